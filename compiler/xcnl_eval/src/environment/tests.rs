use super::*;
use pretty_assertions::assert_eq;
use xcnl_ir::SharedInterner;

#[test]
fn test_scope_define_lookup() {
    let interner = SharedInterner::default();
    let x = interner.intern("x");

    let mut scope = Scope::new();
    scope.define(x, Value::Int(42));
    assert_eq!(scope.lookup(x), Some(Value::Int(42)));
    assert_eq!(scope.len(), 1);
}

#[test]
fn test_scope_shadowing() {
    let interner = SharedInterner::default();
    let x = interner.intern("x");

    let parent = LocalScope::new(Scope::new());
    parent.borrow_mut().define(x, Value::Int(1));

    let mut child = Scope::with_parent(parent);
    child.define(x, Value::Int(2));
    assert_eq!(child.lookup(x), Some(Value::Int(2)));
}

#[test]
fn test_environment_push_pop() {
    let interner = SharedInterner::default();
    let x = interner.intern("x");

    let mut env = Environment::new();
    env.define(x, Value::Int(1));

    env.push_scope();
    env.define(x, Value::Int(2));
    assert_eq!(env.lookup(x), Some(Value::Int(2)));
    assert_eq!(env.depth(), 2);

    env.pop_scope();
    assert_eq!(env.lookup(x), Some(Value::Int(1)));
}

#[test]
fn test_global_frame_is_never_popped() {
    let interner = SharedInterner::default();
    let x = interner.intern("x");

    let mut env = Environment::new();
    env.define_global(x, Value::Bool(true));
    env.pop_scope();
    env.pop_scope();
    assert_eq!(env.depth(), 1);
    assert_eq!(env.lookup(x), Some(Value::Bool(true)));
}

#[test]
fn test_assign_updates_nearest_binding() {
    let interner = SharedInterner::default();
    let x = interner.intern("x");

    let mut env = Environment::new();
    env.define(x, Value::Int(1));
    env.push_scope();
    env.assign(x, Value::Int(5));
    assert_eq!(env.lookup_local(x), None);
    env.pop_scope();
    assert_eq!(env.lookup(x), Some(Value::Int(5)));
}

#[test]
fn test_assign_unbound_defines_in_current_frame() {
    let interner = SharedInterner::default();
    let y = interner.intern("y");

    let mut env = Environment::new();
    env.push_scope();
    env.assign(y, Value::string("hi"));
    assert_eq!(env.lookup_local(y), Some(Value::string("hi")));
    env.pop_scope();
    assert_eq!(env.lookup(y), None);
}

#[test]
fn test_lookup_local_ignores_parents() {
    let interner = SharedInterner::default();
    let x = interner.intern("x");

    let mut env = Environment::new();
    env.define(x, Value::Int(1));
    env.push_scope();
    assert_eq!(env.lookup(x), Some(Value::Int(1)));
    assert_eq!(env.lookup_local(x), None);
}

#[test]
fn test_local_scope_clone_shares() {
    let scope1 = LocalScope::new(42);
    let scope2 = scope1.clone();
    *scope1.borrow_mut() = 100;
    assert_eq!(*scope2.borrow(), 100);
}
