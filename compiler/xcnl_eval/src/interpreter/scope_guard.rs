//! RAII scope frames for the interpreter.
//!
//! [`ScopedInterpreter`] pushes a frame on creation and pops it on drop, so
//! the frame is released on every exit path including `?` returns. It
//! derefs to the interpreter, keeping all evaluation methods available.

use std::ops::{Deref, DerefMut};

use xcnl_ir::Name;

use super::Interpreter;
use crate::Value;

/// Guard over an interpreter with one extra frame pushed.
pub struct ScopedInterpreter<'guard> {
    interpreter: &'guard mut Interpreter,
}

impl Drop for ScopedInterpreter<'_> {
    fn drop(&mut self) {
        self.interpreter.env.pop_scope();
    }
}

impl Deref for ScopedInterpreter<'_> {
    type Target = Interpreter;

    fn deref(&self) -> &Self::Target {
        self.interpreter
    }
}

impl DerefMut for ScopedInterpreter<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.interpreter
    }
}

impl Interpreter {
    /// Push a frame that lives as long as the returned guard.
    pub fn scoped(&mut self) -> ScopedInterpreter<'_> {
        self.env.push_scope();
        ScopedInterpreter { interpreter: self }
    }

    /// Run `f` inside a fresh frame.
    pub fn with_env_scope<T, F>(&mut self, f: F) -> T
    where
        F: FnOnce(&mut ScopedInterpreter<'_>) -> T,
    {
        let mut scoped = self.scoped();
        f(&mut scoped)
    }

    /// Run `f` inside a fresh frame with `bindings` defined locally.
    pub fn with_bindings<T, F, I>(&mut self, bindings: I, f: F) -> T
    where
        F: FnOnce(&mut ScopedInterpreter<'_>) -> T,
        I: IntoIterator<Item = (Name, Value)>,
    {
        self.with_env_scope(|scoped| {
            for (name, value) in bindings {
                scoped.env.define(name, value);
            }
            f(scoped)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use xcnl_ir::SharedInterner;

    #[test]
    fn test_scoped_pops_on_drop() {
        let mut interp = Interpreter::new(SharedInterner::new());
        let x = interp.interner.intern("x");
        assert_eq!(interp.env.depth(), 1);
        {
            let mut scoped = interp.scoped();
            scoped.env.define(x, Value::Int(1));
            assert_eq!(scoped.env.depth(), 2);
        }
        assert_eq!(interp.env.depth(), 1);
        assert_eq!(interp.env.lookup(x), None);
    }

    #[test]
    fn test_scope_popped_on_error_return() {
        let mut interp = Interpreter::new(SharedInterner::new());
        let result: Result<(), &str> = interp.with_env_scope(|scoped| {
            scoped.env.push_scope();
            scoped.env.pop_scope();
            Err("boom")
        });
        assert!(result.is_err());
        assert_eq!(interp.env.depth(), 1);
    }

    #[test]
    fn test_with_bindings() {
        let mut interp = Interpreter::new(SharedInterner::new());
        let a = interp.interner.intern("a");
        let seen = interp.with_bindings([(a, Value::Int(3))], |scoped| scoped.env.lookup_local(a));
        assert_eq!(seen, Some(Value::Int(3)));
        assert_eq!(interp.env.lookup(a), None);
    }
}
