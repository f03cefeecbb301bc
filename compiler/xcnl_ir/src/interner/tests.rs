use super::*;

#[test]
fn test_intern_dedup() {
    let interner = StringInterner::new();
    let a = interner.intern("xcomp.Field");
    let b = interner.intern("xcomp.Field");
    let c = interner.intern("xcomp.Align");
    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_eq!(interner.lookup(a), "xcomp.Field");
    assert_eq!(interner.lookup(c), "xcomp.Align");
}

#[test]
fn test_empty_is_preinterned() {
    let interner = StringInterner::new();
    assert_eq!(interner.intern(""), Name::EMPTY);
    assert!(interner.is_empty());
}

#[test]
fn test_get_does_not_insert() {
    let interner = StringInterner::new();
    assert_eq!(interner.get("missing"), None);
    assert_eq!(interner.len(), 1);
    let name = interner.intern("present");
    assert_eq!(interner.get("present"), Some(name));
}

#[test]
fn test_shared_interner_clones_share_storage() {
    let shared = SharedInterner::new();
    let other = shared.clone();
    let name = shared.intern("kernel");
    assert_eq!(other.lookup(name), "kernel");
}
