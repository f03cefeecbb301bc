use super::*;
use pretty_assertions::assert_eq;

fn holder() -> NamedTextHolder {
    NamedTextHolder::new(SharedInterner::new())
}

/// Ids in emission order, read back from the banners.
fn emitted_ids(output: &str) -> Vec<&str> {
    output
        .lines()
        .filter_map(|line| line.trim().strip_prefix("//vvvvvvvv below injected by "))
        .filter_map(|rest| rest.strip_suffix(" vvvvvvvv"))
        .collect()
}

#[test]
fn test_dependencies_emit_before_dependents() {
    let mut texts = holder();
    texts.force_add("C", "c".to_string(), &["B"]).unwrap();
    texts.force_add("B", "b".to_string(), &["A"]).unwrap();
    texts.force_add("A", "a".to_string(), &[]).unwrap();

    let mut out = String::new();
    texts.write(&mut out, "\n").unwrap();
    assert_eq!(emitted_ids(&out), vec!["A", "B", "C"]);
}

#[test]
fn test_no_dependencies_keeps_insertion_order() {
    let mut texts = holder();
    texts.force_add("z", "1".to_string(), &[]).unwrap();
    texts.force_add("a", "2".to_string(), &[]).unwrap();

    let mut out = String::new();
    texts.write(&mut out, "\n").unwrap();
    assert_eq!(
        out,
        "    //vvvvvvvv below injected by z vvvvvvvv\n1\n    //^^^^^^^^ above injected by z ^^^^^^^^\n\n\
         \x20   //vvvvvvvv below injected by a vvvvvvvv\n2\n    //^^^^^^^^ above injected by a ^^^^^^^^\n\n"
    );
}

#[test]
fn test_self_dependency_rejected_at_insert() {
    let mut texts = holder();
    let err = texts
        .force_add("X", String::new(), &["W", "X"])
        .unwrap_err();
    assert_eq!(
        err,
        DependencyError::SelfDependency {
            id: "X".to_string()
        }
    );
    assert!(texts.is_empty());
}

#[test]
fn test_unresolved_dependency_is_reported() {
    let mut texts = holder();
    texts.force_add("X", "x".to_string(), &["Y"]).unwrap();

    let mut out = String::new();
    let err = texts.write(&mut out, "\n").unwrap_err();
    assert_eq!(
        err,
        DependencyError::Unresolved {
            entries: vec![UnresolvedEntry {
                id: "X".to_string(),
                missing: vec!["Y".to_string()],
            }]
        }
    );
}

#[test]
fn test_cycle_reports_every_remaining_entry() {
    let mut texts = holder();
    texts.force_add("ok", String::new(), &[]).unwrap();
    texts.force_add("P", String::new(), &["Q", "ok"]).unwrap();
    texts.force_add("Q", String::new(), &["P"]).unwrap();

    let mut out = String::new();
    let DependencyError::Unresolved { entries } = texts.write(&mut out, "\n").unwrap_err() else {
        panic!("expected an unresolved report");
    };
    let report: Vec<(&str, Vec<&str>)> = entries
        .iter()
        .map(|e| (e.id.as_str(), e.missing.iter().map(String::as_str).collect()))
        .collect();
    assert_eq!(report, vec![("P", vec!["Q"]), ("Q", vec!["P"])]);
}

#[test]
fn test_add_skips_existing_id() {
    let mut texts = holder();
    assert!(texts.add("k", "first".to_string(), &[]).unwrap());
    assert!(!texts.add("k", "second".to_string(), &[]).unwrap());
    assert_eq!(texts.len(), 1);
    assert_eq!(texts.texts()[0].content, "first");
}

#[test]
fn test_late_dependency_resolves_by_name() {
    let mut texts = holder();
    texts.force_add("user", "use()".to_string(), &["helper"]).unwrap();
    texts.force_add("helper", "fn()".to_string(), &[]).unwrap();
    assert!(texts.contains("helper"));

    let mut out = String::new();
    texts.write(&mut out, "\r\n").unwrap();
    assert_eq!(emitted_ids(&out), vec!["helper", "user"]);
    assert!(out.contains("fn()\r\n"));
}
