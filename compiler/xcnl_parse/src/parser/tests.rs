use super::*;
use pretty_assertions::assert_eq;
use xcnl_ir::printer::stringify_expr;

fn round_trip(source: &str) -> String {
    let interner = StringInterner::new();
    let mut arena = ExprArena::new();
    let mut parser = Parser::new(source, &mut arena, &interner).unwrap();
    let id = parser.parse_expr().unwrap();
    parser.finish().unwrap();
    stringify_expr(&arena, &interner, id)
}

#[test]
fn test_precedence() {
    assert_eq!(round_trip("1 + 2 * 3"), "1 + (2 * 3)");
    assert_eq!(round_trip("(1 + 2) * 3"), "(1 + 2) * 3");
    assert_eq!(round_trip("a < 3 && b || c"), "((a < 3) && b) || c");
    assert_eq!(round_trip("1 - 2 - 3"), "(1 - 2) - 3");
    assert_eq!(round_trip("x << 2 + 1"), "x << (2 + 1)");
}

#[test]
fn test_unary_and_negative_literals() {
    assert_eq!(round_trip("-1"), "-1");
    assert_eq!(round_trip("-2.5"), "-2.5");
    assert_eq!(round_trip("!flag"), "!flag");
    assert_eq!(round_trip("-x + 1"), "(-x) + 1");
}

#[test]
fn test_dotted_call_vs_field_access() {
    assert_eq!(round_trip("xcomp.Arg.Buf(1, 2u)"), "xcomp.Arg.Buf(1, 2u)");
    assert_eq!(round_trip("cfg.size.x"), "cfg.size.x");
    assert_eq!(round_trip("v[1].y"), "v[1].y");
}

#[test]
fn test_field_access_is_not_a_var_named_with_dots() {
    let interner = StringInterner::new();
    let mut arena = ExprArena::new();
    let mut parser = Parser::new("cfg.size", &mut arena, &interner).unwrap();
    let id = parser.parse_expr().unwrap();
    let ExprKind::Field { receiver, field } = *arena.kind(id) else {
        panic!("expected field access, got {:?}", arena.kind(id));
    };
    assert_eq!(interner.lookup(field), "size");
    assert_eq!(
        arena.kind(receiver),
        &ExprKind::Var(VarRef::new(interner.intern("cfg")))
    );
}

#[test]
fn test_local_var() {
    assert_eq!(round_trip(":tmp * 2"), ":tmp * 2");
}

#[test]
fn test_statements_with_metas() {
    let interner = StringInterner::new();
    let mut arena = ExprArena::new();
    let mut parser = Parser::new(
        "@If(debug) x = 1; v.y = 2.0; xcomp.Log(\"hi\")",
        &mut arena,
        &interner,
    )
    .unwrap();
    let stmts = parser.parse_statements().unwrap();
    assert_eq!(stmts.len(), 3);

    assert_eq!(stmts[0].metas.len(), 1);
    assert_eq!(interner.lookup(stmts[0].metas[0].name), "If");
    let StmtKind::Assign { target, .. } = &stmts[0].kind else {
        panic!("expected assignment");
    };
    assert!(target.path.is_empty());

    let StmtKind::Assign { target, .. } = &stmts[1].kind else {
        panic!("expected assignment");
    };
    assert_eq!(interner.lookup(target.var.name), "v");
    assert_eq!(target.path, vec![SubQuery::Field(interner.intern("y"))]);

    assert!(matches!(stmts[2].kind, StmtKind::Expr(_)));
}

#[test]
fn test_missing_semicolon_between_statements() {
    let interner = StringInterner::new();
    let mut arena = ExprArena::new();
    let mut parser = Parser::new("a = 1 b = 2", &mut arena, &interner).unwrap();
    let err = parser.parse_statements().unwrap_err();
    assert_eq!(
        err.kind,
        ParseErrorKind::UnexpectedToken {
            expected: "`;`",
            found: "identifier"
        }
    );
}

#[test]
fn test_invalid_assign_target() {
    let interner = StringInterner::new();
    let mut arena = ExprArena::new();
    let mut parser = Parser::new("f() = 1;", &mut arena, &interner).unwrap();
    let err = parser.parse_statements().unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::InvalidAssignTarget);
}

#[test]
fn test_trailing_input() {
    let interner = StringInterner::new();
    let mut arena = ExprArena::new();
    let mut parser = Parser::new("1 2", &mut arena, &interner).unwrap();
    parser.parse_expr().unwrap();
    assert_eq!(parser.finish().unwrap_err().kind, ParseErrorKind::TrailingInput);
}

#[test]
fn test_nesting_limit() {
    let source = format!("{}1{}", "(".repeat(400), ")".repeat(400));
    let interner = StringInterner::new();
    let mut arena = ExprArena::new();
    let mut parser = Parser::new(&source, &mut arena, &interner).unwrap();
    let err = parser.parse_expr().unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::TooDeep { limit: MAX_NESTING });
}

#[test]
fn test_parse_call_annotation() {
    let interner = StringInterner::new();
    let mut arena = ExprArena::new();
    let mut parser = Parser::new("xcomp.TemplateArgs(a, b)", &mut arena, &interner).unwrap();
    let call = parser.parse_call().unwrap();
    assert_eq!(interner.lookup(call.name), "xcomp.TemplateArgs");
    assert_eq!(arena.call_args(&call).len(), 2);
}
