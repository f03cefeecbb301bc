use super::*;
use crate::errors::EvalErrorKind;
use crate::value::{GeneralVec, VecStorage};
use pretty_assertions::assert_eq;
use xcnl_ir::Scalar;

/// Handles `sum(...)`, `vec2(x, y)` and records the metas seen by `mark()`.
#[derive(Default)]
struct TestCalls {
    marked_metas: Vec<String>,
}

impl CallHandler for TestCalls {
    fn eval_call(
        &mut self,
        interp: &mut Interpreter,
        ctx: &CallContext<'_>,
        args: &[Value],
    ) -> EvalResult<Option<Value>> {
        match ctx.name {
            "sum" => {
                let total = args.iter().filter_map(Value::as_i64).sum::<i64>();
                Ok(Some(Value::Int(total)))
            }
            "vec2" => Ok(Some(GeneralVec::with_values(Scalar::I32, 2, args)?.into())),
            "mark" => {
                self.marked_metas.extend(
                    ctx.metas
                        .iter()
                        .map(|m| interp.name_str(m.name).to_string()),
                );
                Ok(Some(Value::Empty))
            }
            _ => Ok(None),
        }
    }
}

fn run(interp: &mut Interpreter, source: &str) -> EvalResult<()> {
    interp.exec_text(source, &mut TestCalls::default())
}

fn eval(interp: &mut Interpreter, source: &str) -> EvalResult {
    interp.eval_text(source, &mut TestCalls::default())
}

#[test]
fn test_literals_and_arithmetic() {
    let mut interp = Interpreter::new(SharedInterner::new());
    assert_eq!(eval(&mut interp, "1 + 2 * 3").unwrap(), Value::Int(7));
    assert_eq!(eval(&mut interp, "\"a\" + \"b\"").unwrap(), Value::string("ab"));
    assert_eq!(eval(&mut interp, "4u >> 1u").unwrap(), Value::Uint(2));
    assert_eq!(eval(&mut interp, "-1.5 * 2").unwrap(), Value::Float(-3.0));
}

#[test]
fn test_short_circuit_skips_right_side() {
    let mut interp = Interpreter::new(SharedInterner::new());
    // `missing` is undefined; it must not be evaluated.
    assert_eq!(eval(&mut interp, "false && missing").unwrap(), Value::Bool(false));
    assert_eq!(eval(&mut interp, "true || missing").unwrap(), Value::Bool(true));
    assert!(eval(&mut interp, "true && missing").is_err());
    assert!(matches!(
        eval(&mut interp, "1 && true").unwrap_err().kind,
        EvalErrorKind::TypeMismatch { .. }
    ));
}

#[test]
fn test_assignment_and_lookup() {
    let mut interp = Interpreter::new(SharedInterner::new());
    run(&mut interp, "x = 40; y = x + 2;").unwrap();
    assert_eq!(eval(&mut interp, "y").unwrap(), Value::Int(42));
}

#[test]
fn test_default_assign_updates_outer_and_local_shadows() {
    let mut interp = Interpreter::new(SharedInterner::new());
    run(&mut interp, "x = 1;").unwrap();
    {
        let mut scoped = interp.scoped();
        run(&mut scoped, "x = 2; :y = 3;").unwrap();
        assert_eq!(eval(&mut scoped, ":y").unwrap(), Value::Int(3));
        assert!(eval(&mut scoped, ":x").is_err());
        run(&mut scoped, ":x = 9;").unwrap();
        assert_eq!(eval(&mut scoped, "x").unwrap(), Value::Int(9));
    }
    assert_eq!(eval(&mut interp, "x").unwrap(), Value::Int(2));
    assert!(eval(&mut interp, "y").is_err());
}

#[test]
fn test_undefined_variable_message() {
    let mut interp = Interpreter::new(SharedInterner::new());
    let err = eval(&mut interp, ":nope").unwrap_err();
    assert_eq!(
        err.kind,
        EvalErrorKind::UndefinedVariable {
            name: ":nope".to_string()
        }
    );
}

#[test]
fn test_calls_go_through_handler() {
    let mut interp = Interpreter::new(SharedInterner::new());
    assert_eq!(eval(&mut interp, "sum(1, 2, sum(3, 4))").unwrap(), Value::Int(10));

    let err = eval(&mut interp, "xcomp.Missing(1, 2)").unwrap_err();
    assert_eq!(
        err.kind,
        EvalErrorKind::UndefinedFunction {
            name: "xcomp.Missing".to_string(),
            args: 2
        }
    );
    assert!(err.span.is_some());
}

#[test]
fn test_no_calls_handler_declines() {
    let mut interp = Interpreter::new(SharedInterner::new());
    let err = interp.eval_text("f()", &mut NoCalls).unwrap_err();
    assert!(matches!(err.kind, EvalErrorKind::UndefinedFunction { .. }));
}

#[test]
fn test_statement_conditions() {
    let mut interp = Interpreter::new(SharedInterner::new());
    run(
        &mut interp,
        "a = 0; @If(a == 0) a = 1; @Skip(a == 1) a = 2; @If(true) @Skip(false) b = 3;",
    )
    .unwrap();
    assert_eq!(eval(&mut interp, "a").unwrap(), Value::Int(1));
    assert_eq!(eval(&mut interp, "b").unwrap(), Value::Int(3));

    let err = run(&mut interp, "@If(1) c = 1;").unwrap_err();
    assert!(matches!(err.kind, EvalErrorKind::TypeMismatch { .. }));
}

#[test]
fn test_statement_metas_reach_handler() {
    let mut interp = Interpreter::new(SharedInterner::new());
    let mut calls = TestCalls::default();
    interp
        .exec_text("@xcomp.Align(16) @If(true) mark();", &mut calls)
        .unwrap();
    assert_eq!(calls.marked_metas, vec!["xcomp.Align", "If"]);
}

#[test]
fn test_vector_field_and_index_assignment() {
    let mut interp = Interpreter::new(SharedInterner::new());
    run(&mut interp, "v = vec2(1, 2); w = v; v.x = 5; v[-1] = 6;").unwrap();
    assert_eq!(eval(&mut interp, "w.x + w[1]").unwrap(), Value::Int(11));
    assert_eq!(eval(&mut interp, "v.Length").unwrap(), Value::Uint(2));
    assert_eq!(eval(&mut interp, "v == vec2(5, 6)").unwrap(), Value::Bool(true));
}

#[test]
fn test_rebinding_owned_vector_replaces_it() {
    let mut interp = Interpreter::new(SharedInterner::new());
    run(&mut interp, "v = vec2(1, 2); w = v; v = 3;").unwrap();
    assert_eq!(eval(&mut interp, "v").unwrap(), Value::Int(3));
    assert_eq!(eval(&mut interp, "w.y").unwrap(), Value::Int(2));
}

#[test]
fn test_assigning_to_view_writes_through() {
    let mut interp = Interpreter::new(SharedInterner::new());
    let host = VecStorage::from_u64s(&[1, 1, 1]);
    let view = GeneralVec::view(host.clone(), 0, Scalar::U64, 3, false).unwrap();
    let name = interp.interner.intern("WgSize");
    interp.env.define(name, view.into());

    run(&mut interp, "WgSize = 64; WgSize.z = 1;").unwrap();
    assert_eq!(host.to_u64s(), vec![64, 64, 1]);
    assert!(eval(&mut interp, "WgSize").unwrap().is_vec_view());
}

#[test]
fn test_field_on_scalar_is_an_error() {
    let mut interp = Interpreter::new(SharedInterner::new());
    run(&mut interp, "n = 1;").unwrap();
    assert!(matches!(
        eval(&mut interp, "n.x").unwrap_err().kind,
        EvalErrorKind::UndefinedField { .. }
    ));
    assert!(matches!(
        run(&mut interp, "n.x = 2;").unwrap_err().kind,
        EvalErrorKind::TypeMismatch { .. }
    ));
}

#[test]
fn test_parse_errors_surface_as_eval_errors() {
    let mut interp = Interpreter::new(SharedInterner::new());
    let err = eval(&mut interp, "1 +").unwrap_err();
    assert!(matches!(err.kind, EvalErrorKind::Parse { .. }));
}
