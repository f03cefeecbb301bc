//! Render expressions back to source text.
//!
//! Used for condition banners in the generated output and for diagnostics.

use crate::ast::{ExprKind, FuncCall, VarScope};
use crate::{ExprArena, ExprId, StringInterner};

/// Render one expression.
pub fn stringify_expr(arena: &ExprArena, interner: &StringInterner, id: ExprId) -> String {
    let mut out = String::new();
    write_expr(&mut out, arena, interner, id);
    out
}

/// Render a call as `name(arg, arg)`.
pub fn stringify_call(arena: &ExprArena, interner: &StringInterner, call: &FuncCall) -> String {
    let mut out = String::new();
    write_call(&mut out, arena, interner, call);
    out
}

fn write_call(out: &mut String, arena: &ExprArena, interner: &StringInterner, call: &FuncCall) {
    out.push_str(interner.lookup(call.name));
    out.push('(');
    for (i, &arg) in arena.call_args(call).iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write_expr(out, arena, interner, arg);
    }
    out.push(')');
}

fn write_expr(out: &mut String, arena: &ExprArena, interner: &StringInterner, id: ExprId) {
    match *arena.kind(id) {
        ExprKind::Bool(b) => out.push_str(if b { "true" } else { "false" }),
        ExprKind::Int(v) => out.push_str(&v.to_string()),
        ExprKind::Uint(v) => {
            out.push_str(&v.to_string());
            out.push('u');
        }
        ExprKind::Float(bits) => {
            let v = f64::from_bits(bits);
            if v.fract() == 0.0 && v.is_finite() {
                out.push_str(&format!("{v:.1}"));
            } else {
                out.push_str(&v.to_string());
            }
        }
        ExprKind::Str(name) => {
            out.push('"');
            for c in interner.lookup(name).chars() {
                match c {
                    '"' => out.push_str("\\\""),
                    '\\' => out.push_str("\\\\"),
                    '\n' => out.push_str("\\n"),
                    '\t' => out.push_str("\\t"),
                    c => out.push(c),
                }
            }
            out.push('"');
        }
        ExprKind::Var(var) => {
            if var.scope == VarScope::Local {
                out.push(':');
            }
            out.push_str(interner.lookup(var.name));
        }
        ExprKind::Call(call) => write_call(out, arena, interner, &call),
        ExprKind::Unary { op, operand } => {
            out.push_str(op.as_symbol());
            write_operand(out, arena, interner, operand);
        }
        ExprKind::Binary { op, left, right } => {
            write_operand(out, arena, interner, left);
            out.push(' ');
            out.push_str(op.as_symbol());
            out.push(' ');
            write_operand(out, arena, interner, right);
        }
        ExprKind::Field { receiver, field } => {
            write_operand(out, arena, interner, receiver);
            out.push('.');
            out.push_str(interner.lookup(field));
        }
        ExprKind::Index { receiver, index } => {
            write_operand(out, arena, interner, receiver);
            out.push('[');
            write_expr(out, arena, interner, index);
            out.push(']');
        }
    }
}

/// Nested binary/unary operands are parenthesized so the text re-parses
/// to the same tree.
fn write_operand(out: &mut String, arena: &ExprArena, interner: &StringInterner, id: ExprId) {
    if matches!(arena.kind(id), ExprKind::Binary { .. } | ExprKind::Unary { .. }) {
        out.push('(');
        write_expr(out, arena, interner, id);
        out.push(')');
    } else {
        write_expr(out, arena, interner, id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinaryOp, Expr, VarRef};
    use crate::Span;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_stringify_binary_with_nesting() {
        let interner = StringInterner::new();
        let mut arena = ExprArena::new();
        let x = arena.alloc_expr(Expr::new(
            ExprKind::Var(VarRef::local(interner.intern("x"))),
            Span::DUMMY,
        ));
        let one = arena.alloc_expr(Expr::new(ExprKind::Int(1), Span::DUMMY));
        let add = arena.alloc_expr(Expr::new(
            ExprKind::Binary {
                op: BinaryOp::Add,
                left: x,
                right: one,
            },
            Span::DUMMY,
        ));
        let two = arena.alloc_expr(Expr::new(ExprKind::Float(2.0f64.to_bits()), Span::DUMMY));
        let gt = arena.alloc_expr(Expr::new(
            ExprKind::Binary {
                op: BinaryOp::Gt,
                left: add,
                right: two,
            },
            Span::DUMMY,
        ));
        assert_eq!(stringify_expr(&arena, &interner, gt), "(:x + 1) > 2.0");
    }

    #[test]
    fn test_stringify_call_with_string() {
        let interner = StringInterner::new();
        let mut arena = ExprArena::new();
        let s = arena.alloc_expr(Expr::new(
            ExprKind::Str(interner.intern("say \"hi\"")),
            Span::DUMMY,
        ));
        let args = arena.alloc_expr_list([s]);
        let call = FuncCall {
            name: interner.intern("xcomp.Log"),
            args,
            span: Span::DUMMY,
        };
        assert_eq!(
            stringify_call(&arena, &interner, &call),
            r#"xcomp.Log("say \"hi\"")"#
        );
    }
}
