//! Tree-walking interpreter over the flat expression arena.
//!
//! The interpreter owns the variable environment and nothing else. Every
//! function call is offered to a [`CallHandler`] supplied by the caller; a
//! call the handler does not claim is an undefined-function error. This is
//! the seam the generator uses to implement `xcomp.*` builtins and to route
//! calls to extensions.

mod scope_guard;

pub use scope_guard::ScopedInterpreter;

use tracing::trace;
use xcnl_ir::{
    AssignTarget, BinaryOp, ExprArena, ExprId, ExprKind, FuncCall, Name, SharedInterner,
    Statement, StmtKind, SubQuery, VarRef,
};

use crate::environment::Environment;
use crate::errors::{
    not_indexable, type_mismatch, undefined_field, undefined_function, undefined_variable,
    wrong_arg_count, EvalError, EvalResult,
};
use crate::operators::{evaluate_binary, evaluate_unary};
use crate::stack::ensure_sufficient_stack;
use crate::Value;

/// The call being dispatched, with access to its unevaluated form.
pub struct CallContext<'a> {
    pub arena: &'a ExprArena,
    pub call: &'a FuncCall,
    /// Full dotted name, e.g. `xcomp.Arg.Buf`.
    pub name: &'a str,
    /// Annotations of the statement this call heads; empty for nested calls.
    pub metas: &'a [FuncCall],
}

impl CallContext<'_> {
    /// Unevaluated argument expressions.
    pub fn arg_exprs(&self) -> &[ExprId] {
        self.arena.call_args(self.call)
    }
}

/// Intercepts function calls during evaluation.
pub trait CallHandler {
    /// Handle a call with already-evaluated `args`. `Ok(None)` declines it.
    fn eval_call(
        &mut self,
        interp: &mut Interpreter,
        ctx: &CallContext<'_>,
        args: &[Value],
    ) -> EvalResult<Option<Value>>;
}

/// Handler that declines every call.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoCalls;

impl CallHandler for NoCalls {
    fn eval_call(
        &mut self,
        _interp: &mut Interpreter,
        _ctx: &CallContext<'_>,
        _args: &[Value],
    ) -> EvalResult<Option<Value>> {
        Ok(None)
    }
}

/// Pre-interned names the interpreter checks on every statement.
#[derive(Clone, Copy, Debug)]
struct CoreNames {
    if_: Name,
    skip: Name,
}

pub struct Interpreter {
    pub interner: SharedInterner,
    pub env: Environment,
    names: CoreNames,
}

impl Interpreter {
    pub fn new(interner: SharedInterner) -> Self {
        let names = CoreNames {
            if_: interner.intern("If"),
            skip: interner.intern("Skip"),
        };
        Interpreter {
            interner,
            env: Environment::new(),
            names,
        }
    }

    #[inline]
    pub fn name_str(&self, name: Name) -> &'static str {
        self.interner.lookup(name)
    }

    /// Evaluate one expression.
    pub fn eval_expr(
        &mut self,
        arena: &ExprArena,
        id: ExprId,
        handler: &mut dyn CallHandler,
    ) -> EvalResult {
        ensure_sufficient_stack(|| self.eval_expr_inner(arena, id, handler))
            .map_err(|e| e.with_span(arena.get_expr(id).span))
    }

    fn eval_expr_inner(
        &mut self,
        arena: &ExprArena,
        id: ExprId,
        handler: &mut dyn CallHandler,
    ) -> EvalResult {
        match *arena.kind(id) {
            ExprKind::Bool(b) => Ok(Value::Bool(b)),
            ExprKind::Int(v) => Ok(Value::Int(v)),
            ExprKind::Uint(v) => Ok(Value::Uint(v)),
            ExprKind::Float(bits) => Ok(Value::Float(f64::from_bits(bits))),
            ExprKind::Str(name) => Ok(Value::string(self.name_str(name))),
            ExprKind::Var(var) => self.lookup_var(var).ok_or_else(|| self.undefined(var)),
            ExprKind::Call(call) => self.eval_call(arena, &call, &[], handler),
            ExprKind::Unary { op, operand } => {
                let value = self.eval_expr(arena, operand, handler)?;
                evaluate_unary(op, &value)
            }
            ExprKind::Binary {
                op: op @ (BinaryOp::And | BinaryOp::Or),
                left,
                right,
            } => {
                let lhs = self.eval_bool(arena, left, handler)?;
                if (op == BinaryOp::And) != lhs {
                    return Ok(Value::Bool(lhs));
                }
                Ok(Value::Bool(self.eval_bool(arena, right, handler)?))
            }
            ExprKind::Binary { op, left, right } => {
                let lhs = self.eval_expr(arena, left, handler)?;
                let rhs = self.eval_expr(arena, right, handler)?;
                evaluate_binary(&lhs, &rhs, op)
            }
            ExprKind::Field { receiver, field } => {
                let value = self.eval_expr(arena, receiver, handler)?;
                self.query(&value, SubQueryValue::Field(self.name_str(field)))
            }
            ExprKind::Index { receiver, index } => {
                let value = self.eval_expr(arena, receiver, handler)?;
                let index = self.eval_index(arena, index, handler)?;
                self.query(&value, SubQueryValue::Index(index))
            }
        }
    }

    fn eval_bool(
        &mut self,
        arena: &ExprArena,
        id: ExprId,
        handler: &mut dyn CallHandler,
    ) -> EvalResult<bool> {
        let value = self.eval_expr(arena, id, handler)?;
        value
            .as_bool()
            .ok_or_else(|| type_mismatch("Bool", value.type_name()))
    }

    fn eval_index(
        &mut self,
        arena: &ExprArena,
        id: ExprId,
        handler: &mut dyn CallHandler,
    ) -> EvalResult<i64> {
        let value = self.eval_expr(arena, id, handler)?;
        value
            .as_i64()
            .ok_or_else(|| type_mismatch("integer index", value.type_name()))
    }

    /// Evaluate the arguments of `call` left to right.
    pub fn eval_args(
        &mut self,
        arena: &ExprArena,
        call: &FuncCall,
        handler: &mut dyn CallHandler,
    ) -> EvalResult<Vec<Value>> {
        arena
            .call_args(call)
            .iter()
            .map(|&arg| self.eval_expr(arena, arg, handler))
            .collect()
    }

    /// Evaluate a call, offering it to `handler`.
    pub fn eval_call(
        &mut self,
        arena: &ExprArena,
        call: &FuncCall,
        metas: &[FuncCall],
        handler: &mut dyn CallHandler,
    ) -> EvalResult {
        let args = self.eval_args(arena, call, handler)?;
        let name = self.name_str(call.name);
        trace!(name, args = args.len(), "call");
        let ctx = CallContext {
            arena,
            call,
            name,
            metas,
        };
        match handler.eval_call(self, &ctx, &args)? {
            Some(value) => Ok(value),
            None => Err(undefined_function(name, args.len()).with_span(call.span)),
        }
    }

    /// Evaluate `If(cond)` / `Skip(cond)` annotations. Returns `false` when
    /// the annotated item must be skipped. Other annotations are ignored.
    pub fn check_conditions(
        &mut self,
        arena: &ExprArena,
        metas: &[FuncCall],
        handler: &mut dyn CallHandler,
    ) -> EvalResult<bool> {
        for meta in metas {
            let expect = if meta.name == self.names.if_ {
                true
            } else if meta.name == self.names.skip {
                false
            } else {
                continue;
            };
            let args = arena.call_args(meta);
            let [cond] = args else {
                return Err(wrong_arg_count(self.name_str(meta.name), 1, args.len())
                    .with_span(meta.span));
            };
            if self.eval_bool(arena, *cond, handler)? != expect {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub fn exec_statement(
        &mut self,
        arena: &ExprArena,
        stmt: &Statement,
        handler: &mut dyn CallHandler,
    ) -> EvalResult<()> {
        if !self.check_conditions(arena, &stmt.metas, handler)? {
            trace!("statement skipped by condition");
            return Ok(());
        }
        match &stmt.kind {
            StmtKind::Assign { target, value } => {
                let value = self.eval_expr(arena, *value, handler)?;
                self.assign_target(arena, target, value, handler)
                    .map_err(|e| e.with_span(stmt.span))
            }
            StmtKind::Expr(id) => {
                if let ExprKind::Call(call) = *arena.kind(*id) {
                    self.eval_call(arena, &call, &stmt.metas, handler)
                        .map_err(|e| e.with_span(arena.get_expr(*id).span))?;
                } else {
                    self.eval_expr(arena, *id, handler)?;
                }
                Ok(())
            }
        }
    }

    pub fn exec_statements(
        &mut self,
        arena: &ExprArena,
        stmts: &[Statement],
        handler: &mut dyn CallHandler,
    ) -> EvalResult<()> {
        for stmt in stmts {
            self.exec_statement(arena, stmt, handler)?;
        }
        Ok(())
    }

    /// Parse and evaluate a single expression written as text.
    pub fn eval_text(&mut self, source: &str, handler: &mut dyn CallHandler) -> EvalResult {
        let mut arena = ExprArena::with_capacity(source.len());
        let id = xcnl_parse::parse_expression(source, &mut arena, &self.interner)?;
        self.eval_expr(&arena, id, handler)
    }

    /// Parse and run statements written as text.
    pub fn exec_text(&mut self, source: &str, handler: &mut dyn CallHandler) -> EvalResult<()> {
        let mut arena = ExprArena::with_capacity(source.len());
        let stmts = xcnl_parse::parse_statements(source, &mut arena, &self.interner)?;
        self.exec_statements(&arena, &stmts, handler)
    }

    pub fn lookup_var(&self, var: VarRef) -> Option<Value> {
        if var.is_local() {
            self.env.lookup_local(var.name)
        } else {
            self.env.lookup(var.name)
        }
    }

    /// Assign to a variable. A binding that holds a vector view is written
    /// through instead of being replaced.
    pub fn assign_var(&mut self, var: VarRef, value: Value) -> EvalResult<()> {
        if let Some(Value::Custom(view)) = self.lookup_var(var).filter(Value::is_vec_view) {
            return view.assign(&value);
        }
        if var.is_local() {
            self.env.define(var.name, value);
        } else {
            self.env.assign(var.name, value);
        }
        Ok(())
    }

    fn assign_target(
        &mut self,
        arena: &ExprArena,
        target: &AssignTarget,
        value: Value,
        handler: &mut dyn CallHandler,
    ) -> EvalResult<()> {
        let Some((last, init)) = target.path.split_last() else {
            return self.assign_var(target.var, value);
        };
        let mut current = self
            .lookup_var(target.var)
            .ok_or_else(|| self.undefined(target.var))?;
        for query in init {
            let query = self.resolve_query(arena, *query, handler)?;
            current = self.query(&current, query)?;
        }
        let Value::Custom(custom) = &current else {
            return Err(type_mismatch("custom value", current.type_name()));
        };
        match self.resolve_query(arena, *last, handler)? {
            SubQueryValue::Field(field) => custom.assign_field(field, &value),
            SubQueryValue::Index(index) => custom.assign_index(index, &value),
        }
    }

    fn resolve_query(
        &mut self,
        arena: &ExprArena,
        query: SubQuery,
        handler: &mut dyn CallHandler,
    ) -> EvalResult<SubQueryValue> {
        Ok(match query {
            SubQuery::Field(name) => SubQueryValue::Field(self.name_str(name)),
            SubQuery::Index(id) => SubQueryValue::Index(self.eval_index(arena, id, handler)?),
        })
    }

    fn query(&self, value: &Value, query: SubQueryValue) -> EvalResult {
        match (value, query) {
            (Value::Custom(custom), SubQueryValue::Field(field)) => custom.field(field),
            (Value::Custom(custom), SubQueryValue::Index(index)) => custom.index(index),
            (_, SubQueryValue::Field(field)) => Err(undefined_field(field, value.type_name())),
            (_, SubQueryValue::Index(_)) => Err(not_indexable(value.type_name())),
        }
    }

    #[cold]
    fn undefined(&self, var: VarRef) -> EvalError {
        let name = self.name_str(var.name);
        if var.is_local() {
            undefined_variable(&format!(":{name}"))
        } else {
            undefined_variable(name)
        }
    }
}

/// A field or index step with its index already evaluated.
#[derive(Clone, Copy, Debug)]
enum SubQueryValue {
    Field(&'static str),
    Index(i64),
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests unwrap evaluation results")]
mod tests;
