//! Arena allocation for the flat expression tree.

use std::fmt;

use crate::ast::{Expr, ExprKind, FuncCall};

/// Index of an expression in an [`ExprArena`].
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct ExprId(u32);

impl ExprId {
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// `(start, len)` window into the arena's argument-list storage.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct ExprRange {
    start: u32,
    len: u16,
}

impl ExprRange {
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.len == 0
    }
}

/// Contiguous storage for all expressions of one parse.
///
/// - All expressions stored in a flat Vec
/// - Child references use `ExprId` indices
/// - Argument lists use `ExprRange` into `expr_lists`
#[derive(Clone, Default)]
pub struct ExprArena {
    exprs: Vec<Expr>,
    expr_lists: Vec<ExprId>,
}

impl ExprArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with estimated capacity based on source size.
    pub fn with_capacity(source_len: usize) -> Self {
        let estimated_exprs = source_len / 8;
        ExprArena {
            exprs: Vec::with_capacity(estimated_exprs),
            expr_lists: Vec::with_capacity(estimated_exprs / 2),
        }
    }

    /// Allocate expression, return ID.
    ///
    /// # Panics
    /// Panics if the arena exceeds `u32::MAX - 1` expressions.
    #[inline]
    pub fn alloc_expr(&mut self, expr: Expr) -> ExprId {
        let index = u32::try_from(self.exprs.len())
            .ok()
            .filter(|&i| i != u32::MAX)
            .unwrap_or_else(|| panic!("expression arena overflow"));
        self.exprs.push(expr);
        ExprId(index)
    }

    /// Get expression by ID.
    ///
    /// # Panics
    /// Panics if `id` is out of bounds.
    #[inline]
    #[track_caller]
    pub fn get_expr(&self, id: ExprId) -> &Expr {
        &self.exprs[id.index()]
    }

    #[inline]
    pub fn kind(&self, id: ExprId) -> &ExprKind {
        &self.get_expr(id).kind
    }

    #[inline]
    pub fn expr_count(&self) -> usize {
        self.exprs.len()
    }

    /// Allocate expression list, return range.
    ///
    /// # Panics
    /// Panics if the list holds more than `u16::MAX` expressions.
    pub fn alloc_expr_list(&mut self, exprs: impl IntoIterator<Item = ExprId>) -> ExprRange {
        let start = self.expr_lists.len();
        self.expr_lists.extend(exprs);
        let len = u16::try_from(self.expr_lists.len() - start)
            .unwrap_or_else(|_| panic!("argument list exceeds {} entries", u16::MAX));
        let start = u32::try_from(start).unwrap_or_else(|_| panic!("expression list overflow"));
        ExprRange { start, len }
    }

    /// Get expression list by range.
    #[inline]
    pub fn get_expr_list(&self, range: ExprRange) -> &[ExprId] {
        let start = range.start as usize;
        let end = start + usize::from(range.len);
        &self.expr_lists[start..end]
    }

    /// Arguments of a call.
    #[inline]
    pub fn call_args(&self, call: &FuncCall) -> &[ExprId] {
        self.get_expr_list(call.args)
    }
}

impl fmt::Debug for ExprArena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExprArena")
            .field("exprs", &self.exprs.len())
            .field("expr_lists", &self.expr_lists.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Name, Span};

    #[test]
    fn test_alloc_and_list() {
        let mut arena = ExprArena::new();
        let a = arena.alloc_expr(Expr::new(ExprKind::Int(1), Span::DUMMY));
        let b = arena.alloc_expr(Expr::new(ExprKind::Int(2), Span::DUMMY));
        let range = arena.alloc_expr_list([a, b]);
        assert_eq!(arena.get_expr_list(range), &[a, b]);
        assert_eq!(arena.kind(b), &ExprKind::Int(2));

        let call = FuncCall {
            name: Name::from_raw(3),
            args: range,
            span: Span::DUMMY,
        };
        assert_eq!(arena.call_args(&call).len(), 2);
    }

    #[test]
    fn test_empty_list() {
        let mut arena = ExprArena::with_capacity(64);
        let range = arena.alloc_expr_list(std::iter::empty());
        assert!(range.is_empty());
        assert!(arena.get_expr_list(range).is_empty());
    }
}
