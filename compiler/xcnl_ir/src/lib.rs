//! Intermediate representation for the XCNL kernel-source generator.
//!
//! - [`Name`] / [`StringInterner`]: interned identifiers shared by the parser,
//!   the evaluator and the generator
//! - [`ExprArena`]: flat expression storage addressed by [`ExprId`]
//! - [`ast`]: statements, typed blocks and raw text blocks
//! - [`vec_type`]: primitive vector type descriptors like `f32v4`

mod arena;
pub mod ast;
mod interner;
mod name;
pub mod printer;
mod span;
pub mod vec_type;

pub use arena::{ExprArena, ExprId, ExprRange};
pub use ast::{
    AssignTarget, BinaryOp, Block, Expr, ExprKind, FuncCall, Program, ProgramItem, RawBlock,
    Statement, StmtKind, SubQuery, UnaryOp, VarRef, VarScope,
};
pub use interner::{InternError, SharedInterner, StringInterner};
pub use name::Name;
pub use span::Span;
pub use vec_type::{ParsedVecType, Scalar, ScalarKind, VecType};
