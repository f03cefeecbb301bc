//! Syntax tree for XCNL programs.
//!
//! Expressions live in a flat [`ExprArena`](crate::ExprArena) and refer to
//! their children by [`ExprId`]. Statements, blocks and raw blocks are owned
//! directly by the [`Program`].

use std::rc::Rc;

use crate::{ExprArena, ExprId, ExprRange, Name, Span};

/// Binary operators.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,

    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,

    And,
    Or,

    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

impl BinaryOp {
    /// Source-level symbol, used in error messages and when printing conditions.
    pub const fn as_symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::And => "&&",
            Self::Or => "||",
            Self::BitAnd => "&",
            Self::BitOr => "|",
            Self::BitXor => "^",
            Self::Shl => "<<",
            Self::Shr => ">>",
        }
    }

    /// Binding power for precedence climbing (higher binds tighter).
    pub const fn precedence(self) -> u8 {
        match self {
            Self::Or => 1,
            Self::And => 2,
            Self::BitOr => 3,
            Self::BitXor => 4,
            Self::BitAnd => 5,
            Self::Eq | Self::NotEq => 6,
            Self::Lt | Self::LtEq | Self::Gt | Self::GtEq => 7,
            Self::Shl | Self::Shr => 8,
            Self::Add | Self::Sub => 9,
            Self::Mul | Self::Div | Self::Mod => 10,
        }
    }
}

/// Unary operators.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum UnaryOp {
    Neg,
    Not,
    BitNot,
}

impl UnaryOp {
    pub const fn as_symbol(self) -> &'static str {
        match self {
            Self::Neg => "-",
            Self::Not => "!",
            Self::BitNot => "~",
        }
    }
}

/// How a variable reference resolves against the scope chain.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub enum VarScope {
    /// `name`: found anywhere in the chain; assignment updates the nearest
    /// existing binding or defines one in the current frame.
    #[default]
    Default,
    /// `:name`: current frame only.
    Local,
}

/// A variable reference.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct VarRef {
    pub name: Name,
    pub scope: VarScope,
}

impl VarRef {
    pub const fn new(name: Name) -> Self {
        VarRef {
            name,
            scope: VarScope::Default,
        }
    }

    pub const fn local(name: Name) -> Self {
        VarRef {
            name,
            scope: VarScope::Local,
        }
    }

    #[inline]
    pub const fn is_local(&self) -> bool {
        matches!(self.scope, VarScope::Local)
    }
}

/// A function call (or annotation) with its full dotted name, e.g.
/// `xcomp.Arg.Buf`.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct FuncCall {
    pub name: Name,
    pub args: ExprRange,
    pub span: Span,
}

/// Expression node.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    #[inline]
    pub const fn new(kind: ExprKind, span: Span) -> Self {
        Expr { kind, span }
    }
}

/// Expression variants.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ExprKind {
    Bool(bool),
    Int(i64),
    /// Integer literal with a `u` suffix.
    Uint(u64),
    /// Float literal stored as bits so the node stays `Eq`.
    Float(u64),
    Str(Name),
    Var(VarRef),
    Call(FuncCall),
    Unary {
        op: UnaryOp,
        operand: ExprId,
    },
    Binary {
        op: BinaryOp,
        left: ExprId,
        right: ExprId,
    },
    /// `receiver.field`
    Field {
        receiver: ExprId,
        field: Name,
    },
    /// `receiver[index]`
    Index {
        receiver: ExprId,
        index: ExprId,
    },
}

impl ExprKind {
    /// Short type tag for diagnostics ("Var", "Call", "Str", ...).
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "Bool",
            Self::Int(_) => "Int",
            Self::Uint(_) => "Uint",
            Self::Float(_) => "Float",
            Self::Str(_) => "Str",
            Self::Var(_) => "Var",
            Self::Call(_) => "Call",
            Self::Unary { .. } => "Unary",
            Self::Binary { .. } => "Binary",
            Self::Field { .. } | Self::Index { .. } => "Query",
        }
    }
}

/// One step of an assignment target path: `v.x = ...` or `v[1] = ...`.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum SubQuery {
    Field(Name),
    Index(ExprId),
}

/// Assignment target.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct AssignTarget {
    pub var: VarRef,
    pub path: Vec<SubQuery>,
}

/// Statement variants.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum StmtKind {
    Assign { target: AssignTarget, value: ExprId },
    Expr(ExprId),
}

/// A statement together with its `@annotation(...)` list.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Statement {
    pub kind: StmtKind,
    pub metas: Vec<FuncCall>,
    pub span: Span,
}

/// A typed block whose body is a statement list, e.g. an `xcomp.Struct`.
#[derive(Clone, Debug)]
pub struct Block {
    pub type_tag: Name,
    pub name: Name,
    pub statements: Vec<Statement>,
    pub span: Span,
}

/// A typed block whose body is kept as free-form text.
#[derive(Clone, Debug)]
pub struct RawBlock {
    pub type_tag: Name,
    pub name: Name,
    pub source: Rc<str>,
    pub span: Span,
}

/// Top-level item of a program.
#[derive(Clone, Debug)]
pub enum ProgramItem {
    Statement(Statement),
    Block { metas: Vec<FuncCall>, block: Block },
    RawBlock { metas: Vec<FuncCall>, block: RawBlock },
}

impl ProgramItem {
    /// Type tag of a block item; `None` for plain statements.
    pub fn type_tag(&self) -> Option<Name> {
        match self {
            ProgramItem::Statement(_) => None,
            ProgramItem::Block { block, .. } => Some(block.type_tag),
            ProgramItem::RawBlock { block, .. } => Some(block.type_tag),
        }
    }
}

/// A parsed program: expression storage plus the ordered top-level items.
#[derive(Clone, Debug, Default)]
pub struct Program {
    pub arena: ExprArena,
    pub items: Vec<ProgramItem>,
}
