//! Error types for expression evaluation.
//!
//! `EvalErrorKind` gives each failure a typed category; the `#[cold]`
//! factory functions below are the construction API and fill in both the
//! kind and the rendered message.

use std::fmt;

use xcnl_ir::{BinaryOp, Span, UnaryOp};
use xcnl_parse::ParseError;

use crate::Value;

/// Result of evaluation.
pub type EvalResult<T = Value> = Result<T, EvalError>;

/// Typed error category.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EvalErrorKind {
    // Arithmetic
    DivisionByZero,
    ModuloByZero,
    IntegerOverflow {
        operation: String,
    },

    // Type/Operator
    TypeMismatch {
        expected: String,
        got: String,
    },
    InvalidBinaryOp {
        type_name: String,
        op: BinaryOp,
    },
    InvalidUnaryOp {
        type_name: String,
        op: UnaryOp,
    },
    BinaryTypeMismatch {
        left: String,
        right: String,
    },

    // Access
    UndefinedVariable {
        name: String,
    },
    UndefinedFunction {
        name: String,
        args: usize,
    },
    UndefinedField {
        field: String,
        type_name: String,
    },
    NotIndexable {
        type_name: String,
    },
    IndexOutOfRange {
        type_name: String,
        access: String,
        len: usize,
    },
    ReadOnly {
        type_name: String,
    },
    LengthMismatch {
        expected: usize,
        got: usize,
    },

    // Calls
    ArityMismatch {
        name: String,
        expected: usize,
        got: usize,
    },
    TooFewArgs {
        name: String,
        min: usize,
        got: usize,
    },
    InvalidArgument {
        name: String,
        index: usize,
        expected: String,
        got: String,
    },
    StackOverflow {
        depth: usize,
    },

    /// Runtime text failed to parse.
    Parse {
        message: String,
    },

    /// Errors that carry only a message.
    Custom {
        message: String,
    },
}

impl fmt::Display for EvalErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DivisionByZero => write!(f, "division by zero"),
            Self::ModuloByZero => write!(f, "modulo by zero"),
            Self::IntegerOverflow { operation } => write!(f, "integer overflow in {operation}"),

            Self::TypeMismatch { expected, got } => {
                write!(f, "type mismatch: expected {expected}, got {got}")
            }
            Self::InvalidBinaryOp { type_name, op } => write!(
                f,
                "operator `{}` cannot be applied to {type_name}",
                op.as_symbol()
            ),
            Self::InvalidUnaryOp { type_name, op } => write!(
                f,
                "operator `{}` cannot be applied to {type_name}",
                op.as_symbol()
            ),
            Self::BinaryTypeMismatch { left, right } => {
                write!(f, "cannot apply operator to `{left}` and `{right}`")
            }

            Self::UndefinedVariable { name } => write!(f, "undefined variable: {name}"),
            Self::UndefinedFunction { name, args } => {
                write!(f, "undefined function: {name} with [{args}] args")
            }
            Self::UndefinedField { field, type_name } => {
                write!(f, "no field `{field}` on {type_name}")
            }
            Self::NotIndexable { type_name } => write!(f, "{type_name} cannot be indexed"),
            Self::IndexOutOfRange {
                type_name,
                access,
                len,
            } => write!(
                f,
                "access [{access}] out of range for {type_name} of length {len}"
            ),
            Self::ReadOnly { type_name } => write!(f, "cannot assign to read-only {type_name}"),
            Self::LengthMismatch { expected, got } => {
                write!(f, "length mismatch: expected {expected}, got {got}")
            }

            Self::ArityMismatch {
                name,
                expected,
                got,
            } => write!(f, "{name} expects {expected} args, got {got}"),
            Self::TooFewArgs { name, min, got } => {
                write!(f, "{name} requires at least [{min}] args, which gives [{got}]")
            }
            Self::InvalidArgument {
                name,
                index,
                expected,
                got,
            } => write!(f, "{name}'s arg[{index}] is [{got}], not [{expected}]"),
            Self::StackOverflow { depth } => {
                write!(f, "maximum nesting depth exceeded (limit: {depth})")
            }

            Self::Parse { message } => write!(f, "parse error: {message}"),
            Self::Custom { message } => write!(f, "{message}"),
        }
    }
}

/// Additional context attached to an error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EvalNote {
    pub message: String,
    pub span: Option<Span>,
}

impl EvalNote {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            span: None,
        }
    }

    pub fn with_span(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span: Some(span),
        }
    }
}

/// Evaluation error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EvalError {
    pub kind: EvalErrorKind,
    /// Rendered message; equals `kind.to_string()` for factory-made errors.
    pub message: String,
    pub span: Option<Span>,
    pub notes: Vec<EvalNote>,
}

impl EvalError {
    /// Error with only a message (`Custom` kind).
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            kind: EvalErrorKind::Custom {
                message: message.clone(),
            },
            message,
            span: None,
            notes: Vec::new(),
        }
    }

    fn from_kind(kind: EvalErrorKind) -> Self {
        let message = kind.to_string();
        Self {
            kind,
            message,
            span: None,
            notes: Vec::new(),
        }
    }

    /// Attach a span unless one is already set.
    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        if self.span.is_none() {
            self.span = Some(span);
        }
        self
    }

    #[must_use]
    pub fn with_note(mut self, note: EvalNote) -> Self {
        self.notes.push(note);
        self
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        for note in &self.notes {
            write!(f, "\n  note: {}", note.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for EvalError {}

impl From<ParseError> for EvalError {
    fn from(err: ParseError) -> Self {
        EvalError::from_kind(EvalErrorKind::Parse {
            message: err.to_string(),
        })
        .with_span(err.span)
    }
}

// Arithmetic

#[cold]
pub fn division_by_zero() -> EvalError {
    EvalError::from_kind(EvalErrorKind::DivisionByZero)
}

#[cold]
pub fn modulo_by_zero() -> EvalError {
    EvalError::from_kind(EvalErrorKind::ModuloByZero)
}

#[cold]
pub fn integer_overflow(operation: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::IntegerOverflow {
        operation: operation.to_string(),
    })
}

// Type/Operator

#[cold]
pub fn type_mismatch(expected: &str, got: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::TypeMismatch {
        expected: expected.to_string(),
        got: got.to_string(),
    })
}

#[cold]
pub fn invalid_binary_op_for(type_name: &str, op: BinaryOp) -> EvalError {
    EvalError::from_kind(EvalErrorKind::InvalidBinaryOp {
        type_name: type_name.to_string(),
        op,
    })
}

#[cold]
pub fn invalid_unary_op_for(type_name: &str, op: UnaryOp) -> EvalError {
    EvalError::from_kind(EvalErrorKind::InvalidUnaryOp {
        type_name: type_name.to_string(),
        op,
    })
}

#[cold]
pub fn binary_type_mismatch(left: &str, right: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::BinaryTypeMismatch {
        left: left.to_string(),
        right: right.to_string(),
    })
}

// Access

#[cold]
pub fn undefined_variable(name: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::UndefinedVariable {
        name: name.to_string(),
    })
}

#[cold]
pub fn undefined_function(name: &str, args: usize) -> EvalError {
    EvalError::from_kind(EvalErrorKind::UndefinedFunction {
        name: name.to_string(),
        args,
    })
}

#[cold]
pub fn undefined_field(field: &str, type_name: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::UndefinedField {
        field: field.to_string(),
        type_name: type_name.to_string(),
    })
}

#[cold]
pub fn not_indexable(type_name: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::NotIndexable {
        type_name: type_name.to_string(),
    })
}

#[cold]
pub fn index_out_of_range(type_name: &str, access: &str, len: usize) -> EvalError {
    EvalError::from_kind(EvalErrorKind::IndexOutOfRange {
        type_name: type_name.to_string(),
        access: access.to_string(),
        len,
    })
}

#[cold]
pub fn read_only_target(type_name: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::ReadOnly {
        type_name: type_name.to_string(),
    })
}

#[cold]
pub fn length_mismatch(expected: usize, got: usize) -> EvalError {
    EvalError::from_kind(EvalErrorKind::LengthMismatch { expected, got })
}

// Calls

#[cold]
pub fn wrong_arg_count(name: &str, expected: usize, got: usize) -> EvalError {
    EvalError::from_kind(EvalErrorKind::ArityMismatch {
        name: name.to_string(),
        expected,
        got,
    })
}

#[cold]
pub fn too_few_args(name: &str, min: usize, got: usize) -> EvalError {
    EvalError::from_kind(EvalErrorKind::TooFewArgs {
        name: name.to_string(),
        min,
        got,
    })
}

#[cold]
pub fn invalid_argument(name: &str, index: usize, expected: &str, got: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::InvalidArgument {
        name: name.to_string(),
        index,
        expected: expected.to_string(),
        got: got.to_string(),
    })
}

#[cold]
pub fn recursion_limit_exceeded(depth: usize) -> EvalError {
    EvalError::from_kind(EvalErrorKind::StackOverflow { depth })
}
