//! Parse error types.

use std::fmt;

use xcnl_ir::Span;

/// What went wrong while parsing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// A character no token starts with.
    InvalidCharacter(char),
    /// A numeric literal that does not fit its type.
    InvalidLiteral(String),
    /// Found a different token than the grammar allows here.
    UnexpectedToken {
        expected: &'static str,
        found: &'static str,
    },
    /// Left side of `=` is not a variable or a field/index path on one.
    InvalidAssignTarget,
    /// Tokens left over after a complete expression.
    TrailingInput,
    /// Nesting deeper than the parser accepts.
    TooDeep { limit: usize },
    /// More call arguments than an argument list can hold.
    TooManyArgs,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCharacter(c) => write!(f, "invalid character `{c}`"),
            Self::InvalidLiteral(text) => write!(f, "invalid literal `{text}`"),
            Self::UnexpectedToken { expected, found } => {
                write!(f, "expected {expected}, found {found}")
            }
            Self::InvalidAssignTarget => write!(f, "invalid assignment target"),
            Self::TrailingInput => write!(f, "unexpected input after expression"),
            Self::TooDeep { limit } => write!(f, "expression nested deeper than {limit} levels"),
            Self::TooManyArgs => write!(f, "too many arguments in call"),
        }
    }
}

/// A parse error with its location in the parsed text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub span: Span,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, span: Span) -> Self {
        ParseError { kind, span }
    }

    #[cold]
    pub fn unexpected(expected: &'static str, found: &'static str, span: Span) -> Self {
        ParseError::new(ParseErrorKind::UnexpectedToken { expected, found }, span)
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}..{}", self.kind, self.span.start, self.span.end)
    }
}

impl std::error::Error for ParseError {}
