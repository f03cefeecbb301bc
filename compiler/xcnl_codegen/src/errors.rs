//! Errors of the generation pipeline.
//!
//! Evaluation failures keep their [`EvalError`] and gain the kind and name of
//! the block that triggered them. Dependency failures come from
//! [`NamedTextHolder`](crate::NamedTextHolder) emission.

use std::fmt;

use xcnl_eval::EvalError;
use xcnl_parse::ParseError;

/// Error returned instead of output when generation fails.
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    /// Evaluation failed while processing a block.
    #[error("{kind} block [{block}]: {source}")]
    Eval {
        kind: &'static str,
        block: String,
        #[source]
        source: EvalError,
    },

    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Fragments injected into one block could not be ordered.
    #[error("{kind} block [{block}]: {source}")]
    BlockDependency {
        kind: &'static str,
        block: String,
        #[source]
        source: DependencyError,
    },

    /// Patched blocks of the prefix section could not be ordered.
    #[error(transparent)]
    Dependency(#[from] DependencyError),
}

impl GenerateError {
    /// Attach the block `kind`/`block` to an evaluation error.
    #[cold]
    pub fn in_block(kind: &'static str, block: &str, source: EvalError) -> Self {
        GenerateError::Eval {
            kind,
            block: block.to_string(),
            source,
        }
    }

    /// Attach the block `kind`/`block` to a dependency error.
    #[cold]
    pub fn dependency_in_block(kind: &'static str, block: &str, source: DependencyError) -> Self {
        GenerateError::BlockDependency {
            kind,
            block: block.to_string(),
            source,
        }
    }

    /// The underlying evaluation error, if any.
    pub fn eval_error(&self) -> Option<&EvalError> {
        match self {
            GenerateError::Eval { source, .. } => Some(source),
            _ => None,
        }
    }

    /// The underlying dependency error, if any.
    pub fn dependency_error(&self) -> Option<&DependencyError> {
        match self {
            GenerateError::BlockDependency { source, .. } | GenerateError::Dependency(source) => {
                Some(source)
            }
            _ => None,
        }
    }
}

/// One entry that could not be emitted, with the dependencies it still waits on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnresolvedEntry {
    pub id: String,
    pub missing: Vec<String>,
}

impl fmt::Display for UnresolvedEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] waits on [{}]", self.id, self.missing.join(", "))
    }
}

/// Dependency errors of named text fragments.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DependencyError {
    /// Rejected at insertion.
    #[error("text [{id}] depends on itself")]
    SelfDependency { id: String },

    /// Emission made no progress; every remaining entry is listed.
    #[error("unresolved dependencies: {}", join_entries(entries))]
    Unresolved { entries: Vec<UnresolvedEntry> },
}

fn join_entries(entries: &[UnresolvedEntry]) -> String {
    entries
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
