//! Expression engine for XCNL.
//!
//! - [`Value`] / [`CustomValue`]: runtime values, including ref-counted
//!   vectors and boxed kernel argument descriptors
//! - [`Environment`]: frame chain with inherited and `:local` lookup
//! - [`Interpreter`]: evaluates expressions and statements, delegating every
//!   call to a [`CallHandler`]

mod environment;
pub mod errors;
mod interpreter;
mod operators;
mod stack;
pub mod value;

pub use environment::{Environment, LocalScope, Scope};
pub use errors::{EvalError, EvalErrorKind, EvalNote, EvalResult};
pub use interpreter::{CallContext, CallHandler, Interpreter, NoCalls, ScopedInterpreter};
pub use operators::{evaluate_binary, evaluate_unary};
pub use stack::ensure_sufficient_stack;
pub use value::{
    ArgFlags, ArgKind, CustomValue, GeneralVec, InstanceArgInfo, TexKind, Value, VecStorage,
};
