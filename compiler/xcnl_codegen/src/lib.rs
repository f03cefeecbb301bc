//! Kernel-source generation for XCNL programs.
//!
//! A program is a sequence of top-level statements, typed blocks
//! (`xcomp.Config`, `xcomp.Struct`, ...) whose bodies are statements, and
//! raw blocks whose bodies are target source text. Generation runs the typed
//! blocks, then emits the raw blocks through the text replacer:
//!
//! - [`XcnlProgStub`]: one generation pass (`prepare`, `collect`,
//!   `post_act`, `generate_output`)
//! - [`NamedTextHolder`]: named fragments emitted in dependency order
//! - [`XcnlStruct`]: struct field layout and its target declaration
//! - [`XcnlExtension`]: hooks for target-specific functions and annotations
//! - [`DebugExtension`]: device-side debug messages
//!
//! # Output markers
//!
//! | Marker | Replaced by |
//! |--------|-------------|
//! | `$$@ cond ; body @$$` | `body` when `cond` is true |
//! | `$$!{expr}` | value of `expr`; `@type` and `#var` render vector type names |
//! | `$$!name(args)` | result of a builtin or extension replace function |

mod config;
mod context;
mod debug;
mod errors;
mod extension;
mod instance;
mod layout;
mod named_text;
mod output_block;
mod program;
mod replacer;
mod runtime;

use std::sync::Once;

pub use config::{Define, XcnlConfig};
pub use context::XcnlContext;
pub use debug::{
    check_formatter, debug_extension, ArgSlot, ArgsLayout, DebugArg, DebugExtension, MessageBlock,
    MAX_MESSAGES,
};
pub use errors::{DependencyError, GenerateError, UnresolvedEntry};
pub use extension::{
    register_extension, ExtensionGenerator, ExtensionHost, ReplaceResult, XcnlExtension,
};
pub use instance::{parse_instance_arg, InstanceContext};
pub use layout::{
    vec_type_name, ArrayDim, DimsRange, FieldDecl, FieldType, XcnlField, XcnlStruct,
    MAX_ARRAY_COUNT,
};
pub use named_text::{NamedText, NamedTextHolder};
pub use output_block::{BlockExtra, BlockKind, OutputBlock, PreAssign};
pub use program::{XcnlProgStub, XcnlProgram};
pub use replacer::{
    replace_all, split_args, ReplaceHandler, ReplacePasses, FUNCTION_BEGIN, OPT_BLOCK_BEGIN,
    OPT_BLOCK_END, VARIABLE_BEGIN, VARIABLE_END,
};

static TRACING_INIT: Once = Once::new();

/// Install a `tracing` subscriber filtered by `RUST_LOG`.
///
/// Does nothing when `RUST_LOG` is unset; later calls are no-ops.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(
                    tracing_tree::HierarchicalLayer::new(2)
                        .with_targets(true)
                        .with_bracketed_fields(true),
                )
                .with(filter)
                .init();
        }
    });
}
