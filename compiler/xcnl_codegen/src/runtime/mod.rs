//! Call dispatch for generation: `xcomp.*` builtins first, then extensions.
//!
//! [`Dispatch`] borrows the generation state and the extension list as two
//! separate fields, so extensions can be iterated while the state is handed
//! to them mutably.

mod builtins;
mod output;

pub(crate) use output::{direct_output, output_block_banner};

use xcnl_eval::{CallContext, CallHandler, EvalResult, Interpreter, Value};

use crate::context::XcnlContext;
use crate::extension::{ExtensionHost, XcnlExtension};

pub(crate) struct Dispatch<'a> {
    pub ctx: &'a mut XcnlContext,
    pub extensions: &'a mut [Box<dyn XcnlExtension>],
}

impl<'a> Dispatch<'a> {
    pub fn new(ctx: &'a mut XcnlContext, extensions: &'a mut [Box<dyn XcnlExtension>]) -> Self {
        Dispatch { ctx, extensions }
    }

    /// Dispatch over the builtins only.
    pub fn core_only(ctx: &'a mut XcnlContext) -> Self {
        Dispatch {
            ctx,
            extensions: &mut [],
        }
    }

    /// Shorter-lived copy of this dispatch.
    pub fn reborrow(&mut self) -> Dispatch<'_> {
        Dispatch {
            ctx: &mut *self.ctx,
            extensions: &mut *self.extensions,
        }
    }
}

impl CallHandler for Dispatch<'_> {
    fn eval_call(
        &mut self,
        interp: &mut Interpreter,
        call: &CallContext<'_>,
        args: &[Value],
    ) -> EvalResult<Option<Value>> {
        if let Some(builtin) = call.name.strip_prefix("xcomp.") {
            if let Some(value) = self.common_func(interp, call, builtin, args)? {
                return Ok(Some(value));
            }
        }
        for extension in self.extensions.iter_mut() {
            let mut host = ExtensionHost {
                interp: &mut *interp,
                ctx: &mut *self.ctx,
            };
            if let Some(value) = extension.config_func(&mut host, call, args)? {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }
}
