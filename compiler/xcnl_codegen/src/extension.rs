//! Pluggable generator extensions.
//!
//! Extensions are created per generation pass from generators, either
//! registered globally with [`register_extension`] or attached to one
//! [`XcnlProgram`](crate::XcnlProgram). Every hook runs in registration
//! order. Hooks get an [`ExtensionHost`] to evaluate text and reach the
//! generation state; calls evaluated through the host see the core
//! builtins but not other extensions.

use parking_lot::Mutex;
use xcnl_eval::{CallContext, EvalResult, Interpreter, Value};

use crate::context::XcnlContext;
use crate::errors::DependencyError;
use crate::instance::InstanceContext;
use crate::runtime::Dispatch;

/// Outcome of [`XcnlExtension::replace_func`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReplaceResult {
    /// The call is handled; the text is inserted.
    Replaced(String),
    /// Not handled here; later handlers are tried. A message is logged as a
    /// warning.
    Fallback(Option<String>),
    /// Not handled, and generation must fail with this message.
    Fail(String),
}

/// Generation hooks. Every method has a no-op default.
pub trait XcnlExtension {
    fn name(&self) -> &str;

    fn begin_instance(&mut self, _host: &mut ExtensionHost<'_>) -> EvalResult<()> {
        Ok(())
    }

    fn finish_instance(&mut self, _host: &mut ExtensionHost<'_>) -> EvalResult<()> {
        Ok(())
    }

    /// After every block has been generated.
    fn finish_xcnl(&mut self, _host: &mut ExtensionHost<'_>) -> EvalResult<()> {
        Ok(())
    }

    /// Offered every call the core builtins did not claim.
    fn config_func(
        &mut self,
        _host: &mut ExtensionHost<'_>,
        _call: &CallContext<'_>,
        _args: &[Value],
    ) -> EvalResult<Option<Value>> {
        Ok(None)
    }

    /// Whether [`instance_meta`](Self::instance_meta) wants the annotation
    /// `name`. Arguments are only evaluated for claimed annotations.
    fn claims_instance_meta(&self, _name: &str) -> bool {
        false
    }

    /// Offered claimed instance annotations the core does not know, with
    /// their evaluated arguments. Returns whether the annotation was handled.
    fn instance_meta(
        &mut self,
        _host: &mut ExtensionHost<'_>,
        _name: &str,
        _args: &[Value],
    ) -> EvalResult<bool> {
        Ok(false)
    }

    /// Offered `$$!name(args)` markers the core does not resolve.
    fn replace_func(
        &mut self,
        _host: &mut ExtensionHost<'_>,
        _name: &str,
        _args: &[&str],
    ) -> EvalResult<ReplaceResult> {
        Ok(ReplaceResult::Fallback(None))
    }
}

/// Creates an extension for one generation pass, or declines with `None`.
pub type ExtensionGenerator = fn(&XcnlContext) -> Option<Box<dyn XcnlExtension>>;

static GENERATORS: Mutex<Vec<ExtensionGenerator>> = parking_lot::const_mutex(Vec::new());

/// Register a generator for every later generation pass. Returns its id.
pub fn register_extension(generator: ExtensionGenerator) -> usize {
    let mut generators = GENERATORS.lock();
    generators.push(generator);
    generators.len() - 1
}

pub(crate) fn registered_generators() -> Vec<ExtensionGenerator> {
    GENERATORS.lock().clone()
}

/// Access to the interpreter and generation state from inside a hook.
pub struct ExtensionHost<'a> {
    pub interp: &'a mut Interpreter,
    pub ctx: &'a mut XcnlContext,
}

impl ExtensionHost<'_> {
    pub fn eval_text(&mut self, source: &str) -> EvalResult {
        let mut calls = Dispatch::core_only(self.ctx);
        self.interp.eval_text(source, &mut calls)
    }

    pub fn exec_text(&mut self, source: &str) -> EvalResult<()> {
        let mut calls = Dispatch::core_only(self.ctx);
        self.interp.exec_text(source, &mut calls)
    }

    /// The instance being generated, during instance hooks.
    pub fn instance(&mut self) -> Option<&mut InstanceContext> {
        self.ctx.instance_mut()
    }

    /// Queue a block for the prefix section unless `id` was already added.
    pub fn add_patched_block(
        &mut self,
        id: &str,
        content: String,
        deps: &[&str],
    ) -> Result<bool, DependencyError> {
        self.ctx.add_patched_block(id, content, deps)
    }
}
