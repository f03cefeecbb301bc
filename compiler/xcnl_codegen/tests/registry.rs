// Test code uses unwrap/expect for clarity - panics provide good test failure messages
#![allow(clippy::unwrap_used, clippy::expect_used)]

//! The global extension registry. Kept in its own test binary because
//! registrations last for the whole process.

use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

use pretty_assertions::assert_eq;
use xcnl_codegen::{
    register_extension, ExtensionHost, ReplaceResult, XcnlConfig, XcnlContext, XcnlExtension,
    XcnlProgStub, XcnlProgram,
};
use xcnl_eval::EvalResult;
use xcnl_ir::SharedInterner;
use xcnl_parse::ProgramBuilder;

static CREATED: AtomicUsize = AtomicUsize::new(0);

struct Upper;

impl XcnlExtension for Upper {
    fn name(&self) -> &str {
        "upper"
    }

    fn replace_func(
        &mut self,
        _host: &mut ExtensionHost<'_>,
        name: &str,
        args: &[&str],
    ) -> EvalResult<ReplaceResult> {
        Ok(match name {
            "upper.Of" => ReplaceResult::Replaced(args.join(",").to_uppercase()),
            _ => ReplaceResult::Fallback(None),
        })
    }
}

fn upper(ctx: &XcnlContext) -> Option<Box<dyn XcnlExtension>> {
    CREATED.fetch_add(1, Ordering::SeqCst);
    // Only offered to passes that enable fp16.
    ctx.config.fp16.then(|| Box::new(Upper) as Box<dyn XcnlExtension>)
}

fn program() -> Rc<XcnlProgram> {
    let interner = SharedInterner::new();
    let program = ProgramBuilder::new(&interner)
        .raw_block("xcomp.Global", "g", &["xcomp.Replace()"], "$$!upper.Of(a, b)")
        .unwrap()
        .finish();
    Rc::new(XcnlProgram::new("registry.xcnl", interner, program))
}

#[test]
fn test_registered_generators_run_for_every_pass() {
    let id = register_extension(upper);
    let before = CREATED.load(Ordering::SeqCst);

    let mut enabled = XcnlProgStub::new(program(), XcnlConfig::default().with_fp16(true));
    assert_eq!(enabled.extensions().len(), 1);
    assert_eq!(enabled.extensions()[0].name(), "upper");
    assert_eq!(
        enabled.generate().unwrap(),
        "\n/* From Global Block [g] */\nA,B"
    );

    let mut declined = XcnlProgStub::new(program(), XcnlConfig::default());
    assert!(declined.extensions().is_empty());
    let err = declined.generate().unwrap_err();
    assert_eq!(
        err.eval_error().unwrap().message,
        "replace-func [upper.Of] with [2]args is not resolved"
    );

    assert_eq!(CREATED.load(Ordering::SeqCst) - before, 2);
    assert_eq!(register_extension(upper), id + 1);
}
