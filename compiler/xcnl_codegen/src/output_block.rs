//! Raw blocks selected for output, with their annotations interpreted.

use std::fmt;

use xcnl_eval::errors::{invalid_argument, wrong_arg_count};
use xcnl_eval::{EvalError, EvalResult};
use xcnl_ir::{ExprArena, ExprId, ExprKind, FuncCall, Name, RawBlock, StringInterner, VarRef};

/// Purpose of a raw block, from its type tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlockKind {
    Prefix,
    Global,
    Struct,
    Instance,
    Template,
    /// Unrecognized tag; such blocks are skipped.
    None,
}

impl BlockKind {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "xcomp.Prefix" => BlockKind::Prefix,
            "xcomp.Global" => BlockKind::Global,
            "xcomp.Struct" => BlockKind::Struct,
            "xcomp.Instance" | "xcomp.Kernel" => BlockKind::Instance,
            "xcomp.Template" => BlockKind::Template,
            _ => BlockKind::None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            BlockKind::Prefix => "Prefix",
            BlockKind::Global => "Global",
            BlockKind::Struct => "Struct",
            BlockKind::Instance => "Instance",
            BlockKind::Template => "Template",
            BlockKind::None => "None",
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `@xcomp.PreAssign(var, expr)`: evaluated and assigned before output.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PreAssign {
    pub var: VarRef,
    pub value: ExprId,
}

/// Kind-specific payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BlockExtra {
    /// Formal parameter names of a Template block.
    TemplateArgs(Vec<Name>),
}

#[derive(Clone, Debug)]
pub struct OutputBlock {
    pub kind: BlockKind,
    pub block: RawBlock,
    pub metas: Vec<FuncCall>,
    pub replace_variable: bool,
    pub replace_function: bool,
    pub pre_assigns: Vec<PreAssign>,
    pub extra: Option<BlockExtra>,
}

impl OutputBlock {
    /// Interpret the block-level annotations. Conditions (`If`/`Skip`) are
    /// kept in `metas` and evaluated by the caller; unknown annotations are
    /// left for instance processing.
    pub fn new(
        kind: BlockKind,
        block: RawBlock,
        metas: Vec<FuncCall>,
        arena: &ExprArena,
        interner: &StringInterner,
    ) -> EvalResult<Self> {
        let mut out = OutputBlock {
            kind,
            block,
            metas,
            replace_variable: false,
            replace_function: false,
            pre_assigns: Vec::new(),
            extra: None,
        };
        for meta in &out.metas {
            let name = interner.lookup(meta.name);
            let args = arena.call_args(meta);
            match name {
                "xcomp.ReplaceVariable" => out.replace_variable = true,
                "xcomp.ReplaceFunction" => out.replace_function = true,
                "xcomp.Replace" => {
                    out.replace_variable = true;
                    out.replace_function = true;
                }
                "xcomp.PreAssign" => {
                    let [var, value] = args else {
                        return Err(wrong_arg_count(name, 2, args.len()).with_span(meta.span));
                    };
                    let ExprKind::Var(var) = *arena.kind(*var) else {
                        return Err(var_expected(name, 0, arena, *var).with_span(meta.span));
                    };
                    out.pre_assigns.push(PreAssign { var, value: *value });
                }
                "xcomp.TemplateArgs" => {
                    if kind != BlockKind::Template {
                        return Err(EvalError::new(format!(
                            "{name} is only allowed on Template blocks, found on {kind} block"
                        ))
                        .with_span(meta.span));
                    }
                    let formals = args
                        .iter()
                        .enumerate()
                        .map(|(idx, &arg)| match *arena.kind(arg) {
                            ExprKind::Var(var) => Ok(var.name),
                            _ => Err(var_expected(name, idx, arena, arg).with_span(meta.span)),
                        })
                        .collect::<EvalResult<Vec<_>>>()?;
                    out.extra = Some(BlockExtra::TemplateArgs(formals));
                }
                _ => {}
            }
        }
        Ok(out)
    }

    pub fn name(&self) -> Name {
        self.block.name
    }

    /// Formal parameters; empty unless this is a Template block.
    pub fn template_args(&self) -> &[Name] {
        match &self.extra {
            Some(BlockExtra::TemplateArgs(formals)) => formals,
            None => &[],
        }
    }
}

#[cold]
fn var_expected(name: &str, index: usize, arena: &ExprArena, arg: ExprId) -> EvalError {
    invalid_argument(name, index, "Var", arena.kind(arg).type_name())
}
