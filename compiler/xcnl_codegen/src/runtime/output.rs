//! Direct output of one block: condition comments, pre-assignments and the
//! replace passes.

use std::fmt::Write as _;

use tracing::{trace, warn};
use xcnl_eval::errors::recursion_limit_exceeded;
use xcnl_eval::{
    ensure_sufficient_stack, EvalError, EvalErrorKind, EvalNote, EvalResult, Interpreter, Value,
};
use xcnl_ir::{printer, ExprArena, FuncCall};

use super::Dispatch;
use crate::extension::{ExtensionHost, ReplaceResult};
use crate::output_block::{BlockKind, OutputBlock};
use crate::replacer::{replace_all, ReplaceHandler, ReplacePasses};

/// `/* From <Kind> Block [<name>] */` preceded by an empty line.
pub(crate) fn output_block_banner(output: &mut String, kind: BlockKind, name: &str, eol: &str) {
    let _ = write!(output, "{eol}/* From {kind} Block [{name}] */{eol}");
}

/// Render `If`/`Skip` annotations as comments.
fn output_conditions(
    interp: &Interpreter,
    arena: &ExprArena,
    metas: &[FuncCall],
    output: &mut String,
    eol: &str,
) {
    for meta in metas {
        let prefix = match interp.name_str(meta.name) {
            "If" => "If",
            "Skip" => "Skip if",
            _ => continue,
        };
        let [cond] = arena.call_args(meta) else {
            continue;
        };
        let cond = printer::stringify_expr(arena, &interp.interner, *cond);
        let _ = write!(output, "    /* {prefix:7} :  {cond} */{eol}");
    }
}

/// Emit `block` into `output` in the current frame.
pub(crate) fn direct_output(
    interp: &mut Interpreter,
    calls: &mut Dispatch<'_>,
    arena: &ExprArena,
    block: &OutputBlock,
    output: &mut String,
) -> EvalResult<()> {
    let eol = calls.ctx.config.line_ending.clone();
    output_conditions(interp, arena, &block.metas, output, &eol);
    for pre in &block.pre_assigns {
        let value = interp.eval_expr(arena, pre.value, calls)?;
        interp.assign_var(pre.var, value)?;
    }
    let passes = ReplacePasses::from_flags(block.replace_variable, block.replace_function);
    let mut replacer = BlockReplacer {
        interp,
        calls,
        arena,
        eol: &eol,
    };
    let text = replace_all(&block.block.source, passes, &mut replacer)?;
    output.push_str(&text);
    Ok(())
}

struct BlockReplacer<'r, 'd> {
    interp: &'r mut Interpreter,
    calls: &'r mut Dispatch<'d>,
    arena: &'r ExprArena,
    eol: &'r str,
}

impl BlockReplacer<'_, '_> {
    /// `xcomp.CodeBlock(name, args...)`: emit a Template block with its
    /// formals bound to the raw argument text.
    fn code_block(
        &mut self,
        output: &mut String,
        template: &OutputBlock,
        name: &str,
        args: &[&str],
    ) -> EvalResult<()> {
        let formals = template.template_args();
        if args.len() < formals.len() + 1 {
            return Err(replacer_arg_count(
                "xcomp.CodeBlock",
                "at least ",
                formals.len() + 1,
                args.len(),
            ));
        }
        let limit = self.calls.ctx.config.max_template_depth;
        if self.calls.ctx.template_depth >= limit {
            return Err(recursion_limit_exceeded(limit).with_note(EvalNote::new(format!(
                "while expanding template block [{name}]"
            ))));
        }
        trace!(template = name, depth = self.calls.ctx.template_depth, "code block");

        let bindings: Vec<_> = formals
            .iter()
            .zip(&args[1..])
            .map(|(&formal, arg)| (formal, Value::string(arg)))
            .collect();
        let calls = &mut *self.calls;
        let arena = self.arena;
        let eol = self.eol;
        calls.ctx.template_depth += 1;
        let result = self.interp.with_bindings(bindings, |scoped| {
            let mut text = format!("// template block [{name}]{eol}");
            ensure_sufficient_stack(|| {
                direct_output(scoped, &mut calls.reborrow(), arena, template, &mut text)
            })?;
            Ok::<_, EvalError>(text)
        });
        calls.ctx.template_depth -= 1;
        output.push_str(&result?);
        Ok(())
    }
}

impl ReplaceHandler for BlockReplacer<'_, '_> {
    fn on_opt_block(&mut self, output: &mut String, cond: &str, body: &str) -> EvalResult<()> {
        if cond.is_empty() {
            return Err(EvalError::new(
                "Empty condition occurred when replace-opt-block",
            ));
        }
        let value = self.interp.eval_text(cond, &mut *self.calls)?;
        if value.is_empty() {
            return Err(EvalError::new(
                "No value returned as condition when replace-opt-block",
            ));
        }
        let keep = value.as_bool().ok_or_else(|| {
            EvalError::new(format!(
                "Evaluated condition [{cond}] is not boolable when replace-opt-block, got [{}]",
                value.type_name()
            ))
        })?;
        if keep {
            output.push_str(body);
        }
        Ok(())
    }

    fn on_variable(&mut self, output: &mut String, var: &str) -> EvalResult<()> {
        if let Some(ty) = var.strip_prefix('@') {
            let name = self.calls.ctx.vec_type_name(ty.trim(), "replace-variable")?;
            output.push_str(&name);
            return Ok(());
        }
        if let Some(holder) = var.strip_prefix('#') {
            let value = self.interp.eval_text(holder.trim(), &mut *self.calls)?;
            let ty = value.as_str().ok_or_else(|| {
                EvalError::new(format!(
                    "Arg [{holder}] holds [{}], not a type name when replace-variable",
                    value.type_name()
                ))
            })?;
            let name = self.calls.ctx.vec_type_name(ty, "replace-variable")?;
            output.push_str(&name);
            return Ok(());
        }
        let value = match self.interp.eval_text(var, &mut *self.calls) {
            Ok(value) if !value.is_empty() => value,
            Err(err) if !matches!(err.kind, EvalErrorKind::UndefinedVariable { .. }) => {
                return Err(err)
            }
            _ => {
                return Err(EvalError::new(format!(
                    "Arg [{var}] not found when replace-variable"
                )))
            }
        };
        let _ = write!(output, "{value}");
        Ok(())
    }

    fn on_function(&mut self, output: &mut String, name: &str, args: &[&str]) -> EvalResult<()> {
        match name {
            "xcomp.GetVecTypeName" => {
                let [ty] = args else {
                    return Err(replacer_arg_count(name, "", 1, args.len()));
                };
                let ty = self
                    .calls
                    .ctx
                    .vec_type_name(unquote(ty), "replace-func [GetVecTypeName]")?;
                output.push_str(&ty);
                return Ok(());
            }
            "xcomp.CodeBlock" => {
                let Some(first) = args.first() else {
                    return Err(replacer_arg_count(name, "at least ", 1, 0));
                };
                let template_name = unquote(first);
                if let Some(template) = self.calls.ctx.find_template(template_name) {
                    return self.code_block(output, &template, template_name, args);
                }
            }
            _ => {}
        }

        let calls = &mut *self.calls;
        for extension in calls.extensions.iter_mut() {
            let mut host = ExtensionHost {
                interp: &mut *self.interp,
                ctx: &mut *calls.ctx,
            };
            match extension.replace_func(&mut host, name, args)? {
                ReplaceResult::Replaced(text) => {
                    output.push_str(&text);
                    return Ok(());
                }
                ReplaceResult::Fallback(Some(message)) => {
                    warn!(target: "xcnl", "when replace-func [{name}]: {message}");
                }
                ReplaceResult::Fallback(None) => {}
                ReplaceResult::Fail(message) => {
                    return Err(EvalError::new(format!(
                        "replace-func [{name}] with [{}]args error: {message}",
                        args.len()
                    )));
                }
            }
        }
        Err(EvalError::new(format!(
            "replace-func [{name}] with [{}]args is not resolved",
            args.len()
        )))
    }
}

fn unquote(arg: &str) -> &str {
    arg.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(arg)
}

#[cold]
fn replacer_arg_count(name: &str, bound: &str, count: usize, got: usize) -> EvalError {
    EvalError::new(format!(
        "Replacer-Func [{name}] requires {bound}[{count}] args, which gives [{got}]."
    ))
}
