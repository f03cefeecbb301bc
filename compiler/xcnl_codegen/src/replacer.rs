//! Template scanning for raw block text.
//!
//! Three marker forms are recognized, each in its own left-to-right pass:
//!
//! - `$$@ cond ; body @$$`: conditional block
//! - `$$!{name}`: variable reference
//! - `$$!name(arg, ...)`: function call
//!
//! The scanners only split the text; what each marker expands to is decided
//! by a [`ReplaceHandler`]. Expanded text is appended to the output and never
//! rescanned by the same pass.

use xcnl_eval::{EvalError, EvalResult};

pub const OPT_BLOCK_BEGIN: &str = "$$@";
pub const OPT_BLOCK_END: &str = "@$$";
pub const VARIABLE_BEGIN: &str = "$$!{";
pub const VARIABLE_END: &str = "}";
pub const FUNCTION_BEGIN: &str = "$$!";

/// Expands the markers found by the scanners.
pub trait ReplaceHandler {
    fn on_opt_block(&mut self, output: &mut String, cond: &str, body: &str) -> EvalResult<()>;

    fn on_variable(&mut self, output: &mut String, var: &str) -> EvalResult<()>;

    fn on_function(&mut self, output: &mut String, name: &str, args: &[&str]) -> EvalResult<()>;
}

/// Which passes run over a block.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReplacePasses {
    pub opt_block: bool,
    pub variable: bool,
    pub function: bool,
}

impl ReplacePasses {
    /// Passes enabled by a block's flags: conditional blocks run when either
    /// flag is set.
    pub fn from_flags(replace_variable: bool, replace_function: bool) -> Self {
        ReplacePasses {
            opt_block: replace_variable || replace_function,
            variable: replace_variable,
            function: replace_function,
        }
    }
}

/// Run the enabled passes in order: conditional blocks, variables, functions.
pub fn replace_all(
    source: &str,
    passes: ReplacePasses,
    handler: &mut dyn ReplaceHandler,
) -> EvalResult<String> {
    let mut text = source.to_string();
    if passes.opt_block {
        text = replace_opt_blocks(&text, handler)?;
    }
    if passes.variable {
        text = replace_variables(&text, handler)?;
    }
    if passes.function {
        text = replace_functions(&text, handler)?;
    }
    Ok(text)
}

pub fn replace_opt_blocks(source: &str, handler: &mut dyn ReplaceHandler) -> EvalResult<String> {
    let mut output = String::with_capacity(source.len());
    let mut rest = source;
    while let Some(start) = rest.find(OPT_BLOCK_BEGIN) {
        output.push_str(&rest[..start]);
        let inner = &rest[start + OPT_BLOCK_BEGIN.len()..];
        let end = inner
            .find(OPT_BLOCK_END)
            .ok_or_else(|| unterminated(OPT_BLOCK_BEGIN, OPT_BLOCK_END, inner))?;
        let content = &inner[..end];
        let split = find_top_level(content, b';').ok_or_else(|| {
            EvalError::new(format!(
                "No [;] between condition and body when replace-opt-block: [{content}]"
            ))
        })?;
        handler.on_opt_block(&mut output, content[..split].trim(), &content[split + 1..])?;
        rest = &inner[end + OPT_BLOCK_END.len()..];
    }
    output.push_str(rest);
    Ok(output)
}

pub fn replace_variables(source: &str, handler: &mut dyn ReplaceHandler) -> EvalResult<String> {
    let mut output = String::with_capacity(source.len());
    let mut rest = source;
    while let Some(start) = rest.find(VARIABLE_BEGIN) {
        output.push_str(&rest[..start]);
        let inner = &rest[start + VARIABLE_BEGIN.len()..];
        let end = inner
            .find(VARIABLE_END)
            .ok_or_else(|| unterminated(VARIABLE_BEGIN, VARIABLE_END, inner))?;
        let var = inner[..end].trim();
        if var.is_empty() {
            return Err(EvalError::new("Empty variable name when replace-variable"));
        }
        handler.on_variable(&mut output, var)?;
        rest = &inner[end + VARIABLE_END.len()..];
    }
    output.push_str(rest);
    Ok(output)
}

pub fn replace_functions(source: &str, handler: &mut dyn ReplaceHandler) -> EvalResult<String> {
    let mut output = String::with_capacity(source.len());
    let mut rest = source;
    while let Some(start) = rest.find(FUNCTION_BEGIN) {
        output.push_str(&rest[..start]);
        let inner = &rest[start + FUNCTION_BEGIN.len()..];
        // Variable markers belong to the variable pass.
        if inner.starts_with('{') {
            output.push_str(FUNCTION_BEGIN);
            rest = inner;
            continue;
        }
        let name_len = inner
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '.'))
            .unwrap_or(inner.len());
        let name = &inner[..name_len];
        let after_name = &inner[name_len..];
        if name.is_empty() || !after_name.starts_with('(') {
            return Err(EvalError::new(format!(
                "Expected [name(...)] after [{FUNCTION_BEGIN}] when replace-func, found [{}]",
                preview(inner)
            )));
        }
        let body = &after_name[1..];
        let close = find_top_level(body, b')')
            .ok_or_else(|| unterminated(FUNCTION_BEGIN, ")", inner))?;
        let args = split_args(&body[..close]);
        handler.on_function(&mut output, name, &args)?;
        rest = &body[close + 1..];
    }
    output.push_str(rest);
    Ok(output)
}

/// Split raw call arguments on top-level commas and trim them. Brackets and
/// quoted strings are kept intact.
pub fn split_args(text: &str) -> Vec<&str> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    let mut args = Vec::new();
    let mut rest = text;
    while let Some(comma) = find_top_level(rest, b',') {
        args.push(rest[..comma].trim());
        rest = &rest[comma + 1..];
    }
    args.push(rest.trim());
    args
}

/// Byte offset of the first `target` not nested in brackets or quotes.
fn find_top_level(text: &str, target: u8) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0_usize;
    let mut in_string = false;
    let mut idx = 0;
    while idx < bytes.len() {
        let b = bytes[idx];
        if in_string {
            match b {
                b'\\' => idx += 1,
                b'"' => in_string = false,
                _ => {}
            }
        } else if b == target && depth == 0 {
            return Some(idx);
        } else {
            match b {
                b'"' => in_string = true,
                b'(' | b'[' | b'{' => depth += 1,
                b')' | b']' | b'}' => depth = depth.saturating_sub(1),
                _ => {}
            }
        }
        idx += 1;
    }
    None
}

fn preview(text: &str) -> &str {
    let end = text
        .char_indices()
        .nth(24)
        .map_or(text.len(), |(idx, _)| idx);
    text[..end].lines().next().unwrap_or("")
}

#[cold]
fn unterminated(begin: &str, end: &str, rest: &str) -> EvalError {
    EvalError::new(format!(
        "Marker [{begin}] is not closed by [{end}] near [{}]",
        preview(rest)
    ))
}
