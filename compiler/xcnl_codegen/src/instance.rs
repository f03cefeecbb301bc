//! Kernel instances and their argument descriptors.

use xcnl_eval::errors::{invalid_argument, too_few_args};
use xcnl_eval::{ArgFlags, ArgKind, EvalError, EvalResult, InstanceArgInfo, TexKind, Value};
use xcnl_ir::SharedInterner;

use crate::errors::DependencyError;
use crate::named_text::NamedTextHolder;

/// Parse the arguments of `xcomp.Arg.<tag>(...)` / `xcomp.ArgInfo.<tag>(...)`.
///
/// `Buf`, `Typed` and `Simple` take `(data_type, name, qualifiers...)`; `Tex`
/// takes `(tex_kind, data_type, name, qualifiers...)`. The qualifiers
/// `read`, `write` and `restrict` become flags, empty strings are ignored.
pub fn parse_instance_arg(call: &str, tag: &str, args: &[Value]) -> EvalResult<InstanceArgInfo> {
    let (kind, leading) = match tag {
        "Buf" => (ArgKind::RawBuf, 2),
        "Typed" => (ArgKind::TypedBuf, 2),
        "Simple" => (ArgKind::Simple, 2),
        "Tex" => (ArgKind::Texture, 3),
        _ => {
            return Err(EvalError::new(format!(
                "Unknown argument kind [{tag}] in [{call}], expected Buf, Typed, Simple or Tex"
            )))
        }
    };
    if args.len() < leading {
        return Err(too_few_args(call, leading, args.len()));
    }

    let tex_kind = if kind == ArgKind::Texture {
        let tag = string_arg(call, args, 0)?;
        TexKind::from_tag(tag).ok_or_else(|| {
            EvalError::new(format!(
                "{call}'s arg[0] is [{tag}], not a texture kind (1D, 2D, 3D, 1DArray, 2DArray)"
            ))
        })?
    } else {
        TexKind::Empty
    };
    let data_type = string_arg(call, args, leading - 2)?.to_string();
    let name = string_arg(call, args, leading - 1)?.to_string();

    let mut flags = ArgFlags::empty();
    let mut extra = Vec::new();
    for index in leading..args.len() {
        let qualifier = string_arg(call, args, index)?;
        if qualifier.is_empty() {
            continue;
        }
        match ArgFlags::from_keyword(qualifier) {
            Some(flag) => flags |= flag,
            None => extra.push(qualifier.to_string()),
        }
    }
    Ok(InstanceArgInfo {
        kind,
        tex_kind,
        name,
        data_type,
        flags,
        extra,
    })
}

pub(crate) fn string_arg<'a>(call: &str, args: &'a [Value], index: usize) -> EvalResult<&'a str> {
    args[index]
        .as_str()
        .ok_or_else(|| invalid_argument(call, index, "string", args[index].type_name()))
}

/// State of the instance being generated.
#[derive(Clone, Debug)]
pub struct InstanceContext {
    pub name: String,
    pub args: Vec<InstanceArgInfo>,
    /// Replaced block text.
    pub content: String,
    pub body_prefixes: NamedTextHolder,
    pub body_suffixes: NamedTextHolder,
}

impl InstanceContext {
    pub fn new(name: &str, interner: &SharedInterner) -> Self {
        InstanceContext {
            name: name.to_string(),
            args: Vec::new(),
            content: String::new(),
            body_prefixes: NamedTextHolder::new(interner.clone()),
            body_suffixes: NamedTextHolder::new(interner.clone()),
        }
    }

    pub fn arg(&self, name: &str) -> Option<&InstanceArgInfo> {
        self.args.iter().find(|arg| arg.name == name)
    }

    /// Register an argument; names are unique per instance.
    pub fn add_arg(&mut self, info: InstanceArgInfo) -> EvalResult<()> {
        if self.arg(&info.name).is_some() {
            return Err(EvalError::new(format!(
                "Argument [{}] already defined in instance [{}]",
                info.name, self.name
            )));
        }
        self.args.push(info);
        Ok(())
    }

    /// Body prefixes, content, then body suffixes.
    pub fn write(&self, output: &mut String, eol: &str) -> Result<(), DependencyError> {
        self.body_prefixes.write(output, eol)?;
        output.push_str(&self.content);
        if !self.content.is_empty() && !self.content.ends_with('\n') {
            output.push_str(eol);
        }
        self.body_suffixes.write(output, eol)
    }
}
