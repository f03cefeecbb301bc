//! Device-side debug messages.
//!
//! `xcomp.DefineDebugString(id, formatter, "name:type"...)` declares a
//! message with typed arguments. Each message gets a packed argument layout
//! and an `oglu_debug_<id>` helper in the prefix section that appends one
//! record to a global buffer. Inside an instance declared with
//! `@xcomp.DebugOutput()`, `$$!xcomp.DebugString(id, args...)` expands to a
//! call of that helper.
//!
//! A record is one `uint` header, `(message id << 24) | thread id`, followed
//! by the packed arguments. Message id 0 marks the end of the buffer.
//!
//! Without `XcnlConfig::debug` or `xcomp.EnableDebug()`, calls expand to
//! `oclu_SkipDebug()` and `DebugOutput` is ignored.

use std::fmt::Write as _;

use tracing::{debug, info};
use xcnl_eval::errors::{invalid_argument, too_few_args};
use xcnl_eval::{CallContext, EvalError, EvalResult, Value};
use xcnl_ir::{Scalar, ScalarKind, VecType};

use crate::context::XcnlContext;
use crate::extension::{ExtensionHost, ReplaceResult, XcnlExtension};
use crate::instance::{parse_instance_arg, string_arg};
use crate::layout::vec_type_name;

/// Most messages one program may define.
pub const MAX_MESSAGES: usize = 250;

const DEFINE_FUNC: &str = "xcomp.DefineDebugString";
const ENABLE_FUNC: &str = "xcomp.EnableDebug";
const OUTPUT_META: &str = "xcomp.DebugOutput";
const PRINT_FUNC: &str = "xcomp.DebugString";

const SIZE_ARG: &str = "_oclu_debug_buffer_size";
const INFO_ARG: &str = "_oclu_debug_buffer_info";
const DATA_ARG: &str = "_oclu_debug_buffer_data";
const DEFAULT_BUFFER_SIZE: u64 = 512;

/// One argument of a message; the name is optional.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DebugArg {
    pub name: Option<String>,
    pub ty: VecType,
}

impl DebugArg {
    /// Packed size in bytes. 3-wide vectors take exactly three lanes.
    #[inline]
    pub fn size_bytes(&self) -> u16 {
        u16::from(self.ty.scalar.bits) / 8 * u16::from(self.ty.dim)
    }
}

/// An argument placed in a message record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArgSlot {
    pub arg: DebugArg,
    /// Byte offset after the record header.
    pub offset: u16,
}

/// Packed placement of a message's arguments.
///
/// Arguments whose size is a multiple of the alignment keep declaration
/// order. The rest follow, wider elements first, then larger vectors first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArgsLayout {
    slots: Vec<ArgSlot>,
    order: Vec<usize>,
    /// Record payload size, rounded up to the alignment.
    pub total_size: u16,
}

impl ArgsLayout {
    pub fn new(args: Vec<DebugArg>, align: u16) -> EvalResult<Self> {
        if args.len() > usize::from(u8::MAX) {
            return Err(EvalError::new(format!(
                "Debug message takes at most {} args, got [{}]",
                u8::MAX,
                args.len()
            )));
        }
        let align = align.max(1);
        let (mut order, mut packed): (Vec<usize>, Vec<usize>) =
            (0..args.len()).partition(|&idx| args[idx].size_bytes() % align == 0);
        packed.sort_by(|&l, &r| {
            let (l, r) = (&args[l], &args[r]);
            r.ty.scalar
                .bits
                .cmp(&l.ty.scalar.bits)
                .then(r.size_bytes().cmp(&l.size_bytes()))
        });
        order.append(&mut packed);

        let mut slots: Vec<ArgSlot> = args
            .into_iter()
            .map(|arg| ArgSlot { arg, offset: 0 })
            .collect();
        let mut offset = 0_u16;
        for &idx in &order {
            let slot = &mut slots[idx];
            slot.offset = offset;
            offset = offset
                .checked_add(slot.arg.size_bytes())
                .ok_or_else(layout_too_large)?;
        }
        let total_size = offset
            .checked_next_multiple_of(align)
            .ok_or_else(layout_too_large)?;
        Ok(ArgsLayout {
            slots,
            order,
            total_size,
        })
    }

    /// Arguments in declaration order.
    pub fn by_index(&self) -> &[ArgSlot] {
        &self.slots
    }

    /// `(declaration index, slot)` in record order.
    pub fn by_layout(&self) -> impl Iterator<Item = (usize, &ArgSlot)> + '_ {
        self.order.iter().map(|&idx| (idx, &self.slots[idx]))
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// `[offset] type name`, one line per argument in record order.
    pub fn describe(&self) -> String {
        self.by_layout()
            .fold(String::new(), |mut out, (idx, slot)| {
                let name = slot.arg.name.as_deref().unwrap_or("");
                let _ = writeln!(out, "[{}] {} arg{idx} {name}", slot.offset, slot.arg.ty);
                out
            })
    }
}

#[cold]
fn layout_too_large() -> EvalError {
    EvalError::new(format!("Debug message exceeds {} bytes", u16::MAX))
}

/// A defined debug message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageBlock {
    /// Header id, starting at 1.
    pub debug_id: u8,
    pub name: String,
    pub formatter: String,
    pub layout: ArgsLayout,
}

impl MessageBlock {
    /// Name of the generated helper function.
    pub fn func_name(&self) -> String {
        format!("oglu_debug_{}", self.name)
    }

    /// Target source of the helper that appends one record.
    pub fn helper_source(&self, ctx: &XcnlContext) -> EvalResult<String> {
        let eol = ctx.eol();
        let mut func = format!("inline void {}(", self.func_name());
        let mut params = vec![
            "const  uint           uid".to_string(),
            "const  uint           total".to_string(),
            "global uint* restrict counter".to_string(),
            "global uint* restrict data".to_string(),
        ];
        for (idx, slot) in self.layout.by_index().iter().enumerate() {
            let ty = ctx.vec_type_name(&slot.arg.ty.to_string(), "DebugString")?;
            params.push(format!("const  {ty:7} arg{idx}"));
        }
        for (idx, param) in params.iter().enumerate() {
            let sep = if idx + 1 == params.len() { "" } else { "," };
            let _ = write!(func, "{eol}    {param}{sep}");
        }
        let _ = write!(func, "){eol}{{");
        let lines = [
            format!("const uint size = {} + 1;", self.layout.total_size / 4),
            format!(
                "const uint dbgId = {0:#010x}u << 24; // dbg [{0:3}]",
                self.debug_id
            ),
            "if (total == 0) return;".to_string(),
            "if (counter[0] + size > total) return;".to_string(),
            "const uint old = atom_add (counter, size);".to_string(),
            "if (old >= total) return;".to_string(),
            "if (old + size > total) { data[old] = 0xff000000u; return; }".to_string(),
            "data[old] = (uid & 0x00ffffffu) | dbgId;".to_string(),
            "global uint* const restrict ptr = data + old + 1;".to_string(),
        ];
        for line in lines {
            let _ = write!(func, "{eol}    {line}");
        }
        for (idx, slot) in self.layout.by_layout() {
            write_arg(&mut func, eol, idx, slot);
        }
        let _ = write!(func, "{eol}}}{eol}");
        Ok(func)
    }
}

/// Store one argument through `ptr` using the widest unsigned element that
/// divides its size.
fn write_arg(func: &mut String, eol: &str, idx: usize, slot: &ArgSlot) {
    let ty = slot.arg.ty;
    let bits = u32::from(ty.scalar.bits) * u32::from(ty.dim);
    let _ = write!(
        func,
        "{eol}    // arg[{idx:3}], offset[{:3}], size[{:3}], type[{ty}]",
        slot.offset,
        bits / 8
    );
    let Some(elem_bits) = [32_u8, 16, 8]
        .into_iter()
        .find(|&elem| bits % u32::from(elem) == 0)
    else {
        return;
    };
    let dst = Scalar::new(ScalarKind::Uint, elem_bits);
    let convert = ty.scalar != dst;
    let elem_bytes = u32::from(elem_bits / 8);
    let offset = u32::from(slot.offset);
    let mut store = |at: u32, lanes: u8, access: &str| {
        let value = if convert {
            format!("as_{}(arg{idx}{access})", vec_type_name(VecType::new(dst, lanes)))
        } else {
            format!("arg{idx}{access}")
        };
        let dst_name = vec_type_name(VecType::scalar(dst));
        let index = at / elem_bytes;
        if lanes == 1 {
            let _ = write!(func, "{eol}    ((global {dst_name}*)(ptr))[{index}] = {value};");
        } else {
            let _ = write!(
                func,
                "{eol}    vstore{lanes}({value}, 0, (global {dst_name}*)(ptr) + {index});"
            );
        }
    };
    match bits / u32::from(elem_bits) {
        32 => {
            store(offset, 16, ".s01234567");
            store(offset + elem_bytes * 16, 16, ".s89abcdef");
        }
        6 => {
            store(offset, 4, ".s01");
            store(offset + elem_bytes * 4, 2, ".s2");
        }
        3 => {
            store(offset, 2, ".s01");
            store(offset + elem_bytes * 2, 1, ".s2");
        }
        count => store(offset, u8::try_from(count).unwrap_or(u8::MAX), ""),
    }
}

/// Check `{}` placeholders against the argument count. `{{` and `}}` are
/// literal braces; `{n}` and `{n:fmt}` refer to argument `n`.
pub fn check_formatter(formatter: &str, arg_count: usize) -> Result<(), String> {
    let mut next = 0;
    let mut chars = formatter.char_indices().peekable();
    while let Some((pos, ch)) = chars.next() {
        match ch {
            '{' if chars.next_if(|&(_, c)| c == '{').is_some() => {}
            '{' => {
                let rest = &formatter[pos + 1..];
                let end = rest
                    .find('}')
                    .ok_or_else(|| format!("unterminated placeholder at [{pos}]"))?;
                let field = &rest[..end];
                let index = field.split(':').next().unwrap_or("");
                let index = if index.is_empty() {
                    next += 1;
                    next - 1
                } else {
                    index
                        .parse::<usize>()
                        .map_err(|_| format!("placeholder [{{{field}}}] is not positional"))?
                };
                if index >= arg_count {
                    return Err(format!(
                        "placeholder [{{{field}}}] refers to arg [{index}] of [{arg_count}]"
                    ));
                }
                while chars.next_if(|&(at, _)| at <= pos + 1 + end).is_some() {}
            }
            '}' if chars.next_if(|&(_, c)| c == '}').is_some() => {}
            '}' => return Err(format!("unmatched [}}] at [{pos}]")),
            _ => {}
        }
    }
    Ok(())
}

/// Parse `name:type` or `type`. Names start with a letter and continue with
/// letters, digits or `_`.
fn parse_debug_arg(ctx: &XcnlContext, text: &str, index: usize) -> EvalResult<DebugArg> {
    let (name, ty) = match text.split_once(':') {
        Some((name, ty)) => (Some(name).filter(|name| !name.is_empty()), ty),
        None => (None, text),
    };
    if let Some(name) = name {
        let mut chars = name.chars();
        let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid {
            return Err(EvalError::new(format!(
                "Arg name [{name}] is not acceptable"
            )));
        }
    }
    let reason = format!("Arg[{index}] of [DefineDebugString]");
    ctx.vec_type_name(ty, &reason)?;
    let parsed = VecType::parse(ty)
        .filter(|parsed| !parsed.min_bits)
        .ok_or_else(|| {
            EvalError::new(format!(
                "Type [{ty}] is not a fixed-width type when {reason}"
            ))
        })?;
    Ok(DebugArg {
        name: name.map(str::to_string),
        ty: parsed.ty,
    })
}

/// Generator of [`DebugExtension`], for
/// [`XcnlProgram::with_extension`](crate::XcnlProgram::with_extension) or
/// [`register_extension`](crate::register_extension).
pub fn debug_extension(ctx: &XcnlContext) -> Option<Box<dyn XcnlExtension>> {
    Some(Box::new(DebugExtension::new(ctx.config.debug)))
}

/// Debug message definitions of one generation pass.
#[derive(Debug, Default)]
pub struct DebugExtension {
    enabled: bool,
    messages: Vec<MessageBlock>,
}

impl DebugExtension {
    pub fn new(enabled: bool) -> Self {
        DebugExtension {
            enabled,
            messages: Vec::new(),
        }
    }

    pub fn messages(&self) -> &[MessageBlock] {
        &self.messages
    }

    pub fn message(&self, name: &str) -> Option<&MessageBlock> {
        self.messages.iter().find(|m| m.name == name)
    }

    fn define(&mut self, host: &mut ExtensionHost<'_>, call: &str, args: &[Value]) -> EvalResult<()> {
        if args.len() < 3 {
            return Err(too_few_args(call, 3, args.len()));
        }
        let name = string_arg(call, args, 0)?;
        let formatter = string_arg(call, args, 1)?;
        if self.message(name).is_some() {
            return Err(EvalError::new(format!(
                "DebugString [{name}] repeatedly defined"
            )));
        }
        if self.messages.len() >= MAX_MESSAGES {
            return Err(EvalError::new(format!(
                "Too many DebugString defined, maximum {MAX_MESSAGES}"
            )));
        }
        let mut debug_args = Vec::with_capacity(args.len() - 2);
        for (index, arg) in args.iter().enumerate().skip(2) {
            let text = arg
                .as_str()
                .ok_or_else(|| invalid_argument(call, index, "string", arg.type_name()))?;
            debug_args.push(parse_debug_arg(host.ctx, text, index)?);
        }
        let layout = ArgsLayout::new(debug_args, 4)?;
        check_formatter(formatter, layout.len()).map_err(|reason| {
            EvalError::new(format!(
                "Formatter of DebugString [{name}] does not match its args: {reason}"
            ))
        })?;

        let message = MessageBlock {
            debug_id: u8::try_from(self.messages.len() + 1).unwrap_or(u8::MAX),
            name: name.to_string(),
            formatter: formatter.to_string(),
            layout,
        };
        debug!(
            target: "xcnl",
            "DebugString [{name}] {formatter}\n{}",
            message.layout.describe().trim_end()
        );
        let source = message.helper_source(host.ctx)?;
        host.add_patched_block(&message.func_name(), source, &[])
            .map_err(|e| EvalError::new(e.to_string()))?;
        self.messages.push(message);
        Ok(())
    }

    fn print(&self, host: &mut ExtensionHost<'_>, args: &[&str]) -> EvalResult<ReplaceResult> {
        let Some((name, values)) = args.split_first() else {
            return Ok(ReplaceResult::Fail(
                "requires at least [1] args, which gives [0]".to_string(),
            ));
        };
        if !self.enabled {
            host.add_patched_block(
                "oclu_SkipDebug",
                format!("inline void oclu_SkipDebug() {{}}{}", host.ctx.eol()),
                &[],
            )
            .map_err(|e| EvalError::new(e.to_string()))?;
            return Ok(ReplaceResult::Replaced("oclu_SkipDebug()".to_string()));
        }
        let name = name.trim_matches('"');
        let Some(message) = self.message(name) else {
            return Ok(ReplaceResult::Fail(format!("DebugString [{name}] not defined")));
        };
        if values.len() != message.layout.len() {
            return Ok(ReplaceResult::Fail(format!(
                "DebugString [{name}] takes [{}] args, which gives [{}]",
                message.layout.len(),
                values.len()
            )));
        }
        let eol = host.ctx.eol().to_string();
        let Some(instance) = host.instance() else {
            return Ok(ReplaceResult::Fail("only supported inside an instance".to_string()));
        };
        if instance.arg(DATA_ARG).is_none() {
            return Ok(ReplaceResult::Fail(format!(
                "instance [{}] lacks @{OUTPUT_META}",
                instance.name
            )));
        }
        instance
            .body_prefixes
            .add("oclu_debug", thread_info_source(&eol), &[])
            .map_err(|e| EvalError::new(e.to_string()))?;

        let mut call = format!(
            "{}(_oclu_thread_id, {SIZE_ARG}, {INFO_ARG}, {DATA_ARG}",
            message.func_name()
        );
        for value in values {
            let _ = write!(call, ", {value}");
        }
        call.push(')');
        Ok(ReplaceResult::Replaced(call))
    }

    fn declare_output(&self, host: &mut ExtensionHost<'_>, args: &[Value]) -> EvalResult<()> {
        if !self.enabled {
            info!(target: "xcnl", "DebugOutput is disabled and ignored.");
            return Ok(());
        }
        let size = match args {
            [] => DEFAULT_BUFFER_SIZE,
            [size] => size
                .as_u64()
                .ok_or_else(|| invalid_argument(OUTPUT_META, 0, "integer", size.type_name()))?,
            _ => {
                return Err(EvalError::new(format!(
                    "{OUTPUT_META} takes at most [1] args, which gives [{}]",
                    args.len()
                )))
            }
        };
        debug!(target: "xcnl", size, "debug output requested");
        let debug_args = [
            ("Simple", [SIZE_ARG, ""]),
            ("Buf", [INFO_ARG, "restrict"]),
            ("Buf", [DATA_ARG, "restrict"]),
        ];
        for (tag, [name, qualifier]) in debug_args {
            let values = [Value::string("u32"), Value::string(name), Value::string(qualifier)];
            let info = parse_instance_arg(OUTPUT_META, tag, &values)?;
            host.ctx.handle_instance_arg(info)?;
        }
        Ok(())
    }
}

/// Per-thread prologue that computes `_oclu_thread_id` and records the
/// launch shape.
fn thread_info_source(eol: &str) -> String {
    [
        "    const uint _oclu_thread_id = get_global_id(0) + get_global_id(1) * get_global_size(0) + get_global_id(2) * get_global_size(1) * get_global_size(0);",
        "    if (_oclu_debug_buffer_size > 0)",
        "    {",
        "        if (_oclu_thread_id == 0)",
        "        {",
        "            _oclu_debug_buffer_info[1] = get_global_size(0);",
        "            _oclu_debug_buffer_info[2] = get_global_size(1);",
        "            _oclu_debug_buffer_info[3] = get_global_size(2);",
        "            _oclu_debug_buffer_info[4] = get_local_size(0);",
        "            _oclu_debug_buffer_info[5] = get_local_size(1);",
        "            _oclu_debug_buffer_info[6] = get_local_size(2);",
        "        }",
        "#if defined(cl_khr_subgroups) || defined(cl_intel_subgroups)",
        "        const ushort sgid  = get_sub_group_id();",
        "        const ushort sglid = get_sub_group_local_id();",
        "        const uint sginfo  = sgid * 65536u + sglid;",
        "#else",
        "        const uint sginfo  = get_local_id(0) + get_local_id(1) * get_local_size(0) + get_local_id(2) * get_local_size(1) * get_local_size(0);",
        "#endif",
        "        _oclu_debug_buffer_info[_oclu_thread_id + 7] = sginfo;",
        "    }",
    ]
    .join(eol)
}

impl XcnlExtension for DebugExtension {
    fn name(&self) -> &str {
        "debug"
    }

    fn config_func(
        &mut self,
        host: &mut ExtensionHost<'_>,
        call: &CallContext<'_>,
        args: &[Value],
    ) -> EvalResult<Option<Value>> {
        match call.name {
            DEFINE_FUNC => self.define(host, call.name, args)?,
            ENABLE_FUNC => {
                debug!(target: "xcnl", "Manually enable debug.");
                self.enabled = true;
            }
            _ => return Ok(None),
        }
        Ok(Some(Value::Empty))
    }

    fn claims_instance_meta(&self, name: &str) -> bool {
        name == OUTPUT_META
    }

    fn instance_meta(
        &mut self,
        host: &mut ExtensionHost<'_>,
        name: &str,
        args: &[Value],
    ) -> EvalResult<bool> {
        if name != OUTPUT_META {
            return Ok(false);
        }
        self.declare_output(host, args)?;
        Ok(true)
    }

    fn replace_func(
        &mut self,
        host: &mut ExtensionHost<'_>,
        name: &str,
        args: &[&str],
    ) -> EvalResult<ReplaceResult> {
        if name != PRINT_FUNC {
            return Ok(ReplaceResult::Fallback(None));
        }
        self.print(host, args)
    }
}
