//! `xcomp.*` functions available to every statement and expression.
//!
//! | Function | Result |
//! |----------|--------|
//! | `GetVecTypeName(type)` | target spelling of a vector type |
//! | `Log(level, fmt, args...)` | logs under target `xcnl` |
//! | `Vec(type, values...)` | owned vector value |
//! | `ArgInfo.<Kind>(...)` | boxed argument descriptor |
//! | `Field(type, name, dims..., qualifiers...)` | struct field, inside Struct blocks |

use tracing::{debug, error, info, trace, warn};
use xcnl_eval::errors::{invalid_argument, too_few_args, wrong_arg_count};
use xcnl_eval::{ArgFlags, CallContext, EvalError, EvalResult, GeneralVec, Interpreter, Value};
use xcnl_ir::VecType;

use super::Dispatch;
use crate::instance::{parse_instance_arg, string_arg};
use crate::layout::{FieldDecl, FieldType};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LogLevel {
    Error,
    Success,
    Warning,
    Info,
    Verbose,
    Debug,
}

impl LogLevel {
    fn parse(text: &str) -> Option<Self> {
        match text {
            "error" => Some(LogLevel::Error),
            "success" => Some(LogLevel::Success),
            "warning" => Some(LogLevel::Warning),
            "info" => Some(LogLevel::Info),
            "verbose" => Some(LogLevel::Verbose),
            "debug" => Some(LogLevel::Debug),
            _ => None,
        }
    }
}

impl Dispatch<'_> {
    /// `builtin` is the call name without the `xcomp.` prefix.
    pub(super) fn common_func(
        &mut self,
        interp: &mut Interpreter,
        call: &CallContext<'_>,
        builtin: &str,
        args: &[Value],
    ) -> EvalResult<Option<Value>> {
        let value = match builtin {
            "GetVecTypeName" => {
                let [ty] = args else {
                    return Err(wrong_arg_count(call.name, 1, args.len()));
                };
                let ty = ty
                    .as_str()
                    .ok_or_else(|| invalid_argument(call.name, 0, "string", ty.type_name()))?;
                Value::string(self.ctx.vec_type_name(ty, "call [GetVecTypeName]")?)
            }
            "Log" => {
                log(call.name, args)?;
                Value::Empty
            }
            "Vec" => make_vec(call.name, args)?,
            "Field" => {
                self.declare_field(interp, call, args)?;
                Value::Empty
            }
            _ => match builtin.strip_prefix("ArgInfo.") {
                Some(tag) => parse_instance_arg(call.name, tag, args)?.into(),
                None => return Ok(None),
            },
        };
        Ok(Some(value))
    }

    /// `xcomp.Field(type, name, dims..., qualifiers...)`, optionally
    /// annotated with `@xcomp.Align(n)`.
    fn declare_field(
        &mut self,
        interp: &mut Interpreter,
        call: &CallContext<'_>,
        args: &[Value],
    ) -> EvalResult<()> {
        if self.ctx.building.is_none() {
            return Err(EvalError::new(format!(
                "{} is only allowed inside a Struct block",
                call.name
            )));
        }
        if args.len() < 2 {
            return Err(too_few_args(call.name, 2, args.len()));
        }
        let type_name = string_arg(call.name, args, 0)?;
        let name = string_arg(call.name, args, 1)?;
        let ty = match self.ctx.find_struct(type_name) {
            Some(idx) => FieldType::Struct(idx),
            None => match VecType::parse(type_name) {
                Some(parsed) if !parsed.min_bits => FieldType::Vec(parsed.ty),
                Some(_) => {
                    return Err(EvalError::new(format!(
                        "Type [{type_name}] is a min-bits type, not allowed when declare field [{name}]"
                    )))
                }
                None => {
                    return Err(EvalError::new(format!(
                        "Type [{type_name}] not recognized as VecType when declare field [{name}]"
                    )))
                }
            },
        };

        let mut extents = Vec::new();
        let mut flags = ArgFlags::empty();
        let mut extra = Vec::new();
        for (index, arg) in args.iter().enumerate().skip(2) {
            match arg {
                Value::Str(qualifier) => match ArgFlags::from_keyword(qualifier) {
                    _ if qualifier.is_empty() => {}
                    Some(flag) => flags |= flag,
                    None => extra.push(qualifier.to_string()),
                },
                Value::Int(_) | Value::Uint(_) if flags.is_empty() && extra.is_empty() => {
                    let extent = arg
                        .as_u64()
                        .and_then(|v| u32::try_from(v).ok())
                        .ok_or_else(|| {
                            EvalError::new(format!(
                                "Array dimension [{arg}] of field [{name}] is out of range"
                            ))
                        })?;
                    extents.push(extent);
                }
                _ => {
                    return Err(invalid_argument(
                        call.name,
                        index,
                        "dimension or qualifier",
                        arg.type_name(),
                    ))
                }
            }
        }

        let align = self.field_align(interp, call)?;
        let Some(building) = self.ctx.building.as_mut() else {
            return Ok(());
        };
        building.add_field(FieldDecl {
            ty,
            name,
            extents: &extents,
            align,
            flags,
            extra,
        })?;
        Ok(())
    }

    fn field_align(
        &mut self,
        interp: &mut Interpreter,
        call: &CallContext<'_>,
    ) -> EvalResult<Option<u32>> {
        let mut align = None;
        for meta in call.metas {
            let meta_name = interp.name_str(meta.name);
            if meta_name != "xcomp.Align" {
                continue;
            }
            let args = interp.eval_args(call.arena, meta, self)?;
            let [value] = args.as_slice() else {
                return Err(wrong_arg_count(meta_name, 1, args.len()).with_span(meta.span));
            };
            let value = value
                .as_u64()
                .and_then(|v| u32::try_from(v).ok())
                .ok_or_else(|| invalid_argument(meta_name, 0, "positive integer", value.type_name()))?;
            align = Some(value);
        }
        Ok(align)
    }
}

/// `xcomp.Vec(type, values...)`: 0, 1 or `dim` initial values.
fn make_vec(name: &str, args: &[Value]) -> EvalResult {
    let Some((ty, values)) = args.split_first() else {
        return Err(too_few_args(name, 1, 0));
    };
    let ty_name = ty
        .as_str()
        .ok_or_else(|| invalid_argument(name, 0, "string", ty.type_name()))?;
    let parsed = VecType::parse(ty_name)
        .filter(|parsed| !parsed.min_bits)
        .ok_or_else(|| {
            EvalError::new(format!(
                "Type [{ty_name}] not recognized as VecType when call [{name}]"
            ))
        })?;
    Ok(GeneralVec::with_values(parsed.ty.scalar, usize::from(parsed.ty.dim), values)?.into())
}

fn log(name: &str, args: &[Value]) -> EvalResult<()> {
    if args.len() < 2 {
        return Err(too_few_args(name, 2, args.len()));
    }
    let level = args[0]
        .as_str()
        .and_then(LogLevel::parse)
        .ok_or_else(|| {
            let got = args[0].as_str().unwrap_or(args[0].type_name());
            invalid_argument(name, 0, "LogLevel", got)
        })?;
    let message = match format_message(&args[1].to_string(), &args[2..]) {
        Ok(message) => message,
        Err(reason) => {
            error!(target: "xcnl", "Error when formatting inner log: {reason}");
            return Ok(());
        }
    };
    match level {
        LogLevel::Error => error!(target: "xcnl", "{message}"),
        LogLevel::Warning => warn!(target: "xcnl", "{message}"),
        LogLevel::Success | LogLevel::Info => info!(target: "xcnl", "{message}"),
        LogLevel::Verbose => trace!(target: "xcnl", "{message}"),
        LogLevel::Debug => debug!(target: "xcnl", "{message}"),
    }
    Ok(())
}

/// Substitute `{}` placeholders in order; `{{` and `}}` are literal braces.
fn format_message(fmt: &str, args: &[Value]) -> Result<String, String> {
    if args.is_empty() {
        return Ok(fmt.to_string());
    }
    let mut out = String::with_capacity(fmt.len());
    let mut next = args.iter();
    let mut chars = fmt.chars().peekable();
    while let Some(c) = chars.next() {
        match (c, chars.peek()) {
            ('{', Some('{')) | ('}', Some('}')) => {
                out.push(c);
                chars.next();
            }
            ('{', Some('}')) => {
                chars.next();
                let arg = next
                    .next()
                    .ok_or_else(|| format!("not enough arguments for [{fmt}]"))?;
                out.push_str(&arg.to_string());
            }
            ('{' | '}', _) => return Err(format!("unmatched brace in [{fmt}]")),
            _ => out.push(c),
        }
    }
    Ok(out)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests unwrap formatting results")]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_format_message() {
        let args = [Value::Int(3), Value::string("x")];
        assert_eq!(format_message("{} of {}", &args).unwrap(), "3 of x");
        assert_eq!(format_message("{{{}}}", &args).unwrap(), "{3}");
        assert_eq!(format_message("plain {", &[]).unwrap(), "plain {");
        assert!(format_message("{} {} {}", &args).is_err());
        assert!(format_message("{x}", &args).is_err());
    }

    #[test]
    fn test_log_level_checked() {
        let err = log("xcomp.Log", &[Value::string("loud"), Value::string("m")]).unwrap_err();
        assert_eq!(err.message, "xcomp.Log's arg[0] is [loud], not [LogLevel]");
        assert!(log("xcomp.Log", &[Value::string("info")]).is_err());
        // A bad format string is logged, not raised.
        log("xcomp.Log", &[Value::string("info"), Value::string("{}{}"), Value::Int(1)]).unwrap();
    }

    #[test]
    fn test_make_vec() {
        let v = make_vec("xcomp.Vec", &[Value::string("u32v3"), Value::Uint(7)]).unwrap();
        assert_eq!(v.to_string(), "[7, 7, 7]");
        assert!(make_vec("xcomp.Vec", &[Value::string("u32v3"), Value::Uint(7), Value::Uint(1)]).is_err());
        assert!(make_vec("xcomp.Vec", &[Value::string("u32v8")]).is_err());
        assert!(make_vec("xcomp.Vec", &[]).is_err());
    }
}
