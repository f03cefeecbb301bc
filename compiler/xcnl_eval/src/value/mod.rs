//! Runtime values.
//!
//! Scalars and strings are plain variants. Host-defined objects are
//! [`CustomValue`]s: a closed set of reference-counted handles that the
//! interpreter queries and assigns through a fixed interface.
//!
//! Values use `Rc` and are therefore `!Send`; one generation pass runs on
//! one thread.

mod arg_info;
mod vec;

use std::fmt;
use std::rc::Rc;

pub use arg_info::{ArgFlags, ArgKind, InstanceArgInfo, TexKind};
pub use vec::{GeneralVec, VecStorage, OWNED_LEN, VIEW_LEN};

use crate::errors::{not_indexable, read_only_target, undefined_field, EvalResult};

/// A runtime value.
#[derive(Clone, Debug, Default)]
pub enum Value {
    /// No value: the result of statements and of lookups that found nothing.
    #[default]
    Empty,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    Str(Rc<str>),
    Custom(CustomValue),
}

impl Value {
    pub fn string(s: impl AsRef<str>) -> Self {
        Value::Str(Rc::from(s.as_ref()))
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Empty)
    }

    /// Short type tag for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Empty => "Empty",
            Value::Bool(_) => "Bool",
            Value::Int(_) => "Int",
            Value::Uint(_) => "Uint",
            Value::Float(_) => "Float",
            Value::Str(_) => "Str",
            Value::Custom(custom) => custom.type_name(),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Value::Bool(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Int(v) => Some(v),
            Value::Uint(v) => i64::try_from(v).ok(),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Value::Uint(v) => Some(v),
            Value::Int(v) => u64::try_from(v).ok(),
            _ => None,
        }
    }

    #[allow(clippy::cast_precision_loss, reason = "numeric promotion to float")]
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Int(v) => Some(v as f64),
            Value::Uint(v) => Some(v as f64),
            Value::Float(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_custom(&self) -> Option<&CustomValue> {
        match self {
            Value::Custom(custom) => Some(custom),
            _ => None,
        }
    }

    /// `true` for a vector view binding, which assignment writes through.
    pub fn is_vec_view(&self) -> bool {
        matches!(self, Value::Custom(CustomValue::Vec(v)) if v.is_view())
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Empty, Value::Empty) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Uint(a), Value::Uint(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits() || a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Custom(a), Value::Custom(b)) => a.eq_same_kind(b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Empty => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Uint(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Str(s) => f.write_str(s),
            Value::Custom(custom) => write!(f, "{custom}"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Uint(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

/// Host-defined value kinds.
#[derive(Clone, Debug)]
pub enum CustomValue {
    Vec(GeneralVec),
    /// Boxed argument descriptor from `xcomp.ArgInfo.*`.
    InstanceArg(Rc<InstanceArgInfo>),
}

impl CustomValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            CustomValue::Vec(v) => v.kind_name(),
            CustomValue::InstanceArg(_) => "InstanceArgInfo",
        }
    }

    /// Concrete type, e.g. `f32v4` for vectors.
    pub fn exact_type_name(&self) -> String {
        match self {
            CustomValue::Vec(v) => v.type_name(),
            CustomValue::InstanceArg(_) => self.type_name().to_string(),
        }
    }

    /// Number of live handles to the underlying data.
    pub fn ref_count(&self) -> usize {
        match self {
            CustomValue::Vec(v) => v.ref_count(),
            CustomValue::InstanceArg(info) => Rc::strong_count(info),
        }
    }

    /// Equality within one kind; values of different kinds are never equal.
    pub fn eq_same_kind(&self, other: &CustomValue) -> bool {
        match (self, other) {
            (CustomValue::Vec(a), CustomValue::Vec(b)) => a.same_values(b),
            (CustomValue::InstanceArg(a), CustomValue::InstanceArg(b)) => a == b,
            _ => false,
        }
    }

    pub fn field(&self, name: &str) -> EvalResult {
        match self {
            CustomValue::Vec(v) => v.field(name),
            CustomValue::InstanceArg(info) => {
                let value = match name {
                    "Name" => Value::string(&info.name),
                    "DataType" => Value::string(&info.data_type),
                    "Kind" => Value::string(info.kind.as_str()),
                    "TexType" => Value::string(info.tex_kind.as_str()),
                    "Flags" => Value::string(info.flags.to_string()),
                    "Extra" => Value::string(info.extra.join(" ")),
                    _ => return Err(undefined_field(name, self.type_name())),
                };
                Ok(value)
            }
        }
    }

    pub fn index(&self, index: i64) -> EvalResult {
        match self {
            CustomValue::Vec(v) => v.index(index),
            CustomValue::InstanceArg(_) => Err(not_indexable(self.type_name())),
        }
    }

    pub fn assign(&self, value: &Value) -> EvalResult<()> {
        match self {
            CustomValue::Vec(v) => v.assign(value),
            CustomValue::InstanceArg(_) => Err(read_only_target(self.type_name())),
        }
    }

    pub fn assign_field(&self, name: &str, value: &Value) -> EvalResult<()> {
        match self {
            CustomValue::Vec(v) => v.assign_field(name, value),
            CustomValue::InstanceArg(_) => Err(read_only_target(self.type_name())),
        }
    }

    pub fn assign_index(&self, index: i64, value: &Value) -> EvalResult<()> {
        match self {
            CustomValue::Vec(v) => v.assign_index(index, value),
            CustomValue::InstanceArg(_) => Err(not_indexable(self.type_name())),
        }
    }
}

impl fmt::Display for CustomValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CustomValue::Vec(v) => write!(f, "{v}"),
            CustomValue::InstanceArg(info) => write!(f, "{info}"),
        }
    }
}

impl From<GeneralVec> for Value {
    fn from(v: GeneralVec) -> Self {
        Value::Custom(CustomValue::Vec(v))
    }
}

impl From<InstanceArgInfo> for Value {
    fn from(info: InstanceArgInfo) -> Self {
        Value::Custom(CustomValue::InstanceArg(Rc::new(info)))
    }
}
