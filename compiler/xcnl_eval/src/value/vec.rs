//! Small numeric vectors over shared byte storage.
//!
//! An owned vector allocates its own storage; a view points into storage
//! supplied by the host (for example a work-group size array) and may be
//! read-only. Both are cheap handles: cloning shares the storage, so field
//! and index assignment is visible through every handle.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use xcnl_ir::{Scalar, ScalarKind};

use crate::errors::{
    index_out_of_range, length_mismatch, read_only_target, type_mismatch, undefined_field,
    EvalError, EvalResult,
};
use crate::value::{CustomValue, Value};

/// Lengths accepted for owned vectors.
pub const OWNED_LEN: std::ops::RangeInclusive<usize> = 2..=4;
/// Lengths accepted for views.
pub const VIEW_LEN: std::ops::RangeInclusive<usize> = 1..=16;

/// Reference-counted byte storage shared by vectors and the host.
#[derive(Clone, Default)]
pub struct VecStorage(Rc<RefCell<Vec<u8>>>);

impl VecStorage {
    pub fn zeroed(len: usize) -> Self {
        VecStorage(Rc::new(RefCell::new(vec![0; len])))
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        VecStorage(Rc::new(RefCell::new(bytes)))
    }

    /// Little-endian `u64` array, the layout of host size arrays.
    pub fn from_u64s(values: &[u64]) -> Self {
        Self::from_bytes(values.iter().flat_map(|v| v.to_le_bytes()).collect())
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    /// Snapshot of the current contents.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.borrow().clone()
    }

    /// Read back a little-endian `u64` array.
    pub fn to_u64s(&self) -> Vec<u64> {
        self.0
            .borrow()
            .chunks_exact(8)
            .map(|chunk| {
                let mut buf = [0u8; 8];
                buf.copy_from_slice(chunk);
                u64::from_le_bytes(buf)
            })
            .collect()
    }

    pub fn ref_count(&self) -> usize {
        Rc::strong_count(&self.0)
    }
}

impl fmt::Debug for VecStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VecStorage")
            .field("len", &self.len())
            .field("refs", &self.ref_count())
            .finish()
    }
}

/// A numeric vector value.
#[derive(Clone)]
pub struct GeneralVec {
    storage: VecStorage,
    /// Byte offset of element 0.
    offset: usize,
    scalar: Scalar,
    len: u8,
    owned: bool,
    read_only: bool,
}

impl GeneralVec {
    /// Zero-initialized owned vector of 2 to 4 elements.
    pub fn new(scalar: Scalar, len: usize) -> EvalResult<Self> {
        if !OWNED_LEN.contains(&len) {
            return Err(EvalError::new(format!(
                "vector length must be 2 to 4, got {len}"
            )));
        }
        let bytes = len * scalar.bytes() as usize;
        Ok(GeneralVec {
            storage: VecStorage::zeroed(bytes),
            offset: 0,
            scalar,
            len: len_u8(len),
            owned: true,
            read_only: false,
        })
    }

    /// Owned vector from 0 (zeros), 1 (broadcast) or `len` initializers.
    pub fn with_values(scalar: Scalar, len: usize, init: &[Value]) -> EvalResult<Self> {
        let vec = Self::new(scalar, len)?;
        match init {
            [] => {}
            [single] => vec.fill(single)?,
            values if values.len() == len => {
                for (i, value) in values.iter().enumerate() {
                    vec.store(i, value)?;
                }
            }
            values => return Err(length_mismatch(len, values.len())),
        }
        Ok(vec)
    }

    /// Window of `len` elements starting at byte `offset` of `storage`.
    pub fn view(
        storage: VecStorage,
        offset: usize,
        scalar: Scalar,
        len: usize,
        read_only: bool,
    ) -> EvalResult<Self> {
        if !VIEW_LEN.contains(&len) {
            return Err(EvalError::new(format!(
                "vector view length must be 1 to 16, got {len}"
            )));
        }
        let end = offset + len * scalar.bytes() as usize;
        if end > storage.len() {
            return Err(EvalError::new(format!(
                "vector view [{offset}..{end}) exceeds storage of {} bytes",
                storage.len()
            )));
        }
        Ok(GeneralVec {
            storage,
            offset,
            scalar,
            len: len_u8(len),
            owned: false,
            read_only,
        })
    }

    #[inline]
    pub fn scalar(&self) -> Scalar {
        self.scalar
    }

    #[inline]
    pub fn len(&self) -> usize {
        usize::from(self.len)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn is_view(&self) -> bool {
        !self.owned
    }

    #[inline]
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Handles sharing the underlying storage (including the host's).
    pub fn ref_count(&self) -> usize {
        self.storage.ref_count()
    }

    /// Concrete type such as `f32v3`.
    pub fn type_name(&self) -> String {
        format!("{}v{}", self.scalar, self.len)
    }

    pub fn kind_name(&self) -> &'static str {
        if self.owned {
            "GeneralVec"
        } else {
            "GeneralVecRef"
        }
    }

    /// Element at `index`, `None` when out of range.
    pub fn get(&self, index: usize) -> Option<Value> {
        if index >= self.len() {
            return None;
        }
        let raw = self.read_raw(index)?;
        Some(decode(self.scalar, raw))
    }

    pub fn to_values(&self) -> Vec<Value> {
        (0..self.len()).filter_map(|i| self.get(i)).collect()
    }

    /// `x`, `y`, `z`, `w` or `Length`.
    pub fn field(&self, name: &str) -> EvalResult {
        if name == "Length" {
            return Ok(Value::Uint(u64::from(self.len)));
        }
        let index = self.field_index(name)?;
        self.get(index)
            .ok_or_else(|| index_out_of_range(&self.type_name(), name, self.len()))
    }

    /// Element by index; negative indices count from the end.
    pub fn index(&self, index: i64) -> EvalResult {
        let i = self.resolve_index(index)?;
        self.get(i)
            .ok_or_else(|| index_out_of_range(&self.type_name(), &index.to_string(), self.len()))
    }

    pub fn assign_field(&self, name: &str, value: &Value) -> EvalResult<()> {
        self.check_writable()?;
        let index = self.field_index(name)?;
        self.store(index, value)
    }

    pub fn assign_index(&self, index: i64, value: &Value) -> EvalResult<()> {
        self.check_writable()?;
        let i = self.resolve_index(index)?;
        self.store(i, value)
    }

    /// Whole-vector assignment: equal-length vector copy or scalar broadcast.
    pub fn assign(&self, value: &Value) -> EvalResult<()> {
        self.check_writable()?;
        match value {
            Value::Custom(CustomValue::Vec(other)) => {
                if other.len() != self.len() {
                    return Err(length_mismatch(self.len(), other.len()));
                }
                // Read first: `other` may alias this storage.
                let values = other.to_values();
                for (i, v) in values.iter().enumerate() {
                    self.store(i, v)?;
                }
                Ok(())
            }
            scalar => self.fill(scalar),
        }
    }

    /// Same length and element-wise numerically equal.
    pub fn same_values(&self, other: &GeneralVec) -> bool {
        self.len() == other.len()
            && self
                .to_values()
                .iter()
                .zip(other.to_values().iter())
                .all(|(a, b)| numeric_eq(a, b))
    }

    fn check_writable(&self) -> EvalResult<()> {
        if self.read_only {
            Err(read_only_target(&self.type_name()))
        } else {
            Ok(())
        }
    }

    fn field_index(&self, name: &str) -> EvalResult<usize> {
        let index = match name {
            "x" => 0,
            "y" => 1,
            "z" => 2,
            "w" => 3,
            _ => return Err(undefined_field(name, &self.type_name())),
        };
        if index < self.len() {
            Ok(index)
        } else {
            Err(index_out_of_range(&self.type_name(), name, self.len()))
        }
    }

    fn resolve_index(&self, index: i64) -> EvalResult<usize> {
        let len = i64::from(self.len);
        let resolved = if index < 0 { len + index } else { index };
        if (0..len).contains(&resolved) {
            usize::try_from(resolved)
                .map_err(|_| index_out_of_range(&self.type_name(), &index.to_string(), self.len()))
        } else {
            Err(index_out_of_range(
                &self.type_name(),
                &index.to_string(),
                self.len(),
            ))
        }
    }

    fn fill(&self, value: &Value) -> EvalResult<()> {
        let raw = encode(self.scalar, value)?;
        for i in 0..self.len() {
            self.write_raw(i, raw);
        }
        Ok(())
    }

    fn store(&self, index: usize, value: &Value) -> EvalResult<()> {
        let raw = encode(self.scalar, value)?;
        self.write_raw(index, raw);
        Ok(())
    }

    fn byte_range(&self, index: usize) -> std::ops::Range<usize> {
        let width = self.scalar.bytes() as usize;
        let start = self.offset + index * width;
        start..start + width
    }

    fn read_raw(&self, index: usize) -> Option<u64> {
        let range = self.byte_range(index);
        let width = range.len();
        let bytes = self.storage.0.borrow();
        let src = bytes.get(range)?;
        let mut buf = [0u8; 8];
        buf[..width].copy_from_slice(src);
        Some(u64::from_le_bytes(buf))
    }

    fn write_raw(&self, index: usize, raw: u64) {
        let range = self.byte_range(index);
        let width = range.len();
        let mut bytes = self.storage.0.borrow_mut();
        if let Some(dst) = bytes.get_mut(range) {
            dst.copy_from_slice(&raw.to_le_bytes()[..width]);
        }
    }
}

impl fmt::Display for GeneralVec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, value) in self.to_values().iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{value}")?;
        }
        f.write_str("]")
    }
}

impl fmt::Debug for GeneralVec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{} {self}", self.kind_name(), self.type_name())
    }
}

fn len_u8(len: usize) -> u8 {
    u8::try_from(len).unwrap_or(u8::MAX)
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    reason = "raw holds exactly `bits` significant bits"
)]
fn decode(scalar: Scalar, raw: u64) -> Value {
    match scalar.kind {
        ScalarKind::Uint => Value::Uint(raw),
        ScalarKind::Sint => {
            let shift = 64 - u32::from(scalar.bits);
            Value::Int(((raw << shift) as i64) >> shift)
        }
        ScalarKind::Float => match scalar.bits {
            16 => Value::Float(half::f16::from_bits(raw as u16).to_f64()),
            32 => Value::Float(f64::from(f32::from_bits(raw as u32))),
            _ => Value::Float(f64::from_bits(raw)),
        },
    }
}

/// Convert a scalar value to the element's bit pattern (low `bits` bits).
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss,
    reason = "element stores follow C conversion semantics"
)]
fn encode(scalar: Scalar, value: &Value) -> EvalResult<u64> {
    let raw = match scalar.kind {
        ScalarKind::Uint | ScalarKind::Sint => match *value {
            Value::Bool(b) => u64::from(b),
            Value::Int(v) => v as u64,
            Value::Uint(v) => v,
            Value::Float(v) if scalar.kind == ScalarKind::Sint => (v as i64) as u64,
            Value::Float(v) => v as u64,
            _ => return Err(type_mismatch("number", value.type_name())),
        },
        ScalarKind::Float => {
            let v = match *value {
                Value::Bool(b) => f64::from(u8::from(b)),
                Value::Int(v) => v as f64,
                Value::Uint(v) => v as f64,
                Value::Float(v) => v,
                _ => return Err(type_mismatch("number", value.type_name())),
            };
            match scalar.bits {
                16 => u64::from(half::f16::from_f64(v).to_bits()),
                32 => u64::from((v as f32).to_bits()),
                _ => v.to_bits(),
            }
        }
    };
    Ok(raw)
}

#[allow(clippy::float_cmp, reason = "exact element comparison")]
fn numeric_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => x == y,
        (Value::Uint(x), Value::Uint(y)) => x == y,
        _ => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests unwrap construction results")]
mod tests;
