//! Primitive vector type descriptors (`u8`, `i32v4`, `f16v2+`, ...).
//!
//! Grammar: `<kind><bits>[v<dim>][+]` where kind is `u`, `i` or `f`, bits is
//! 8/16/32/64 for integers and 16/32/64 for floats, dim is one of
//! 2/3/4/8/16, and a trailing `+` marks a minimum-bit-width type ("at least
//! this many bits").

use std::fmt;

/// The kind of a scalar element.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub enum ScalarKind {
    /// Unsigned integer.
    Uint,
    /// Signed integer.
    Sint,
    /// Floating point.
    Float,
}

impl ScalarKind {
    const fn prefix(self) -> char {
        match self {
            ScalarKind::Uint => 'u',
            ScalarKind::Sint => 'i',
            ScalarKind::Float => 'f',
        }
    }
}

/// A scalar element type: kind + bit width.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct Scalar {
    pub kind: ScalarKind,
    pub bits: u8,
}

impl Scalar {
    pub const U8: Self = Self::new(ScalarKind::Uint, 8);
    pub const U16: Self = Self::new(ScalarKind::Uint, 16);
    pub const U32: Self = Self::new(ScalarKind::Uint, 32);
    pub const U64: Self = Self::new(ScalarKind::Uint, 64);
    pub const I8: Self = Self::new(ScalarKind::Sint, 8);
    pub const I16: Self = Self::new(ScalarKind::Sint, 16);
    pub const I32: Self = Self::new(ScalarKind::Sint, 32);
    pub const I64: Self = Self::new(ScalarKind::Sint, 64);
    pub const F16: Self = Self::new(ScalarKind::Float, 16);
    pub const F32: Self = Self::new(ScalarKind::Float, 32);
    pub const F64: Self = Self::new(ScalarKind::Float, 64);

    pub const fn new(kind: ScalarKind, bits: u8) -> Self {
        Scalar { kind, bits }
    }

    /// Width in bytes.
    #[inline]
    pub const fn bytes(self) -> u32 {
        self.bits as u32 / 8
    }

    const fn is_valid(self) -> bool {
        match self.kind {
            ScalarKind::Uint | ScalarKind::Sint => {
                matches!(self.bits, 8 | 16 | 32 | 64)
            }
            ScalarKind::Float => matches!(self.bits, 16 | 32 | 64),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind.prefix(), self.bits)
    }
}

/// A primitive vector type: scalar element + lane count.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub struct VecType {
    pub scalar: Scalar,
    pub dim: u8,
}

impl VecType {
    pub const fn new(scalar: Scalar, dim: u8) -> Self {
        VecType { scalar, dim }
    }

    pub const fn scalar(scalar: Scalar) -> Self {
        VecType { scalar, dim: 1 }
    }

    /// Number of lanes the type occupies in memory: 3-wide vectors take 4.
    #[inline]
    pub const fn storage_lanes(self) -> u32 {
        if self.dim == 3 {
            4
        } else {
            self.dim as u32
        }
    }

    /// Size (and natural alignment) in bytes.
    #[inline]
    pub const fn size_bytes(self) -> u32 {
        self.scalar.bytes() * self.storage_lanes()
    }

    /// Parse a type descriptor such as `f32v4` or `u16+`.
    pub fn parse(text: &str) -> Option<ParsedVecType> {
        let (body, min_bits) = match text.strip_suffix('+') {
            Some(body) => (body, true),
            None => (text, false),
        };
        let mut chars = body.chars();
        let kind = match chars.next()? {
            'u' => ScalarKind::Uint,
            'i' => ScalarKind::Sint,
            'f' => ScalarKind::Float,
            _ => return None,
        };
        let rest = chars.as_str();
        let (bits_text, dim_text) = match rest.split_once('v') {
            Some((bits, dim)) => (bits, Some(dim)),
            None => (rest, None),
        };
        let bits: u8 = parse_decimal(bits_text)?;
        let scalar = Scalar::new(kind, bits);
        if !scalar.is_valid() {
            return None;
        }
        let dim = match dim_text {
            None => 1,
            Some(dim_text) => match parse_decimal(dim_text)? {
                dim @ (2 | 3 | 4 | 8 | 16) => dim,
                _ => return None,
            },
        };
        Some(ParsedVecType {
            ty: VecType::new(scalar, dim),
            min_bits,
        })
    }
}

/// Strict decimal parse: no sign, no leading zeros.
fn parse_decimal(text: &str) -> Option<u8> {
    if text.is_empty() || text.starts_with('0') || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

impl fmt::Display for VecType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.dim == 1 {
            write!(f, "{}", self.scalar)
        } else {
            write!(f, "{}v{}", self.scalar, self.dim)
        }
    }
}

/// Result of parsing a type descriptor.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub struct ParsedVecType {
    pub ty: VecType,
    /// Written with a trailing `+`.
    pub min_bits: bool,
}

impl fmt::Display for ParsedVecType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.ty)?;
        if self.min_bits {
            f.write_str("+")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_scalars_and_vectors() {
        let ty = VecType::parse("f32v4").map(|p| p.ty);
        assert_eq!(ty, Some(VecType::new(Scalar::F32, 4)));
        let ty = VecType::parse("u8").map(|p| p.ty);
        assert_eq!(ty, Some(VecType::scalar(Scalar::U8)));
        let parsed = VecType::parse("i16v16+");
        assert_eq!(
            parsed,
            Some(ParsedVecType {
                ty: VecType::new(Scalar::I16, 16),
                min_bits: true,
            })
        );
    }

    #[test]
    fn test_parse_rejects_bad_names() {
        for name in ["f8", "u12", "f32v5", "f32v", "v4", "x32", "", "f32v04", "u32++"] {
            assert_eq!(VecType::parse(name), None, "{name}");
        }
    }

    #[test]
    fn test_stringify_roundtrips_names() {
        for name in ["u8", "i64v2", "f16v3", "f32v4+", "u32v16"] {
            let parsed = VecType::parse(name).map(|p| p.to_string());
            assert_eq!(parsed.as_deref(), Some(name));
        }
    }

    #[test]
    fn test_storage_size() {
        assert_eq!(VecType::new(Scalar::F32, 3).size_bytes(), 16);
        assert_eq!(VecType::new(Scalar::F32, 4).size_bytes(), 16);
        assert_eq!(VecType::new(Scalar::U8, 2).size_bytes(), 2);
        assert_eq!(VecType::scalar(Scalar::F64).size_bytes(), 8);
    }
}
