//! Struct field layout.
//!
//! Fields are appended while a `xcomp.Struct` block runs; one
//! [`XcnlStruct::fill_field_offsets`] pass at the end of the block computes
//! offsets, the struct alignment and its size. Afterwards the struct is
//! immutable and can be referenced as a field type by later structs.

use std::fmt::Write as _;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use xcnl_eval::{ArgFlags, EvalError, EvalResult};
use xcnl_ir::{ScalarKind, VecType};

/// Largest element count of one array field.
pub const MAX_ARRAY_COUNT: u32 = u16::MAX as u32;

/// Type of a struct field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldType {
    Vec(VecType),
    /// Index into the table of completed structs.
    Struct(usize),
}

/// One array dimension: extent and the element stride of one step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArrayDim {
    pub extent: u32,
    pub stride: u32,
}

/// Location of a field's dimensions in the struct's shared dimension list.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DimsRange {
    start: u16,
    len: u8,
}

#[derive(Clone, Debug)]
pub struct XcnlField {
    pub ty: FieldType,
    pub name: String,
    pub dims: DimsRange,
    pub offset: u32,
    /// Explicit alignment from `@xcomp.Align(n)`.
    pub align: Option<u32>,
    pub flags: ArgFlags,
    pub extra: Vec<String>,
}

/// A user-defined aggregate.
#[derive(Clone, Debug)]
pub struct XcnlStruct {
    pub name: String,
    pub fields: Vec<XcnlField>,
    pub alignment: u32,
    pub size: u32,
    dims: Vec<ArrayDim>,
    interned_dims: FxHashMap<SmallVec<[u32; 4]>, DimsRange>,
}

/// Field declaration passed to [`XcnlStruct::add_field`].
#[derive(Clone, Debug)]
pub struct FieldDecl<'a> {
    pub ty: FieldType,
    pub name: &'a str,
    pub extents: &'a [u32],
    pub align: Option<u32>,
    pub flags: ArgFlags,
    pub extra: Vec<String>,
}

impl XcnlStruct {
    pub fn new(name: &str) -> Self {
        XcnlStruct {
            name: name.to_string(),
            fields: Vec::new(),
            alignment: 1,
            size: 0,
            dims: Vec::new(),
            interned_dims: FxHashMap::default(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&XcnlField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_dims(&self, field: &XcnlField) -> &[ArrayDim] {
        let start = usize::from(field.dims.start);
        &self.dims[start..start + usize::from(field.dims.len)]
    }

    /// Number of elements of a field; 1 for non-array fields.
    pub fn element_count(&self, field: &XcnlField) -> u32 {
        self.field_dims(field)
            .first()
            .map_or(1, |dim| dim.extent * dim.stride)
    }

    pub fn add_field(&mut self, decl: FieldDecl<'_>) -> EvalResult<usize> {
        if self.field(decl.name).is_some() {
            return Err(EvalError::new(format!(
                "Field [{}] already exists in struct [{}]",
                decl.name, self.name
            )));
        }
        if let Some(align) = decl.align {
            if !align.is_power_of_two() {
                return Err(EvalError::new(format!(
                    "Align of field [{}] must be a power of two, got [{align}]",
                    decl.name
                )));
            }
        }
        let dims = self.intern_dims(decl.name, decl.extents)?;
        self.fields.push(XcnlField {
            ty: decl.ty,
            name: decl.name.to_string(),
            dims,
            offset: 0,
            align: decl.align,
            flags: decl.flags,
            extra: decl.extra,
        });
        Ok(self.fields.len() - 1)
    }

    fn intern_dims(&mut self, field: &str, extents: &[u32]) -> EvalResult<DimsRange> {
        if extents.is_empty() {
            return Ok(DimsRange::default());
        }
        let key: SmallVec<[u32; 4]> = SmallVec::from_slice(extents);
        if let Some(&range) = self.interned_dims.get(&key) {
            return Ok(range);
        }
        let mut strides: SmallVec<[u32; 4]> = SmallVec::with_capacity(extents.len());
        let mut count: u32 = 1;
        for &extent in extents.iter().rev() {
            if extent == 0 {
                return Err(EvalError::new(format!(
                    "Array dimension of field [{field}] must not be zero"
                )));
            }
            strides.push(count);
            count = count
                .checked_mul(extent)
                .filter(|&c| c <= MAX_ARRAY_COUNT)
                .ok_or_else(|| {
                    EvalError::new(format!(
                        "Array of field [{field}] exceeds {MAX_ARRAY_COUNT} elements"
                    ))
                })?;
        }
        strides.reverse();
        let (Ok(start), Ok(len)) = (u16::try_from(self.dims.len()), u8::try_from(extents.len()))
        else {
            return Err(EvalError::new(format!(
                "Too many array dimensions in struct [{}]",
                self.name
            )));
        };
        self.dims.extend(
            extents
                .iter()
                .zip(strides)
                .map(|(&extent, stride)| ArrayDim { extent, stride }),
        );
        let range = DimsRange { start, len };
        self.interned_dims.insert(key, range);
        Ok(range)
    }

    /// Natural alignment and size of one element of `ty`.
    fn element_layout(ty: FieldType, structs: &[XcnlStruct]) -> (u32, u32) {
        match ty {
            FieldType::Vec(vec) => (vec.size_bytes(), vec.size_bytes()),
            FieldType::Struct(idx) => structs
                .get(idx)
                .map_or((1, 0), |s| (s.alignment, s.size)),
        }
    }

    /// Compute every field offset, the alignment and the size.
    ///
    /// Fails without touching the struct when an offset or the size does
    /// not fit in `u32`.
    pub fn fill_field_offsets(&mut self, structs: &[XcnlStruct]) -> EvalResult<()> {
        let mut offsets = Vec::with_capacity(self.fields.len());
        let mut end = 0_u32;
        let mut max_align = 1_u32;
        for field in &self.fields {
            let (natural, elem_size) = Self::element_layout(field.ty, structs);
            let align = field.align.map_or(natural, |a| a.max(natural));
            let offset = round_up(end, align)
                .ok_or_else(|| self.too_large(&field.name))?;
            end = self
                .element_count(field)
                .checked_mul(elem_size)
                .and_then(|bytes| offset.checked_add(bytes))
                .ok_or_else(|| self.too_large(&field.name))?;
            max_align = max_align.max(align);
            offsets.push(offset);
        }
        let size = round_up(end, max_align).ok_or_else(|| {
            EvalError::new(format!(
                "Size of struct [{}] exceeds {} bytes",
                self.name,
                u32::MAX
            ))
        })?;
        for (field, offset) in self.fields.iter_mut().zip(offsets) {
            field.offset = offset;
        }
        self.alignment = max_align;
        self.size = size;
        Ok(())
    }

    #[cold]
    fn too_large(&self, field: &str) -> EvalError {
        EvalError::new(format!(
            "Field [{field}] of struct [{}] lies beyond {} bytes",
            self.name,
            u32::MAX
        ))
    }

    fn type_name(ty: FieldType, structs: &[XcnlStruct]) -> String {
        match ty {
            FieldType::Vec(vec) => vec.to_string(),
            FieldType::Struct(idx) => structs
                .get(idx)
                .map_or_else(|| format!("struct#{idx}"), |s| s.name.clone()),
        }
    }

    fn dims_suffix(&self, field: &XcnlField) -> String {
        self.field_dims(field)
            .iter()
            .fold(String::new(), |mut acc, dim| {
                let _ = write!(acc, "[{}]", dim.extent);
                acc
            })
    }

    /// `[offset] type name[dim]...`, one line per field.
    pub fn describe(&self, structs: &[XcnlStruct]) -> String {
        let mut out = format!(
            "struct {} (size {}, align {})\n",
            self.name, self.size, self.alignment
        );
        for field in &self.fields {
            let _ = writeln!(
                out,
                "[{}] {} {}{}",
                field.offset,
                Self::type_name(field.ty, structs),
                field.name,
                self.dims_suffix(field)
            );
        }
        out
    }

    /// C-like declaration. Padding members are emitted where an explicit
    /// alignment moves a field past its natural position.
    pub fn stringify(&self, structs: &[XcnlStruct], eol: &str) -> String {
        let mut out = String::new();
        let _ = write!(out, "typedef struct {}{eol}{{{eol}", self.name);
        let mut end = 0_u32;
        let mut natural_align = 1_u32;
        for (idx, field) in self.fields.iter().enumerate() {
            let (natural, elem_size) = Self::element_layout(field.ty, structs);
            natural_align = natural_align.max(natural);
            if field.offset > round_up(end, natural).unwrap_or(u32::MAX) {
                let _ = write!(
                    out,
                    "    /* {end:>5} */ uchar _pad{idx}[{}];{eol}",
                    field.offset - end
                );
            }
            let ty = match field.ty {
                FieldType::Vec(vec) => vec_type_name(vec),
                FieldType::Struct(_) => Self::type_name(field.ty, structs),
            };
            let _ = write!(
                out,
                "    /* {:>5} */ {ty} {}{};{eol}",
                field.offset,
                field.name,
                self.dims_suffix(field)
            );
            end = field.offset + self.element_count(field) * elem_size;
        }
        if self.size > round_up(end, natural_align).unwrap_or(u32::MAX) {
            let _ = write!(
                out,
                "    /* {end:>5} */ uchar _pad_tail[{}];{eol}",
                self.size - end
            );
        }
        out.push('}');
        if self.alignment > natural_align {
            let _ = write!(out, " __attribute__((aligned({})))", self.alignment);
        }
        let _ = write!(out, " {};{eol}", self.name);
        out
    }
}

#[inline]
fn round_up(value: u32, align: u32) -> Option<u32> {
    value.checked_next_multiple_of(align.max(1))
}

/// OpenCL spelling of a vector type: `float4`, `uchar`, `half2`, ...
pub fn vec_type_name(ty: VecType) -> String {
    let base = match (ty.scalar.kind, ty.scalar.bits) {
        (ScalarKind::Uint, 8) => "uchar",
        (ScalarKind::Uint, 16) => "ushort",
        (ScalarKind::Uint, 32) => "uint",
        (ScalarKind::Uint, _) => "ulong",
        (ScalarKind::Sint, 8) => "char",
        (ScalarKind::Sint, 16) => "short",
        (ScalarKind::Sint, 32) => "int",
        (ScalarKind::Sint, _) => "long",
        (ScalarKind::Float, 16) => "half",
        (ScalarKind::Float, 32) => "float",
        (ScalarKind::Float, _) => "double",
    };
    if ty.dim == 1 {
        base.to_string()
    } else {
        format!("{base}{}", ty.dim)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests unwrap layout results")]
mod tests;
