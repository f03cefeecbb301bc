//! Kernel argument descriptors (`xcomp.Arg.*` / `xcomp.ArgInfo.*`).

use std::fmt;

use bitflags::bitflags;

bitflags! {
    /// Access qualifiers of a kernel argument.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ArgFlags: u8 {
        const READ = 0x1;
        const WRITE = 0x2;
        const RESTRICT = 0x4;
    }
}

impl ArgFlags {
    pub const READ_WRITE: Self = Self::READ.union(Self::WRITE);

    /// Qualifier keyword for a reserved extra argument.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "read" => Some(Self::READ),
            "write" => Some(Self::WRITE),
            "restrict" => Some(Self::RESTRICT),
            _ => None,
        }
    }
}

impl fmt::Display for ArgFlags {
    /// `read|write|restrict` subset, `none` when empty.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        let mut first = true;
        for (flag, name) in [
            (Self::READ, "read"),
            (Self::WRITE, "write"),
            (Self::RESTRICT, "restrict"),
        ] {
            if self.contains(flag) {
                if !first {
                    f.write_str("|")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// What kind of resource an argument binds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArgKind {
    RawBuf,
    TypedBuf,
    Simple,
    Texture,
}

impl ArgKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            ArgKind::RawBuf => "RawBuf",
            ArgKind::TypedBuf => "TypedBuf",
            ArgKind::Simple => "Simple",
            ArgKind::Texture => "Texture",
        }
    }
}

/// Texture dimensionality; `Empty` for non-texture arguments.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TexKind {
    #[default]
    Empty,
    Tex1D,
    Tex2D,
    Tex3D,
    Tex1DArray,
    Tex2DArray,
}

impl TexKind {
    /// Parse the texture kind tag used in `xcomp.Arg.Tex(kind, ...)`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "1D" => Some(TexKind::Tex1D),
            "2D" => Some(TexKind::Tex2D),
            "3D" => Some(TexKind::Tex3D),
            "1DArray" => Some(TexKind::Tex1DArray),
            "2DArray" => Some(TexKind::Tex2DArray),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            TexKind::Empty => "",
            TexKind::Tex1D => "Tex1D",
            TexKind::Tex2D => "Tex2D",
            TexKind::Tex3D => "Tex3D",
            TexKind::Tex1DArray => "Tex1DArray",
            TexKind::Tex2DArray => "Tex2DArray",
        }
    }
}

/// A parsed kernel argument description.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstanceArgInfo {
    pub kind: ArgKind,
    pub tex_kind: TexKind,
    pub name: String,
    pub data_type: String,
    pub flags: ArgFlags,
    /// Free-form qualifiers other than the reserved flag keywords.
    pub extra: Vec<String>,
}

impl fmt::Display for InstanceArgInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind.as_str())?;
        if self.tex_kind != TexKind::Empty {
            write!(f, "<{}>", self.tex_kind.as_str())?;
        }
        write!(f, " {} {} [{}]", self.data_type, self.name, self.flags)?;
        for extra in &self.extra {
            write!(f, " {extra}")?;
        }
        Ok(())
    }
}
