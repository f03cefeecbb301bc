//! Generator configuration.

use xcnl_eval::Value;

/// A predefined variable seeded into the root scope.
#[derive(Clone, Debug, PartialEq)]
pub enum Define {
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    Str(String),
}

impl Define {
    pub fn to_value(&self) -> Value {
        match self {
            Define::Bool(b) => Value::Bool(*b),
            Define::Int(v) => Value::Int(*v),
            Define::Uint(v) => Value::Uint(*v),
            Define::Float(v) => Value::Float(*v),
            Define::Str(s) => Value::string(s),
        }
    }
}

impl From<bool> for Define {
    fn from(b: bool) -> Self {
        Define::Bool(b)
    }
}

impl From<i64> for Define {
    fn from(v: i64) -> Self {
        Define::Int(v)
    }
}

impl From<u64> for Define {
    fn from(v: u64) -> Self {
        Define::Uint(v)
    }
}

impl From<f64> for Define {
    fn from(v: f64) -> Self {
        Define::Float(v)
    }
}

impl From<&str> for Define {
    fn from(s: &str) -> Self {
        Define::Str(s.to_string())
    }
}

/// Settings of one generation pass.
#[derive(Clone, Debug)]
pub struct XcnlConfig {
    pub defines: Vec<(String, Define)>,
    /// Raw blocks whose type tag starts with one of these are collected.
    pub prefixes: Vec<String>,
    /// Typed blocks run by the default prepare phase.
    pub prepare_types: Vec<String>,
    /// Typed blocks run after collection.
    pub post_act_types: Vec<String>,
    pub fp16: bool,
    pub fp64: bool,
    /// Allow `GetVecTypeName` on min-bit types such as `u16+`.
    pub allow_min_bits: bool,
    pub max_template_depth: usize,
    pub line_ending: String,
    /// Emit debug messages instead of `oclu_SkipDebug()`.
    pub debug: bool,
}

impl Default for XcnlConfig {
    fn default() -> Self {
        XcnlConfig {
            defines: Vec::new(),
            prefixes: vec!["xcomp.".to_string()],
            prepare_types: vec!["xcomp.Config".to_string(), "xcomp.Struct".to_string()],
            post_act_types: vec!["xcomp.PostAct".to_string()],
            fp16: false,
            fp64: false,
            allow_min_bits: false,
            max_template_depth: 32,
            line_ending: "\n".to_string(),
            debug: false,
        }
    }
}

impl XcnlConfig {
    #[must_use]
    pub fn with_define(mut self, name: &str, value: impl Into<Define>) -> Self {
        self.defines.push((name.to_string(), value.into()));
        self
    }

    #[must_use]
    pub fn with_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.prefixes = prefixes.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_prepare_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.prepare_types = types.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_post_act_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.post_act_types = types.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_fp16(mut self, enabled: bool) -> Self {
        self.fp16 = enabled;
        self
    }

    #[must_use]
    pub fn with_fp64(mut self, enabled: bool) -> Self {
        self.fp64 = enabled;
        self
    }

    #[must_use]
    pub fn with_min_bits(mut self, allowed: bool) -> Self {
        self.allow_min_bits = allowed;
        self
    }

    #[must_use]
    pub fn with_max_template_depth(mut self, depth: usize) -> Self {
        self.max_template_depth = depth;
        self
    }

    #[must_use]
    pub fn with_debug(mut self, enabled: bool) -> Self {
        self.debug = enabled;
        self
    }

    #[must_use]
    pub fn with_line_ending(mut self, eol: &str) -> Self {
        self.line_ending = eol.to_string();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = XcnlConfig::default();
        assert_eq!(config.prefixes, vec!["xcomp."]);
        assert_eq!(config.prepare_types, vec!["xcomp.Config", "xcomp.Struct"]);
        assert_eq!(config.max_template_depth, 32);
        assert_eq!(config.line_ending, "\n");
    }

    #[test]
    fn test_defines_convert_to_values() {
        let config = XcnlConfig::default()
            .with_define("fast", true)
            .with_define("lanes", 4_i64)
            .with_define("scale", 0.5)
            .with_define("tag", "v1");
        let values: Vec<Value> = config.defines.iter().map(|(_, d)| d.to_value()).collect();
        assert_eq!(
            values,
            vec![
                Value::Bool(true),
                Value::Int(4),
                Value::Float(0.5),
                Value::string("v1")
            ]
        );
    }
}
