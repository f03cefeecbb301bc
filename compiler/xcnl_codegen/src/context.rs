//! Generation state shared by the pipeline, the builtins and extensions.

use std::rc::Rc;

use rustc_hash::FxHashMap;
use tracing::warn;
use xcnl_eval::{EvalError, EvalResult, InstanceArgInfo};
use xcnl_ir::{Name, Scalar, SharedInterner, VecType};

use crate::config::XcnlConfig;
use crate::errors::DependencyError;
use crate::instance::InstanceContext;
use crate::layout::{self, XcnlStruct};
use crate::named_text::NamedTextHolder;
use crate::output_block::OutputBlock;

/// Everything generation accumulates besides variables.
#[derive(Debug)]
pub struct XcnlContext {
    pub config: XcnlConfig,
    pub interner: SharedInterner,
    structs: Vec<XcnlStruct>,
    struct_index: FxHashMap<String, usize>,
    /// Struct whose block is currently running.
    pub(crate) building: Option<XcnlStruct>,
    templates: FxHashMap<Name, Rc<OutputBlock>>,
    pub(crate) output_blocks: Vec<Rc<OutputBlock>>,
    pub(crate) patched_blocks: NamedTextHolder,
    /// Instance whose block is currently being generated.
    pub(crate) instance: Option<InstanceContext>,
    pub(crate) template_depth: usize,
}

impl XcnlContext {
    pub fn new(config: XcnlConfig, interner: SharedInterner) -> Self {
        XcnlContext {
            patched_blocks: NamedTextHolder::new(interner.clone()),
            config,
            interner,
            structs: Vec::new(),
            struct_index: FxHashMap::default(),
            building: None,
            templates: FxHashMap::default(),
            output_blocks: Vec::new(),
            instance: None,
            template_depth: 0,
        }
    }

    #[inline]
    pub fn eol(&self) -> &str {
        &self.config.line_ending
    }

    /// Completed structs in declaration order.
    pub fn structs(&self) -> &[XcnlStruct] {
        &self.structs
    }

    pub fn find_struct(&self, name: &str) -> Option<usize> {
        self.struct_index.get(name).copied()
    }

    pub(crate) fn register_struct(&mut self, s: XcnlStruct) -> EvalResult<()> {
        if self.find_struct(&s.name).is_some() {
            return Err(EvalError::new(format!("Struct [{}] already defined", s.name)));
        }
        self.struct_index.insert(s.name.clone(), self.structs.len());
        self.structs.push(s);
        Ok(())
    }

    /// Collected output blocks other than templates, in program order.
    pub fn output_blocks(&self) -> &[Rc<OutputBlock>] {
        &self.output_blocks
    }

    pub fn find_template(&self, name: &str) -> Option<Rc<OutputBlock>> {
        let name = self.interner.get(name)?;
        self.templates.get(&name).cloned()
    }

    pub(crate) fn add_template(&mut self, block: OutputBlock) -> EvalResult<()> {
        let name = block.name();
        if self.templates.contains_key(&name) {
            return Err(EvalError::new(format!(
                "Template [{}] already defined",
                self.interner.lookup(name)
            )));
        }
        self.templates.insert(name, Rc::new(block));
        Ok(())
    }

    pub fn instance(&self) -> Option<&InstanceContext> {
        self.instance.as_ref()
    }

    pub fn instance_mut(&mut self) -> Option<&mut InstanceContext> {
        self.instance.as_mut()
    }

    /// Record an argument on the instance being generated.
    pub fn handle_instance_arg(&mut self, info: InstanceArgInfo) -> EvalResult<()> {
        match self.instance.as_mut() {
            Some(instance) => instance.add_arg(info),
            None => Err(EvalError::new(format!(
                "Argument [{}] declared outside of an instance",
                info.name
            ))),
        }
    }

    /// Queue a block for the prefix section unless `id` was already added.
    pub fn add_patched_block(
        &mut self,
        id: &str,
        content: String,
        deps: &[&str],
    ) -> Result<bool, DependencyError> {
        self.patched_blocks.add(id, content, deps)
    }

    /// Target spelling of the vector type `type_name`. Struct names and
    /// unknown descriptors are rejected, as are min-bit types unless the
    /// configuration allows them.
    pub fn vec_type_name(&self, type_name: &str, reason: &str) -> EvalResult<String> {
        if self.find_struct(type_name).is_some() {
            return Err(EvalError::new(format!(
                "Type [{type_name}] is a struct, not a VecType when {reason}"
            )));
        }
        let parsed = VecType::parse(type_name).ok_or_else(|| {
            EvalError::new(format!(
                "Type [{type_name}] not recognized as VecType when {reason}"
            ))
        })?;
        if parsed.min_bits && !self.config.allow_min_bits {
            return Err(EvalError::new(format!(
                "Type [{type_name}] is a min-bits type, not allowed when {reason}"
            )));
        }
        let scalar = parsed.ty.scalar;
        if (scalar == Scalar::F16 && !self.config.fp16)
            || (scalar == Scalar::F64 && !self.config.fp64)
        {
            warn!(target: "xcnl", "Potential use of unsupported type[{type_name}] with [{reason}].");
        }
        Ok(layout::vec_type_name(parsed.ty))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests unwrap lookups")]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn context(config: XcnlConfig) -> XcnlContext {
        XcnlContext::new(config, SharedInterner::new())
    }

    #[test]
    fn test_vec_type_name() {
        let ctx = context(XcnlConfig::default());
        assert_eq!(ctx.vec_type_name("f32v4", "test").unwrap(), "float4");
        assert_eq!(ctx.vec_type_name("i8", "test").unwrap(), "char");
        // Unsupported precision only warns.
        assert_eq!(ctx.vec_type_name("f64v2", "test").unwrap(), "double2");

        let err = ctx.vec_type_name("float", "test").unwrap_err();
        assert_eq!(err.message, "Type [float] not recognized as VecType when test");
    }

    #[test]
    fn test_min_bits_needs_opt_in() {
        let ctx = context(XcnlConfig::default());
        assert!(ctx.vec_type_name("u16+", "test").is_err());
        let ctx = context(XcnlConfig::default().with_min_bits(true));
        assert_eq!(ctx.vec_type_name("u16v2+", "test").unwrap(), "ushort2");
    }

    #[test]
    fn test_struct_names_are_not_vec_types() {
        let mut ctx = context(XcnlConfig::default());
        ctx.register_struct(XcnlStruct::new("u8")).unwrap();
        assert!(ctx.vec_type_name("u8", "test").is_err());
        assert!(ctx.register_struct(XcnlStruct::new("u8")).is_err());
    }
}
