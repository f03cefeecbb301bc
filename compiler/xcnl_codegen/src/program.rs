//! The generation pipeline.
//!
//! An [`XcnlProgram`] is the parsed input and can be shared between passes.
//! An [`XcnlProgStub`] runs one pass over it:
//!
//! 1. `prepare`: top-level statements, then `xcomp.Config` statements and
//!    `xcomp.Struct` layouts
//! 2. `collect`: raw blocks are classified into output blocks
//! 3. `post_act`: `xcomp.PostAct` statements
//! 4. `generate_output`: prefix, struct, global and instance sections
//!
//! The first error aborts the pass.

use std::rc::Rc;

use tracing::{debug, debug_span, trace};
use xcnl_eval::errors::invalid_argument;
use xcnl_eval::{CustomValue, EvalError, EvalResult, Interpreter};
use xcnl_ir::{Block, ExprArena, FuncCall, Program, ProgramItem, SharedInterner};

use crate::config::XcnlConfig;
use crate::context::XcnlContext;
use crate::errors::GenerateError;
use crate::extension::{registered_generators, ExtensionGenerator, ExtensionHost, XcnlExtension};
use crate::instance::{parse_instance_arg, InstanceContext};
use crate::layout::XcnlStruct;
use crate::output_block::{BlockKind, OutputBlock};
use crate::runtime::{direct_output, output_block_banner, Dispatch};

const STRUCT_TAG: &str = "xcomp.Struct";

/// Annotations consumed by the core; never offered to extensions.
const CORE_METAS: &[&str] = &[
    "If",
    "Skip",
    "xcomp.Replace",
    "xcomp.ReplaceVariable",
    "xcomp.ReplaceFunction",
    "xcomp.PreAssign",
];

/// A parsed program with the extensions attached to it.
pub struct XcnlProgram {
    pub interner: SharedInterner,
    pub program: Program,
    pub file_name: String,
    generators: Vec<ExtensionGenerator>,
}

impl XcnlProgram {
    /// `program` must have been built with `interner`.
    pub fn new(file_name: &str, interner: SharedInterner, program: Program) -> Self {
        XcnlProgram {
            interner,
            program,
            file_name: file_name.to_string(),
            generators: Vec::new(),
        }
    }

    /// Attach a generator used only by passes over this program, after the
    /// globally registered ones.
    #[must_use]
    pub fn with_extension(mut self, generator: ExtensionGenerator) -> Self {
        self.generators.push(generator);
        self
    }
}

/// One generation pass over an [`XcnlProgram`].
pub struct XcnlProgStub {
    program: Rc<XcnlProgram>,
    interp: Interpreter,
    ctx: XcnlContext,
    extensions: Vec<Box<dyn XcnlExtension>>,
    statements_ran: bool,
}

impl XcnlProgStub {
    pub fn new(program: Rc<XcnlProgram>, config: XcnlConfig) -> Self {
        let interner = program.interner.clone();
        let mut interp = Interpreter::new(interner.clone());
        for (name, value) in &config.defines {
            interp.env.define_global(interner.intern(name), value.to_value());
        }
        let ctx = XcnlContext::new(config, interner);
        let extensions: Vec<_> = registered_generators()
            .into_iter()
            .chain(program.generators.iter().copied())
            .filter_map(|generator| generator(&ctx))
            .collect();
        debug!(
            file = %program.file_name,
            extensions = ?extensions.iter().map(|ext| ext.name()).collect::<Vec<_>>(),
            "generation pass created"
        );
        XcnlProgStub {
            program,
            interp,
            ctx,
            extensions,
            statements_ran: false,
        }
    }

    pub fn context(&self) -> &XcnlContext {
        &self.ctx
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interp
    }

    pub fn extensions(&self) -> &[Box<dyn XcnlExtension>] {
        &self.extensions
    }

    /// Run top-level statements (first call only) and the typed blocks
    /// whose tag is in `types`.
    pub fn prepare(&mut self, types: &[&str]) -> Result<(), GenerateError> {
        let program = Rc::clone(&self.program);
        let arena = &program.program.arena;
        let run_statements = !self.statements_ran;
        self.statements_ran = true;
        for item in &program.program.items {
            match item {
                ProgramItem::Statement(stmt) if run_statements => {
                    let mut calls = Dispatch::new(&mut self.ctx, &mut self.extensions);
                    self.interp
                        .exec_statement(arena, stmt, &mut calls)
                        .map_err(|e| GenerateError::in_block("Top-level", &program.file_name, e))?;
                }
                ProgramItem::Block { metas, block } => {
                    let tag = self.interp.name_str(block.type_tag);
                    if types.contains(&tag) {
                        self.run_block(arena, metas, block)?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Run the typed blocks whose tag is in `types`.
    pub fn post_act(&mut self, types: &[&str]) -> Result<(), GenerateError> {
        let program = Rc::clone(&self.program);
        let arena = &program.program.arena;
        for item in &program.program.items {
            if let ProgramItem::Block { metas, block } = item {
                if types.contains(&self.interp.name_str(block.type_tag)) {
                    self.run_block(arena, metas, block)?;
                }
            }
        }
        Ok(())
    }

    fn run_block(
        &mut self,
        arena: &ExprArena,
        metas: &[FuncCall],
        block: &Block,
    ) -> Result<(), GenerateError> {
        let tag = self.interp.name_str(block.type_tag);
        let name = self.interp.name_str(block.name);
        let _span = debug_span!("block", kind = tag, name).entered();
        let result = if tag == STRUCT_TAG {
            self.build_struct(arena, metas, block)
        } else {
            let mut calls = Dispatch::new(&mut self.ctx, &mut self.extensions);
            match self.interp.check_conditions(arena, metas, &mut calls) {
                Ok(true) => self.interp.exec_statements(arena, &block.statements, &mut calls),
                Ok(false) => {
                    trace!("block skipped by condition");
                    Ok(())
                }
                Err(e) => Err(e),
            }
        };
        result.map_err(|e| GenerateError::in_block(block_kind_name(tag), name, e))
    }

    /// Run a struct block in its own frame and register the finished layout.
    fn build_struct(
        &mut self,
        arena: &ExprArena,
        metas: &[FuncCall],
        block: &Block,
    ) -> EvalResult<()> {
        let name = self.interp.name_str(block.name);
        let mut calls = Dispatch::new(&mut self.ctx, &mut self.extensions);
        if !self.interp.check_conditions(arena, metas, &mut calls)? {
            trace!("struct skipped by condition");
            return Ok(());
        }
        calls.ctx.building = Some(XcnlStruct::new(name));
        let result = self
            .interp
            .scoped()
            .exec_statements(arena, &block.statements, &mut calls);
        let building = self.ctx.building.take();
        result?;
        let Some(mut layout) = building else {
            return Ok(());
        };
        layout.fill_field_offsets(self.ctx.structs())?;
        debug!("{}", layout.describe(self.ctx.structs()).trim_end());
        self.ctx.register_struct(layout)
    }

    /// Classify raw blocks whose tag starts with one of `prefixes` and keep
    /// those whose conditions hold.
    pub fn collect(&mut self, prefixes: &[&str]) -> Result<(), GenerateError> {
        let program = Rc::clone(&self.program);
        let arena = &program.program.arena;
        for item in &program.program.items {
            let ProgramItem::RawBlock { metas, block } = item else {
                continue;
            };
            let tag = self.interp.name_str(block.type_tag);
            if !prefixes.iter().any(|prefix| tag.starts_with(prefix)) {
                continue;
            }
            let name = self.interp.name_str(block.name);
            let kind = BlockKind::from_tag(tag);
            if kind == BlockKind::None {
                trace!(tag, name, "raw block of unknown kind skipped");
                continue;
            }
            let wrap = |e: EvalError| GenerateError::in_block(kind.as_str(), name, e);
            let interner = &self.interp.interner;
            let output =
                OutputBlock::new(kind, block.clone(), metas.clone(), arena, interner).map_err(wrap)?;
            let mut calls = Dispatch::new(&mut self.ctx, &mut self.extensions);
            let keep = self
                .interp
                .scoped()
                .check_conditions(arena, &output.metas, &mut calls)
                .map_err(wrap)?;
            if !keep {
                trace!(kind = kind.as_str(), name, "block dropped by condition");
                continue;
            }
            if kind == BlockKind::Template {
                self.ctx.add_template(output).map_err(wrap)?;
            } else {
                self.ctx.output_blocks.push(Rc::new(output));
            }
        }
        Ok(())
    }

    /// Emit every collected block and return the concatenated source.
    pub fn generate_output(&mut self) -> Result<String, GenerateError> {
        let program = Rc::clone(&self.program);
        let arena = &program.program.arena;
        let eol = self.ctx.eol().to_string();
        let blocks = self.ctx.output_blocks.clone();
        let of_kind = |kind: BlockKind| blocks.iter().filter(move |block| block.kind == kind);

        let mut prefixes = String::new();
        for block in of_kind(BlockKind::Prefix) {
            self.emit_block(arena, block, &mut prefixes)?;
        }

        let mut structs = String::new();
        for layout in self.ctx.structs() {
            output_block_banner(&mut structs, BlockKind::Struct, &layout.name, &eol);
            structs.push_str(&layout.stringify(self.ctx.structs(), &eol));
        }
        for block in of_kind(BlockKind::Struct) {
            self.emit_block(arena, block, &mut structs)?;
        }

        let mut globals = String::new();
        for block in of_kind(BlockKind::Global) {
            self.emit_block(arena, block, &mut globals)?;
        }

        let mut instances = String::new();
        for block in of_kind(BlockKind::Instance) {
            self.emit_instance(arena, block, &mut instances)?;
        }

        for extension in &mut self.extensions {
            let mut host = ExtensionHost {
                interp: &mut self.interp,
                ctx: &mut self.ctx,
            };
            extension
                .finish_xcnl(&mut host)
                .map_err(|e| GenerateError::in_block("Extension", extension.name(), e))?;
        }
        self.ctx.patched_blocks.write(&mut prefixes, &eol)?;

        let mut output =
            String::with_capacity(prefixes.len() + structs.len() + globals.len() + instances.len());
        output.push_str(&prefixes);
        output.push_str(&structs);
        output.push_str(&globals);
        output.push_str(&instances);
        Ok(output)
    }

    /// Prepare with the configured types, collect, post-act and emit.
    pub fn generate(&mut self) -> Result<String, GenerateError> {
        let config = self.ctx.config.clone();
        let prepare: Vec<&str> = config.prepare_types.iter().map(String::as_str).collect();
        let prefixes: Vec<&str> = config.prefixes.iter().map(String::as_str).collect();
        let post_act: Vec<&str> = config.post_act_types.iter().map(String::as_str).collect();
        self.prepare(&prepare)?;
        self.collect(&prefixes)?;
        self.post_act(&post_act)?;
        self.generate_output()
    }

    fn emit_block(
        &mut self,
        arena: &ExprArena,
        block: &OutputBlock,
        output: &mut String,
    ) -> Result<(), GenerateError> {
        let name = self.interp.name_str(block.name());
        let _span = debug_span!("block", kind = block.kind.as_str(), name).entered();
        output_block_banner(output, block.kind, name, &self.ctx.config.line_ending);
        let mut calls = Dispatch::new(&mut self.ctx, &mut self.extensions);
        direct_output(&mut self.interp.scoped(), &mut calls, arena, block, output)
            .map_err(|e| GenerateError::in_block(block.kind.as_str(), name, e))
    }

    fn emit_instance(
        &mut self,
        arena: &ExprArena,
        block: &OutputBlock,
        output: &mut String,
    ) -> Result<(), GenerateError> {
        let name = self.interp.name_str(block.name());
        let _span = debug_span!("block", kind = block.kind.as_str(), name).entered();
        self.ctx.instance = Some(InstanceContext::new(name, &self.ctx.interner));
        let result = self.run_instance(arena, block);
        let instance = self.ctx.instance.take();
        result.map_err(|e| GenerateError::in_block(block.kind.as_str(), name, e))?;

        output_block_banner(output, block.kind, name, &self.ctx.config.line_ending);
        if let Some(instance) = instance {
            instance
                .write(output, &self.ctx.config.line_ending)
                .map_err(|e| GenerateError::dependency_in_block(block.kind.as_str(), name, e))?;
        }
        Ok(())
    }

    fn run_instance(&mut self, arena: &ExprArena, block: &OutputBlock) -> EvalResult<()> {
        let mut scoped = self.interp.scoped();
        for extension in &mut self.extensions {
            let mut host = ExtensionHost {
                interp: &mut *scoped,
                ctx: &mut self.ctx,
            };
            extension.begin_instance(&mut host)?;
        }

        let mut calls = Dispatch::new(&mut self.ctx, &mut self.extensions);
        handle_instance_metas(&mut scoped, &mut calls, arena, block)?;
        let mut content = String::new();
        direct_output(&mut scoped, &mut calls, arena, block, &mut content)?;
        if let Some(instance) = self.ctx.instance.as_mut() {
            instance.content = content;
        }

        for extension in &mut self.extensions {
            let mut host = ExtensionHost {
                interp: &mut *scoped,
                ctx: &mut self.ctx,
            };
            extension.finish_instance(&mut host)?;
        }
        Ok(())
    }
}

/// `xcomp.Arg.<Kind>(...)` and `xcomp.Arg(info...)` declare arguments; other
/// annotations are evaluated and offered, in order, to the extensions that
/// claim them.
fn handle_instance_metas(
    interp: &mut Interpreter,
    calls: &mut Dispatch<'_>,
    arena: &ExprArena,
    block: &OutputBlock,
) -> EvalResult<()> {
    for meta in &block.metas {
        let name = interp.name_str(meta.name);
        if CORE_METAS.contains(&name) {
            continue;
        }
        let is_arg = name == "xcomp.Arg" || name.starts_with("xcomp.Arg.");
        if !is_arg
            && !calls
                .extensions
                .iter()
                .any(|extension| extension.claims_instance_meta(name))
        {
            trace!(meta = name, "instance annotation not handled");
            continue;
        }
        let args = interp
            .eval_args(arena, meta, calls)
            .map_err(|e| e.with_span(meta.span))?;
        if let Some(tag) = name.strip_prefix("xcomp.Arg.") {
            let info = parse_instance_arg(name, tag, &args)?;
            calls.ctx.handle_instance_arg(info)?;
            continue;
        }
        if name == "xcomp.Arg" {
            for (index, arg) in args.iter().enumerate() {
                let Some(CustomValue::InstanceArg(info)) = arg.as_custom() else {
                    return Err(invalid_argument(name, index, "InstanceArgInfo", arg.type_name()));
                };
                calls.ctx.handle_instance_arg((**info).clone())?;
            }
            continue;
        }

        let mut handled = false;
        for extension in calls.extensions.iter_mut() {
            if !extension.claims_instance_meta(name) {
                continue;
            }
            let mut host = ExtensionHost {
                interp: &mut *interp,
                ctx: &mut *calls.ctx,
            };
            if extension.instance_meta(&mut host, name, &args)? {
                handled = true;
                break;
            }
        }
        if !handled {
            trace!(meta = name, "instance annotation declined");
        }
    }
    Ok(())
}

fn block_kind_name(tag: &str) -> &'static str {
    match tag {
        STRUCT_TAG => "Struct",
        "xcomp.Config" => "Config",
        "xcomp.PostAct" => "PostAct",
        _ => "Statement",
    }
}
