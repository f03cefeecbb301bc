//! Programmatic assembly of XCNL programs.
//!
//! The top-level block syntax is not parsed here; hosts describe the block
//! structure directly and only statement bodies and annotations go through
//! the expression parser.

use std::rc::Rc;

use xcnl_ir::{
    Block, FuncCall, Program, ProgramItem, RawBlock, SharedInterner, Span, Statement,
};

use crate::error::ParseError;
use crate::parser::Parser;

/// Builds a [`Program`] item by item, sharing one expression arena.
pub struct ProgramBuilder {
    interner: SharedInterner,
    program: Program,
}

impl ProgramBuilder {
    pub fn new(interner: &SharedInterner) -> Self {
        ProgramBuilder {
            interner: interner.clone(),
            program: Program::default(),
        }
    }

    /// Append top-level statements (`a = 1; @If(x) b = 2;`).
    pub fn statements(mut self, source: &str) -> Result<Self, ParseError> {
        let stmts = self.parse_statements(source)?;
        self.program
            .items
            .extend(stmts.into_iter().map(ProgramItem::Statement));
        Ok(self)
    }

    /// Append a typed block whose body is a statement list.
    pub fn block(
        mut self,
        type_tag: &str,
        name: &str,
        metas: &[&str],
        body: &str,
    ) -> Result<Self, ParseError> {
        let metas = self.parse_metas(metas)?;
        let statements = self.parse_statements(body)?;
        let block = Block {
            type_tag: self.interner.intern(type_tag),
            name: self.interner.intern(name),
            statements,
            span: Span::DUMMY,
        };
        self.program.items.push(ProgramItem::Block { metas, block });
        Ok(self)
    }

    /// Append a typed block whose body is kept as raw text.
    pub fn raw_block(
        mut self,
        type_tag: &str,
        name: &str,
        metas: &[&str],
        source: &str,
    ) -> Result<Self, ParseError> {
        let metas = self.parse_metas(metas)?;
        let block = RawBlock {
            type_tag: self.interner.intern(type_tag),
            name: self.interner.intern(name),
            source: Rc::from(source),
            span: Span::DUMMY,
        };
        self.program.items.push(ProgramItem::RawBlock { metas, block });
        Ok(self)
    }

    pub fn finish(self) -> Program {
        self.program
    }

    fn parse_statements(&mut self, source: &str) -> Result<Vec<Statement>, ParseError> {
        let mut parser = Parser::new(source, &mut self.program.arena, &self.interner)?;
        parser.parse_statements()
    }

    /// Each meta is one call, written with or without the leading `@`.
    fn parse_metas(&mut self, metas: &[&str]) -> Result<Vec<FuncCall>, ParseError> {
        metas
            .iter()
            .map(|meta| {
                let text = meta.trim();
                let text = text.strip_prefix('@').unwrap_or(text);
                let mut parser = Parser::new(text, &mut self.program.arena, &self.interner)?;
                let call = parser.parse_call()?;
                parser.finish()?;
                Ok(call)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use xcnl_ir::printer::stringify_call;

    #[test]
    fn test_build_program() -> Result<(), ParseError> {
        let interner = SharedInterner::new();
        let program = ProgramBuilder::new(&interner)
            .statements("scale = 2;")?
            .block("xcomp.Struct", "Pair", &[], "xcomp.Field(\"f32\", \"a\");")?
            .raw_block(
                "xcomp.Global",
                "helpers",
                &["@xcomp.Replace()", "If(scale > 1)"],
                "float twice(float v) { return v * $$!{scale}; }",
            )?
            .finish();

        assert_eq!(program.items.len(), 3);
        assert_eq!(program.items[0].type_tag(), None);

        let ProgramItem::Block { block, .. } = &program.items[1] else {
            panic!("expected a block");
        };
        assert_eq!(interner.lookup(block.name), "Pair");
        assert_eq!(block.statements.len(), 1);

        let ProgramItem::RawBlock { metas, block } = &program.items[2] else {
            panic!("expected a raw block");
        };
        assert_eq!(interner.lookup(block.type_tag), "xcomp.Global");
        let rendered: Vec<String> = metas
            .iter()
            .map(|m| stringify_call(&program.arena, &interner, m))
            .collect();
        assert_eq!(rendered, vec!["xcomp.Replace()", "If(scale > 1)"]);
        Ok(())
    }

    #[test]
    fn test_meta_must_be_a_single_call() {
        let interner = SharedInterner::new();
        let result = ProgramBuilder::new(&interner).raw_block("xcomp.Global", "g", &["If(a) b"], "");
        assert!(result.is_err());
    }
}
