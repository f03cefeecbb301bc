//! Recursive-descent parser for expressions, statements and annotations.
//!
//! Grammar (informal):
//!
//! ```text
//! statement  := meta* (target '=' expr | expr) ';'
//! meta       := '@' call
//! expr       := unary (binop unary)*          -- precedence climbing
//! unary      := ('-' | '!' | '~') unary | postfix
//! postfix    := primary ('.' ident | '[' expr ']')*
//! primary    := literal | '(' expr ')' | ':' ident | path | call
//! call       := ident ('.' ident)* '(' (expr (',' expr)*)? ')'
//! ```
//!
//! A dotted path followed by `(` is one call with the full dotted name
//! (`xcomp.Arg.Buf(...)`); otherwise the first segment is a variable and the
//! rest are field accesses.

use xcnl_ir::{
    AssignTarget, BinaryOp, Expr, ExprArena, ExprId, ExprKind, FuncCall, Span, Statement,
    StmtKind, StringInterner, SubQuery, UnaryOp, VarRef,
};

use crate::error::{ParseError, ParseErrorKind};
use crate::lexer::{lex, Token, TokenKind};

/// Maximum nesting of parenthesized/unary/call expressions.
const MAX_NESTING: usize = 256;

pub struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    arena: &'a mut ExprArena,
    interner: &'a StringInterner,
}

impl<'a> Parser<'a> {
    pub fn new(
        source: &str,
        arena: &'a mut ExprArena,
        interner: &'a StringInterner,
    ) -> Result<Self, ParseError> {
        Ok(Parser {
            tokens: lex(source, interner)?,
            pos: 0,
            depth: 0,
            arena,
            interner,
        })
    }

    #[inline]
    fn current(&self) -> Token {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .copied()
            .unwrap_or(Token {
                kind: TokenKind::Eof,
                span: Span::DUMMY,
            })
    }

    #[inline]
    fn peek(&self) -> TokenKind {
        self.current().kind
    }

    #[inline]
    fn advance(&mut self) -> Token {
        let token = self.current();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek() == kind
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, expected: &'static str) -> Result<Token, ParseError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            let found = self.current();
            Err(ParseError::unexpected(expected, found.kind.describe(), found.span))
        }
    }

    fn expect_ident(&mut self) -> Result<(xcnl_ir::Name, Span), ParseError> {
        let token = self.current();
        if let TokenKind::Ident(name) = token.kind {
            self.advance();
            Ok((name, token.span))
        } else {
            Err(ParseError::unexpected(
                "identifier",
                token.kind.describe(),
                token.span,
            ))
        }
    }

    pub fn at_end(&self) -> bool {
        self.check(TokenKind::Eof)
    }

    /// Fail unless all input was consumed.
    pub fn finish(&self) -> Result<(), ParseError> {
        if self.at_end() {
            Ok(())
        } else {
            Err(ParseError::new(
                ParseErrorKind::TrailingInput,
                self.current().span,
            ))
        }
    }

    fn nested<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        if self.depth >= MAX_NESTING {
            return Err(ParseError::new(
                ParseErrorKind::TooDeep { limit: MAX_NESTING },
                self.current().span,
            ));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn alloc(&mut self, kind: ExprKind, span: Span) -> ExprId {
        self.arena.alloc_expr(Expr::new(kind, span))
    }

    /// Parse one expression.
    pub fn parse_expr(&mut self) -> Result<ExprId, ParseError> {
        self.parse_binary(0)
    }

    fn parse_binary(&mut self, min_prec: u8) -> Result<ExprId, ParseError> {
        let mut left = self.parse_unary()?;
        while let Some(op) = binary_op(self.peek()) {
            let prec = op.precedence();
            if prec <= min_prec {
                break;
            }
            self.advance();
            let right = self.nested(|p| p.parse_binary(prec))?;
            let span = self
                .arena
                .get_expr(left)
                .span
                .merge(self.arena.get_expr(right).span);
            left = self.alloc(ExprKind::Binary { op, left, right }, span);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<ExprId, ParseError> {
        let op = match self.peek() {
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Bang => UnaryOp::Not,
            TokenKind::Tilde => UnaryOp::BitNot,
            _ => return self.parse_postfix(),
        };
        let start = self.advance().span;
        let operand = self.nested(Self::parse_unary)?;
        let span = start.merge(self.arena.get_expr(operand).span);
        // Fold negative literals so `-1` stays a literal.
        if op == UnaryOp::Neg {
            match *self.arena.kind(operand) {
                ExprKind::Int(v) => return Ok(self.alloc(ExprKind::Int(v.wrapping_neg()), span)),
                ExprKind::Float(bits) => {
                    let v = -f64::from_bits(bits);
                    return Ok(self.alloc(ExprKind::Float(v.to_bits()), span));
                }
                _ => {}
            }
        }
        Ok(self.alloc(ExprKind::Unary { op, operand }, span))
    }

    fn parse_postfix(&mut self) -> Result<ExprId, ParseError> {
        let mut expr = self.parse_primary()?;
        loop {
            let start = self.arena.get_expr(expr).span;
            if self.eat(TokenKind::Dot) {
                let (field, span) = self.expect_ident()?;
                expr = self.alloc(
                    ExprKind::Field {
                        receiver: expr,
                        field,
                    },
                    start.merge(span),
                );
            } else if self.eat(TokenKind::LBracket) {
                let index = self.nested(Self::parse_expr)?;
                let end = self.expect(TokenKind::RBracket, "`]`")?.span;
                expr = self.alloc(
                    ExprKind::Index {
                        receiver: expr,
                        index,
                    },
                    start.merge(end),
                );
            } else {
                return Ok(expr);
            }
        }
    }

    fn parse_primary(&mut self) -> Result<ExprId, ParseError> {
        let token = self.current();
        match token.kind {
            TokenKind::Int(v) => {
                self.advance();
                Ok(self.alloc(ExprKind::Int(v), token.span))
            }
            TokenKind::Uint(v) => {
                self.advance();
                Ok(self.alloc(ExprKind::Uint(v), token.span))
            }
            TokenKind::Float(bits) => {
                self.advance();
                Ok(self.alloc(ExprKind::Float(bits), token.span))
            }
            TokenKind::Str(name) => {
                self.advance();
                Ok(self.alloc(ExprKind::Str(name), token.span))
            }
            TokenKind::True | TokenKind::False => {
                self.advance();
                Ok(self.alloc(
                    ExprKind::Bool(token.kind == TokenKind::True),
                    token.span,
                ))
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.nested(Self::parse_expr)?;
                self.expect(TokenKind::RParen, "`)`")?;
                Ok(inner)
            }
            TokenKind::Colon => {
                self.advance();
                let (name, span) = self.expect_ident()?;
                Ok(self.alloc(ExprKind::Var(VarRef::local(name)), token.span.merge(span)))
            }
            TokenKind::Ident(_) => self.parse_path(),
            other => Err(ParseError::unexpected(
                "expression",
                other.describe(),
                token.span,
            )),
        }
    }

    /// `a.b.c(...)` is a call named `a.b.c`; `a.b.c` is var `a` with fields.
    fn parse_path(&mut self) -> Result<ExprId, ParseError> {
        let start = self.pos;
        let (first, first_span) = self.expect_ident()?;
        let mut segments = vec![first];
        while self.check(TokenKind::Dot)
            && matches!(
                self.tokens.get(self.pos + 1).map(|t| t.kind),
                Some(TokenKind::Ident(_))
            )
        {
            self.advance();
            let (seg, _) = self.expect_ident()?;
            segments.push(seg);
        }

        if self.check(TokenKind::LParen) {
            let name = if segments.len() == 1 {
                first
            } else {
                let joined: Vec<&str> = segments.iter().map(|&s| self.interner.lookup(s)).collect();
                self.interner.intern(&joined.join("."))
            };
            let call = self.parse_call_rest(name, first_span)?;
            return Ok(self.alloc(ExprKind::Call(call), call.span));
        }

        // Not a call: rewind and let postfix parsing build the field chain.
        self.pos = start + 1;
        Ok(self.alloc(ExprKind::Var(VarRef::new(first)), first_span))
    }

    /// Parse `( args )` after a call name.
    fn parse_call_rest(
        &mut self,
        name: xcnl_ir::Name,
        start: Span,
    ) -> Result<FuncCall, ParseError> {
        self.expect(TokenKind::LParen, "`(`")?;
        let mut args = Vec::new();
        if !self.check(TokenKind::RParen) {
            loop {
                args.push(self.nested(Self::parse_expr)?);
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        let end = self.expect(TokenKind::RParen, "`)`")?.span;
        if args.len() > usize::from(u16::MAX) {
            return Err(ParseError::new(ParseErrorKind::TooManyArgs, start.merge(end)));
        }
        let args = self.arena.alloc_expr_list(args);
        Ok(FuncCall {
            name,
            args,
            span: start.merge(end),
        })
    }

    /// Parse a call such as `xcomp.Replace()` (used for annotations).
    pub fn parse_call(&mut self) -> Result<FuncCall, ParseError> {
        let (first, start) = self.expect_ident()?;
        let mut name = first;
        if self.check(TokenKind::Dot) {
            let mut full = self.interner.lookup(first).to_string();
            while self.eat(TokenKind::Dot) {
                let (seg, _) = self.expect_ident()?;
                full.push('.');
                full.push_str(self.interner.lookup(seg));
            }
            name = self.interner.intern(&full);
        }
        self.parse_call_rest(name, start)
    }

    /// Parse `@call` annotations until something else shows up.
    pub fn parse_metas(&mut self) -> Result<Vec<FuncCall>, ParseError> {
        let mut metas = Vec::new();
        while self.eat(TokenKind::At) {
            metas.push(self.parse_call()?);
        }
        Ok(metas)
    }

    /// Parse one statement, including its annotations and the closing `;`.
    ///
    /// The `;` may be omitted on the last statement of the input.
    pub fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        let metas = self.parse_metas()?;
        let start = self.current().span;
        let expr = self.parse_expr()?;
        let kind = if self.eat(TokenKind::Eq) {
            let target = self.to_assign_target(expr)?;
            let value = self.parse_expr()?;
            StmtKind::Assign { target, value }
        } else {
            StmtKind::Expr(expr)
        };
        let mut end = self.tokens[self.pos.saturating_sub(1)].span;
        if !self.at_end() {
            end = self.expect(TokenKind::Semicolon, "`;`")?.span;
        }
        Ok(Statement {
            kind,
            metas,
            span: start.merge(end),
        })
    }

    /// Parse statements until the end of input.
    pub fn parse_statements(&mut self) -> Result<Vec<Statement>, ParseError> {
        let mut statements = Vec::new();
        while !self.at_end() {
            if self.eat(TokenKind::Semicolon) {
                continue;
            }
            statements.push(self.parse_statement()?);
        }
        Ok(statements)
    }

    fn to_assign_target(&self, expr: ExprId) -> Result<AssignTarget, ParseError> {
        let mut path = Vec::new();
        let mut cur = expr;
        loop {
            match *self.arena.kind(cur) {
                ExprKind::Var(var) => {
                    path.reverse();
                    return Ok(AssignTarget { var, path });
                }
                ExprKind::Field { receiver, field } => {
                    path.push(SubQuery::Field(field));
                    cur = receiver;
                }
                ExprKind::Index { receiver, index } => {
                    path.push(SubQuery::Index(index));
                    cur = receiver;
                }
                _ => {
                    return Err(ParseError::new(
                        ParseErrorKind::InvalidAssignTarget,
                        self.arena.get_expr(expr).span,
                    ))
                }
            }
        }
    }
}

fn binary_op(kind: TokenKind) -> Option<BinaryOp> {
    let op = match kind {
        TokenKind::Plus => BinaryOp::Add,
        TokenKind::Minus => BinaryOp::Sub,
        TokenKind::Star => BinaryOp::Mul,
        TokenKind::Slash => BinaryOp::Div,
        TokenKind::Percent => BinaryOp::Mod,
        TokenKind::EqEq => BinaryOp::Eq,
        TokenKind::NotEq => BinaryOp::NotEq,
        TokenKind::Lt => BinaryOp::Lt,
        TokenKind::LtEq => BinaryOp::LtEq,
        TokenKind::Gt => BinaryOp::Gt,
        TokenKind::GtEq => BinaryOp::GtEq,
        TokenKind::AmpAmp => BinaryOp::And,
        TokenKind::PipePipe => BinaryOp::Or,
        TokenKind::Amp => BinaryOp::BitAnd,
        TokenKind::Pipe => BinaryOp::BitOr,
        TokenKind::Caret => BinaryOp::BitXor,
        TokenKind::Shl => BinaryOp::Shl,
        TokenKind::Shr => BinaryOp::Shr,
        _ => return None,
    };
    Some(op)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests unwrap parse results")]
mod tests;
