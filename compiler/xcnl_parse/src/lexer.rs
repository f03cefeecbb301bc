//! Lexer for XCNL expressions and statements using logos.
//!
//! Identifiers and string literals are interned as they are produced.
//! Whitespace and `//` comments are skipped.

use logos::Logos;
use xcnl_ir::{Name, Span, StringInterner};

use crate::error::{ParseError, ParseErrorKind};

/// Raw token from logos (before interning).
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
#[logos(skip r"//[^\n]*")]
enum RawToken {
    #[token("true")]
    True,
    #[token("false")]
    False,

    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(",")]
    Comma,
    #[token(";")]
    Semicolon,
    #[token(".")]
    Dot,
    #[token("@")]
    At,
    #[token(":")]
    Colon,

    #[token("==")]
    EqEq,
    #[token("=")]
    Eq,
    #[token("!=")]
    NotEq,
    #[token("<<")]
    Shl,
    #[token("<=")]
    LtEq,
    #[token("<")]
    Lt,
    #[token(">>")]
    Shr,
    #[token(">=")]
    GtEq,
    #[token(">")]
    Gt,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("!")]
    Bang,
    #[token("~")]
    Tilde,
    #[token("&&")]
    AmpAmp,
    #[token("&")]
    Amp,
    #[token("||")]
    PipePipe,
    #[token("|")]
    Pipe,
    #[token("^")]
    Caret,

    #[regex(r"0x[0-9a-fA-F][0-9a-fA-F_]*u?")]
    HexInt,
    #[regex(r"[0-9][0-9_]*u?")]
    Int,
    #[regex(r"[0-9][0-9_]*\.[0-9][0-9_]*([eE][+-]?[0-9]+)?")]
    Float,
    #[regex(r#""([^"\\]|\\.)*""#)]
    String,
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Ident,
}

/// Token kinds seen by the parser.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TokenKind {
    Int(i64),
    Uint(u64),
    /// Float literal bits.
    Float(u64),
    Str(Name),
    Ident(Name),
    True,
    False,

    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Semicolon,
    Dot,
    At,
    Colon,

    Eq,
    EqEq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Shl,
    Shr,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    Tilde,
    AmpAmp,
    Amp,
    PipePipe,
    Pipe,
    Caret,

    Eof,
}

impl TokenKind {
    /// Human-readable description used in "expected X, found Y" errors.
    pub fn describe(&self) -> &'static str {
        match self {
            TokenKind::Int(_) | TokenKind::Uint(_) => "integer literal",
            TokenKind::Float(_) => "float literal",
            TokenKind::Str(_) => "string literal",
            TokenKind::Ident(_) => "identifier",
            TokenKind::True | TokenKind::False => "boolean literal",
            TokenKind::LParen => "`(`",
            TokenKind::RParen => "`)`",
            TokenKind::LBracket => "`[`",
            TokenKind::RBracket => "`]`",
            TokenKind::Comma => "`,`",
            TokenKind::Semicolon => "`;`",
            TokenKind::Dot => "`.`",
            TokenKind::At => "`@`",
            TokenKind::Colon => "`:`",
            TokenKind::Eq => "`=`",
            TokenKind::Eof => "end of input",
            _ => "operator",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

/// Lex the whole source into tokens, ending with `Eof`.
pub fn lex(source: &str, interner: &StringInterner) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::with_capacity(source.len() / 3 + 1);
    let mut logos = RawToken::lexer(source);
    while let Some(result) = logos.next() {
        let span = Span::from_range(logos.span());
        let slice = logos.slice();
        let Ok(raw) = result else {
            return Err(ParseError::new(
                ParseErrorKind::InvalidCharacter(slice.chars().next().unwrap_or('\0')),
                span,
            ));
        };
        let kind = convert_token(raw, slice, interner)
            .ok_or_else(|| ParseError::new(ParseErrorKind::InvalidLiteral(slice.to_string()), span))?;
        tokens.push(Token { kind, span });
    }
    let end = u32::try_from(source.len()).unwrap_or(u32::MAX);
    tokens.push(Token {
        kind: TokenKind::Eof,
        span: Span::new(end, end),
    });
    Ok(tokens)
}

fn convert_token(raw: RawToken, slice: &str, interner: &StringInterner) -> Option<TokenKind> {
    let kind = match raw {
        RawToken::Int => parse_int(slice, 10)?,
        RawToken::HexInt => parse_int(&slice[2..], 16)?,
        RawToken::Float => {
            let v: f64 = slice.replace('_', "").parse().ok()?;
            TokenKind::Float(v.to_bits())
        }
        RawToken::String => {
            let content = &slice[1..slice.len() - 1];
            TokenKind::Str(interner.intern(&unescape_string(content)))
        }
        RawToken::Ident => TokenKind::Ident(interner.intern(slice)),
        RawToken::True => TokenKind::True,
        RawToken::False => TokenKind::False,
        RawToken::LParen => TokenKind::LParen,
        RawToken::RParen => TokenKind::RParen,
        RawToken::LBracket => TokenKind::LBracket,
        RawToken::RBracket => TokenKind::RBracket,
        RawToken::Comma => TokenKind::Comma,
        RawToken::Semicolon => TokenKind::Semicolon,
        RawToken::Dot => TokenKind::Dot,
        RawToken::At => TokenKind::At,
        RawToken::Colon => TokenKind::Colon,
        RawToken::EqEq => TokenKind::EqEq,
        RawToken::Eq => TokenKind::Eq,
        RawToken::NotEq => TokenKind::NotEq,
        RawToken::Shl => TokenKind::Shl,
        RawToken::LtEq => TokenKind::LtEq,
        RawToken::Lt => TokenKind::Lt,
        RawToken::Shr => TokenKind::Shr,
        RawToken::GtEq => TokenKind::GtEq,
        RawToken::Gt => TokenKind::Gt,
        RawToken::Plus => TokenKind::Plus,
        RawToken::Minus => TokenKind::Minus,
        RawToken::Star => TokenKind::Star,
        RawToken::Slash => TokenKind::Slash,
        RawToken::Percent => TokenKind::Percent,
        RawToken::Bang => TokenKind::Bang,
        RawToken::Tilde => TokenKind::Tilde,
        RawToken::AmpAmp => TokenKind::AmpAmp,
        RawToken::Amp => TokenKind::Amp,
        RawToken::PipePipe => TokenKind::PipePipe,
        RawToken::Pipe => TokenKind::Pipe,
        RawToken::Caret => TokenKind::Caret,
    };
    Some(kind)
}

/// Integer literal; a `u` suffix makes it unsigned.
fn parse_int(digits: &str, radix: u32) -> Option<TokenKind> {
    let (digits, unsigned) = match digits.strip_suffix('u') {
        Some(d) => (d, true),
        None => (digits, false),
    };
    let digits = digits.replace('_', "");
    if unsigned {
        u64::from_str_radix(&digits, radix).ok().map(TokenKind::Uint)
    } else {
        i64::from_str_radix(&digits, radix).ok().map(TokenKind::Int)
    }
}

fn unescape_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => result.push('\n'),
                Some('t') => result.push('\t'),
                Some('r') => result.push('\r'),
                Some('0') => result.push('\0'),
                Some(other) => result.push(other),
                None => result.push('\\'),
            }
        } else {
            result.push(c);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(source: &str, interner: &StringInterner) -> Vec<TokenKind> {
        lex(source, interner)
            .map(|tokens| tokens.into_iter().map(|t| t.kind).collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_lex_call_statement() {
        let interner = StringInterner::new();
        let field = interner.intern("xcomp");
        let name = interner.intern("Field");
        let ty = interner.intern("f32");
        assert_eq!(
            kinds(r#"xcomp.Field("f32", 4u); // trailing"#, &interner),
            vec![
                TokenKind::Ident(field),
                TokenKind::Dot,
                TokenKind::Ident(name),
                TokenKind::LParen,
                TokenKind::Str(ty),
                TokenKind::Comma,
                TokenKind::Uint(4),
                TokenKind::RParen,
                TokenKind::Semicolon,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_lex_numbers() {
        let interner = StringInterner::new();
        assert_eq!(
            kinds("0x1F 1_000 2.5", &interner),
            vec![
                TokenKind::Int(31),
                TokenKind::Int(1000),
                TokenKind::Float(2.5f64.to_bits()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_lex_keywords_vs_idents() {
        let interner = StringInterner::new();
        let truthy = interner.intern("trueish");
        assert_eq!(
            kinds("true trueish", &interner),
            vec![TokenKind::True, TokenKind::Ident(truthy), TokenKind::Eof]
        );
    }

    #[test]
    fn test_lex_string_escapes() {
        let interner = StringInterner::new();
        let tokens = kinds(r#""a\"b\n""#, &interner);
        let TokenKind::Str(name) = tokens[0] else {
            panic!("expected string token, got {:?}", tokens[0]);
        };
        assert_eq!(interner.lookup(name), "a\"b\n");
    }

    #[test]
    fn test_lex_invalid_character() {
        let interner = StringInterner::new();
        let err = lex("a # b", &interner).err();
        assert_eq!(
            err.map(|e| e.kind),
            Some(ParseErrorKind::InvalidCharacter('#'))
        );
    }
}
