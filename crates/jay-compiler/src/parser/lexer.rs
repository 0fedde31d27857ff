//! Lexer for Jay source files.
//!
//! Produces span-based tokens; text is sliced from the source only when
//! needed. Runs of characters the lexer cannot match coalesce into single
//! `Garbage` tokens so malformed input yields one error, not one per byte.

use logos::Logos;
use std::ops::Range;

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip(r"//[^\n]*", allow_greedy = true))]
#[logos(skip r"/\*(?:[^*]|\*[^/])*\*+/")]
pub enum TokenKind {
    #[token("class")]
    ClassKw,
    #[token("void")]
    VoidKw,
    #[token("auto")]
    AutoKw,
    #[token("var")]
    VarKw,
    #[token("if")]
    IfKw,
    #[token("else")]
    ElseKw,
    #[token("while")]
    WhileKw,
    #[token("do")]
    DoKw,
    #[token("for")]
    ForKw,
    #[token("in")]
    InKw,
    #[token("switch")]
    SwitchKw,
    #[token("case")]
    CaseKw,
    #[token("default")]
    DefaultKw,
    #[token("break")]
    BreakKw,
    #[token("continue")]
    ContinueKw,
    #[token("return")]
    ReturnKw,
    #[token("true")]
    TrueKw,
    #[token("false")]
    FalseKw,
    #[token("length")]
    LengthKw,
    #[token("new")]
    NewKw,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Identifier,
    #[regex(r"0x[0-9a-fA-F]+[lL]?")]
    #[regex(r"[0-9]+[lL]?")]
    IntLiteral,
    #[regex(r"[0-9]+\.[0-9]+(?:[eE][+-]?[0-9]+)?[fF]?")]
    #[regex(r"[0-9]+[eE][+-]?[0-9]+[fF]?")]
    #[regex(r"[0-9]+[fF]")]
    FloatLiteral,

    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(";")]
    Semicolon,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token(":")]
    Colon,
    #[token("?")]
    Question,

    #[token("=")]
    Assign,
    #[token("+=")]
    PlusAssign,
    #[token("-=")]
    MinusAssign,
    #[token("*=")]
    MultAssign,
    #[token("/=")]
    DivAssign,
    #[token("%=")]
    ModAssign,
    #[token("&=")]
    AndAssign,
    #[token("|=")]
    OrAssign,
    #[token("^=")]
    XorAssign,
    #[token("<<=")]
    LeftShiftAssign,
    #[token(">>=")]
    RightShiftAssign,
    #[token(">>>=")]
    UnsignedRightShiftAssign,

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
    #[token("&")]
    Ampersand,
    #[token("|")]
    Pipe,
    #[token("^")]
    Caret,
    #[token("~")]
    Tilde,
    #[token("!")]
    Bang,
    #[token("<<")]
    LeftShift,
    #[token(">>")]
    RightShift,
    #[token(">>>")]
    UnsignedRightShift,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    PipePipe,
    #[token("==")]
    EqualsEquals,
    #[token("!=")]
    NotEquals,
    #[token("<")]
    Less,
    #[token("<=")]
    LessEquals,
    #[token(">")]
    Greater,
    #[token(">=")]
    GreaterEquals,
    #[token("++")]
    PlusPlus,
    #[token("--")]
    MinusMinus,

    /// A run of characters the lexer could not match.
    Garbage,
}

/// A token: kind, byte span, and 1-based source line of its first byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: u32,
    pub end: u32,
    pub line: u32,
}

impl Token {
    fn new(kind: TokenKind, span: Range<usize>, line: u32) -> Self {
        Self {
            kind,
            start: span.start as u32,
            end: span.end as u32,
            line,
        }
    }
}

/// Retrieves the text slice for a token. O(1) slice into the source.
#[inline]
pub fn token_text<'s>(source: &'s str, token: &Token) -> &'s str {
    &source[token.start as usize..token.end as usize]
}

/// Maps byte offsets to 1-based line numbers.
struct LineIndex {
    newline_offsets: Vec<usize>,
}

impl LineIndex {
    fn new(source: &str) -> Self {
        Self {
            newline_offsets: source
                .bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i)
                .collect(),
        }
    }

    fn line(&self, offset: usize) -> u32 {
        (self.newline_offsets.partition_point(|&nl| nl < offset) + 1) as u32
    }
}

/// Tokenizes source into span-based tokens, coalescing lexer errors into
/// `Garbage` runs.
pub fn lex(source: &str) -> Vec<Token> {
    let lines = LineIndex::new(source);
    let mut tokens = Vec::new();
    let mut lexer = TokenKind::lexer(source);
    let mut error_start: Option<usize> = None;

    while let Some(result) = lexer.next() {
        match result {
            Ok(kind) => {
                if let Some(start) = error_start.take() {
                    let end = lexer.span().start;
                    tokens.push(Token::new(TokenKind::Garbage, start..end, lines.line(start)));
                }
                let span = lexer.span();
                let line = lines.line(span.start);
                tokens.push(Token::new(kind, span, line));
            }
            Err(()) => {
                if error_start.is_none() {
                    error_start = Some(lexer.span().start);
                }
            }
        }
    }
    if let Some(start) = error_start.take() {
        tokens.push(Token::new(
            TokenKind::Garbage,
            start..source.len(),
            lines.line(start),
        ));
    }

    tokens
}
