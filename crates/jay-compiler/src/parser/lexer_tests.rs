//! Unit tests for the lexer.

use crate::parser::lexer::{TokenKind, lex, token_text};

fn kinds(source: &str) -> Vec<TokenKind> {
    lex(source).iter().map(|t| t.kind).collect()
}

#[test]
fn keywords_and_identifiers() {
    assert_eq!(
        kinds("class Foo { void bar }"),
        vec![
            TokenKind::ClassKw,
            TokenKind::Identifier,
            TokenKind::LBrace,
            TokenKind::VoidKw,
            TokenKind::Identifier,
            TokenKind::RBrace,
        ]
    );
    // Primitive type names are plain identifiers, not keywords.
    assert_eq!(kinds("Int Bool"), vec![TokenKind::Identifier, TokenKind::Identifier]);
}

#[test]
fn numeric_literals() {
    assert_eq!(kinds("42"), vec![TokenKind::IntLiteral]);
    assert_eq!(kinds("42L"), vec![TokenKind::IntLiteral]);
    assert_eq!(kinds("0x1f"), vec![TokenKind::IntLiteral]);
    assert_eq!(kinds("0xDEADbeefL"), vec![TokenKind::IntLiteral]);
    assert_eq!(kinds("1.5"), vec![TokenKind::FloatLiteral]);
    assert_eq!(kinds("1.5f"), vec![TokenKind::FloatLiteral]);
    assert_eq!(kinds("2f"), vec![TokenKind::FloatLiteral]);
    assert_eq!(kinds("1e10"), vec![TokenKind::FloatLiteral]);
    assert_eq!(kinds("2.5e-3F"), vec![TokenKind::FloatLiteral]);
}

#[test]
fn shift_operators_lex_longest_first() {
    assert_eq!(
        kinds("a >> b >>> c"),
        vec![
            TokenKind::Identifier,
            TokenKind::RightShift,
            TokenKind::Identifier,
            TokenKind::UnsignedRightShift,
            TokenKind::Identifier,
        ]
    );
    assert_eq!(
        kinds("a >>>= b"),
        vec![
            TokenKind::Identifier,
            TokenKind::UnsignedRightShiftAssign,
            TokenKind::Identifier,
        ]
    );
}

#[test]
fn comments_are_skipped() {
    assert_eq!(
        kinds("a // trailing\nb /* block\nspanning */ c"),
        vec![TokenKind::Identifier, TokenKind::Identifier, TokenKind::Identifier]
    );
}

#[test]
fn line_numbers_are_one_based() {
    let source = "a\nb\n\nc";
    let tokens = lex(source);
    let lines: Vec<u32> = tokens.iter().map(|t| t.line).collect();
    assert_eq!(lines, vec![1, 2, 4]);
}

#[test]
fn token_text_slices_the_source() {
    let source = "foo = 12;";
    let tokens = lex(source);
    assert_eq!(token_text(source, &tokens[0]), "foo");
    assert_eq!(token_text(source, &tokens[2]), "12");
}

#[test]
fn garbage_runs_coalesce() {
    let tokens = lex("a @#@ b");
    let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
    assert_eq!(
        kinds,
        vec![TokenKind::Identifier, TokenKind::Garbage, TokenKind::Identifier]
    );
}
