use logos::Logos;
use std::fmt;

use crate::Span;

/// Token classes. Anything that is neither whitespace nor a parenthesis is
/// part of an atom, so lexing cannot fail.
#[derive(Logos, Debug, Copy, Clone, PartialEq, Eq)]
#[logos(skip r"\s+")]
pub enum TokenKind {
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[regex(r"[^\s()]+")]
    Atom,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub span: Span,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::LParen => write!(f, "("),
            TokenKind::RParen => write!(f, ")"),
            TokenKind::Atom => write!(f, "atom"),
        }
    }
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// Splits `input` into parenthesis and atom tokens, dropping whitespace.
pub fn tokenize(input: &str) -> Vec<Token<'_>> {
    TokenKind::lexer(input)
        .spanned()
        .map(|(result, range)| Token {
            // Every non-whitespace character matches one of the patterns.
            kind: result.unwrap_or(TokenKind::Atom),
            text: &input[range.clone()],
            span: range.into(),
        })
        .collect()
}

/// How far the parentheses of an input are from closing.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Balance {
    /// Every `(` is closed.
    Closed,
    /// This many `(` are still open.
    Open(usize),
    /// A `)` with nothing left to close.
    Unmatched(Span),
}

/// Counts open parentheses, stopping at the first unmatched `)`.
pub fn balance(input: &str) -> Balance {
    let mut depth = 0usize;
    for token in tokenize(input) {
        match token.kind {
            TokenKind::LParen => depth += 1,
            TokenKind::RParen if depth == 0 => return Balance::Unmatched(token.span),
            TokenKind::RParen => depth -= 1,
            TokenKind::Atom => {}
        }
    }
    if depth == 0 {
        Balance::Closed
    } else {
        Balance::Open(depth)
    }
}
