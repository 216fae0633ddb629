use crate::Span;
use crate::lexer::{Token, TokenKind};
use crate::types::Node;
use std::iter::Peekable;
use std::vec::IntoIter;
use thiserror::Error;

/// Deepest list nesting the reader accepts.
pub const MAX_DEPTH: usize = 256;

/// Syntax errors, raised while reading or while building the AST.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("unexpected end of input")]
    UnexpectedEof(Span),
    #[error("unexpected `)`")]
    UnexpectedCloseParen(Span),
    #[error("unbalanced parentheses: `(` is never closed")]
    UnbalancedParens(Span), // Span of the unclosed '('
    #[error("empty list `()` is not a valid expression")]
    EmptyList(Span),
    #[error("{message}")]
    InvalidSpecialForm { message: String, span: Span },
    #[error("lists nested deeper than {MAX_DEPTH} levels")]
    TooDeep(Span), // Span of the first '(' past the limit
}

impl ParseError {
    pub fn span(&self) -> Span {
        match self {
            ParseError::UnexpectedEof(span)
            | ParseError::UnexpectedCloseParen(span)
            | ParseError::UnbalancedParens(span)
            | ParseError::EmptyList(span)
            | ParseError::TooDeep(span) => *span,
            ParseError::InvalidSpecialForm { span, .. } => *span,
        }
    }
}

// Result type alias for convenience
pub type ParseResult<T> = Result<T, ParseError>;

pub struct Parser<'a> {
    tokens: Peekable<IntoIter<Token<'a>>>,
    // Where the input ends, for EOF errors.
    end: usize,
    // Lists currently open.
    depth: usize,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: Vec<Token<'a>>) -> Self {
        let end = tokens.last().map_or(0, |t| t.span.end);
        Parser {
            tokens: tokens.into_iter().peekable(),
            end,
            depth: 0,
        }
    }

    /// Reads a single S-expression from the token stream.
    pub fn parse_expr(&mut self) -> ParseResult<Node> {
        let Some(token) = self.tokens.next() else {
            return Err(ParseError::UnexpectedEof(Span::new(self.end, self.end)));
        };
        match token.kind {
            TokenKind::RParen => Err(ParseError::UnexpectedCloseParen(token.span)),
            TokenKind::LParen if self.depth >= MAX_DEPTH => Err(ParseError::TooDeep(token.span)),
            TokenKind::LParen => {
                self.depth += 1;
                let list = self.parse_list(token.span);
                self.depth -= 1;
                list
            }
            TokenKind::Atom => Ok(Node::new_atom(token.text, token.span)),
        }
    }

    /// Reads children up to the `)` matching the already consumed `(`.
    fn parse_list(&mut self, open: Span) -> ParseResult<Node> {
        let mut children = Vec::new();
        loop {
            match self.tokens.peek() {
                None => return Err(ParseError::UnbalancedParens(open)),
                Some(Token {
                    kind: TokenKind::RParen,
                    span,
                    ..
                }) => {
                    let span = open.merge(*span);
                    self.tokens.next();
                    return Ok(Node::new_list(children, span));
                }
                Some(_) => children.push(self.parse_expr()?),
            }
        }
    }

    /// Reads the first complete expression. Anything after it is ignored.
    pub fn parse(mut self) -> ParseResult<Node> {
        self.parse_expr()
    }

    /// Reads every top-level expression until the tokens run out.
    pub fn parse_all(mut self) -> ParseResult<Vec<Node>> {
        let mut nodes = Vec::new();
        while self.tokens.peek().is_some() {
            nodes.push(self.parse_expr()?);
        }
        Ok(nodes)
    }
}
