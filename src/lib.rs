// Declare modules publicly so they are part of the library interface
pub mod ast;
pub mod environment;
pub mod evaluator;
pub mod lexer;
pub mod operators;
pub mod parser;
pub mod pretty_print;
pub mod source;
pub mod types;

pub use ast::{Expr, ExprKind, Lambda};
pub use environment::{Binding, EnvError, Environment};
pub use evaluator::{
    CallFrames, EvalError, EvalResult, Evaluator, UnknownCallFrames, evaluate,
};
pub use lexer::{Balance, Token, TokenKind, balance, tokenize};
pub use operators::Operator;
pub use parser::{ParseError, Parser};
pub use source::Span;
pub use types::{Closure, Node, Sexpr, Value};

use std::cell::RefCell;
use std::rc::Rc;
use thiserror::Error;

/// Any error the pipeline can raise, from reading to evaluation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Eval(#[from] EvalError),
}

impl Error {
    pub fn span(&self) -> Span {
        match self {
            Error::Parse(e) => e.span(),
            Error::Eval(e) => e.span(),
        }
    }
}

/// Lexes and reads the first expression of `input` into a syntax tree.
pub fn read_str(input: &str) -> Result<Node, ParseError> {
    Parser::new(tokenize(input)).parse()
}

/// Lexes, reads and builds the first expression of `input`.
pub fn parse_str(input: &str) -> Result<Expr, ParseError> {
    ast::build(read_str(input)?)
}

/// Parses and evaluates the first expression of `input` in `env`.
pub fn eval_str(input: &str, env: &Rc<RefCell<Environment>>) -> Result<Option<Value>, Error> {
    Ok(evaluate(&parse_str(input)?, env)?)
}

/// Evaluates every top-level expression of `input` in order and returns the
/// result of the last one. Nothing is evaluated if any form fails to parse.
pub fn eval_program(
    input: &str,
    env: &Rc<RefCell<Environment>>,
    evaluator: Evaluator,
) -> Result<Option<Value>, Error> {
    let exprs = Parser::new(tokenize(input))
        .parse_all()?
        .into_iter()
        .map(ast::build)
        .collect::<Result<Vec<_>, _>>()?;
    tracing::debug!(forms = exprs.len(), frames = ?evaluator.frames(), "evaluating program");

    let mut last = None;
    for expr in &exprs {
        last = evaluator.evaluate(expr, env)?;
    }
    Ok(last)
}
