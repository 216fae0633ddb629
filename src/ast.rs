//! Typed expression tree and the single-pass builder that produces it from
//! the reader's syntax tree.

use crate::operators::Operator;
use crate::parser::{ParseError, ParseResult};
use crate::source::Span;
use crate::types::{Node, Sexpr};
use std::rc::Rc;

pub const LAMBDA: &str = "lambda";
pub const IF: &str = "if";
pub const DEFINE: &str = "define";
pub const CONS: &str = "cons";
pub const CAR: &str = "car";
pub const CDR: &str = "cdr";
pub const TRUE: &str = "#t";
pub const FALSE: &str = "#f";

/// Words with special meaning at the head of a list, operators included.
pub fn reserved_words() -> impl Iterator<Item = &'static str> {
    [LAMBDA, IF, DEFINE, CONS, CAR, CDR]
        .into_iter()
        .chain(Operator::ALL.iter().map(|op| op.symbol()))
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Expr { kind, span }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Number(f64),
    Bool(bool),
    Variable(String),
    // The bound expression is stored unevaluated, hence the Rc.
    Define {
        name: String,
        expr: Rc<Expr>,
    },
    If {
        test: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    Lambda(Rc<Lambda>),
    Call {
        callee: Box<Expr>,
        arguments: Vec<Expr>,
    },
    ListFunction {
        operator: Operator,
        arguments: Vec<Expr>,
    },
    Cons {
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Car(Box<Expr>),
    Cdr(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Lambda {
    pub parameters: Vec<String>,
    pub body: Expr,
}

fn invalid(message: &str, span: Span) -> ParseError {
    ParseError::InvalidSpecialForm {
        message: message.to_string(),
        span,
    }
}

/// Converts one syntax tree node into an expression.
pub fn build(node: Node) -> ParseResult<Expr> {
    match node.kind {
        Sexpr::Atom(token) => Ok(build_atom(token, node.span)),
        Sexpr::List(children) => build_list(children, node.span),
    }
}

fn build_all(nodes: impl IntoIterator<Item = Node>) -> ParseResult<Vec<Expr>> {
    nodes.into_iter().map(build).collect()
}

fn build_atom(token: String, span: Span) -> Expr {
    let kind = if let Some(n) = parse_number(&token) {
        ExprKind::Number(n)
    } else if token == TRUE {
        ExprKind::Bool(true)
    } else if token == FALSE {
        ExprKind::Bool(false)
    } else {
        ExprKind::Variable(token)
    };
    Expr::new(kind, span)
}

/// Decimal literals with optional sign, fraction and exponent. Words that
/// `f64::from_str` also accepts (`inf`, `NaN`) stay identifiers.
fn parse_number(token: &str) -> Option<f64> {
    let unsigned = token.strip_prefix(['+', '-']).unwrap_or(token);
    match unsigned.chars().next() {
        Some(c) if c.is_ascii_digit() || c == '.' => token.parse().ok(),
        _ => None,
    }
}

fn build_list(children: Vec<Node>, span: Span) -> ParseResult<Expr> {
    let mut rest = children.into_iter();
    let Some(head) = rest.next() else {
        return Err(ParseError::EmptyList(span));
    };

    let head_token = match &head.kind {
        Sexpr::Atom(token) => Some(token.clone()),
        Sexpr::List(_) => None,
    };
    if let Some(operator) = head_token.as_deref().and_then(Operator::from_symbol) {
        let arguments = build_all(rest)?;
        return Ok(Expr::new(
            ExprKind::ListFunction {
                operator,
                arguments,
            },
            span,
        ));
    }

    let kind = match head_token.as_deref() {
        Some(LAMBDA) => build_lambda(rest.collect(), span)?,
        Some(IF) => build_if(rest.collect(), span)?,
        Some(DEFINE) => build_define(rest.collect(), span)?,
        Some(CONS) => build_cons(rest.collect(), span)?,
        Some(CAR) => ExprKind::Car(Box::new(build_single(CAR, rest.collect(), span)?)),
        Some(CDR) => ExprKind::Cdr(Box::new(build_single(CDR, rest.collect(), span)?)),
        // A nested list or any other atom in head position is applied.
        _ => ExprKind::Call {
            callee: Box::new(build(head)?),
            arguments: build_all(rest)?,
        },
    };
    Ok(Expr::new(kind, span))
}

fn build_lambda(rest: Vec<Node>, span: Span) -> ParseResult<ExprKind> {
    let mut rest = rest.into_iter();
    let parameters = match rest.next() {
        Some(Node {
            kind: Sexpr::List(parameters),
            ..
        }) => parameters
            .into_iter()
            .map(|p| match p.kind {
                Sexpr::Atom(name) => Ok(name),
                Sexpr::List(_) => Err(invalid(
                    "'lambda' statement should be followed by a list of string parameters",
                    p.span,
                )),
            })
            .collect::<ParseResult<Vec<String>>>()?,
        _ => {
            return Err(invalid(
                "'lambda' statement should be followed by a list of parameters",
                span,
            ));
        }
    };
    let body = match (rest.next(), rest.next()) {
        (Some(body), None) => build(body)?,
        _ => {
            return Err(invalid(
                "'lambda' statement should have exactly one body expression",
                span,
            ));
        }
    };
    Ok(ExprKind::Lambda(Rc::new(Lambda { parameters, body })))
}

fn build_if(rest: Vec<Node>, span: Span) -> ParseResult<ExprKind> {
    let Ok([test, then, otherwise]) = <[Node; 3]>::try_from(rest) else {
        return Err(invalid(
            "'if' statements should be followed by exactly 3 expressions",
            span,
        ));
    };
    Ok(ExprKind::If {
        test: Box::new(build(test)?),
        then: Box::new(build(then)?),
        otherwise: Box::new(build(otherwise)?),
    })
}

fn build_define(rest: Vec<Node>, span: Span) -> ParseResult<ExprKind> {
    match <[Node; 2]>::try_from(rest) {
        Ok(
            [
                Node {
                    kind: Sexpr::Atom(name),
                    ..
                },
                expr,
            ],
        ) => Ok(ExprKind::Define {
            name,
            expr: Rc::new(build(expr)?),
        }),
        Ok(_) => Err(invalid(
            "'define' statements should be followed by identifier",
            span,
        )),
        Err(_) => Err(invalid(
            "'define' statements should be followed by an identifier and exactly 1 expression",
            span,
        )),
    }
}

fn build_cons(rest: Vec<Node>, span: Span) -> ParseResult<ExprKind> {
    let Ok([left, right]) = <[Node; 2]>::try_from(rest) else {
        return Err(invalid(
            "'cons' statements should be followed by exactly 2 expressions",
            span,
        ));
    };
    Ok(ExprKind::Cons {
        left: Box::new(build(left)?),
        right: Box::new(build(right)?),
    })
}

fn build_single(form: &str, rest: Vec<Node>, span: Span) -> ParseResult<Expr> {
    let Ok([operand]) = <[Node; 1]>::try_from(rest) else {
        return Err(invalid(
            &format!("'{}' statements should be followed by exactly 1 expression", form),
            span,
        ));
    };
    build(operand)
}
