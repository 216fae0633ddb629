use crate::ast::Lambda;
use crate::environment::Environment;
use crate::source::Span;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Reader output: a syntax tree node with the source span it covers.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: Sexpr,
    pub span: Span,
}

impl Node {
    pub fn new(kind: Sexpr, span: Span) -> Self {
        Node { kind, span }
    }

    pub fn new_atom(token: impl Into<String>, span: Span) -> Self {
        Node::new(Sexpr::Atom(token.into()), span)
    }

    pub fn new_list(children: Vec<Node>, span: Span) -> Self {
        Node::new(Sexpr::List(children), span)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

/// A purely syntactic S-expression: no numbers or keywords yet, just atoms
/// and lists.
#[derive(Debug, Clone, PartialEq)]
pub enum Sexpr {
    Atom(String),
    List(Vec<Node>),
}

impl fmt::Display for Sexpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sexpr::Atom(token) => write!(f, "{}", token),
            Sexpr::List(children) => {
                write!(f, "(")?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", child)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Runtime values produced by the evaluator.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Bool(bool),
    Pair(Rc<Value>, Rc<Value>),
    Closure(Rc<Closure>),
}

impl Value {
    pub fn pair(left: Value, right: Value) -> Self {
        Value::Pair(Rc::new(left), Rc::new(right))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Bool(_) => "boolean",
            Value::Pair(..) => "pair",
            Value::Closure(_) => "closure",
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::Bool(b) => write!(f, "{}", if *b { "#t" } else { "#f" }),
            Value::Pair(left, right) => {
                write!(f, "({}", left)?;
                let mut rest = right;
                // Right-nested pairs print as one list: (1 2 . 3)
                while let Value::Pair(left, right) = rest.as_ref() {
                    write!(f, " {}", left)?;
                    rest = right;
                }
                write!(f, " . {})", rest)
            }
            Value::Closure(closure) => write!(f, "{}", closure),
        }
    }
}

/// A lambda paired with the scope it captured when it was evaluated.
#[derive(Clone)]
pub struct Closure {
    pub lambda: Rc<Lambda>,
    pub env: Rc<RefCell<Environment>>,
}

impl Closure {
    pub fn new(lambda: Rc<Lambda>, env: Rc<RefCell<Environment>>) -> Self {
        Closure { lambda, env }
    }
}

impl fmt::Display for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#<lambda ({})>", self.lambda.parameters.join(" "))
    }
}

// The captured scope can contain other closures, so keep Debug shallow.
impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Closure({:?})", self.lambda.parameters)
    }
}

// Closures are only equal to themselves.
impl PartialEq for Closure {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.lambda, &other.lambda) && Rc::ptr_eq(&self.env, &other.env)
    }
}
