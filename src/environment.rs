use crate::ast::Expr;
use crate::source::Span;
use crate::types::Value;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use thiserror::Error;

// --- Environment Error ---
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EnvError {
    #[error("`{0}` is not defined in the current scope")]
    UnboundVariable(String, Span), // Symbol name, span where lookup happened
}

/// What a name is bound to.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    /// A `define`d expression, evaluated again at every reference.
    Expression(Rc<Expr>),
    /// An already evaluated call argument.
    Value(Value),
}

// --- Environment Definition ---

#[derive(Debug, Default)]
pub struct Environment {
    outer: Option<Rc<RefCell<Environment>>>,
    bindings: HashMap<String, Binding>,
}

impl Environment {
    /// Creates a new, top-level (global) environment.
    pub fn new() -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Environment::default()))
    }

    /// Creates a scope holding a copy of every binding visible from `parent`.
    /// The copy is not linked to `parent`: later definitions there stay
    /// invisible in the child.
    pub fn new_child(parent: &Rc<RefCell<Environment>>) -> Rc<RefCell<Self>> {
        let mut bindings = HashMap::new();
        let mut scope = Some(parent.clone());
        while let Some(current) = scope {
            let current = current.borrow();
            for (name, binding) in &current.bindings {
                // Inner scopes were visited first and shadow outer ones.
                bindings
                    .entry(name.clone())
                    .or_insert_with(|| binding.clone());
            }
            scope = current.outer.clone();
        }
        Rc::new(RefCell::new(Environment {
            outer: None,
            bindings,
        }))
    }

    /// Creates an empty scope whose lookups fall back to `outer`.
    pub fn new_enclosed(outer: Rc<RefCell<Environment>>) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Environment {
            outer: Some(outer),
            bindings: HashMap::new(),
        }))
    }

    /// Binds `name` in the *current* scope, replacing any previous binding here.
    pub fn bind(&mut self, name: impl Into<String>, binding: Binding) {
        self.bindings.insert(name.into(), binding);
    }

    /// Looks up a binding, walking outward through enclosing scopes.
    /// `lookup_span` is the location of the reference, used for error reporting.
    pub fn lookup(&self, name: &str, lookup_span: Span) -> Result<Binding, EnvError> {
        if let Some(binding) = self.bindings.get(name) {
            return Ok(binding.clone());
        }
        match &self.outer {
            Some(outer) => outer.borrow().lookup(name, lookup_span),
            None => Err(EnvError::UnboundVariable(name.to_string(), lookup_span)),
        }
    }

    /// Every name visible from this scope.
    pub fn identifiers(&self) -> HashSet<String> {
        let mut identifiers: HashSet<String> = self.bindings.keys().cloned().collect();
        if let Some(outer) = &self.outer {
            identifiers.extend(outer.borrow().identifiers());
        }
        identifiers
    }
}
