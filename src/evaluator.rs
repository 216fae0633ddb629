use crate::ast::{Expr, ExprKind};
use crate::environment::{Binding, EnvError, Environment};
use crate::operators::{self, Operator};
use crate::source::Span;
use crate::types::{Closure, Value};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;
use thiserror::Error;

// --- Evaluation Error ---
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error(transparent)]
    EnvError(#[from] EnvError),
    #[error("expected a procedure, but got a {found}")]
    NotAProcedure { found: &'static str, span: Span },
    #[error("expected a {expected}, but got a {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
        span: Span,
    },
    #[error("operator `{operator}` not found for `{type_name}` type")]
    OperatorNotFound {
        operator: Operator,
        type_name: &'static str,
        span: Span,
    },
    #[error("operator `{operator}` needs at least one operand")]
    MissingOperands { operator: Operator, span: Span },
    #[error("`define` does not produce a value")]
    NoValue { span: Span },
}

impl EvalError {
    pub fn span(&self) -> Span {
        match self {
            EvalError::EnvError(EnvError::UnboundVariable(_, span)) => *span,
            EvalError::NotAProcedure { span, .. }
            | EvalError::TypeMismatch { span, .. }
            | EvalError::OperatorNotFound { span, .. }
            | EvalError::MissingOperands { span, .. }
            | EvalError::NoValue { span } => *span,
        }
    }
}

// Result type alias for convenience
pub type EvalResult<T = Value> = Result<T, EvalError>;

/// Where a call binds its parameters.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum CallFrames {
    /// A fresh scope per call, chained to the closure's captured scope.
    #[default]
    PerCall,
    /// Parameters are written straight into the closure's captured scope, so
    /// every call of one closure value shares a single frame.
    Shared,
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("unknown call frame mode `{0}`, expected `per-call` or `shared`")]
pub struct UnknownCallFrames(String);

impl CallFrames {
    pub fn name(self) -> &'static str {
        match self {
            CallFrames::PerCall => "per-call",
            CallFrames::Shared => "shared",
        }
    }
}

impl fmt::Display for CallFrames {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CallFrames {
    type Err = UnknownCallFrames;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [CallFrames::PerCall, CallFrames::Shared]
            .into_iter()
            .find(|frames| frames.name() == s)
            .ok_or_else(|| UnknownCallFrames(s.to_string()))
    }
}

/// Tree-walking evaluator. Holds no state besides its configuration; all
/// mutable state lives in the environments passed in.
#[derive(Debug, Copy, Clone, Default)]
pub struct Evaluator {
    frames: CallFrames,
}

/// Evaluates `expr` in `env` with the default configuration.
pub fn evaluate(expr: &Expr, env: &Rc<RefCell<Environment>>) -> EvalResult<Option<Value>> {
    Evaluator::default().evaluate(expr, env)
}

impl Evaluator {
    pub fn new(frames: CallFrames) -> Self {
        Evaluator { frames }
    }

    pub fn frames(&self) -> CallFrames {
        self.frames
    }

    /// Evaluates `expr`. Only `define` (directly, or through a branch or a
    /// variable bound to one) yields `None`.
    pub fn evaluate(
        &self,
        expr: &Expr,
        env: &Rc<RefCell<Environment>>,
    ) -> EvalResult<Option<Value>> {
        match &expr.kind {
            ExprKind::Number(n) => Ok(Some(Value::Number(*n))),
            ExprKind::Bool(b) => Ok(Some(Value::Bool(*b))),
            ExprKind::Variable(name) => {
                // Clone the binding out so no borrow is held while evaluating.
                let binding = env.borrow().lookup(name, expr.span)?;
                match binding {
                    Binding::Value(value) => Ok(Some(value)),
                    Binding::Expression(bound) => self.evaluate(&bound, env),
                }
            }
            ExprKind::Define { name, expr: bound } => {
                tracing::debug!(name = %name, "define");
                env.borrow_mut()
                    .bind(name.clone(), Binding::Expression(bound.clone()));
                Ok(None)
            }
            ExprKind::If {
                test,
                then,
                otherwise,
            } => {
                let branch = match self.evaluate_value(test, env)? {
                    Value::Bool(true) => then,
                    Value::Bool(false) => otherwise,
                    other => {
                        return Err(EvalError::TypeMismatch {
                            expected: "boolean",
                            found: other.type_name(),
                            span: test.span,
                        });
                    }
                };
                self.evaluate(branch, env)
            }
            ExprKind::Lambda(lambda) => Ok(Some(Value::Closure(Rc::new(Closure::new(
                lambda.clone(),
                Environment::new_child(env),
            ))))),
            ExprKind::Call { callee, arguments } => {
                let closure = match self.evaluate_value(callee, env)? {
                    Value::Closure(closure) => closure,
                    other => {
                        return Err(EvalError::NotAProcedure {
                            found: other.type_name(),
                            span: callee.span,
                        });
                    }
                };
                let values = self.evaluate_all(arguments, env)?;
                self.call(&closure, values)
            }
            ExprKind::ListFunction {
                operator,
                arguments,
            } => {
                let values = self.evaluate_all(arguments, env)?;
                let operands: Vec<(Value, Span)> = values
                    .into_iter()
                    .zip(arguments.iter().map(|argument| argument.span))
                    .collect();
                operators::apply(*operator, &operands, expr.span).map(Some)
            }
            ExprKind::Cons { left, right } => {
                let left = self.evaluate_value(left, env)?;
                let right = self.evaluate_value(right, env)?;
                Ok(Some(Value::pair(left, right)))
            }
            ExprKind::Car(operand) => self.project(operand, env, |left, _| left),
            ExprKind::Cdr(operand) => self.project(operand, env, |_, right| right),
        }
    }

    /// Like [`Evaluator::evaluate`], but a missing value is an error.
    pub fn evaluate_value(&self, expr: &Expr, env: &Rc<RefCell<Environment>>) -> EvalResult {
        self.evaluate(expr, env)?
            .ok_or(EvalError::NoValue { span: expr.span })
    }

    // Left to right, in the caller's environment.
    fn evaluate_all(
        &self,
        arguments: &[Expr],
        env: &Rc<RefCell<Environment>>,
    ) -> EvalResult<Vec<Value>> {
        arguments
            .iter()
            .map(|argument| self.evaluate_value(argument, env))
            .collect()
    }

    /// Binds parameters pairwise (surplus arguments are dropped, parameters
    /// without an argument stay unbound) and evaluates the body.
    #[tracing::instrument(level = "trace", skip_all, fields(closure = %closure, args = values.len()))]
    fn call(&self, closure: &Closure, values: Vec<Value>) -> EvalResult<Option<Value>> {
        let frame = match self.frames {
            CallFrames::PerCall => Environment::new_enclosed(closure.env.clone()),
            CallFrames::Shared => closure.env.clone(),
        };
        {
            let mut frame = frame.borrow_mut();
            for (parameter, value) in closure.lambda.parameters.iter().zip(values) {
                frame.bind(parameter.clone(), Binding::Value(value));
            }
        }
        self.evaluate(&closure.lambda.body, &frame)
    }

    fn project(
        &self,
        operand: &Expr,
        env: &Rc<RefCell<Environment>>,
        select: fn(Rc<Value>, Rc<Value>) -> Rc<Value>,
    ) -> EvalResult<Option<Value>> {
        match self.evaluate_value(operand, env)? {
            Value::Pair(left, right) => Ok(Some(select(left, right).as_ref().clone())),
            other => Err(EvalError::TypeMismatch {
                expected: "pair",
                found: other.type_name(),
                span: operand.span,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build;
    use crate::lexer::tokenize;
    use crate::parser::Parser;

    fn parse(input: &str) -> Expr {
        let node = Parser::new(tokenize(input))
            .parse()
            .unwrap_or_else(|e| panic!("Reading failed for input '{}': {}", input, e));
        build(node).unwrap_or_else(|e| panic!("Building failed for input '{}': {}", input, e))
    }

    fn eval_in(input: &str, env: &Rc<RefCell<Environment>>) -> EvalResult<Option<Value>> {
        evaluate(&parse(input), env)
    }

    // Helper to evaluate input string and check the produced value
    fn assert_eval(input: &str, expected: Value, env: Option<&Rc<RefCell<Environment>>>) {
        let fresh = Environment::new();
        let env = env.unwrap_or(&fresh);
        match eval_in(input, env) {
            Ok(Some(value)) => assert_eq!(value, expected, "Input: '{}'", input),
            Ok(None) => panic!("Input '{}' produced no value", input),
            Err(e) => panic!("Evaluation failed for input '{}': {}", input, e),
        }
    }

    // Helper to assert evaluation errors by variant
    fn assert_eval_error(input: &str, expected_error_variant: &EvalError) {
        match eval_in(input, &Environment::new()) {
            Ok(result) => panic!(
                "Expected evaluation to fail for input '{}', but got: {:?}",
                input, result
            ),
            Err(e) => assert_eq!(
                std::mem::discriminant(&e),
                std::mem::discriminant(expected_error_variant),
                "Input: '{}', Expected error variant like {:?}, got: {:?}",
                input,
                expected_error_variant,
                e
            ),
        }
    }

    #[test]
    fn test_eval_literals() {
        assert_eval("6", Value::Number(6.0), None);
        assert_eval("-10.5", Value::Number(-10.5), None);
        assert_eval("#t", Value::Bool(true), None);
        assert_eval("#f", Value::Bool(false), None);
    }

    #[test]
    fn test_eval_arithmetic() {
        assert_eval("(+ 2 2)", Value::Number(4.0), None);
        assert_eval("(+ 2 2 2 2 2 2 2 2 2 2)", Value::Number(20.0), None);
        assert_eval("(- 10 3 2)", Value::Number(5.0), None);
        assert_eval("(- 2 3 3)", Value::Number(-4.0), None);
        assert_eval("(/ 8 2 2)", Value::Number(2.0), None);
        assert_eval("(* 2 (+ 1 2) 3)", Value::Number(18.0), None);
    }

    #[test]
    fn test_eval_comparisons() {
        assert_eval("(< 1 2 3)", Value::Bool(true), None);
        assert_eval("(< 1 3 2)", Value::Bool(false), None);
        assert_eval("(= 0.1 0.10001)", Value::Bool(true), None);
        assert_eval("(= 0.1 0.1002)", Value::Bool(false), None);
        assert_eval("(= (+ 5 5) (/ 100 10) (* 2 5))", Value::Bool(true), None);
        assert_eval("(&& (|| #t #t) (> 5 3))", Value::Bool(true), None);
        assert_eval("(!= #f #f)", Value::Bool(false), None);
    }

    #[test]
    fn test_eval_define_then_lookup() {
        let env = Environment::new();
        assert_eq!(eval_in("(define x 6)", &env), Ok(None));
        assert_eval("x", Value::Number(6.0), Some(&env));

        assert_eq!(eval_in("(define y (> 10.5 10))", &env), Ok(None));
        assert_eval("y", Value::Bool(true), Some(&env));
    }

    #[test]
    fn test_define_stores_the_expression() {
        let env = Environment::new();
        eval_in("(define a 1)", &env).unwrap();
        eval_in("(define b (+ a 1))", &env).unwrap();
        assert_eval("b", Value::Number(2.0), Some(&env));

        // `b` is re-evaluated at every reference.
        eval_in("(define a 10)", &env).unwrap();
        assert_eval("b", Value::Number(11.0), Some(&env));
    }

    #[test]
    fn test_define_before_its_dependencies() {
        let env = Environment::new();
        eval_in("(define double (lambda (n) (* factor n)))", &env).unwrap();
        eval_in("(define factor 2)", &env).unwrap();
        assert_eval("(double 21)", Value::Number(42.0), Some(&env));
    }

    #[test]
    fn test_if_evaluates_only_the_taken_branch() {
        let env = Environment::new();
        assert_eq!(eval_in("(if #t (define a 1) (define b 2))", &env), Ok(None));
        assert_eval("a", Value::Number(1.0), Some(&env));
        assert!(matches!(
            eval_in("b", &env),
            Err(EvalError::EnvError(EnvError::UnboundVariable(name, _))) if name == "b"
        ));

        assert_eq!(eval_in("(if #f (define c 1) (define d 2))", &env), Ok(None));
        assert_eval("d", Value::Number(2.0), Some(&env));
        assert!(eval_in("c", &env).is_err());

        // The untaken branch is never evaluated, so its error never surfaces.
        assert_eval("(if #t 1 undefined-name)", Value::Number(1.0), None);
        assert_eval("(if #f (+ #t 1) 2)", Value::Number(2.0), None);
    }

    #[test]
    fn test_if_requires_boolean_test() {
        assert_eval_error(
            "(if 1 2 3)",
            &EvalError::TypeMismatch {
                expected: "boolean",
                found: "number",
                span: Span::default(),
            },
        );
        let err = eval_in("(if (cons 1 2) 2 3)", &Environment::new()).unwrap_err();
        assert_eq!(err.to_string(), "expected a boolean, but got a pair");
        assert_eq!(err.span(), Span::new(4, 14));
    }

    #[test]
    fn test_lambda_calls() {
        assert_eval("((lambda (y) (= #f y)) #t)", Value::Bool(false), None);
        assert_eval("((lambda (y) (= #f y)) #f)", Value::Bool(true), None);
        assert_eval("((lambda () #t))", Value::Bool(true), None);
        assert_eval("((lambda (a b) (- a b)) 10 4)", Value::Number(6.0), None);

        let env = Environment::new();
        eval_in("( define x (lambda (y) (= #f y)))", &env).unwrap();
        assert_eval("(x #t)", Value::Bool(false), Some(&env));
    }

    #[test]
    fn test_closures_capture_their_scope() {
        let env = Environment::new();
        eval_in(
            "(define adder (lambda (n) (lambda (m) (+ n m))))",
            &env,
        )
        .unwrap();
        assert_eval("((adder 3) 4)", Value::Number(7.0), Some(&env));
        assert_eval(
            "((lambda (f) (f 10)) (adder 5))",
            Value::Number(15.0),
            Some(&env),
        );
    }

    #[test]
    fn test_self_reference() {
        let env = Environment::new();
        eval_in(
            "(define f (lambda (n) (if (= n 0) 0 (f (- n 1)))))",
            &env,
        )
        .unwrap();
        assert_eval("(f 5)", Value::Number(0.0), Some(&env));
    }

    #[test]
    fn test_closure_snapshot_misses_later_defines() {
        let env = Environment::new();
        let closure = eval_in("(lambda () x)", &env).unwrap().unwrap();
        env.borrow_mut().bind("h", Binding::Value(closure));
        eval_in("(define x 1)", &env).unwrap();

        // The closure copied the scope before `x` existed.
        assert!(matches!(
            eval_in("(h)", &env),
            Err(EvalError::EnvError(EnvError::UnboundVariable(name, _))) if name == "x"
        ));
        // Looking the lambda up again by a defined name builds a fresh closure.
        eval_in("(define g (lambda () x))", &env).unwrap();
        assert_eval("(g)", Value::Number(1.0), Some(&env));
    }

    #[test]
    fn test_arity_mismatch_is_not_an_error() {
        assert_eval("((lambda (a) a) 1 2 3)", Value::Number(1.0), None);
        assert_eval("((lambda (a b) a) 1)", Value::Number(1.0), None);
        assert!(matches!(
            eval_in("((lambda (a b) b) 1)", &Environment::new()),
            Err(EvalError::EnvError(_))
        ));
    }

    // The two frame modes differ when one closure value is called twice.
    fn call_twice(frames: CallFrames) -> EvalResult<Option<Value>> {
        let evaluator = Evaluator::new(frames);
        let env = Environment::new();
        let closure = evaluator
            .evaluate(&parse("(lambda (a b) b)"), &env)?
            .expect("a closure");
        env.borrow_mut().bind("h", Binding::Value(closure));
        assert_eq!(
            evaluator.evaluate(&parse("(h 1 2)"), &env)?,
            Some(Value::Number(2.0))
        );
        evaluator.evaluate(&parse("(h 1)"), &env)
    }

    #[test]
    fn test_per_call_frames_do_not_leak_arguments() {
        assert!(matches!(
            call_twice(CallFrames::PerCall),
            Err(EvalError::EnvError(EnvError::UnboundVariable(name, _))) if name == "b"
        ));
    }

    #[test]
    fn test_shared_frames_keep_previous_arguments() {
        assert_eq!(call_twice(CallFrames::Shared), Ok(Some(Value::Number(2.0))));
    }

    #[test]
    fn test_call_frames_from_str() {
        assert_eq!("per-call".parse(), Ok(CallFrames::PerCall));
        assert_eq!("shared".parse(), Ok(CallFrames::Shared));
        assert_eq!(CallFrames::Shared.to_string(), "shared");
        assert_eq!(
            "Shared".parse::<CallFrames>(),
            Err(UnknownCallFrames("Shared".to_string()))
        );
    }

    #[test]
    fn test_recursion_in_both_frame_modes() {
        for frames in [CallFrames::PerCall, CallFrames::Shared] {
            let evaluator = Evaluator::new(frames);
            let env = Environment::new();
            evaluator
                .evaluate(
                    &parse("(define fact (lambda (n) (if (< n 2) 1 (* n (fact (- n 1))))))"),
                    &env,
                )
                .unwrap();
            assert_eq!(
                evaluator.evaluate(&parse("(fact 5)"), &env),
                Ok(Some(Value::Number(120.0))),
                "{:?}",
                frames
            );
        }
    }

    #[test]
    fn test_pairs() {
        assert_eval(
            "(cons 1 (cons 2 3))",
            Value::pair(
                Value::Number(1.0),
                Value::pair(Value::Number(2.0), Value::Number(3.0)),
            ),
            None,
        );
        assert_eval("(car (cons 1 2))", Value::Number(1.0), None);
        assert_eval("(cdr (cons 1 2))", Value::Number(2.0), None);
        assert_eval("(car (cdr (cons 1 (cons 2 3))))", Value::Number(2.0), None);
        assert_eval("(cdr (cdr (cons 1 (cons 2 3))))", Value::Number(3.0), None);
        assert_eval_error(
            "(car 1)",
            &EvalError::TypeMismatch {
                expected: "pair",
                found: "number",
                span: Span::default(),
            },
        );
    }

    #[test]
    fn test_unbound_variable() {
        let err = eval_in("(+ 1 nope)", &Environment::new()).unwrap_err();
        assert_eq!(
            err,
            EvalError::EnvError(EnvError::UnboundVariable(
                "nope".to_string(),
                Span::new(5, 9)
            ))
        );
        assert_eq!(err.to_string(), "`nope` is not defined in the current scope");
    }

    #[test]
    fn test_not_a_procedure() {
        assert_eval_error(
            "(1 2)",
            &EvalError::NotAProcedure {
                found: "number",
                span: Span::default(),
            },
        );
        let env = Environment::new();
        eval_in("(define x #t)", &env).unwrap();
        assert_eq!(
            eval_in("(x)", &env),
            Err(EvalError::NotAProcedure {
                found: "boolean",
                span: Span::new(1, 2)
            })
        );
    }

    #[test]
    fn test_operator_errors() {
        assert_eval_error(
            "(&& 1 2)",
            &EvalError::OperatorNotFound {
                operator: Operator::And,
                type_name: "number",
                span: Span::default(),
            },
        );
        assert_eval_error(
            "(+)",
            &EvalError::MissingOperands {
                operator: Operator::Add,
                span: Span::default(),
            },
        );
    }

    #[test]
    fn test_logical_operators_evaluate_every_operand() {
        for input in ["(&& #f undefined-name)", "(|| #t undefined-name)"] {
            match eval_in(input, &Environment::new()) {
                Err(EvalError::EnvError(EnvError::UnboundVariable(name, span))) => {
                    assert_eq!(name, "undefined-name", "Input: '{}'", input);
                    assert_eq!(span, Span::new(7, 21), "Input: '{}'", input);
                }
                other => panic!("Expected an unbound variable for '{}', got {:?}", input, other),
            }
        }
    }

    #[test]
    fn test_operand_type_errors_point_at_the_operand() {
        assert_eq!(
            eval_in("(+ 1 #t)", &Environment::new()),
            Err(EvalError::TypeMismatch {
                expected: "number",
                found: "boolean",
                span: Span::new(5, 7),
            })
        );
        assert_eq!(
            eval_in("(&& #t (< 1 2) 3)", &Environment::new()),
            Err(EvalError::TypeMismatch {
                expected: "boolean",
                found: "number",
                span: Span::new(15, 16),
            })
        );
    }

    #[test]
    fn test_define_where_a_value_is_needed() {
        assert_eval_error("(+ 1 (define x 2))", &EvalError::NoValue { span: Span::default() });
        assert_eval_error("(cons (if #t (define x 2) 1) 3)", &EvalError::NoValue {
            span: Span::default(),
        });
        // A call whose body is a `define` yields no value, which is fine at top level.
        assert_eq!(
            eval_in("((lambda () (define x 2)))", &Environment::new()),
            Ok(None)
        );
    }
}
