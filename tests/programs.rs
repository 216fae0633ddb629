//! Whole programs run through the public API.

use pretty_assertions::assert_eq;
use snow::{
    CallFrames, Environment, Error, EvalError, Evaluator, ParseError, Value, eval_program,
    eval_str,
};

const FIB: &str = "
(define fib (lambda (n)
    (if (= n 0)
        0
        (if (< n 2)
            1
        (+ (fib (- n 1)) (fib (- n 2)))))
    )
)";

fn number(input: &str, env: &std::rc::Rc<std::cell::RefCell<Environment>>) -> f64 {
    match eval_str(input, env) {
        Ok(Some(Value::Number(n))) => n,
        other => panic!("Expected a number from '{}', got {:?}", input, other),
    }
}

#[test]
fn fibonacci_sequence() {
    let env = Environment::new();
    assert_eq!(eval_str(FIB, &env), Ok(None));
    let expected = [0.0, 1.0, 1.0, 2.0, 3.0, 5.0, 8.0, 13.0, 21.0, 34.0, 55.0];
    for (n, want) in expected.iter().enumerate() {
        assert_eq!(number(&format!("(fib {})", n), &env), *want, "fib {}", n);
    }
}

#[test]
fn fibonacci_with_shared_frames() {
    let env = Environment::new();
    let program = format!("{}\n(fib 10)", FIB);
    assert_eq!(
        eval_program(&program, &env, Evaluator::new(CallFrames::Shared)),
        Ok(Some(Value::Number(55.0)))
    );
}

#[test]
fn pair_chains() {
    let env = Environment::new();
    let mut value = eval_str("(cons 1 (cons 2 (cons 3 (cons 4 (cons 5 6)))))", &env)
        .expect("evaluates")
        .expect("has a value");
    let mut seen = Vec::new();
    while let Value::Pair(left, right) = value {
        seen.push(left.as_ref().clone());
        value = right.as_ref().clone();
    }
    seen.push(value);
    let expected: Vec<Value> = (1..=6).map(|n| Value::Number(n as f64)).collect();
    assert_eq!(seen, expected);
}

#[test]
fn unicode_identifiers() {
    let env = Environment::new();
    eval_str("(define λ 2)", &env).unwrap();
    eval_str("(define μα #f)", &env).unwrap();
    eval_str("(define 💀 #t)", &env).unwrap();
    assert_eq!(eval_str("λ", &env), Ok(Some(Value::Number(2.0))));
    assert_eq!(eval_str("μα", &env), Ok(Some(Value::Bool(false))));
    assert_eq!(eval_str("💀", &env), Ok(Some(Value::Bool(true))));
}

#[test]
fn higher_order_functions() {
    let env = Environment::new();
    let program = "
        (define compose (lambda (f g) (lambda (x) (f (g x)))))
        (define inc (lambda (n) (+ n 1)))
        (define double (lambda (n) (* n 2)))
        ((compose inc double) 20)";
    assert_eq!(
        eval_program(program, &env, Evaluator::default()),
        Ok(Some(Value::Number(41.0)))
    );
}

#[test]
fn mutual_recursion_through_lazy_bindings() {
    let env = Environment::new();
    let program = "
        (define even? (lambda (n) (if (= n 0) #t (odd? (- n 1)))))
        (define odd? (lambda (n) (if (= n 0) #f (even? (- n 1)))))
        (&& (even? 10) (odd? 7))";
    assert_eq!(
        eval_program(program, &env, Evaluator::default()),
        Ok(Some(Value::Bool(true)))
    );
}

#[test]
fn errors_surface_to_the_caller() {
    let env = Environment::new();
    assert!(matches!(
        eval_str("(undefined 1)", &env),
        Err(Error::Eval(EvalError::EnvError(_)))
    ));
    assert!(matches!(
        eval_str("(lambda (x) x x)", &env),
        Err(Error::Parse(ParseError::InvalidSpecialForm { .. }))
    ));
    assert!(matches!(
        eval_str("((lambda (x) x) (+ 1", &env),
        Err(Error::Parse(ParseError::UnbalancedParens(_)))
    ));
}
