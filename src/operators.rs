use crate::evaluator::{EvalError, EvalResult};
use crate::source::Span;
use crate::types::Value;
use std::fmt;

/// Tolerance used by numeric `=` and `!=`.
pub const EPSILON: f64 = 1e-4;

/// The built-in variadic operators.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Operator {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    NotEq,
    And,
    Or,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Operator {
    pub const ALL: [Operator; 12] = [
        Operator::Add,
        Operator::Sub,
        Operator::Mul,
        Operator::Div,
        Operator::Eq,
        Operator::NotEq,
        Operator::And,
        Operator::Or,
        Operator::Lt,
        Operator::Le,
        Operator::Gt,
        Operator::Ge,
    ];

    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Sub => "-",
            Operator::Mul => "*",
            Operator::Div => "/",
            Operator::Eq => "=",
            Operator::NotEq => "!=",
            Operator::And => "&&",
            Operator::Or => "||",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Operator> {
        Operator::ALL.into_iter().find(|op| op.symbol() == symbol)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// How an operator combines its argument list.
#[derive(Clone, Copy)]
pub enum ListOperation<T> {
    /// Left fold over all arguments.
    Reduce(fn(T, T) -> T),
    /// Every adjacent pair must satisfy the relation.
    Chain(fn(T, T) -> bool),
}

fn approx_eq(left: f64, right: f64) -> bool {
    (left - right).abs() < EPSILON
}

/// Operators available when the first argument is a number.
pub fn number_operation(operator: Operator) -> Option<ListOperation<f64>> {
    use ListOperation::*;
    Some(match operator {
        Operator::Add => Reduce(|acc, n| acc + n),
        Operator::Sub => Reduce(|acc, n| acc - n),
        Operator::Mul => Reduce(|acc, n| acc * n),
        Operator::Div => Reduce(|acc, n| acc / n),
        Operator::Lt => Chain(|l, r| l < r),
        Operator::Le => Chain(|l, r| l <= r),
        Operator::Gt => Chain(|l, r| l > r),
        Operator::Ge => Chain(|l, r| l >= r),
        Operator::Eq => Chain(approx_eq),
        Operator::NotEq => Chain(|l, r| !approx_eq(l, r)),
        Operator::And | Operator::Or => return None,
    })
}

/// Operators available when the first argument is a boolean.
pub fn boolean_operation(operator: Operator) -> Option<ListOperation<bool>> {
    use ListOperation::*;
    Some(match operator {
        Operator::Eq => Chain(|l, r| l == r),
        Operator::NotEq => Chain(|l, r| l != r),
        Operator::And => Chain(|l, r| l && r),
        Operator::Or => Chain(|l, r| l || r),
        _ => return None,
    })
}

impl<T: Copy> ListOperation<T> {
    /// Applies the operation to a non-empty list of operands.
    fn eval_list(self, operands: &[T]) -> Option<Value>
    where
        Value: From<T>,
    {
        match self {
            ListOperation::Reduce(func) => {
                let (first, rest) = operands.split_first()?;
                Some(Value::from(rest.iter().fold(*first, |acc, n| func(acc, *n))))
            }
            ListOperation::Chain(compare) => Some(Value::Bool(
                operands.windows(2).all(|pair| compare(pair[0], pair[1])),
            )),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

// Converts every operand with `extract`, failing on the first one of the wrong type.
fn expect_all<T>(
    operands: &[(Value, Span)],
    expected: &'static str,
    extract: fn(&Value) -> Option<T>,
) -> EvalResult<Vec<T>> {
    operands
        .iter()
        .map(|(value, span)| {
            extract(value).ok_or(EvalError::TypeMismatch {
                expected,
                found: value.type_name(),
                span: *span,
            })
        })
        .collect()
}

/// Applies `operator` to already evaluated operands, each paired with the
/// span of the expression it came from. The type of the first operand
/// selects the operator table; `span` covers the whole form.
pub fn apply(operator: Operator, operands: &[(Value, Span)], span: Span) -> EvalResult<Value> {
    let Some((first, _)) = operands.first() else {
        return Err(EvalError::MissingOperands { operator, span });
    };
    let not_found = || EvalError::OperatorNotFound {
        operator,
        type_name: first.type_name(),
        span,
    };
    let result = match first {
        Value::Number(_) => {
            let operation = number_operation(operator).ok_or_else(not_found)?;
            operation.eval_list(&expect_all(operands, "number", Value::as_number)?)
        }
        Value::Bool(_) => {
            let operation = boolean_operation(operator).ok_or_else(not_found)?;
            operation.eval_list(&expect_all(operands, "boolean", Value::as_bool)?)
        }
        Value::Pair(..) | Value::Closure(_) => return Err(not_found()),
    };
    // Operands are non-empty here, so a result always exists.
    result.ok_or(EvalError::MissingOperands { operator, span })
}
