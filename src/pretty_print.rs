use crate::parser::MAX_DEPTH;
use crate::{EnvError, Error, EvalError, ParseError};
use ariadne::{Config, Label, Report, ReportKind, Source};
use std::io;
use std::ops::Range;

type SourceSpan<'a> = (&'a str, Range<usize>);

impl ParseError {
    fn report<'a>(&self, source_id: &'a str, config: Config) -> Report<'a, SourceSpan<'a>> {
        let range = self.span().to_range();
        let label = Label::new((source_id, range.clone()));
        let (message, label) = match self {
            ParseError::UnexpectedEof(_) => (
                "Unexpected end of input".to_string(),
                label.with_message("Expected an expression here"),
            ),
            ParseError::UnexpectedCloseParen(_) => (
                "Unexpected `)`".to_string(),
                label.with_message("This `)` does not close anything"),
            ),
            ParseError::UnbalancedParens(_) => (
                "Unbalanced parentheses".to_string(),
                label.with_message("This `(` is never closed"),
            ),
            ParseError::EmptyList(_) => (
                "Empty list".to_string(),
                label.with_message("`()` is not a valid expression"),
            ),
            ParseError::InvalidSpecialForm { message, .. } => (
                format!("Invalid special form: {}", message),
                label.with_message("This special form is malformed"),
            ),
            ParseError::TooDeep(_) => (
                "Nesting too deep".to_string(),
                label.with_message(format!("This list is nested more than {} levels deep", MAX_DEPTH)),
            ),
        };
        Report::build(ReportKind::Error, (source_id, range))
            .with_message(message)
            .with_label(label)
            .with_config(config)
            .finish()
    }
}

impl EvalError {
    fn report<'a>(&self, source_id: &'a str, config: Config) -> Report<'a, SourceSpan<'a>> {
        let range = self.span().to_range();
        let label = Label::new((source_id, range.clone()));
        let (message, label) = match self {
            EvalError::EnvError(EnvError::UnboundVariable(symbol, _)) => (
                format!("Unbound symbol `{}`", symbol),
                label.with_message("This symbol is not defined in the current scope"),
            ),
            EvalError::NotAProcedure { found, .. } => (
                format!("Not a procedure: {}", found),
                label.with_message("This expression cannot be called as a procedure"),
            ),
            EvalError::TypeMismatch {
                expected, found, ..
            } => (
                "Type mismatch".to_string(),
                label.with_message(format!("Expected {}, found {}", expected, found)),
            ),
            EvalError::OperatorNotFound {
                operator,
                type_name,
                ..
            } => (
                format!("Operator `{}` not found", operator),
                label.with_message(format!("`{}` is not defined for {} operands", operator, type_name)),
            ),
            EvalError::MissingOperands { operator, .. } => (
                format!("Operator `{}` has no operands", operator),
                label.with_message("Add at least one operand"),
            ),
            EvalError::NoValue { .. } => (
                "Missing value".to_string(),
                label.with_message("`define` does not produce a value"),
            ),
        };
        Report::build(ReportKind::Error, (source_id, range))
            .with_message(message)
            .with_label(label)
            .with_config(config)
            .finish()
    }
}

impl Error {
    fn report<'a>(&self, source_id: &'a str, config: Config) -> Report<'a, SourceSpan<'a>> {
        match self {
            Error::Parse(e) => e.report(source_id, config),
            Error::Eval(e) => e.report(source_id, config),
        }
    }

    /// Prints a labelled report of this error against `input` to stderr.
    pub fn pretty_print(&self, source_id: &str, input: &str) -> io::Result<()> {
        self.report(source_id, Config::default())
            .eprint((source_id, Source::from(input)))
    }

    /// Writes an uncoloured report, for logs and tests.
    pub fn write_report<W: io::Write>(&self, source_id: &str, input: &str, w: W) -> io::Result<()> {
        self.report(source_id, Config::default().with_color(false))
            .write((source_id, Source::from(input)), w)
    }
}
