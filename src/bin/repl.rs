use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use clap::Parser;
use rustyline::error::ReadlineError;
use rustyline::highlight::{CmdKind, Highlighter};
use rustyline::validate::{ValidationContext, ValidationResult, Validator};
use rustyline::{Cmd, Completer, Context, Editor, EventHandler, KeyCode, KeyEvent, Modifiers};
use rustyline::{Helper, Highlighter, Hinter, Validator};
use snow::{
    Balance, CallFrames, Environment, Evaluator, TokenKind, ast, balance, eval_program, tokenize,
};
use tracing_subscriber::EnvFilter;

struct SnowCompleter {
    env: Rc<RefCell<Environment>>,
}

impl SnowCompleter {
    fn new(env: Rc<RefCell<Environment>>) -> Self {
        SnowCompleter { env }
    }
}

impl rustyline::completion::Completer for SnowCompleter {
    type Candidate = String;
    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<String>)> {
        let tokens = tokenize(&line[..pos]);
        let prefix = match tokens.last() {
            // Only complete a word the cursor is still touching.
            Some(token) if token.kind == TokenKind::Atom && token.span.end == pos => token.text,
            _ => return Ok((pos, vec![])),
        };
        let mut candidates: Vec<String> = self
            .env
            .borrow()
            .identifiers()
            .into_iter()
            .chain(ast::reserved_words().map(str::to_string))
            .filter_map(|id| id.strip_prefix(prefix).map(str::to_string))
            .filter(|rest| !rest.is_empty())
            .collect();
        candidates.sort();
        candidates.dedup();
        Ok((pos, candidates))
    }
}

#[derive(Completer, Helper, Highlighter, Hinter, Validator)]
struct InputValidator {
    #[rustyline(Validator)]
    validator: SnowValidator,
    #[rustyline(Highlighter)]
    highlighter: SnowHighlighter,
    #[rustyline(Completer)]
    completer: SnowCompleter,
}

struct SnowValidator;

impl Validator for SnowValidator {
    fn validate(&self, ctx: &mut ValidationContext) -> rustyline::Result<ValidationResult> {
        Ok(match balance(ctx.input()) {
            Balance::Closed => ValidationResult::Valid(None),
            Balance::Open(_) => ValidationResult::Incomplete,
            Balance::Unmatched(span) => ValidationResult::Invalid(Some(format!(
                "  - Unmatched ')' at position {}",
                span.start
            ))),
        })
    }
}

struct SnowHighlighter;

impl Highlighter for SnowHighlighter {
    // Highlights the parenthesis under the cursor together with its partner.
    fn highlight<'l>(&self, line: &'l str, pos: usize) -> std::borrow::Cow<'l, str> {
        let mut stack: Vec<usize> = Vec::new();
        let mut pair = None;
        let mut unmatched = Vec::new();
        for (i, c) in line.char_indices() {
            match c {
                '(' => stack.push(i),
                ')' => match stack.pop() {
                    Some(open) if pos == i || pos == i + 1 || pos == open => pair = Some((open, i)),
                    Some(_) => {}
                    None => unmatched.push(i),
                },
                _ => {}
            }
        }
        if pair.is_none() && unmatched.is_empty() {
            return std::borrow::Cow::Borrowed(line);
        }

        let mut highlighted = String::with_capacity(line.len() + 16);
        for (i, c) in line.char_indices() {
            if matches!(pair, Some((open, close)) if i == open || i == close) {
                highlighted.push_str(&format!("\x1b[1;34m{}\x1b[0m", c)); // Blue for matching parens
            } else if unmatched.contains(&i) {
                highlighted.push_str(&format!("\x1b[31m{}\x1b[0m", c)); // Red for unmatched ')'
            } else {
                highlighted.push(c);
            }
        }
        std::borrow::Cow::Owned(highlighted)
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _kind: CmdKind) -> bool {
        true
    }
}

/// Interactive snow session.
#[derive(Debug, Parser)]
#[command(name = "snow-repl", version)]
struct ReplConfig {
    /// Use vi key bindings instead of emacs ones.
    #[arg(long)]
    vi: bool,

    /// Where to keep the input history.
    #[arg(long, default_value = "snow_history.txt")]
    history: PathBuf,

    /// How calls bind their parameters: `per-call` or `shared`.
    #[arg(long, default_value_t = CallFrames::PerCall)]
    frames: CallFrames,
}

fn main() -> rustyline::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    let config = ReplConfig::parse();

    println!("Snow REPL v{}", env!("CARGO_PKG_VERSION"));
    println!("Type 'exit' or press Ctrl-D to quit.");

    let evaluator = Evaluator::new(config.frames);
    let global_env = Environment::new();
    let h = InputValidator {
        highlighter: SnowHighlighter,
        validator: SnowValidator,
        completer: SnowCompleter::new(global_env.clone()),
    };
    let edit_mode = if config.vi {
        rustyline::EditMode::Vi
    } else {
        rustyline::EditMode::Emacs
    };
    let rl_config = rustyline::config::Config::builder()
        .edit_mode(edit_mode)
        .build();
    let mut rl = Editor::with_config(rl_config)?;
    rl.set_helper(Some(h));
    rl.bind_sequence(
        KeyEvent(KeyCode::Char('s'), Modifiers::CTRL),
        EventHandler::Simple(Cmd::Newline),
    );
    if rl.load_history(&config.history).is_err() {
        println!("No previous history.");
    }

    loop {
        match rl.readline("snow> ") {
            Ok(line) => {
                rl.add_history_entry(line.as_str())?;
                let trimmed_input = line.trim();
                if trimmed_input.is_empty() {
                    continue;
                }
                if trimmed_input.eq_ignore_ascii_case("exit") {
                    break;
                }

                match eval_program(trimmed_input, &global_env, evaluator) {
                    Ok(Some(value)) => println!("{}", value),
                    Ok(None) => {}
                    Err(e) => {
                        if e.pretty_print("REPL", trimmed_input).is_err() {
                            eprintln!("Error: {}", e);
                        }
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl-C
                println!("Interrupted. Type 'exit' or Ctrl-D to quit.");
            }
            Err(ReadlineError::Eof) => {
                // Ctrl-D
                println!("\nExiting.");
                break;
            }
            Err(err) => {
                eprintln!("Readline Error: {:?}", err);
                break;
            }
        }
    }
    rl.save_history(&config.history)
}
