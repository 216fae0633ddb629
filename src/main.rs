use clap::Parser;
use snow::{CallFrames, Environment, Evaluator, eval_program};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const DEMO: &str = "
(define fib (lambda (n)
    (if (= n 0)
        0
        (if (< n 2)
            1
        (+ (fib (- n 1)) (fib (- n 2)))))
    )
)
(fib 25)
";

/// Evaluate a snow program and print the value of its last expression.
#[derive(Debug, Parser)]
#[command(name = "snow", version)]
struct Cli {
    /// Source file to run. Runs a Fibonacci demo when omitted.
    file: Option<PathBuf>,

    /// How calls bind their parameters: `per-call` or `shared`.
    #[arg(long, default_value_t = CallFrames::PerCall)]
    frames: CallFrames,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let (source_id, input) = match &cli.file {
        Some(path) => match std::fs::read_to_string(path) {
            Ok(input) => (path.display().to_string(), input),
            Err(e) => {
                eprintln!("{}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => ("demo".to_string(), DEMO.to_string()),
    };

    let env = Environment::new();
    match eval_program(&input, &env, Evaluator::new(cli.frames)) {
        Ok(Some(value)) => {
            println!("> {}", value);
            ExitCode::SUCCESS
        }
        Ok(None) => ExitCode::SUCCESS,
        Err(e) => {
            if e.pretty_print(&source_id, &input).is_err() {
                eprintln!("Error: {}", e);
            }
            ExitCode::FAILURE
        }
    }
}
