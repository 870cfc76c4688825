//! quizzig - regression tests for shell sessions embedded in prose
//!
//! Usage:
//!   quizzig [OPTIONS] [PATH...]    Run every `.t`/`.md` test file found under PATH

mod cli;

use std::io::Write;
use std::process::ExitCode;

use quizzig::{discover, orchestrator, Config};

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    match cli::parse_args(args) {
        cli::ParseOutcome::Help => {
            cli::print_help();
            ExitCode::SUCCESS
        }
        cli::ParseOutcome::Version => {
            cli::print_version();
            ExitCode::SUCCESS
        }
        cli::ParseOutcome::Error(message) => {
            eprintln!("quizzig: {}", message);
            ExitCode::FAILURE
        }
        cli::ParseOutcome::Run(run) => run_tests(run.config, run.paths),
    }
}

fn run_tests(config: Config, paths: Vec<std::path::PathBuf>) -> ExitCode {
    let default_level = if config.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    // On SIGINT, clean up whatever run temp-root is live before the default handler tears
    // the process down; `Drop` never gets to run across a raw signal termination.
    let _ = ctrlc::set_handler(|| {
        orchestrator::cleanup_on_interrupt();
        std::process::exit(130);
    });

    let root_dir = std::env::current_dir().unwrap_or_else(|_| std::path::PathBuf::from("."));

    let files = match discover::discover_all(&paths) {
        Ok(files) => files,
        Err(e) => {
            eprintln!("quizzig: failed to discover test files: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let (summary, diff_text) = orchestrator::run(&files, &config, &root_dir);

    if !diff_text.is_empty() {
        let stdout = std::io::stdout();
        let mut lock = stdout.lock();
        let _ = lock.write_all(diff_text.as_bytes());
    }

    eprintln!(
        "# Ran {} tests, {} skipped, {} failed, {} patched.",
        summary.total(),
        summary.skipped,
        summary.failed,
        summary.patched,
    );

    if summary.exit_code() == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
