//! Command-line argument parsing.
//!
//! A small hand-rolled parser, not an external argument-parsing crate: the flag set in the
//! external-interface contract is short and fixed, and this mirrors the split between the
//! data plane (the parser never fails on malformed test input) and the control plane (CLI
//! misuse is a hard, immediate error).

use std::path::PathBuf;

use quizzig::Config;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Parsed CLI invocation: a run configuration plus the paths to evaluate.
pub struct Cli {
    pub config: Config,
    pub paths: Vec<PathBuf>,
}

/// Result of parsing argv: either a run to perform, or a request to print something and exit.
pub enum ParseOutcome {
    Run(Cli),
    Help,
    Version,
    Error(String),
}

/// Parse an argv-style iterator (including argv[0]) into a [`ParseOutcome`].
pub fn parse_args<I: IntoIterator<Item = String>>(args: I) -> ParseOutcome {
    let mut config = Config::default();
    let mut paths = Vec::new();

    let mut iter = args.into_iter();
    let _program = iter.next();

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-q" | "--quiet" => config.quiet = true,
            "-v" | "--verbose" => config.verbose = true,
            "-d" | "--debug" => config.debug = true,
            "-i" | "--patch" => config.patch = true,
            "-E" | "--inherit-env" => config.inherit_env = true,
            "--keep-tmpdir" => config.keep_tmpdir = true,
            "-V" | "--version" => return ParseOutcome::Version,
            "-h" | "--help" => return ParseOutcome::Help,

            "--shell" => match iter.next() {
                Some(v) => config.shell = v,
                None => return ParseOutcome::Error("--shell requires a path argument".to_string()),
            },
            _ if arg.starts_with("--shell=") => {
                config.shell = arg["--shell=".len()..].to_string();
            }

            "--indent" => match iter.next().as_deref().and_then(|v| v.parse().ok()) {
                Some(n) => config.indent = n,
                None => return ParseOutcome::Error("--indent requires a numeric argument".to_string()),
            },
            _ if arg.starts_with("--indent=") => match arg["--indent=".len()..].parse() {
                Ok(n) => config.indent = n,
                Err(_) => return ParseOutcome::Error(format!("invalid --indent value: {}", arg)),
            },

            "-e" | "--env" => match iter.next() {
                Some(v) => match parse_env_pair(&v) {
                    Some(pair) => config.env_overrides.push(pair),
                    None => {
                        return ParseOutcome::Error(format!(
                            "invalid -e/--env value (expected VAR=VAL): {}",
                            v
                        ))
                    }
                },
                None => return ParseOutcome::Error("-e/--env requires a VAR=VAL argument".to_string()),
            },
            _ if arg.starts_with("--env=") => match parse_env_pair(&arg["--env=".len()..]) {
                Some(pair) => config.env_overrides.push(pair),
                None => return ParseOutcome::Error(format!("invalid --env value: {}", arg)),
            },

            "--bindir" => match iter.next() {
                Some(v) => config.bindirs.push(v),
                None => return ParseOutcome::Error("--bindir requires a directory argument".to_string()),
            },
            _ if arg.starts_with("--bindir=") => {
                config.bindirs.push(arg["--bindir=".len()..].to_string());
            }

            _ if arg.starts_with('-') && arg.len() > 1 => {
                return ParseOutcome::Error(format!("unknown flag: {}", arg));
            }
            _ => paths.push(PathBuf::from(arg)),
        }
    }

    if paths.is_empty() {
        paths.push(PathBuf::from("."));
    }

    ParseOutcome::Run(Cli { config, paths })
}

fn parse_env_pair(s: &str) -> Option<(String, String)> {
    let (k, v) = s.split_once('=')?;
    if k.is_empty() {
        return None;
    }
    Some((k.to_string(), v.to_string()))
}

pub fn print_version() {
    println!("quizzig {}", VERSION);
}

pub fn print_help() {
    println!(
        r#"quizzig {version} - regression tests for shell sessions embedded in prose

USAGE:
    quizzig [OPTIONS] [PATH...]

Each PATH is a test file or a directory searched recursively for `.t`/`.md` test files. With
no PATH, the current directory is searched.

OPTIONS:
    -q, --quiet           suppress diff output; counts and progress are still printed
    -v, --verbose         one progress line per file, with its path
    -d, --debug           pass child shell output through to the terminal; report all as passed
    -i, --patch           rewrite failing files in place with the actual output
        --shell PATH      shell binary to run commands under (default /bin/sh)
        --indent N        indent width of the test-file dialect (default 2)
    -E, --inherit-env     inherit the parent process environment as the run's base environment
    -e, --env VAR=VAL     set an environment variable for every test (repeatable)
        --bindir DIR      prepend DIR to PATH for every test (repeatable; last flag wins)
        --keep-tmpdir     do not delete the run's temp directory tree on exit
    -V, --version         print the version and exit
    -h, --help            print this help and exit
"#,
        version = VERSION
    );
}
