//! quizzig - regression tests for shell sessions embedded in prose
//!
//! A test file is prose interleaved with indented blocks that look like a shell session:
//! lines beginning with a prompt marker (`$ `) are commands; the indented lines that follow
//! record the output their author expects. quizzig parses such files, runs every command
//! under a real shell, compares actual output to expected output line by line, and reports
//! differences as a unified diff that `patch -p0` accepts back into the file.
//!
//! # Dialects
//!
//! Two indent widths are recognized: 2-space (the legacy dialect, conventionally `.t` files)
//! and 4-space (the markdown dialect, conventionally `.md` files). The indent width is a
//! single CLI-wide choice (`--indent=N`, default 2) applied to every file in the run; file
//! discovery separately accepts both `.t` and `.md` suffixes regardless of indent width.
//!
//! # Expected-output annotations
//!
//! An expected line's trailing annotation picks its matcher:
//!
//! ```text
//! $ echo hello.txt
//! *.txt (glob)                  # '*' / '?' / backslash-escape, fully anchored
//! $ echo "2024-01-15"
//! \d{4}-\d{2}-\d{2} (re)         # Perl-compatible regex, fully anchored
//! $ printf '\x00\x01'
//! \x00\x01 (esc)                 # backslash-escaped bytes, compared literally after unescaping
//! ```
//!
//! plain lines with no suffix match literally, and `(no-eol)` records that the line's command
//! produced no trailing newline.
//!
//! # Example
//!
//! ```
//! use quizzig::parser::parse;
//!
//! let doc = "  $ echo hello\n  hello\n";
//! let commands = parse(doc, 2);
//! assert_eq!(commands.len(), 1);
//! assert_eq!(commands[0].command_lines, vec!["echo hello"]);
//! ```

pub mod config;
pub mod diff;
pub mod discover;
pub mod executor;
pub mod matcher;
pub mod orchestrator;
pub mod parser;

pub use config::Config;
pub use diff::{build_hunks, render_unified_diff, DiffLine, DiffPrefix, Hunk};
pub use executor::{execute, CommandResult, ExecuteError};
pub use matcher::{ExpectedLine, MatcherKind};
pub use orchestrator::{cleanup_on_interrupt, evaluate_file, run, FileOutcome, OrchestratorError, RunSummary};
pub use parser::{parse, TestCommand};
