//! Orchestrator: drives one file through parse -> env setup -> execute -> diff -> report,
//! and aggregates outcomes across a run of many files.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::{build_env, Config};
use crate::diff::{align_command, apply_corrections, build_correction, build_hunks, render_unified_diff, Correction, DiffLine};
use crate::executor::{self, ExecuteError};
use crate::parser;

/// Exit code a test command can use to mean "skip me, don't count as pass or fail".
const SKIP_EXIT_CODE: i32 = 80;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("failed to read {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to create temp directory {path}: {source}")]
    TempDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Execute(#[from] ExecuteError),
    #[error("failed to write patched file {path}: {source}")]
    WritePatch {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// How one file's evaluation came out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Passed,
    Skipped { reason: String },
    Failed { diff: String },
    Patched,
    Error { message: String },
}

impl FileOutcome {
    /// The single character the orchestrator prints to stderr per file.
    pub fn progress_char(&self) -> char {
        match self {
            FileOutcome::Passed => '.',
            FileOutcome::Skipped { .. } => 's',
            FileOutcome::Failed { .. } => '!',
            FileOutcome::Patched => 'P',
            FileOutcome::Error { .. } => 'E',
        }
    }
}

/// Aggregate counts across every file in a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub passed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub patched: usize,
    pub errored: usize,
}

impl RunSummary {
    pub fn total(&self) -> usize {
        self.passed + self.skipped + self.failed + self.patched + self.errored
    }

    /// 0 iff nothing failed or errored; 1 otherwise, matching the tool's exit-code contract.
    pub fn exit_code(&self) -> i32 {
        if self.failed > 0 || self.errored > 0 {
            1
        } else {
            0
        }
    }

    fn record(&mut self, outcome: &FileOutcome) {
        match outcome {
            FileOutcome::Passed => self.passed += 1,
            FileOutcome::Skipped { .. } => self.skipped += 1,
            FileOutcome::Failed { .. } => self.failed += 1,
            FileOutcome::Patched => self.patched += 1,
            FileOutcome::Error { .. } => self.errored += 1,
        }
    }
}

/// One run's temp directory tree, removed on drop unless the caller opted to keep it.
///
/// Combines the process start time with a fresh random value so concurrent or rapid-fire
/// invocations never collide; each file gets its own basename-named subdirectory under it.
pub struct TempRoot {
    path: PathBuf,
    keep: bool,
}

impl TempRoot {
    pub fn create(keep: bool) -> io::Result<Self> {
        let nonce: u64 = rand::random();
        let secs = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let path = std::env::temp_dir().join(format!("cramtests-{}-{:x}", secs, nonce));
        fs::create_dir_all(&path)?;
        if !keep {
            *CURRENT_TEMP_ROOT.lock().unwrap() = Some(path.clone());
        }
        Ok(TempRoot { path, keep })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempRoot {
    fn drop(&mut self) {
        CURRENT_TEMP_ROOT.lock().unwrap().take();
        if !self.keep {
            let _ = fs::remove_dir_all(&self.path);
        }
    }
}

/// The live run's temp-root path, published for [`cleanup_on_interrupt`] to remove if the
/// process is killed by a signal before the [`TempRoot`] guard unwinds normally.
static CURRENT_TEMP_ROOT: std::sync::Mutex<Option<PathBuf>> = std::sync::Mutex::new(None);

/// Best-effort cleanup of whatever run temp-root is currently live. Intended to be called
/// from a SIGINT handler, where `Drop` does not run.
pub fn cleanup_on_interrupt() {
    if let Some(path) = CURRENT_TEMP_ROOT.lock().unwrap().take() {
        let _ = fs::remove_dir_all(path);
    }
}

/// Evaluate one file: parse, build its temp subdirectory and environment, execute, and
/// either diff its failures or (in patch mode) rewrite it in place.
pub fn evaluate_file(
    path: &Path,
    config: &Config,
    run_tmp_root: &Path,
    root_dir: &Path,
) -> Result<FileOutcome, OrchestratorError> {
    log::debug!("parsing {}", path.display());
    let bytes = fs::read(path).map_err(|source| OrchestratorError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    let content = String::from_utf8_lossy(&bytes).into_owned();
    let commands = parser::parse(&content, config.indent);

    if commands.is_empty() {
        return Ok(FileOutcome::Skipped {
            reason: "(no commands)".to_string(),
        });
    }

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("test")
        .to_string();
    let file_tmp = run_tmp_root.join(&file_name);
    fs::create_dir_all(&file_tmp).map_err(|source| OrchestratorError::TempDir {
        path: file_tmp.clone(),
        source,
    })?;

    let test_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let env = build_env(config, test_dir, &file_name, &file_tmp, root_dir);

    log::debug!(
        "executing {} command(s) from {} in {}",
        commands.len(),
        path.display(),
        file_tmp.display()
    );
    let results = executor::execute(&commands, &config.shell, &file_tmp, &env, config.debug)?;

    if config.debug {
        // No marker protocol ran, so there's nothing to compare: every command is reported
        // as passed, matching the documented debug-mode contract.
        return Ok(FileOutcome::Passed);
    }

    let mut skip_reason: Option<String> = None;
    let mut diff_lines: Vec<DiffLine> = Vec::new();
    let mut corrections: Vec<Correction> = Vec::new();
    let mut any_failed = false;

    for (cmd, result) in commands.iter().zip(results.iter()) {
        if result.exit_code == SKIP_EXIT_CODE {
            if skip_reason.is_none() {
                skip_reason = Some(cmd.command_lines[0].to_string());
            }
            continue;
        }

        let aligned = align_command(cmd, result);
        if aligned.iter().any(DiffLine::is_diff) {
            any_failed = true;
            if config.patch {
                corrections.push(build_correction(cmd, result, config.indent));
            }
        }
        diff_lines.extend(aligned);
    }

    if any_failed {
        log::debug!("{} failed", path.display());
        if config.patch {
            let patched = apply_corrections(&content, &mut corrections);
            fs::write(path, patched).map_err(|source| OrchestratorError::WritePatch {
                path: path.to_path_buf(),
                source,
            })?;
            return Ok(FileOutcome::Patched);
        }

        let original_lines: Vec<&str> = content.lines().collect();
        let hunks = build_hunks(&diff_lines, &original_lines);
        let diff_text = render_unified_diff(&path.display().to_string(), &hunks);
        return Ok(FileOutcome::Failed { diff: diff_text });
    }

    if let Some(reason) = skip_reason {
        return Ok(FileOutcome::Skipped { reason });
    }

    log::debug!("{} passed", path.display());
    Ok(FileOutcome::Passed)
}

/// Drive a whole run: evaluate every file in order, print progress characters to stderr as
/// it goes, and return the aggregate counts plus the buffered diff text for stdout.
pub fn run(paths: &[PathBuf], config: &Config, root_dir: &Path) -> (RunSummary, String) {
    let tmp_root = match TempRoot::create(config.keep_tmpdir) {
        Ok(t) => t,
        Err(source) => {
            log::error!("failed to create run temp directory: {}", source);
            let mut summary = RunSummary::default();
            summary.errored = paths.len().max(1);
            return (summary, String::new());
        }
    };

    let mut summary = RunSummary::default();
    let mut diff_text = String::new();

    for path in paths {
        let outcome = evaluate_file(path, config, tmp_root.path(), root_dir).unwrap_or_else(|e| {
            log::error!("{}: {}", path.display(), e);
            FileOutcome::Error {
                message: e.to_string(),
            }
        });

        eprint!("{}", outcome.progress_char());
        if config.verbose {
            eprintln!(" {}", path.display());
        }

        if let FileOutcome::Failed { diff } = &outcome {
            if !config.quiet {
                diff_text.push_str(diff);
            }
        }

        summary.record(&outcome);
    }

    if !config.verbose {
        eprintln!();
    }

    (summary, diff_text)
}
