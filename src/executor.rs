//! Executor: runs every command of one test file in a single shell session and
//! demultiplexes the merged stdout/stderr stream back to each command's own result.

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Child, Command, Stdio};

use thiserror::Error;

use crate::parser::TestCommand;

/// Hard cap on how much of a single file's combined shell output we'll buffer.
const OUTPUT_CAP_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error("failed to spawn shell {shell:?}: {source}")]
    Spawn {
        shell: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write test script to shell stdin: {0}")]
    WriteScript(#[source] std::io::Error),
    #[error("failed to read shell output: {0}")]
    ReadOutput(#[source] std::io::Error),
}

/// Captured result of running one test command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandResult {
    /// Combined stdout+stderr, with the one trailing newline the marker emitter added
    /// stripped back off.
    pub output: Vec<u8>,
    pub exit_code: i32,
}

/// A fresh per-run salt string of the form `QUIZZIG<16 hex digits>`, used to demultiplex
/// command output from marker lines. Generated per call, never shared process-wide.
pub fn random_salt() -> String {
    let nonce: u64 = rand::random();
    format!("QUIZZIG{}", hex::encode(nonce.to_be_bytes()))
}

/// Build the shell script for one file: every command's physical lines, each followed by a
/// marker emitter (unless `emit_markers` is false, as in debug mode).
fn build_script(commands: &[TestCommand<'_>], salt: &str, emit_markers: bool) -> String {
    let mut script = String::new();
    for (i, cmd) in commands.iter().enumerate() {
        script.push_str(&cmd.script());
        script.push('\n');
        if emit_markers {
            script.push_str(&format!(
                "_quizzig_status=$?; env printf '\\n%s %d %d\\n' '{salt}' {i} \"$_quizzig_status\"\n",
                salt = salt,
                i = i,
            ));
        }
    }
    script
}

fn spawn(
    shell_path: &str,
    cwd: &Path,
    env: &HashMap<String, String>,
    stdout: Stdio,
) -> Result<Child, ExecuteError> {
    Command::new(shell_path)
        .arg("-c")
        .arg("exec 2>&1; sh")
        .current_dir(cwd)
        .env_clear()
        .envs(env)
        .stdin(Stdio::piped())
        .stdout(stdout)
        .spawn()
        .map_err(|source| ExecuteError::Spawn {
            shell: shell_path.to_string(),
            source,
        })
}

/// Run every command of a file in one shell session. `commands` must come from a single
/// parsed file: the whole point is that they share shell state (cwd, variables, functions).
pub fn execute(
    commands: &[TestCommand<'_>],
    shell_path: &str,
    cwd: &Path,
    env: &HashMap<String, String>,
    debug: bool,
) -> Result<Vec<CommandResult>, ExecuteError> {
    if debug {
        return execute_debug(commands, shell_path, cwd, env);
    }

    let salt = random_salt();
    let script = build_script(commands, &salt, true);

    let mut child = spawn(shell_path, cwd, env, Stdio::piped())?;
    {
        let mut stdin = child.stdin.take().expect("stdin was piped");
        stdin
            .write_all(script.as_bytes())
            .map_err(ExecuteError::WriteScript)?;
        // stdin drops here, closing the pipe before we start reading stdout: this is what
        // keeps the single-producer/single-consumer pattern deadlock-free.
    }

    let mut results = vec![CommandResult::default(); commands.len()];
    demux(&mut child, &salt, &mut results)?;

    let _ = child.wait();
    Ok(results)
}

fn execute_debug(
    commands: &[TestCommand<'_>],
    shell_path: &str,
    cwd: &Path,
    env: &HashMap<String, String>,
) -> Result<Vec<CommandResult>, ExecuteError> {
    let salt = random_salt();
    let script = build_script(commands, &salt, false);

    let mut child = spawn(shell_path, cwd, env, Stdio::inherit())?;
    {
        let mut stdin = child.stdin.take().expect("stdin was piped");
        stdin
            .write_all(script.as_bytes())
            .map_err(ExecuteError::WriteScript)?;
    }
    let _ = child.wait();

    Ok(vec![CommandResult::default(); commands.len()])
}

/// Stream the child's stdout, splitting it into lines, and slot each command's output in
/// as soon as its marker line is seen. Bounded by [`OUTPUT_CAP_BYTES`] total bytes read.
fn demux(
    child: &mut Child,
    salt: &str,
    results: &mut [CommandResult],
) -> Result<(), ExecuteError> {
    let stdout = child.stdout.take().expect("stdout was piped");
    let mut reader = BufReader::new(stdout);

    let marker_prefix = {
        let mut p = salt.as_bytes().to_vec();
        p.push(b' ');
        p
    };

    let mut buf: Vec<u8> = Vec::new();
    let mut line: Vec<u8> = Vec::new();
    let mut total_read = 0usize;

    loop {
        line.clear();
        let n = reader
            .read_until(b'\n', &mut line)
            .map_err(ExecuteError::ReadOutput)?;
        if n == 0 {
            break;
        }
        total_read += n;

        if let Some(rest) = line.strip_prefix(marker_prefix.as_slice()) {
            if let Some((idx, exit_code)) = parse_marker(rest) {
                if let Some(slot) = results.get_mut(idx) {
                    let mut output = std::mem::take(&mut buf);
                    if output.last() == Some(&b'\n') {
                        output.pop();
                    }
                    slot.output = output;
                    slot.exit_code = exit_code;
                }
                continue;
            }
        }

        buf.extend_from_slice(&line);

        if total_read >= OUTPUT_CAP_BYTES {
            break;
        }
    }

    Ok(())
}

fn parse_marker(rest: &[u8]) -> Option<(usize, i32)> {
    let text = std::str::from_utf8(rest).ok()?.trim_end();
    let mut parts = text.splitn(2, ' ');
    let idx: usize = parts.next()?.parse().ok()?;
    let exit_code: i32 = parts.next()?.parse().ok()?;
    Some((idx, exit_code))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse as parse_file;
    use std::env;

    fn commands(doc: &str) -> Vec<TestCommand<'_>> {
        parse_file(doc, 2)
    }

    fn empty_env() -> HashMap<String, String> {
        let mut env = HashMap::new();
        env.insert("PATH".to_string(), "/usr/bin:/bin".to_string());
        env
    }

    #[test]
    fn executes_single_command_and_captures_output() {
        let doc = "  $ echo hello\n  hello\n";
        let cmds = commands(doc);
        let cwd = env::temp_dir();
        let results = execute(&cmds, "/bin/sh", &cwd, &empty_env(), false).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].output, b"hello\n");
        assert_eq!(results[0].exit_code, 0);
    }

    #[test]
    fn executes_multiple_commands_in_one_session() {
        let doc = "  $ X=hello\n  $ echo $X\n  hello\n";
        let cmds = commands(doc);
        let cwd = env::temp_dir();
        let results = execute(&cmds, "/bin/sh", &cwd, &empty_env(), false).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].output, b"");
        assert_eq!(results[1].output, b"hello\n");
    }

    #[test]
    fn captures_nonzero_exit_code() {
        let doc = "  $ (exit 42)\n  [42]\n";
        let cmds = commands(doc);
        let cwd = env::temp_dir();
        let results = execute(&cmds, "/bin/sh", &cwd, &empty_env(), false).unwrap();
        assert_eq!(results[0].exit_code, 42);
    }

    #[test]
    fn merges_stderr_into_output() {
        let doc = "  $ echo err 1>&2\n  err\n";
        let cmds = commands(doc);
        let cwd = env::temp_dir();
        let results = execute(&cmds, "/bin/sh", &cwd, &empty_env(), false).unwrap();
        assert_eq!(results[0].output, b"err\n");
    }

    #[test]
    fn state_carries_across_commands_in_one_session() {
        let doc = "  $ cd /\n  $ pwd\n  /\n";
        let cmds = commands(doc);
        let cwd = env::temp_dir();
        let results = execute(&cmds, "/bin/sh", &cwd, &empty_env(), false).unwrap();
        assert_eq!(results[1].output, b"/\n");
    }

    #[test]
    fn debug_mode_reports_empty_output_and_zero_exit() {
        let doc = "  $ echo hello\n  hello\n";
        let cmds = commands(doc);
        let cwd = env::temp_dir();
        let results = execute(&cmds, "/bin/sh", &cwd, &empty_env(), true).unwrap();
        assert_eq!(results[0].output, Vec::<u8>::new());
        assert_eq!(results[0].exit_code, 0);
    }

    #[test]
    fn missing_markers_fall_back_to_zero_default() {
        // A command that kills the shell leaves later markers unemitted.
        let doc = "  $ exec false\n  $ echo unreachable\n  unreachable\n";
        let cmds = commands(doc);
        let cwd = env::temp_dir();
        let results = execute(&cmds, "/bin/sh", &cwd, &empty_env(), false).unwrap();
        assert_eq!(results[1], CommandResult::default());
    }
}
