//! Run configuration: the flags and environment knobs threaded from the CLI into the
//! orchestrator and executor.

use std::collections::HashMap;
use std::env;
use std::path::Path;

/// Everything the orchestrator/executor need to know about how to run a batch of files.
#[derive(Debug, Clone)]
pub struct Config {
    pub indent: usize,
    pub shell: String,
    pub inherit_env: bool,
    pub env_overrides: Vec<(String, String)>,
    pub bindirs: Vec<String>,
    pub quiet: bool,
    pub verbose: bool,
    pub debug: bool,
    pub patch: bool,
    pub keep_tmpdir: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            indent: 2,
            shell: "/bin/sh".to_string(),
            inherit_env: false,
            env_overrides: Vec::new(),
            bindirs: Vec::new(),
            quiet: false,
            verbose: false,
            debug: false,
            patch: false,
            keep_tmpdir: false,
        }
    }
}

/// Build the environment map a single test file's shell session runs under, per the tool's
/// normalized-locale / per-test-directory contract.
pub fn build_env(
    config: &Config,
    test_dir: &Path,
    test_file: &str,
    tmp_dir: &Path,
    root_dir: &Path,
) -> HashMap<String, String> {
    let mut env: HashMap<String, String> = HashMap::new();

    if config.inherit_env {
        for (k, v) in env::vars() {
            env.insert(k, v);
        }
    }

    env.insert("LANG".to_string(), "C".to_string());
    env.insert("LC_ALL".to_string(), "C".to_string());
    env.insert("LANGUAGE".to_string(), "C".to_string());
    env.insert("TZ".to_string(), "GMT".to_string());
    env.insert("CDPATH".to_string(), String::new());
    env.insert("COLUMNS".to_string(), "80".to_string());
    env.insert("GREP_OPTIONS".to_string(), String::new());

    let tmp_str = tmp_dir.to_string_lossy().into_owned();
    env.insert("TMPDIR".to_string(), tmp_str.clone());
    env.insert("TEMP".to_string(), tmp_str.clone());
    env.insert("TMP".to_string(), tmp_str.clone());
    env.insert("HOME".to_string(), tmp_str.clone());

    env.insert("QUIZZIG".to_string(), "1".to_string());

    let base_path = if config.inherit_env {
        env::var("PATH").unwrap_or_else(|_| "/usr/local/bin:/usr/bin:/bin".to_string())
    } else {
        "/usr/local/bin:/usr/bin:/bin".to_string()
    };
    // Repeated --bindir flags stack so that the last-given one wins: it ends up first.
    let mut path_parts: Vec<String> = config.bindirs.iter().rev().cloned().collect();
    path_parts.push(base_path);
    env.insert("PATH".to_string(), path_parts.join(":"));

    env.insert(
        "TESTDIR".to_string(),
        test_dir.to_string_lossy().into_owned(),
    );
    env.insert("TESTFILE".to_string(), test_file.to_string());
    env.insert("TESTSHELL".to_string(), config.shell.clone());
    env.insert("CRAMTMP".to_string(), tmp_str);
    env.insert(
        "ROOTDIR".to_string(),
        root_dir.to_string_lossy().into_owned(),
    );

    for (k, v) in &config.env_overrides {
        env.insert(k.clone(), v.clone());
    }

    env
}
