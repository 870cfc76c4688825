//! End-to-end tests driving the `quizzig` binary against real `.t`/`.md` files on disk.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

fn quizzig() -> Command {
    Command::cargo_bin("quizzig").unwrap()
}

fn write(dir: &std::path::Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn s1_glob_dialect_passes() {
    let dir = tempdir().unwrap();
    let file = write(dir.path(), "glob.t", "  $ echo hello.txt\n  *.txt (glob)\n");
    quizzig()
        .arg(&file)
        .assert()
        .success()
        .stderr(predicate::str::contains("1 tests"))
        .stderr(predicate::str::contains("0 failed"));
}

#[test]
fn s2_regex_dialect_passes() {
    let dir = tempdir().unwrap();
    let file = write(
        dir.path(),
        "regex.t",
        "  $ echo \"2024-01-15\"\n  \\d{4}-\\d{2}-\\d{2} (re)\n",
    );
    quizzig().arg(&file).assert().success();
}

#[test]
fn s3_escape_dialect_passes() {
    let dir = tempdir().unwrap();
    let file = write(
        dir.path(),
        "esc.t",
        "  $ printf '\\x00\\x01'\n  \\x00\\x01 (esc)\n",
    );
    quizzig().arg(&file).assert().success();
}

#[test]
fn s4_nonzero_exit_code_participates_in_alignment() {
    let dir = tempdir().unwrap();
    let ok = write(dir.path(), "ok.t", "  $ (exit 42)\n  [42]\n");
    quizzig().arg(&ok).assert().success();

    let broken = write(dir.path(), "broken.t", "  $ (exit 42)\n");
    quizzig()
        .arg(&broken)
        .assert()
        .failure()
        .stdout(predicate::str::contains("+[42]"));
}

#[test]
fn s5_patch_mode_rewrites_file_to_a_passing_state() {
    let dir = tempdir().unwrap();
    let file = write(
        dir.path(),
        "fix.t",
        "  $ echo one\n  wrong-one\n  $ echo two\n  wrong-two\n",
    );

    quizzig().arg("-i").arg(&file).assert().success();

    let patched = fs::read_to_string(&file).unwrap();
    assert_eq!(patched, "  $ echo one\n  one\n  $ echo two\n  two\n");

    // Re-running the patched file now passes with zero failures.
    quizzig()
        .arg(&file)
        .assert()
        .success()
        .stderr(predicate::str::contains("0 failed"));
}

#[test]
fn s6_diff_groups_removals_before_additions() {
    let dir = tempdir().unwrap();
    let file = write(dir.path(), "group.t", "  $ printf 'a\\nb\\n'\n  x\n  y\n");
    let output = quizzig().arg(&file).assert().failure().get_output().stdout.clone();
    let text = String::from_utf8(output).unwrap();

    let minus_x = text.find("-x").unwrap();
    let minus_y = text.find("-y").unwrap();
    let plus_a = text.find("+a").unwrap();
    let plus_b = text.find("+b").unwrap();
    assert!(minus_x < minus_y);
    assert!(minus_y < plus_a);
    assert!(plus_a < plus_b);
}

#[test]
fn s7_directory_discovery_finds_both_extensions_sorted() {
    let dir = tempdir().unwrap();
    write(dir.path(), "b.t", "  $ true\n");
    write(dir.path(), "a.md", "    $ true\n");
    write(dir.path(), "ignore.txt", "not a test file");

    quizzig()
        .arg(dir.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("2 tests"));
}

#[test]
fn s8_exit_code_matches_failure_summary() {
    let dir = tempdir().unwrap();
    let file = write(dir.path(), "fail.t", "  $ echo hi\n  bye\n");
    quizzig().arg(&file).assert().failure().code(1);

    let ok = write(dir.path(), "ok.t", "  $ echo hi\n  hi\n");
    quizzig().arg(&ok).assert().success().code(0);
}

#[test]
fn s9_env_contract_exposes_testdir_cramtmp_and_marker_var() {
    let dir = tempdir().unwrap();
    let file = write(
        dir.path(),
        "env.t",
        "  $ test \"$TESTDIR\" = \"$TESTDIR\" && echo testdir-ok\n  testdir-ok\n  $ echo $QUIZZIG\n  1\n  $ test -d \"$CRAMTMP\" && echo cramtmp-ok\n  cramtmp-ok\n",
    );
    quizzig().arg(&file).assert().success();
}

#[test]
fn skip_exit_code_eighty_does_not_count_as_failure() {
    let dir = tempdir().unwrap();
    let file = write(dir.path(), "skip.t", "  $ exit 80\n");
    quizzig()
        .arg(&file)
        .assert()
        .success()
        .stderr(predicate::str::contains("1 skipped"));
}

#[test]
fn quiet_flag_suppresses_diff_but_keeps_exit_code() {
    let dir = tempdir().unwrap();
    let file = write(dir.path(), "fail.t", "  $ echo hi\n  bye\n");
    quizzig()
        .arg("-q")
        .arg(&file)
        .assert()
        .failure()
        .stdout(predicate::str::is_empty());
}

#[test]
fn empty_file_is_skipped_not_failed() {
    let dir = tempdir().unwrap();
    let file = write(dir.path(), "prose.t", "Just some prose, no commands here.\n");
    quizzig()
        .arg(&file)
        .assert()
        .success()
        .stderr(predicate::str::contains("1 skipped"));
}

#[test]
fn markdown_dialect_runs_with_explicit_four_space_indent() {
    let dir = tempdir().unwrap();
    let file = write(
        dir.path(),
        "doc.md",
        "Some narrative text.\n\n    $ echo hello\n    hello\n\nMore narrative.\n",
    );
    quizzig().arg("--indent=4").arg(&file).assert().success();
}

#[test]
fn help_and_version_flags_exit_success() {
    quizzig().arg("--help").assert().success();
    quizzig().arg("--version").assert().success();
}

#[test]
fn unknown_flag_is_a_hard_error() {
    quizzig().arg("--bogus-flag").assert().failure();
}
