//! Diff/patch builder: aligns expected output against actual output, assembles unified-diff
//! hunks, and computes in-place patch corrections.

use crate::executor::CommandResult;
use crate::matcher::{escape, ExpectedLine};
use crate::parser::TestCommand;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffPrefix {
    Context,
    Removed,
    Added,
}

impl DiffPrefix {
    fn ch(self) -> char {
        match self {
            DiffPrefix::Context => ' ',
            DiffPrefix::Removed => '-',
            DiffPrefix::Added => '+',
        }
    }
}

/// One line of a diff, anchored at the 1-based source line it belongs to (or, for additions,
/// the line of the preceding non-addition).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffLine {
    pub prefix: DiffPrefix,
    pub content: String,
    pub anchor_line: usize,
}

impl DiffLine {
    fn context(content: &str, line: usize) -> Self {
        DiffLine {
            prefix: DiffPrefix::Context,
            content: content.to_string(),
            anchor_line: line,
        }
    }

    fn removed(content: &str, line: usize) -> Self {
        DiffLine {
            prefix: DiffPrefix::Removed,
            content: content.to_string(),
            anchor_line: line,
        }
    }

    fn added(content: &str, line: usize) -> Self {
        DiffLine {
            prefix: DiffPrefix::Added,
            content: content.to_string(),
            anchor_line: line,
        }
    }

    pub fn is_diff(&self) -> bool {
        self.prefix != DiffPrefix::Context
    }
}

/// Split captured output into actual lines: break on `\n`, and drop the trailing empty
/// element that a `\n`-terminated buffer produces. Non-UTF-8 bytes are replaced; binary
/// output is therefore compared on a best-effort basis (see `needs_escaping`).
fn split_actual_lines(output: &[u8]) -> Vec<String> {
    if output.is_empty() {
        return Vec::new();
    }
    let text = String::from_utf8_lossy(output);
    let mut lines: Vec<String> = text.split('\n').map(str::to_string).collect();
    if lines.last().map(String::is_empty).unwrap_or(false) {
        lines.pop();
    }
    lines
}

/// Align one command's expected lines against its actual output, emitting context/removed/added
/// diff lines. If `exit_code != 0` a synthetic `[<code>]` line is appended to the actual side
/// before alignment.
pub fn align_command(cmd: &TestCommand<'_>, result: &CommandResult) -> Vec<DiffLine> {
    let mut actual_lines = split_actual_lines(&result.output);
    if result.exit_code != 0 {
        actual_lines.push(format!("[{}]", result.exit_code));
    }

    let expected: &[ExpectedLine<'_>] = &cmd.expected;
    let base_line = cmd.source_line + cmd.command_lines.len();
    let mut last_anchor = base_line.saturating_sub(1);

    let mut out = Vec::new();
    let (mut ei, mut ai) = (0usize, 0usize);
    let (em, an) = (expected.len(), actual_lines.len());

    while ei < em && ai < an {
        if expected[ei].matches(&actual_lines[ai]) {
            let line = base_line + ei;
            out.push(DiffLine::context(expected[ei].original, line));
            last_anchor = line;
            ei += 1;
            ai += 1;
        } else {
            let mut removed_run: Vec<(usize, &str)> = Vec::new();
            let mut added_run: Vec<String> = Vec::new();
            while ei < em && ai < an && !expected[ei].matches(&actual_lines[ai]) {
                removed_run.push((base_line + ei, expected[ei].original));
                added_run.push(actual_lines[ai].clone());
                ei += 1;
                ai += 1;
            }
            for (line, content) in &removed_run {
                out.push(DiffLine::removed(content, *line));
                last_anchor = *line;
            }
            for content in &added_run {
                out.push(DiffLine::added(&render_added(content), last_anchor));
            }
        }
    }

    while ei < em {
        let line = base_line + ei;
        out.push(DiffLine::removed(expected[ei].original, line));
        last_anchor = line;
        ei += 1;
    }

    while ai < an {
        out.push(DiffLine::added(&render_added(&actual_lines[ai]), last_anchor));
        ai += 1;
    }

    out
}

/// Render one actual line for the `+` side of a diff: escaped with a trailing ` (esc)` marker
/// when it carries non-printable bytes, per §6, matching what `build_correction` writes.
fn render_added(line: &str) -> String {
    if needs_escaping(line) {
        format!("{} (esc)", escape(line))
    } else {
        line.to_string()
    }
}

/// A contiguous window of diff lines sharing one `@@ ... @@` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    pub old_start: usize,
    pub old_count: usize,
    pub new_start: usize,
    pub new_count: usize,
    pub lines: Vec<DiffLine>,
}

/// Assemble hunks with 3 lines of context around every non-context diff line, merging
/// overlapping windows and filling gaps from the original file's own lines.
pub fn build_hunks(diff_lines: &[DiffLine], original_lines: &[&str]) -> Vec<Hunk> {
    let total_lines = original_lines.len();
    if total_lines == 0 {
        return Vec::new();
    }

    let mut by_line: std::collections::BTreeMap<usize, Vec<&DiffLine>> =
        std::collections::BTreeMap::new();
    for dl in diff_lines {
        by_line.entry(dl.anchor_line).or_default().push(dl);
    }

    let mut anchors: Vec<usize> = diff_lines
        .iter()
        .filter(|d| d.is_diff())
        .map(|d| d.anchor_line)
        .collect();
    anchors.sort_unstable();
    anchors.dedup();
    if anchors.is_empty() {
        return Vec::new();
    }

    let mut windows: Vec<(usize, usize)> = Vec::new();
    for &line in &anchors {
        let start = line.saturating_sub(3).max(1);
        let end = (line + 3 + 1).min(total_lines + 1);
        match windows.last_mut() {
            Some(last) if start <= last.1 => last.1 = last.1.max(end),
            _ => windows.push((start, end)),
        }
    }

    windows
        .into_iter()
        .map(|(start, end)| {
            let mut lines = Vec::new();
            let (mut old_count, mut new_count) = (0usize, 0usize);
            for line_no in start..end {
                if let Some(diffs) = by_line.get(&line_no) {
                    for d in diffs {
                        match d.prefix {
                            DiffPrefix::Context => {
                                old_count += 1;
                                new_count += 1;
                            }
                            DiffPrefix::Removed => old_count += 1,
                            DiffPrefix::Added => new_count += 1,
                        }
                        lines.push((*d).clone());
                    }
                } else if let Some(&text) = original_lines.get(line_no - 1) {
                    lines.push(DiffLine::context(text, line_no));
                    old_count += 1;
                    new_count += 1;
                }
            }
            Hunk {
                old_start: start,
                old_count,
                new_start: start,
                new_count,
                lines,
            }
        })
        .collect()
}

/// Render a unified diff with the same path on both sides (the file is rewritten in place).
pub fn render_unified_diff(path: &str, hunks: &[Hunk]) -> String {
    let mut out = String::new();
    out.push_str(&format!("--- {}\n", path));
    out.push_str(&format!("+++ {}\n", path));
    for h in hunks {
        out.push_str(&format!(
            "@@ -{},{} +{},{} @@\n",
            h.old_start, h.old_count, h.new_start, h.new_count
        ));
        for d in &h.lines {
            out.push(d.prefix.ch());
            out.push_str(&d.content);
            out.push('\n');
        }
    }
    out
}

/// True iff a line needs the `(esc)` treatment: any byte `< 0x20` other than `\t`, or `0x7F`.
///
/// Operates on already-decoded text; genuinely invalid UTF-8 in the captured output is
/// replaced during decoding upstream rather than detected here.
pub fn needs_escaping(line: &str) -> bool {
    line.bytes().any(|b| (b < 0x20 && b != b'\t') || b == 0x7F)
}

/// A patch-mode correction: replace source lines `[start_line, end_line)` with `new_lines`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Correction {
    pub start_line: usize,
    pub end_line: usize,
    pub new_lines: Vec<String>,
}

/// Build the correction for one failing command: the fresh expected block an author would
/// write to make the test pass, indented and escaped as needed.
pub fn build_correction(cmd: &TestCommand<'_>, result: &CommandResult, indent: usize) -> Correction {
    let start_line = cmd.source_line + cmd.command_lines.len();
    let end_line = start_line + cmd.expected.len();
    let pad = " ".repeat(indent);

    let actual_lines = split_actual_lines(&result.output);
    let mut new_lines: Vec<String> = actual_lines
        .iter()
        .map(|line| {
            if needs_escaping(line) {
                format!("{}{} (esc)", pad, escape(line))
            } else {
                format!("{}{}", pad, line)
            }
        })
        .collect();

    if result.exit_code != 0 {
        new_lines.push(format!("{}[{}]", pad, result.exit_code));
    }

    Correction {
        start_line,
        end_line,
        new_lines,
    }
}

/// Apply corrections to the original file body, preserving every line outside a correction's
/// range and the file's trailing-newline state.
pub fn apply_corrections(original: &str, corrections: &mut Vec<Correction>) -> String {
    corrections.sort_by_key(|c| c.start_line);
    let had_trailing_newline = original.ends_with('\n');
    let lines: Vec<&str> = original.lines().collect();

    let mut out_lines: Vec<String> = Vec::new();
    let mut next_unconsumed = 1usize;

    for c in corrections.iter() {
        for line_no in next_unconsumed..c.start_line {
            if let Some(&l) = lines.get(line_no - 1) {
                out_lines.push(l.to_string());
            }
        }
        out_lines.extend(c.new_lines.iter().cloned());
        next_unconsumed = c.end_line;
    }
    for line_no in next_unconsumed..=lines.len() {
        if let Some(&l) = lines.get(line_no - 1) {
            out_lines.push(l.to_string());
        }
    }

    let mut result = out_lines.join("\n");
    if had_trailing_newline && !result.is_empty() {
        result.push('\n');
    }
    result
}
