//! Block parser: extracts test commands and their expected output from a free-form document.
//!
//! Borrows into the caller's buffer throughout — a parsed file never outlives the `&str` it
//! was built from, and produces no copies of the source text itself.

use crate::matcher::ExpectedLine;

/// One executable unit in a test file: a (possibly continued) command plus the expected
/// output lines that follow it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCommand<'a> {
    /// 1-based line number of the command's first physical line.
    pub source_line: usize,
    /// Line 0 is the text after `$ `; further entries are `> ` continuations.
    pub command_lines: Vec<&'a str>,
    pub expected: Vec<ExpectedLine<'a>>,
}

impl<'a> TestCommand<'a> {
    fn new(source_line: usize, first_line: &'a str) -> Self {
        TestCommand {
            source_line,
            command_lines: vec![first_line],
            expected: Vec::new(),
        }
    }

    /// The command joined back into one shell-ready script fragment.
    pub fn script(&self) -> String {
        self.command_lines.join("\n")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineKind<'a> {
    Comment,
    Command(&'a str),
    Continuation(&'a str),
    Output(&'a str),
}

fn classify(line: &str, indent: usize) -> LineKind<'_> {
    if line.len() < indent || line.as_bytes()[..indent].iter().any(|&b| b != b' ') {
        return LineKind::Comment;
    }

    let rest = &line[indent..];
    if let Some(cmd) = rest.strip_prefix("$ ") {
        LineKind::Command(cmd)
    } else if rest == "$" {
        LineKind::Command("")
    } else if let Some(cont) = rest.strip_prefix("> ") {
        LineKind::Continuation(cont)
    } else if rest == ">" {
        LineKind::Continuation("")
    } else {
        LineKind::Output(rest)
    }
}

/// Parse a whole test file into its ordered sequence of test commands.
///
/// `indent` is the dialect's indent width (2 for `.t`, 4 for `.md`). Never fails: any byte
/// stream yields whatever commands the classification rules produce, including zero.
pub fn parse(content: &str, indent: usize) -> Vec<TestCommand<'_>> {
    let mut commands: Vec<TestCommand<'_>> = Vec::new();
    let mut current: Option<TestCommand<'_>> = None;

    for (idx, line) in content.lines().enumerate() {
        let source_line = idx + 1;
        match classify(line, indent) {
            LineKind::Command(text) => {
                if let Some(cmd) = current.take() {
                    commands.push(cmd);
                }
                current = Some(TestCommand::new(source_line, text));
            }
            LineKind::Continuation(text) => {
                if let Some(cmd) = current.as_mut() {
                    cmd.command_lines.push(text);
                } // a continuation outside IN_CMD is simply malformed prose; ignore.
            }
            LineKind::Output(text) => {
                if let Some(cmd) = current.as_mut() {
                    cmd.expected.push(ExpectedLine::parse(text));
                } // output-shaped line with no preceding command is just indented prose.
            }
            LineKind::Comment => {
                if let Some(cmd) = current.take() {
                    commands.push(cmd);
                }
            }
        }
    }

    if let Some(cmd) = current.take() {
        commands.push(cmd);
    }

    commands
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::MatcherKind;

    #[test]
    fn empty_file_yields_no_commands() {
        assert!(parse("", 2).is_empty());
    }

    #[test]
    fn prose_only_yields_no_commands() {
        let doc = "This is a description.\nNo commands here.\n";
        assert!(parse(doc, 2).is_empty());
    }

    #[test]
    fn single_command_no_output() {
        let doc = "Do nothing:\n\n  $ true\n\nDone.\n";
        let cmds = parse(doc, 2);
        assert_eq!(cmds.len(), 1);
        assert_eq!(cmds[0].source_line, 3);
        assert_eq!(cmds[0].command_lines, vec!["true"]);
        assert!(cmds[0].expected.is_empty());
    }

    #[test]
    fn command_with_expected_output() {
        let doc = "  $ echo hello\n  hello\n";
        let cmds = parse(doc, 2);
        assert_eq!(cmds.len(), 1);
        assert_eq!(cmds[0].command_lines, vec!["echo hello"]);
        assert_eq!(cmds[0].expected.len(), 1);
        assert_eq!(cmds[0].expected[0].text, "hello");
        assert_eq!(cmds[0].expected[0].matcher, MatcherKind::Literal);
    }

    #[test]
    fn continuation_lines_extend_command() {
        let doc = "  $ for x in a b; do\n  >   echo $x\n  > done\n  a\n  b\n";
        let cmds = parse(doc, 2);
        assert_eq!(cmds.len(), 1);
        assert_eq!(
            cmds[0].command_lines,
            vec!["for x in a b; do", "  echo $x", "done"]
        );
        assert_eq!(cmds[0].expected.len(), 2);
    }

    #[test]
    fn bare_dollar_and_angle_are_empty_lines() {
        let doc = "  $\n  >\n";
        let cmds = parse(doc, 2);
        assert_eq!(cmds.len(), 1);
        assert_eq!(cmds[0].command_lines, vec!["", ""]);
    }

    #[test]
    fn comment_terminates_command_and_returns_to_idle() {
        let doc = "  $ echo hi\n  hi\nSome prose.\n  more prose that looks indented? no: 0 indent\n";
        let cmds = parse(doc, 2);
        assert_eq!(cmds.len(), 1);
    }

    #[test]
    fn a_command_line_finalizes_the_previous_command() {
        let doc = "  $ echo one\n  one\n  $ echo two\n  two\n";
        let cmds = parse(doc, 2);
        assert_eq!(cmds.len(), 2);
        assert_eq!(cmds[0].command_lines, vec!["echo one"]);
        assert_eq!(cmds[1].command_lines, vec!["echo two"]);
    }

    #[test]
    fn markdown_dialect_uses_four_space_indent() {
        let doc = "Some text.\n\n    $ echo hi\n    hi\n\nMore text.\n";
        let cmds = parse(doc, 4);
        assert_eq!(cmds.len(), 1);
        assert_eq!(cmds[0].command_lines, vec!["echo hi"]);
        assert_eq!(cmds[0].expected[0].text, "hi");
    }

    #[test]
    fn two_space_indented_line_is_comment_under_four_space_dialect() {
        // Under the markdown dialect a 2-space indent is short of N, so it's a comment and
        // terminates any open command.
        let doc = "    $ echo hi\n  hi\n";
        let cmds = parse(doc, 4);
        assert_eq!(cmds.len(), 1);
        assert!(cmds[0].expected.is_empty());
    }

    #[test]
    fn source_line_points_at_command_line() {
        let doc = "intro\n\n  $ one\n  out\n\n  $ two\n";
        let cmds = parse(doc, 2);
        assert_eq!(cmds[0].source_line, 3);
        assert_eq!(cmds[1].source_line, 6);
    }

    #[test]
    fn annotations_are_parsed_on_expected_lines() {
        let doc = "  $ echo x\n  *.txt (glob)\n  \\d+ (re)\n  raw (esc)\n  trailing (no-eol)\n";
        let cmds = parse(doc, 2);
        let exp = &cmds[0].expected;
        assert_eq!(exp[0].matcher, MatcherKind::Glob);
        assert_eq!(exp[1].matcher, MatcherKind::Regex);
        assert_eq!(exp[2].matcher, MatcherKind::Escape);
        assert!(exp[3].no_eol);
        assert_eq!(exp[3].text, "trailing");
    }
}
