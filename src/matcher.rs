//! Line matcher: compares actual shell output against annotated expected lines.
//!
//! Four dialects, modeled as a closed sum (tagged enum + one match function) rather than
//! polymorphic objects, since the set is fixed by the file format.

use regex::Regex;
use std::fmt;

/// Which pattern dialect an expected line's trailing annotation selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatcherKind {
    Literal,
    Glob,
    Regex,
    Escape,
}

impl fmt::Display for MatcherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MatcherKind::Literal => "literal",
            MatcherKind::Glob => "glob",
            MatcherKind::Regex => "re",
            MatcherKind::Escape => "esc",
        };
        f.write_str(s)
    }
}

/// One annotated line of expected output, borrowing from the parsed file buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedLine<'a> {
    /// Content with the trailing annotation (and `(no-eol)` marker) stripped.
    pub text: &'a str,
    /// The line exactly as written, before any stripping.
    pub original: &'a str,
    pub matcher: MatcherKind,
    pub no_eol: bool,
}

impl<'a> ExpectedLine<'a> {
    /// Parse the annotation off a single post-indent expected line.
    ///
    /// Order matters: `(no-eol)` is stripped first, then one of the dialect suffixes is
    /// stripped from what remains.
    pub fn parse(raw: &'a str) -> Self {
        let (body, no_eol) = match raw.strip_suffix(" (no-eol)") {
            Some(stripped) => (stripped, true),
            None => (raw, false),
        };

        let (text, matcher) = if let Some(t) = body.strip_suffix(" (re)") {
            (t, MatcherKind::Regex)
        } else if let Some(t) = body.strip_suffix(" (glob)") {
            (t, MatcherKind::Glob)
        } else if let Some(t) = body.strip_suffix(" (esc)") {
            (t, MatcherKind::Escape)
        } else {
            (body, MatcherKind::Literal)
        };

        ExpectedLine {
            text,
            original: raw,
            matcher,
            no_eol,
        }
    }

    /// Does `actual` (one line of real output, no trailing newline) satisfy this expectation?
    pub fn matches(&self, actual: &str) -> bool {
        // A literal match against the line as written always wins, regardless of dialect:
        // it lets an author write output that happens to end in e.g. " (re)" without
        // double-escaping it.
        if actual == self.original {
            return true;
        }
        if actual == self.text {
            return true;
        }

        match self.matcher {
            MatcherKind::Literal => false,
            MatcherKind::Glob => glob_match(self.text, actual),
            MatcherKind::Regex => regex_match(self.text, actual),
            MatcherKind::Escape => unescape(self.text) == actual,
        }
    }
}

/// Anchored glob match: `*` (zero or more bytes), `?` (exactly one byte), `\` escapes the
/// next byte literally. The whole of `actual` must be consumed.
///
/// Greedy scan that backtracks to the most recent `*` on mismatch.
fn glob_match(pattern: &str, actual: &str) -> bool {
    let pat: Vec<char> = pattern.chars().collect();
    let act: Vec<char> = actual.chars().collect();

    let (mut pi, mut ai) = (0usize, 0usize);
    let mut star_pi: Option<usize> = None;
    let mut star_ai = 0usize;

    while ai < act.len() {
        if pi < pat.len() {
            match pat[pi] {
                '*' => {
                    star_pi = Some(pi);
                    star_ai = ai;
                    pi += 1;
                    continue;
                }
                '?' => {
                    pi += 1;
                    ai += 1;
                    continue;
                }
                '\\' if pi + 1 < pat.len() => {
                    if pat[pi + 1] == act[ai] {
                        pi += 2;
                        ai += 1;
                        continue;
                    }
                }
                c if c == act[ai] => {
                    pi += 1;
                    ai += 1;
                    continue;
                }
                _ => {}
            }
        }

        // Mismatch (or pattern exhausted): backtrack to the last `*` if any.
        if let Some(sp) = star_pi {
            star_ai += 1;
            ai = star_ai;
            pi = sp + 1;
        } else {
            return false;
        }
    }

    // Consume any trailing `*`s in the pattern.
    while pi < pat.len() && pat[pi] == '*' {
        pi += 1;
    }

    pi == pat.len()
}

fn regex_match(pattern: &str, actual: &str) -> bool {
    let anchored = format!("(?s)\\A(?:{})\\z", pattern);
    match Regex::new(&anchored) {
        Ok(re) => re.is_match(actual),
        Err(e) => {
            log::warn!("invalid regex pattern {:?}: {}", pattern, e);
            false
        }
    }
}

/// Escape a raw byte string per the `(esc)` table: `\t`, `\r`, `\\` get their short forms;
/// other control/high bytes become `\xNN`; everything else is unchanged.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'\t' => out.push_str("\\t"),
            b'\r' => out.push_str("\\r"),
            b'\\' => out.push_str("\\\\"),
            0x00..=0x08 | 0x0B | 0x0C | 0x0E..=0x1F | 0x7F..=0xFF => {
                out.push_str(&format!("\\x{:02x}", b))
            }
            _ => out.push(b as char),
        }
    }
    out
}

/// Inverse of [`escape`]. Also understands `\n`. A malformed `\xNN` or an unrecognized
/// escape (`\q`) is left as a literal backslash followed by the rest.
pub fn unescape(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'\\' {
            out.push(bytes[i]);
            i += 1;
            continue;
        }

        match bytes.get(i + 1) {
            Some(b't') => {
                out.push(b'\t');
                i += 2;
            }
            Some(b'r') => {
                out.push(b'\r');
                i += 2;
            }
            Some(b'n') => {
                out.push(b'\n');
                i += 2;
            }
            Some(b'\\') => {
                out.push(b'\\');
                i += 2;
            }
            Some(b'x') => {
                let hex = bytes.get(i + 2..i + 4);
                match hex.and_then(|h| std::str::from_utf8(h).ok()).and_then(|h| {
                    u8::from_str_radix(h, 16).ok()
                }) {
                    Some(byte) => {
                        out.push(byte);
                        i += 4;
                    }
                    None => {
                        out.push(b'\\');
                        i += 1;
                    }
                }
            }
            _ => {
                out.push(b'\\');
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}
