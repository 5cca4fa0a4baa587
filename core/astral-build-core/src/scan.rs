//! Diagnostic line scanning over decoded build output (astral-build-core)

use serde::{Deserialize, Serialize};

/// Substrings that flag a line as diagnostic, compared case-insensitively.
pub const DEFAULT_MARKERS: [&str; 2] = ["error", "warning"];

/// Lines of trailing context attached to each match.
pub const DEFAULT_CONTEXT_LINES: usize = 2;

/// Lines dumped when nothing matched.
pub const DEFAULT_TAIL_LINES: usize = 20;

/// A flagged line plus the lines that follow it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticMatch {
    /// Zero-based line index in the decoded output.
    pub index: usize,
    pub line: String,
    pub context: Vec<String>,
}

/// Case-insensitive marker matcher with a fixed trailing context window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticScanner {
    markers: Vec<String>,
    context_lines: usize,
}

impl Default for DiagnosticScanner {
    fn default() -> Self {
        Self {
            markers: DEFAULT_MARKERS.iter().map(|m| m.to_string()).collect(),
            context_lines: DEFAULT_CONTEXT_LINES,
        }
    }
}

impl DiagnosticScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the marker set. Empty markers are ignored.
    pub fn with_markers<I, S>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.markers = markers
            .into_iter()
            .map(|m| m.as_ref().to_lowercase())
            .filter(|m| !m.is_empty())
            .collect();
        self
    }

    pub fn with_context_lines(mut self, count: usize) -> Self {
        self.context_lines = count;
        self
    }

    pub fn markers(&self) -> &[String] {
        &self.markers
    }

    pub fn is_diagnostic(&self, line: &str) -> bool {
        let lowered = line.to_lowercase();
        self.markers.iter().any(|m| lowered.contains(m.as_str()))
    }

    /// Every flagged line, in order. Context windows may overlap other
    /// matches; nothing is deduplicated.
    pub fn scan(&self, lines: &[&str]) -> Vec<DiagnosticMatch> {
        lines
            .iter()
            .enumerate()
            .filter(|(_, line)| self.is_diagnostic(line))
            .map(|(index, line)| DiagnosticMatch {
                index,
                line: strip(line),
                context: lines[index + 1..]
                    .iter()
                    .take(self.context_lines)
                    .map(|l| strip(l))
                    .collect(),
            })
            .collect()
    }
}

/// The last `count` lines (or fewer), trimmed.
pub fn tail(lines: &[&str], count: usize) -> Vec<String> {
    let start = lines.len().saturating_sub(count);
    lines[start..].iter().map(|l| strip(l)).collect()
}

/// Trim whitespace, counting the unit separator `\x1f` as whitespace.
fn strip(line: &str) -> String {
    line.trim_matches(|c: char| c.is_whitespace() || c == '\x1f')
        .to_string()
}

/// Split on every universal line boundary, treating `\r\n` as one.
///
/// A trailing boundary does not yield an empty final line.
pub fn split_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((idx, ch)) = chars.next() {
        if !is_line_boundary(ch) {
            continue;
        }

        lines.push(&text[start..idx]);
        let mut end = idx + ch.len_utf8();
        if ch == '\r' {
            if let Some(&(next, '\n')) = chars.peek() {
                chars.next();
                end = next + 1;
            }
        }
        start = end;
    }

    if start < text.len() {
        lines.push(&text[start..]);
    }

    lines
}

fn is_line_boundary(ch: char) -> bool {
    matches!(
        ch,
        '\n' | '\r'
            | '\u{0B}'
            | '\u{0C}'
            | '\u{1C}'
            | '\u{1D}'
            | '\u{1E}'
            | '\u{85}'
            | '\u{2028}'
            | '\u{2029}'
    )
}
