//! Text normalisation and string helpers.
//!
//! - LaTeX-ish control-word stripping and whitespace collapsing for extracted text
//! - String truncation for log previews

use once_cell::sync::Lazy;
use regex::Regex;

/// A control word such as `\alpha` or `\mathcal{X}`, with at most one
/// un-nested brace argument.
static LATEX_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\[A-Za-z]+(\{[^}]*\})?").expect("valid LaTeX pattern"));

/// ASCII whitespace only: space, tab, newline, carriage return, form feed.
static SPACE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[ \t\n\r\x0C]+").expect("valid whitespace pattern"));

/// Remove LaTeX-ish markup, then collapse every whitespace run to one space.
///
/// The result is a single line. It is not trimmed: a leading or trailing
/// whitespace run becomes a single leading or trailing space.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(normalize_text("Let \\mathcal{X} be \\alpha."), "Let be .");
/// assert_eq!(normalize_text("Intro\nBody."), "Intro Body.");
/// ```
pub fn normalize_text(text: &str) -> String {
    let stripped = strip_latex(text);
    collapse_whitespace(&stripped)
}

/// One left-to-right, non-overlapping pass of the LaTeX pattern.
pub fn strip_latex(text: &str) -> String {
    LATEX_PATTERN.replace_all(text, "").into_owned()
}

pub fn collapse_whitespace(text: &str) -> String {
    SPACE_PATTERN.replace_all(text, " ").into_owned()
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut at the last character boundary at or below `max`
/// bytes, with `"…(+N bytes)"` appended.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…(+{} bytes)", &s[..end], s.len() - end)
}
