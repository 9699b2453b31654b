//! Post-processing: deterministic cleanup of the generated LaTeX.
//!
//! Fragments are concatenated with generous blank lines on every path
//! (paragraph breaks, figures, table trailers). These passes are pure
//! `&str → String` functions so each is independently testable.
//!
//! Rules (applied in order by [`clean_latex`]):
//! 1. Normalise line endings (CRLF → LF)
//! 2. Strip invisible Unicode left over from the page (BOM, zero-width space)
//! 3. Collapse three or more consecutive newlines to exactly two
//! 4. Ensure the file ends with exactly one newline
//!
//! [`wrap_words`] is separate: the markup translator applies it per fragment
//! when word wrapping is enabled.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules to the assembled document.
pub fn clean_latex(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = remove_invisible_chars(&s);
    let s = collapse_blank_lines(&s);
    ensure_final_newline(&s)
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Strip invisible Unicode ──────────────────────────────────────────

static RE_INVISIBLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\u{FEFF}\u{200B}\u{200C}\u{200D}]").unwrap());

fn remove_invisible_chars(input: &str) -> String {
    RE_INVISIBLE.replace_all(input, "").to_string()
}

// ── Rule 3: Collapse blank lines ─────────────────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// `\n\n\n+` → `\n\n`.
pub fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").to_string()
}

// ── Rule 4: Final newline ────────────────────────────────────────────────────

fn ensure_final_newline(input: &str) -> String {
    let trimmed = input.trim_end();
    if trimmed.is_empty() {
        String::from("\n")
    } else {
        format!("{}\n", trimmed)
    }
}

// ── Word wrap ────────────────────────────────────────────────────────────────

/// Column used by [`wrap_words`].
pub const WRAP_COLUMN: usize = 75;

/// Greedy word wrap at `width` characters.
///
/// Only spaces are break points and words longer than `width` are never cut.
/// Existing newlines reset the column. Wrapping may split a LaTeX argument
/// over two lines, which LaTeX treats as a space.
pub fn wrap_words(input: &str, width: usize) -> String {
    let mut out = String::with_capacity(input.len() + input.len() / width.max(1));
    for (i, line) in input.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let mut column = 0;
        for (j, word) in line.split(' ').enumerate() {
            let len = word.chars().count();
            if j > 0 {
                if column + 1 + len > width && column > 0 {
                    out.push('\n');
                    column = 0;
                } else {
                    out.push(' ');
                    column += 1;
                }
            }
            out.push_str(word);
            column += len;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_runs_of_blank_lines() {
        assert_eq!(collapse_blank_lines("a\n\n\n\n\nb\n\nc\nd"), "a\n\nb\n\nc\nd");
    }

    #[test]
    fn crlf_normalised() {
        assert_eq!(clean_latex("a\r\n\r\n\r\nb"), "a\n\nb\n");
    }

    #[test]
    fn invisible_chars_removed() {
        assert_eq!(clean_latex("\u{FEFF}x\u{200B}y"), "xy\n");
    }

    #[test]
    fn single_final_newline() {
        assert_eq!(clean_latex("\\end{document}\n\n\n"), "\\end{document}\n");
        assert_eq!(clean_latex("   "), "\n");
    }

    #[test]
    fn wraps_on_spaces() {
        assert_eq!(wrap_words("aaa bbb ccc", 7), "aaa bbb\nccc");
        assert_eq!(wrap_words("short", 75), "short");
    }

    #[test]
    fn long_words_are_not_cut() {
        assert_eq!(wrap_words("a verylongword b", 5), "a\nverylongword\nb");
    }

    #[test]
    fn wrap_respects_existing_breaks() {
        assert_eq!(wrap_words("aaa\n\nbbb ccc", 7), "aaa\n\nbbb ccc");
    }
}
