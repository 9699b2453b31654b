//! Reversible escaping between raw text and LaTeX-safe text.
//!
//! [`escape`] runs once on raw page text before markup translation. A few
//! markup rules (math, URL targets, verbatim) need the raw characters back
//! inside a LaTeX argument that is itself literal; they call [`unescape`] on
//! the captured substring.

/// Raw character → LaTeX sequence. Order matters only for [`unescape`]:
/// longer sequences sharing a prefix must come first.
const ESCAPES: &[(char, &str)] = &[
    ('\\', "\\textbackslash{}"),
    ('~', "\\textasciitilde{}"),
    ('>', "\\textgreater{}"),
    ('<', "\\textless{}"),
    ('^', "\\string^"),
    ('_', "\\_"),
    ('$', "\\$"),
    ('%', "\\%"),
    ('&', "\\&"),
    ('{', "\\{"),
    ('}', "\\}"),
];

/// Map every LaTeX special character in `text` to a safe command sequence.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 8);
    for c in text.chars() {
        match ESCAPES.iter().find(|(raw, _)| *raw == c) {
            Some((_, seq)) => out.push_str(seq),
            None => out.push(c),
        }
    }
    out
}

/// Exact left inverse of [`escape`]. Backslash sequences that `escape` never
/// produces are copied through unchanged.
pub fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find('\\') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        match ESCAPES.iter().find(|(_, seq)| rest.starts_with(seq)) {
            Some((raw, seq)) => {
                out.push(*raw);
                rest = &rest[seq.len()..];
            }
            None => {
                out.push('\\');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_every_special() {
        assert_eq!(
            escape(r"\ _ $ % & { } ~ ^ > <"),
            r"\textbackslash{} \_ \$ \% \& \{ \} \textasciitilde{} \string^ \textgreater{} \textless{}"
        );
    }

    #[test]
    fn backslash_is_not_double_escaped() {
        assert_eq!(escape(r"a\b"), r"a\textbackslash{}b");
    }

    #[test]
    fn round_trip() {
        let samples = [
            "",
            "plain words",
            r"C:\temp\new_file.txt",
            "100% of $5 & {x} ~ y^2 <> z",
            r"\_ already looks escaped",
            r"\textbackslash{} literal",
            "ünïcödé → ∑ α",
            "trailing \\",
        ];
        for s in samples {
            assert_eq!(unescape(&escape(s)), s, "round trip of {s:?}");
        }
    }

    #[test]
    fn unknown_sequences_pass_through() {
        assert_eq!(unescape(r"\bf{} x \_"), r"\bf{} x _");
    }

    #[test]
    fn bbcode_delimiters_survive() {
        assert_eq!(escape("[b]x[/b]"), "[b]x[/b]");
        assert_eq!(escape("[button_small]"), r"[button\_small]");
    }
}
