//! Link deduplication and citation numbering.
//!
//! Runs over the assembled LaTeX. Every `\href{target}{caption}` gets a
//! citation marker appended, and one bibliography entry is produced per
//! distinct caption. Links written as `\hrefnoref` (author, applet figures)
//! are not touched.
//!
//! Links are grouped by *caption*, not by target: two links with the same
//! text share a number even when they point to different places, and the
//! bibliography shows the first target seen.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::Write;

const HREF: &str = "\\href{";

/// Characters left readable in bibliography URLs. Alphanumerics and `-_.`
/// are never encoded.
const BIB_URL: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b';')
    .remove(b':')
    .remove(b'@')
    .remove(b'&')
    .remove(b'=')
    .remove(b'+')
    .remove(b'$')
    .remove(b',')
    .remove(b'/')
    .remove(b'?')
    .remove(b'%')
    .remove(b'#')
    .remove(b'[')
    .remove(b']');

/// One citation number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceEntry {
    pub number: usize,
    pub caption: String,
    /// Target of the first occurrence.
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct References {
    /// Input text with citation markers after every link.
    pub text: String,
    pub entries: Vec<ReferenceEntry>,
    /// `thebibliography` environment, empty when there are no links.
    pub bibliography: String,
}

/// One `\href` occurrence in the scanned text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Link<'t> {
    end: usize,
    target: &'t str,
    caption: &'t str,
}

/// Number links by first appearance of their caption and build the
/// bibliography.
pub fn process(latex: &str) -> References {
    let links = scan(latex);

    let mut by_caption: HashMap<&str, usize> = HashMap::new();
    let mut entries: Vec<ReferenceEntry> = Vec::new();
    let mut text = String::with_capacity(latex.len() + links.len() * 24);
    let mut cursor = 0;

    for link in &links {
        let number = *by_caption.entry(link.caption).or_insert_with(|| {
            entries.push(ReferenceEntry {
                number: entries.len() + 1,
                caption: link.caption.to_string(),
                target: link.target.to_string(),
            });
            entries.len()
        });
        text.push_str(&latex[cursor..link.end]);
        let _ = write!(text, " \\textnormal{{\\cite{{{number}}}}}");
        cursor = link.end;
    }
    text.push_str(&latex[cursor..]);

    let bibliography = bibliography(&entries);
    References {
        text,
        entries,
        bibliography,
    }
}

fn bibliography(entries: &[ReferenceEntry]) -> String {
    if entries.is_empty() {
        return String::new();
    }
    let mut bib = format!("\\begin{{thebibliography}}{{{}}}\n", entries.len());
    for e in entries {
        let _ = writeln!(
            bib,
            "\\bibitem[{n}]{{{n}}}{{\\url{{{}}}}}",
            encode_url(&e.target),
            n = e.number
        );
    }
    bib.push_str("\\end{thebibliography}\n");
    bib
}

/// Percent-encode a target, keeping URL punctuation readable.
pub fn encode_url(target: &str) -> String {
    utf8_percent_encode(target, BIB_URL).to_string()
}

/// All `\href{…}{…}` occurrences, left to right, not overlapping.
fn scan(text: &str) -> Vec<Link<'_>> {
    let mut links = Vec::new();
    let mut from = 0;
    while let Some(pos) = text[from..].find(HREF) {
        let start = from + pos;
        let target_open = start + HREF.len() - 1;
        from = start + HREF.len();

        let Some(target_close) = closing_brace(text, target_open) else {
            continue;
        };
        if text.as_bytes().get(target_close + 1) != Some(&b'{') {
            continue;
        }
        let Some(caption_close) = closing_brace(text, target_close + 1) else {
            continue;
        };
        let caption = &text[target_close + 2..caption_close];
        if caption.is_empty() {
            continue;
        }
        links.push(Link {
            end: caption_close + 1,
            target: &text[target_open + 1..target_close],
            caption,
        });
        from = caption_close + 1;
    }
    links
}

/// Byte offset of the `}` matching the `{` at `open`. A backslash and the
/// character after it are skipped, so `\{` and `\}` do not count.
fn closing_brace(text: &str, open: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut i = open;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 1,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_caption_shares_a_number() {
        let refs = process("\\href{a}{X} \\href{b}{Y} \\href{c}{X}");
        assert_eq!(
            refs.text,
            "\\href{a}{X} \\textnormal{\\cite{1}} \\href{b}{Y} \\textnormal{\\cite{2}} \\href{c}{X} \\textnormal{\\cite{1}}"
        );
        let numbers: Vec<_> = refs.entries.iter().map(|e| (e.number, e.target.as_str())).collect();
        assert_eq!(numbers, [(1, "a"), (2, "b")]);
        assert_eq!(
            refs.bibliography,
            "\\begin{thebibliography}{2}\n\\bibitem[1]{1}{\\url{a}}\n\\bibitem[2]{2}{\\url{b}}\n\\end{thebibliography}\n"
        );
    }

    #[test]
    fn identical_occurrences_are_each_marked_once() {
        let refs = process("\\href{u}{X}\n\\href{u}{X}");
        assert_eq!(refs.text.matches("\\cite{1}").count(), 2);
        assert_eq!(refs.entries.len(), 1);
    }

    #[test]
    fn no_links_no_bibliography() {
        let refs = process("plain \\hrefnoref{u}{author} text");
        assert_eq!(refs.text, "plain \\hrefnoref{u}{author} text");
        assert!(refs.entries.is_empty());
        assert!(refs.bibliography.is_empty());
    }

    #[test]
    fn nested_and_escaped_braces_in_captions() {
        let refs = process("\\href{u}{a {\\bf{}b} \\} c} tail");
        assert_eq!(refs.entries[0].caption, "a {\\bf{}b} \\} c");
        assert!(refs.text.ends_with("c} \\textnormal{\\cite{1}} tail"));
    }

    #[test]
    fn unterminated_link_is_left_alone() {
        let refs = process("\\href{u}{never closed");
        assert_eq!(refs.text, "\\href{u}{never closed");
        assert!(refs.bibliography.is_empty());
    }

    #[test]
    fn bibliography_urls_keep_reserved_characters() {
        assert_eq!(
            encode_url("http://x.org/a b?q=é&r=[1]#top"),
            "http://x.org/a%20b?q=%C3%A9&r=[1]#top"
        );
        assert_eq!(encode_url("http://x.org/~user"), "http://x.org/%7Euser");
    }
}
