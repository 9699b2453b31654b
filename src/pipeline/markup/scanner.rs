//! Span scanner for bracketed markup tags.
//!
//! A [`SpanRule`] describes an opening tag (plain like `[b]` or
//! parameterised like `[url=…]`), a closing tag, whether the content may
//! cross line breaks, and how often the rule is applied. Matching is
//! shortest-leftmost: the first opening tag that has a closing tag after it
//! (with no line break in between for single-line rules) wins, and the
//! closing tag is the nearest one. Nothing is balanced or nested.

/// How a rule is applied to the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    /// One left-to-right replacement pass.
    Once,
    /// Replacement passes until one finds nothing.
    Fixpoint,
}

/// The opening half of a span.
#[derive(Debug, Clone, Copy)]
pub enum Open {
    /// Literal tag, e.g. `[b]`.
    Plain(&'static str),
    /// Tag prefix with a non-empty parameter up to the first `]`, e.g. `[url=`.
    Param(&'static str),
}

#[derive(Debug, Clone, Copy)]
pub struct SpanRule {
    pub open: Open,
    pub close: &'static str,
    pub multiline: bool,
    pub pass: Pass,
}

/// One matched span, borrowed from the scanned text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span<'t> {
    /// Byte offset of the opening `[`.
    pub start: usize,
    /// Byte offset just past the closing tag.
    pub end: usize,
    /// Parameter of a [`Open::Param`] tag, empty for plain tags.
    pub param: &'t str,
    /// Text between the tags.
    pub inner: &'t str,
}

impl SpanRule {
    pub const fn plain(open: &'static str, close: &'static str) -> Self {
        Self {
            open: Open::Plain(open),
            close,
            multiline: true,
            pass: Pass::Once,
        }
    }

    pub const fn param(prefix: &'static str, close: &'static str) -> Self {
        Self {
            open: Open::Param(prefix),
            close,
            multiline: true,
            pass: Pass::Once,
        }
    }

    pub const fn single_line(mut self) -> Self {
        self.multiline = false;
        self
    }

    pub const fn fixpoint(mut self) -> Self {
        self.pass = Pass::Fixpoint;
        self
    }

    fn prefix(&self) -> &'static str {
        match self.open {
            Open::Plain(s) | Open::Param(s) => s,
        }
    }

    /// Find the first span starting at or after `from`.
    pub fn find<'t>(&self, text: &'t str, from: usize) -> Option<Span<'t>> {
        let prefix = self.prefix();
        let mut search = from;
        loop {
            let start = search + text.get(search..)?.find(prefix)?;
            let after_prefix = start + prefix.len();
            // Any retry must move past this opening '['.
            search = start + 1;

            let (param, body_start) = match self.open {
                Open::Plain(_) => ("", after_prefix),
                Open::Param(_) => {
                    let rest = &text[after_prefix..];
                    let Some(bracket) = rest.find(']') else {
                        return None;
                    };
                    let param = &rest[..bracket];
                    if param.is_empty() || (!self.multiline && param.contains('\n')) {
                        continue;
                    }
                    (param, after_prefix + bracket + 1)
                }
            };

            let close_at = body_start + text[body_start..].find(self.close)?;
            let inner = &text[body_start..close_at];
            if !self.multiline && inner.contains('\n') {
                continue;
            }
            return Some(Span {
                start,
                end: close_at + self.close.len(),
                param,
                inner,
            });
        }
    }

    /// Apply the rule, replacing every span with `render(span)` according to
    /// [`Pass`]. Returns the rewritten text.
    pub fn apply<F>(&self, text: &str, mut render: F) -> String
    where
        F: FnMut(&Span<'_>) -> String,
    {
        let Some(mut current) = self.replace_once(text, &mut render) else {
            return text.to_string();
        };
        if self.pass == Pass::Fixpoint {
            while let Some(next) = self.replace_once(&current, &mut render) {
                current = next;
            }
        }
        current
    }

    /// One pass. `None` when nothing matched.
    fn replace_once<F>(&self, text: &str, render: &mut F) -> Option<String>
    where
        F: FnMut(&Span<'_>) -> String,
    {
        let mut out = String::with_capacity(text.len());
        let mut cursor = 0;
        let mut matched = false;
        while let Some(span) = self.find(text, cursor) {
            matched = true;
            out.push_str(&text[cursor..span.start]);
            out.push_str(&render(&span));
            cursor = span.end;
        }
        if !matched {
            return None;
        }
        out.push_str(&text[cursor..]);
        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOLD: SpanRule = SpanRule::plain("[b]", "[/b]").single_line().fixpoint();
    const URL: SpanRule = SpanRule::param("[url=", "[/url]");

    #[test]
    fn shortest_leftmost() {
        let s = BOLD.find("x[b]a[/b][b]b[/b]", 0).unwrap();
        assert_eq!((s.start, s.inner), (1, "a"));
        let s2 = BOLD.find("x[b]a[/b][b]b[/b]", s.end).unwrap();
        assert_eq!(s2.inner, "b");
    }

    #[test]
    fn single_line_skips_to_next_opening() {
        let text = "[b]a\nb[/b] [b]c[/b]";
        let s = BOLD.find(text, 0).unwrap();
        assert_eq!(s.inner, "c");
    }

    #[test]
    fn param_capture() {
        let s = URL.find("see [url=http://x]X[/url].", 0).unwrap();
        assert_eq!((s.param, s.inner), ("http://x", "X"));
        let bare = URL.find("[url=http://x][/url]", 0).unwrap();
        assert_eq!((bare.param, bare.inner), ("http://x", ""));
    }

    #[test]
    fn empty_param_is_not_a_tag() {
        assert!(URL.find("[url=]x[/url]", 0).is_none());
    }

    #[test]
    fn unbalanced_passes_through() {
        assert_eq!(BOLD.apply("[b]open only", |_| "X".into()), "[b]open only");
        assert_eq!(BOLD.apply("close only[/b]", |_| "X".into()), "close only[/b]");
    }

    #[test]
    fn fixpoint_rescans_output() {
        // The first pass leaves a fresh span behind; the fixpoint picks it up.
        let out = BOLD.apply("[b][b]x[/b][/b]", |s| format!("<{}>", s.inner));
        assert_eq!(out, "<<x>>");
    }

    #[test]
    fn once_does_not_rescan() {
        let rule = SpanRule::plain("[sub]", "[/sub]").single_line();
        let out = rule.apply("[sub][sub]x[/sub][/sub]", |s| format!("<{}>", s.inner));
        assert_eq!(out, "<[sub]x>[/sub]");
    }
}
