//! BBcode-like worksheet markup → LaTeX.
//!
//! Input is text that has already been through [`escape`], so every LaTeX
//! special character is neutralised and the square-bracket tags are the only
//! structure left. Rules are applied one after another in a fixed order; a
//! later rule sees the output of the earlier ones. Tags are never validated
//! or balanced: whatever a rule does not match stays in the text.
//!
//! ## Rule Order
//!
//! 1. BOM removal
//! 2. `[math]` (content unescaped)
//! 3. `[b]`, `[u]`, `[i]` (single line, repeated until stable)
//! 4. `[sub]`, `[sup]`, buttons (single line, one pass)
//! 5. line breaks
//! 6. `[code]`
//! 7. `[font=Courier New]` verbatim
//! 8. colours
//! 9. `[url]`
//! 10. `[quote]`
//! 11. lists
//! 12. `[center]`, `[left]`, `[font]`, `[size]` stripped
//! 13. tables (cells translated recursively)
//! 14. `[img]`, `[icon]`
//! 15. character table
//! 16. optional word wrap
//!
//! [`escape`]: crate::pipeline::escape::escape

pub mod scanner;
pub mod symbols;

use crate::config::ConversionConfig;
use crate::diagnostics::Diagnostics;
use crate::pipeline::escape::{escape, unescape};
use crate::pipeline::images::{format_length, ImageResolver};
use crate::pipeline::postprocess::{wrap_words, WRAP_COLUMN};
use once_cell::sync::Lazy;
use regex::{Captures, NoExpand, Regex};
use scanner::SpanRule;

/// Translator switches taken from [`ConversionConfig`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkupOptions {
    pub text_color: bool,
    pub word_wrap: bool,
    /// Table and cell width as a fraction of `\textwidth`.
    pub column_width: f64,
    pub icon_size_cm: f64,
}

impl MarkupOptions {
    pub fn from_config(config: &ConversionConfig) -> Self {
        Self {
            text_color: config.text_color,
            word_wrap: config.word_wrap,
            column_width: config.sizing.column_width,
            icon_size_cm: config.sizing.icon_size_cm,
        }
    }
}

impl Default for MarkupOptions {
    fn default() -> Self {
        Self::from_config(&ConversionConfig::default())
    }
}

// ── Span rules ───────────────────────────────────────────────────────────────

const MATH: SpanRule = SpanRule::plain("[math]", "[/math]");
const BOLD: SpanRule = SpanRule::plain("[b]", "[/b]").single_line().fixpoint();
const UNDERLINE: SpanRule = SpanRule::plain("[u]", "[/u]").single_line().fixpoint();
const ITALIC: SpanRule = SpanRule::plain("[i]", "[/i]").single_line().fixpoint();
const SUB: SpanRule = SpanRule::plain("[sub]", "[/sub]").single_line();
const SUP: SpanRule = SpanRule::plain("[sup]", "[/sup]").single_line();
// Underscores are escaped by the time these run.
const BUTTON_SMALL: SpanRule =
    SpanRule::plain("[button\\_small]", "[/button\\_small]").single_line();
const BUTTON: SpanRule = SpanRule::plain("[button]", "[/button]").single_line();
const CODE: SpanRule = SpanRule::plain("[code]", "[/code]");
const COURIER: SpanRule = SpanRule::plain("[font=Courier New]", "[/font]");
const URL: SpanRule = SpanRule::param("[url=", "[/url]");
const QUOTE: SpanRule = SpanRule::plain("[quote]", "[/quote]");
const CENTER: SpanRule = SpanRule::plain("[center]", "[/center]");
const LEFT: SpanRule = SpanRule::plain("[left]", "[/left]");
const FONT: SpanRule = SpanRule::param("[font=", "[/font]");
const TABLE: SpanRule = SpanRule::plain("[table]", "[/table]");
const CELL: SpanRule = SpanRule::plain("[td]", "[/td]");
const ROW: SpanRule = SpanRule::plain("[tr]", "[/tr]");
const IMG: SpanRule = SpanRule::plain("[img]", "[/img]");
const ICON: SpanRule = SpanRule::plain("[icon]", "[/icon]");

/// Plain marker substitutions for list environments.
const LIST_MARKERS: &[(&str, &str)] = &[
    ("[list]", "\\begin{enumerate}[label=$\\bullet$]"),
    ("[list=1]", "\\begin{enumerate}[label=\\arabic*.]"),
    ("[list=a]", "\\begin{enumerate}[label=(\\alph*)]"),
    ("[/list]", "\\end{enumerate}"),
    ("[*]", "\\item "),
    ("[/*]", ""),
];

/// `[br]`, and `<br>` as it looks after escaping.
const BREAKS: &[&str] = &["[br]", "\\textless{}br\\textgreater{}"];

/// Candidate `\verb` delimiters, tried in order.
const VERB_SEPARATORS: &[char] = &['§', '|', '!', '+', '@', '='];

static RE_COLOR_HEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[color=#(\w+)\]").unwrap());
static RE_COLOR_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[color=(\w+)\]").unwrap());
static RE_COLOR_ANY: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[color=#?\w+\]").unwrap());
static RE_SIZE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[size=[^\]]+\]").unwrap());
static RE_LINE_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\r\n]+").unwrap());
static RE_SPACE_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s\s+").unwrap());
static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Applies the markup rules to escaped text.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkupTranslator {
    options: MarkupOptions,
    diag: Diagnostics,
}

impl MarkupTranslator {
    pub fn new(options: MarkupOptions, diag: Diagnostics) -> Self {
        Self { options, diag }
    }

    pub fn from_config(config: &ConversionConfig) -> Self {
        Self::new(
            MarkupOptions::from_config(config),
            Diagnostics::new(config.verbosity),
        )
    }

    /// Escape raw page text, then translate it.
    pub fn translate_raw(&self, raw: &str, images: &mut ImageResolver) -> String {
        self.translate(&escape(raw), images)
    }

    /// Translate already-escaped text. Images referenced by `[img]` and
    /// `[icon]` are resolved through `images`.
    pub fn translate(&self, escaped: &str, images: &mut ImageResolver) -> String {
        self.diag
            .log(2, format_args!("Translating {} bytes of markup", escaped.len()));
        let text = self.rewrite(escaped, images);
        let text = symbols::substitute(&text);
        let text = if self.options.word_wrap {
            wrap_words(&text, WRAP_COLUMN)
        } else {
            text
        };
        self.diag
            .log(2, format_args!("Markup produced {} bytes", text.len()));
        text
    }

    /// Tag rules only. Table cells recurse through here, so the character
    /// table is applied once to the whole fragment.
    fn rewrite(&self, text: &str, images: &mut ImageResolver) -> String {
        let text = text.replace('\u{FEFF}', "");

        let text = MATH.apply(&text, |s| format!("${}$", unescape(s.inner)));

        let text = BOLD.apply(&text, |s| format!("{{\\bf{{}}{}}}", s.inner));
        let text = UNDERLINE.apply(&text, |s| format!("\\underline{{{}}}", s.inner));
        let text = ITALIC.apply(&text, |s| format!("{{\\em{{}}{}}}", s.inner));

        let text = SUB.apply(&text, |s| format!("\\textsubscript{{{}}}", s.inner));
        let text = SUP.apply(&text, |s| format!("\\textsuperscript{{{}}}", s.inner));
        let text = BUTTON_SMALL.apply(&text, |s| framed_button(s.inner, 2));
        let text = BUTTON.apply(&text, |s| framed_button(s.inner, 3));

        let mut text = text.replace('\n', "\n\n");
        for br in BREAKS {
            text = text.replace(br, "\n\n");
        }

        let text = CODE.apply(&text, |s| {
            format!(
                "\\texttt{{{}}}",
                RE_LINE_RUNS.replace_all(s.inner, NoExpand("\n\\\\"))
            )
        });
        let text = COURIER.apply(&text, |s| verbatim(s.inner));

        let text = self.colors(&text);

        let text = URL.apply(&text, |s| {
            let caption = if s.inner.is_empty() { s.param } else { s.inner };
            format!(
                "\\href{{{}}}{{{}}}",
                unescape(s.param),
                RE_WHITESPACE.replace_all(caption.trim(), " ")
            )
        });

        let text = QUOTE.apply(&text, |s| {
            format!("\\begin{{quote}}{}\\end{{quote}}", s.inner)
        });

        let mut text = text;
        for (marker, latex) in LIST_MARKERS {
            text = text.replace(marker, latex);
        }

        let text = CENTER.apply(&text, |s| s.inner.to_string());
        let text = LEFT.apply(&text, |s| s.inner.to_string());
        let text = FONT.apply(&text, |s| s.inner.to_string());
        let text = RE_SIZE.replace_all(&text, "").replace("[/size]", "");

        let text = self.tables(&text, images);

        let text = IMG.apply(&text, |s| {
            let img = images.inline(unescape(s.inner).trim());
            format!(
                "\\includegraphics[height={}mm]{{{}}}",
                format_length(img.height_mm),
                img.path
            )
        });
        ICON.apply(&text, |s| {
            let path = images.icon(unescape(s.inner).trim());
            format!(
                "\\includegraphics[width={}cm]{{{}}}",
                format_length(self.options.icon_size_cm),
                path
            )
        })
    }

    fn colors(&self, text: &str) -> String {
        let text = if self.options.text_color {
            let text = RE_COLOR_HEX.replace_all(text, |c: &Captures| {
                format!("\\color[HTML]{{{}}}{{}}", c[1].to_uppercase())
            });
            RE_COLOR_NAME
                .replace_all(&text, "\\color{${1}}{}")
                .into_owned()
        } else {
            // Colour is unavailable: keep the emphasis.
            RE_COLOR_ANY.replace_all(text, NoExpand("\\it{}")).into_owned()
        };
        text.replace("[/color]", "\\color{black}{}")
    }

    fn tables(&self, text: &str, images: &mut ImageResolver) -> String {
        let width = format_length(self.options.column_width);
        let text = TABLE.apply(text, |s| {
            if s.inner.is_empty() {
                return String::new();
            }
            format!(
                "{{\\small\\begin{{tabulary}}{{{width}\\textwidth}}{{LLLLLLLLLLLLLL}}\n\
                 \\specialrule{{0em}}{{0.3em}}{{0.3em}}\n{}\\end{{tabulary}}\n}}\n\n",
                s.inner
            )
        });
        let text = CELL.apply(&text, |s| {
            if s.inner.is_empty() {
                return "&".to_string();
            }
            let cell = self.rewrite(cell_newlines(s.inner).trim(), images);
            format!("\\pbox[c]{{{width}\\textwidth}}{{{cell}}}&")
        });
        ROW.apply(&text, |s| {
            format!("{}\\\\\\specialrule{{0em}}{{0.3em}}{{0.3em}}\n", s.inner)
        })
    }
}

fn framed_button(label: &str, sep_pt: u8) -> String {
    format!(
        "\\setlength{{\\fboxsep}}{{{sep_pt}pt}}\\ovalbox{{{label}}}\\setlength{{\\fboxsep}}{{0pt}}"
    )
}

/// ` \verb<sep>content<sep> ` with the raw characters restored and all
/// whitespace folded to single spaces.
fn verbatim(inner: &str) -> String {
    let raw = unescape(inner).replace("[br]", " ").replace('\n', " ");
    let raw = RE_SPACE_RUNS.replace_all(raw.trim(), " ");
    let sep = VERB_SEPARATORS
        .iter()
        .copied()
        .find(|c| !raw.contains(*c))
        .unwrap_or(VERB_SEPARATORS[0]);
    format!(" \\verb{sep}{raw}{sep} ")
}

/// Line-break runs inside a table cell become `{\newline}`.
fn cell_newlines(inner: &str) -> String {
    RE_LINE_RUNS
        .replace_all(inner.trim(), NoExpand("{\\newline}"))
        .into_owned()
}
