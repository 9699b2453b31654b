//! LaTeX output: fixed preamble, title block, section tree, figures.
//!
//! The preamble is static apart from the babel language, the optional
//! paragraph-indent switch and the generation timestamp. Everything that
//! depends on the page is already LaTeX by the time it reaches this module.

use crate::config::{ConversionConfig, Language};
use crate::pipeline::assemble::{Document, Layout};
use std::fmt::Write;

/// Trailer appended after the body and the optional bibliography.
pub const END_DOCUMENT: &str = "\n\\end{document}\n";

const PACKAGES_HEAD: &str = r"\documentclass{article}
\usepackage{fullpage}
\usepackage[utf8]{inputenc}
\usepackage{amssymb}
\usepackage{amsmath}
\usepackage{pbox}
\usepackage{fancybox}
\renewcommand{\familydefault}{\sfdefault}
\newcommand{\hrefnoref}{\href}
\renewenvironment{abstract}
{\small \begin{center} \bfseries \abstractname\vspace{-.5em}\vspace{0pt}
\end{center} \list{}{%
\setlength{\parskip}{4pt}}%
\item\relax}
{\endlist}
\usepackage{xcolor}
\usepackage{graphicx}
\DeclareGraphicsExtensions{.pdf,.png,.jpg}
\usepackage{hyperref}
\usepackage{breakurl}
\usepackage{tabulary}
\usepackage{ctable}
";

// csquotes turns `"` into an active character; the group restores a plain
// quote inside \texttt.
const PACKAGES_TAIL: &str = r#"\usepackage{datetime}
\usepackage{csquotes}
\MakeOuterQuote{"}
\begingroup\lccode`~=`"
\lowercase{\endgroup
\DeclareTextFontCommand{\texttt}{\ttfamily\def~{"}}%
}
\usepackage{float}
\usepackage{caption}
\usepackage[official]{eurosym}
\usepackage{gensymb}
\usepackage{fixltx2e}
\usepackage{enumitem}
\tolerance10000
\frenchspacing
"#;

/// Writes the document up to (not including) `\end{document}`.
#[derive(Debug, Clone)]
pub struct LatexWriter {
    language: Language,
    no_indent: bool,
    generated_at: String,
}

impl LatexWriter {
    /// Writer stamped with the current local time.
    pub fn new(config: &ConversionConfig) -> Self {
        let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        Self {
            language: config.language.clone(),
            no_indent: config.no_indent,
            generated_at: now,
        }
    }

    /// Replace the header timestamp, for reproducible output.
    pub fn with_timestamp(mut self, stamp: impl Into<String>) -> Self {
        self.generated_at = stamp.into();
        self
    }

    pub fn preamble(&self) -> String {
        let mut tex = String::with_capacity(2048);
        let _ = writeln!(
            tex,
            "% This LaTeX document has been machine generated by worksheet2tex {} on {}.",
            env!("CARGO_PKG_VERSION"),
            self.generated_at
        );
        tex.push_str("% Please visit https://www.geogebra.org for more information.\n\n");
        tex.push_str(PACKAGES_HEAD);
        let _ = writeln!(tex, "\\usepackage[greek,{}]{{babel}}", self.language.babel);
        tex.push_str(PACKAGES_TAIL);
        if self.no_indent {
            tex.push_str("\\setlength{\\parindent}{0pt}\n");
        }
        tex
    }

    /// Preamble, title block, table of contents and the section tree.
    pub fn render(&self, doc: &Document) -> String {
        let mut tex = self.preamble();

        tex.push_str("\n\\begin{document}\n");
        tex.push_str("\\setlength{\\parskip}{6pt plus0.2pt minus0.2pt}\n");
        tex.push_str("\\setlength{\\fboxsep}{0pt}\n");
        let _ = writeln!(tex, "\n\\selectlanguage{{{}}}", self.language.name);
        let _ = writeln!(tex, "\\title{{{}}}", doc.title);
        let _ = writeln!(
            tex,
            "\\author{{\\hrefnoref{{{}}}{{{}}}}}",
            doc.author_link, doc.author_name
        );
        let _ = writeln!(tex, "\\date{{{}}}", doc.date);
        tex.push_str("\\maketitle\n");
        if !doc.abstract_text.is_empty() {
            let _ = write!(
                tex,
                "\n\\begin{{abstract}}\n{}\n\\end{{abstract}}\n\n",
                doc.abstract_text
            );
        }
        tex.push_str("\\tableofcontents\n");

        let sub = match doc.layout {
            Layout::Numbered => "subsection",
            Layout::Simple => "section",
        };
        for section in &doc.sections {
            if let Some(title) = &section.title {
                let _ = writeln!(tex, "\\section{{{title}}}");
            }
            for s in &section.subsections {
                let _ = writeln!(tex, "\\{sub}{{{}}}", s.title);
                tex.push_str(&s.body);
            }
        }
        tex
    }
}

/// A centred, unnumbered float.
#[derive(Debug, Clone, Default)]
pub struct FigureMarkup<'a> {
    pub path: &'a str,
    /// Width in millimetres, already formatted.
    pub width_mm: &'a str,
    pub caption: Option<&'a str>,
    pub framed: bool,
    /// Wraps the picture in `\hrefnoref`, which stays out of the bibliography.
    pub link: Option<&'a str>,
}

impl FigureMarkup<'_> {
    pub fn render(&self) -> String {
        let mut graphic = format!("\\includegraphics[width={}mm]{{{}}}", self.width_mm, self.path);
        if self.framed {
            graphic = format!("\\fbox{{{graphic}}}");
        }
        if let Some(link) = self.link {
            graphic = format!("\\hrefnoref{{{link}}}{{{graphic}}}");
        }
        let mut tex = format!("\\begin{{figure}}[H]\n\\begin{{center}}\n{graphic}\n");
        if let Some(caption) = self.caption {
            let _ = writeln!(tex, "\\caption*{{{caption}}}");
        }
        tex.push_str("\\end{center}\n\\end{figure}\n\n");
        tex
    }
}

/// `\subsubsection*{…}`, or nothing for empty text.
pub fn subsubsection(text: &str) -> String {
    if text.is_empty() {
        String::new()
    } else {
        format!("\\subsubsection*{{{text}}}\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::assemble::{Section, Subsection};

    fn doc(layout: Layout) -> Document {
        Document {
            title: "Vectors".into(),
            author_name: "Zoltan".into(),
            author_link: "https://example.org/u/z".into(),
            date: "Nov 17".into(),
            abstract_text: String::new(),
            layout,
            sections: vec![Section {
                title: match layout {
                    Layout::Numbered => Some("Basics".into()),
                    Layout::Simple => None,
                },
                subsections: vec![Subsection {
                    title: "Points".into(),
                    body: "Body.\n\n".into(),
                }],
            }],
        }
    }

    fn writer(config: &ConversionConfig) -> LatexWriter {
        LatexWriter::new(config).with_timestamp("2016-11-17 10:00:00")
    }

    #[test]
    fn preamble_uses_babel_option_and_indent_switch() {
        let config = ConversionConfig::builder()
            .iso639_language("de")
            .no_indent(false)
            .build()
            .unwrap();
        let tex = writer(&config).preamble();
        assert!(tex.starts_with("% This LaTeX document has been machine generated"));
        assert!(tex.contains("2016-11-17 10:00:00"));
        assert!(tex.contains("\\usepackage[greek,ngerman]{babel}\n"));
        assert!(tex.contains("\\newcommand{\\hrefnoref}{\\href}\n"));
        assert!(!tex.contains("\\parindent"));

        let tex = writer(&ConversionConfig::default()).preamble();
        assert!(tex.ends_with("\\frenchspacing\n\\setlength{\\parindent}{0pt}\n"));
    }

    #[test]
    fn numbered_layout() {
        let tex = writer(&ConversionConfig::default()).render(&doc(Layout::Numbered));
        assert!(tex.contains("\\selectlanguage{english}\n\\title{Vectors}\n"));
        assert!(tex.contains("\\author{\\hrefnoref{https://example.org/u/z}{Zoltan}}\n\\date{Nov 17}\n\\maketitle\n"));
        assert!(!tex.contains("\\begin{abstract}"));
        assert!(tex.ends_with("\\tableofcontents\n\\section{Basics}\n\\subsection{Points}\nBody.\n\n"));
    }

    #[test]
    fn simple_layout_promotes_subsections() {
        let mut d = doc(Layout::Simple);
        d.abstract_text = "About.".into();
        let tex = writer(&ConversionConfig::default()).render(&d);
        assert!(tex.contains("\\begin{abstract}\nAbout.\n\\end{abstract}\n\n\\tableofcontents\n"));
        assert!(tex.ends_with("\\tableofcontents\n\\section{Points}\nBody.\n\n"));
    }

    #[test]
    fn linked_framed_figure() {
        let tex = FigureMarkup {
            path: "images/1.png",
            width_mm: "87.4",
            caption: Some("Interactive applet, \\url{http://www.geogebra.org/m/42}"),
            framed: true,
            link: Some("http://www.geogebra.org/m/42"),
        }
        .render();
        assert_eq!(
            tex,
            "\\begin{figure}[H]\n\\begin{center}\n\
             \\hrefnoref{http://www.geogebra.org/m/42}{\\fbox{\\includegraphics[width=87.4mm]{images/1.png}}}\n\
             \\caption*{Interactive applet, \\url{http://www.geogebra.org/m/42}}\n\
             \\end{center}\n\\end{figure}\n\n"
        );
    }

    #[test]
    fn plain_figure_without_caption() {
        let tex = FigureMarkup {
            path: "images/placeholder.png",
            width_mm: "50",
            ..FigureMarkup::default()
        }
        .render();
        assert_eq!(
            tex,
            "\\begin{figure}[H]\n\\begin{center}\n\\includegraphics[width=50mm]{images/placeholder.png}\n\\end{center}\n\\end{figure}\n\n"
        );
    }

    #[test]
    fn empty_subsubsection_is_dropped() {
        assert_eq!(subsubsection(""), "");
        assert_eq!(subsubsection("Hint"), "\\subsubsection*{Hint}\n\n");
    }
}
