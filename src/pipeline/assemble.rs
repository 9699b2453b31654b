//! Document assembly: page metadata + navigation walk → [`Document`].
//!
//! Worksheet content and the navigation menu are read independently. Every
//! worksheet is rendered into one LaTeX block in document order; the menu
//! walk then hands those blocks out, one per sub-entry, in the order the
//! sub-entries are visited. Nothing ties a block to its menu entry except
//! position, so a page with a different number of worksheets and sub-entries
//! produces misplaced content. Both mismatches are logged.

use crate::config::{ConversionConfig, Labels};
use crate::diagnostics::Diagnostics;
use crate::pipeline::escape::escape;
use crate::pipeline::images::{format_length, FigureSource, ImageResolver};
use crate::pipeline::latex::{subsubsection, FigureMarkup};
use crate::pipeline::markup::MarkupTranslator;
use crate::pipeline::source::{BookSource, ContentElement, MenuEntry, Worksheet};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::{info, warn};

/// Suffix the exporter appends to every page title.
const TITLE_SUFFIX: &str = "- GeoGebraBook";

/// Width of the applet placeholder logo.
const PLACEHOLDER_WIDTH_MM: &str = "50";

static RE_PREVIEW: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"setPreviewImage\('([^'\s]+)'").unwrap());
static RE_SECTION_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\.\s+").unwrap());

/// How the menu maps onto LaTeX sectioning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    /// Menu entries are sections, sub-entries are subsections.
    Numbered,
    /// Single-level book: sub-entries are sections and entries are dropped.
    Simple,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Escaped title without the exporter suffix.
    pub title: String,
    pub author_name: String,
    pub author_link: String,
    pub date: String,
    /// Translated description. Empty means no abstract.
    pub abstract_text: String,
    pub layout: Layout,
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    /// `None` in simple layout or when the entry has no sub-entries.
    pub title: Option<String>,
    pub subsections: Vec<Subsection>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Subsection {
    pub title: String,
    /// Rendered content of the worksheet paired with this sub-entry.
    pub body: String,
}

/// Counts collected while assembling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AssemblyReport {
    pub worksheets: usize,
    pub elements: usize,
    pub unsupported: usize,
    /// Sub-entries that found no worksheet block.
    pub empty_subsections: usize,
    /// Worksheet blocks left over after the menu walk.
    pub unused_blocks: usize,
}

pub struct DocumentAssembler {
    translator: MarkupTranslator,
    labels: Labels,
    diag: Diagnostics,
}

impl DocumentAssembler {
    pub fn new(config: &ConversionConfig) -> Self {
        Self {
            translator: MarkupTranslator::from_config(config),
            labels: config.labels.clone(),
            diag: Diagnostics::new(config.verbosity),
        }
    }

    pub fn assemble(
        &self,
        source: &BookSource,
        images: &mut ImageResolver,
    ) -> (Document, AssemblyReport) {
        let mut report = AssemblyReport {
            worksheets: source.worksheets.len(),
            ..AssemblyReport::default()
        };

        let title = escape(strip_title_suffix(&source.title));
        let abstract_text = self.translator.translate_raw(&source.description, images);

        info!("Rendering {} worksheet(s)", source.worksheets.len());
        let blocks: Vec<String> = source
            .worksheets
            .iter()
            .enumerate()
            .map(|(i, ws)| {
                self.diag
                    .log(1, format_args!("Processing worksheet {}", i + 1));
                self.render_worksheet(ws, images, &mut report)
            })
            .collect();

        let layout = detect_layout(&source.menu);
        self.diag
            .log(1, format_args!("Generating sections ({layout:?} layout)"));

        let mut blocks = blocks.into_iter();
        let mut sections = Vec::with_capacity(source.menu.len());
        for (i, entry) in source.menu.iter().enumerate() {
            self.diag
                .log(2, format_args!("Section {}: '{}'", i + 1, entry.label));
            let title = match layout {
                Layout::Numbered if !entry.items.is_empty() => {
                    Some(escape(&RE_SECTION_NUMBER.replace(&entry.label, "")))
                }
                _ => None,
            };
            let subsections = entry
                .items
                .iter()
                .map(|item| {
                    let body = blocks.next().unwrap_or_else(|| {
                        warn!("No worksheet content left for '{item}'; leaving it empty");
                        report.empty_subsections += 1;
                        String::new()
                    });
                    Subsection {
                        title: escape(item),
                        body,
                    }
                })
                .collect();
            sections.push(Section { title, subsections });
        }

        report.unused_blocks = blocks.count();
        if report.unused_blocks > 0 {
            warn!(
                "{} worksheet(s) have no menu entry and are left out",
                report.unused_blocks
            );
        }

        let document = Document {
            title,
            author_name: escape(&source.author.name),
            author_link: source.author.link.clone(),
            date: escape(&source.date),
            abstract_text,
            layout,
            sections,
        };
        (document, report)
    }

    fn render_worksheet(
        &self,
        ws: &Worksheet,
        images: &mut ImageResolver,
        report: &mut AssemblyReport,
    ) -> String {
        let mut block = String::new();
        for element in &ws.elements {
            report.elements += 1;
            match element {
                ContentElement::Text(text) => {
                    block.push_str(&self.translator.translate_raw(text, images));
                    block.push_str("\n\n");
                }
                ContentElement::Title(text) | ContentElement::Header(text) => {
                    block.push_str(&subsubsection(
                        &self.translator.translate_raw(text, images),
                    ));
                }
                ContentElement::Applet { script } => {
                    block.push_str(&self.applet(script, images));
                }
                ContentElement::Image { src, caption } => {
                    let caption = caption
                        .as_deref()
                        .map(|c| self.translator.translate_raw(c, images))
                        .filter(|c| !c.is_empty());
                    let source = images.locate(src);
                    let figure = images.figure(&source);
                    block.push_str(
                        &FigureMarkup {
                            path: &figure.path,
                            width_mm: &format_length(figure.width_mm),
                            caption: caption.as_deref(),
                            ..FigureMarkup::default()
                        }
                        .render(),
                    );
                }
                ContentElement::Video { src } => match youtube_id(src) {
                    Some(id) => block.push_str(&self.video(id, images)),
                    None => {
                        self.diag
                            .log(2, format_args!("Skipping video without embed id: {src}"));
                    }
                },
                ContentElement::Unsupported { kind } => {
                    report.unsupported += 1;
                    self.diag
                        .log(2, format_args!("Dropping unsupported element '{kind}'"));
                }
            }
        }
        block
    }

    /// Preview figure linked to the material page, or the generic logo.
    fn applet(&self, script: &str, images: &mut ImageResolver) -> String {
        let Some((file, material)) = applet_preview(script) else {
            self.diag
                .log(2, format_args!("Applet without preview image, using placeholder"));
            let path = images.placeholder();
            return FigureMarkup {
                path: &path,
                width_mm: PLACEHOLDER_WIDTH_MM,
                ..FigureMarkup::default()
            }
            .render();
        };
        self.diag.log(2, format_args!("figure({file})"));

        let link = format!("http://www.geogebra.org/m/{material}");
        let caption = format!("{}, \\url{{{link}}}", escape(&self.labels.applet));
        let source = images.locate(file);
        let figure = images.figure(&source);
        FigureMarkup {
            path: &figure.path,
            width_mm: &format_length(figure.width_mm),
            caption: Some(&caption),
            framed: true,
            link: Some(&link),
        }
        .render()
    }

    fn video(&self, id: &str, images: &mut ImageResolver) -> String {
        let preview = format!("http://img.youtube.com/vi/{id}/maxresdefault.jpg");
        self.diag
            .log(1, format_args!("Fetching video thumbnail {preview}"));
        let raw = images.thumbnail(&preview);
        let figure = images.figure(&FigureSource::Local(raw));
        let caption = format!(
            "{}, \\url{{https://www.youtube.com/watch?v={id}}}",
            escape(&self.labels.video)
        );
        FigureMarkup {
            path: &figure.path,
            width_mm: &format_length(figure.width_mm),
            caption: Some(&caption),
            ..FigureMarkup::default()
        }
        .render()
    }
}

fn strip_title_suffix(title: &str) -> &str {
    let title = title.trim();
    title.strip_suffix(TITLE_SUFFIX).unwrap_or(title).trim_end()
}

/// A book whose first entry is not numbered `1. ` is single-level.
pub fn detect_layout(menu: &[MenuEntry]) -> Layout {
    match menu.first() {
        Some(first) if !first.label.starts_with("1. ") => Layout::Simple,
        _ => Layout::Numbered,
    }
}

/// Preview image path and material id from an applet's script text.
///
/// `…setPreviewImage('GeoGebra/files/…/material-136381.png', …)` yields the
/// path and `136381`. The id is the file name part after the first `-`,
/// without extension. No usable id means no preview.
pub fn applet_preview(script: &str) -> Option<(&str, &str)> {
    let file = RE_PREVIEW.captures(script)?.get(1)?.as_str();
    let (_, rest) = file.split_once('-')?;
    let material = rest.rsplit_once('.').map_or(rest, |(stem, _)| stem);
    (!material.is_empty()).then_some((file, material))
}

/// Video id of an `…/embed/<id>` player URL, without query string.
pub fn youtube_id(src: &str) -> Option<&str> {
    let (_, rest) = src.split_once("/embed/")?;
    let id = rest.split(['?', '#']).next().unwrap_or(rest);
    (!id.is_empty()).then_some(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RasterBackend;
    use crate::pipeline::images::fetch::MemoryFetcher;
    use crate::pipeline::source::Author;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;
    use tempfile::TempDir;

    fn png_bytes(w: u32, h: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(w, h, Rgba([90, 90, 90, 255]));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    fn setup(dir: &TempDir, fetcher: MemoryFetcher) -> (DocumentAssembler, ImageResolver) {
        let config = ConversionConfig::builder()
            .work_dir(dir.path())
            .raster(RasterBackend::Builtin)
            .build()
            .unwrap();
        let images = ImageResolver::new(&config)
            .unwrap()
            .with_fetcher(Box::new(fetcher))
            .with_asset_root(dir.path());
        (DocumentAssembler::new(&config), images)
    }

    fn text_sheet(text: &str) -> Worksheet {
        Worksheet {
            elements: vec![ContentElement::Text(text.into())],
        }
    }

    fn entry(label: &str, items: &[&str]) -> MenuEntry {
        MenuEntry {
            label: label.into(),
            items: items.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn book(worksheets: Vec<Worksheet>, menu: Vec<MenuEntry>) -> BookSource {
        BookSource {
            title: "Sets & Maps - GeoGebraBook".into(),
            author: Author {
                name: "A_Author".into(),
                link: "https://example.org/u/a".into(),
            },
            date: "Nov 17".into(),
            description: "About [b]sets[/b]".into(),
            worksheets,
            menu,
        }
    }

    #[test]
    fn metadata_is_escaped_and_translated() {
        let dir = TempDir::new().unwrap();
        let (asm, mut images) = setup(&dir, MemoryFetcher::new());
        let (doc, _) = asm.assemble(&book(vec![], vec![]), &mut images);
        assert_eq!(doc.title, "Sets \\& Maps");
        assert_eq!(doc.author_name, "A\\_Author");
        assert_eq!(doc.date, "Nov 17");
        assert_eq!(doc.abstract_text, "About {\\bf{}sets}");
    }

    #[test]
    fn numbered_walk_pairs_blocks_in_order() {
        let dir = TempDir::new().unwrap();
        let (asm, mut images) = setup(&dir, MemoryFetcher::new());
        let src = book(
            vec![text_sheet("one"), text_sheet("two"), text_sheet("three")],
            vec![entry("1. Intro", &["A", "B"]), entry("2. Next", &["C"])],
        );
        let (doc, report) = asm.assemble(&src, &mut images);
        assert_eq!(doc.layout, Layout::Numbered);
        assert_eq!(doc.sections[0].title.as_deref(), Some("Intro"));
        assert_eq!(doc.sections[1].title.as_deref(), Some("Next"));
        let bodies: Vec<_> = doc
            .sections
            .iter()
            .flat_map(|s| s.subsections.iter().map(|ss| ss.body.as_str()))
            .collect();
        assert_eq!(bodies, ["one\n\n", "two\n\n", "three\n\n"]);
        assert_eq!(report, AssemblyReport { worksheets: 3, elements: 3, ..Default::default() });
    }

    #[test]
    fn entry_without_items_has_no_heading() {
        let dir = TempDir::new().unwrap();
        let (asm, mut images) = setup(&dir, MemoryFetcher::new());
        let src = book(vec![], vec![entry("1. Lonely", &[])]);
        let (doc, _) = asm.assemble(&src, &mut images);
        assert_eq!(doc.sections[0].title, None);
    }

    #[test]
    fn simple_walk_flattens_the_whole_book() {
        let dir = TempDir::new().unwrap();
        let (asm, mut images) = setup(&dir, MemoryFetcher::new());
        let src = book(
            vec![text_sheet("one"), text_sheet("two")],
            vec![entry("Intro", &["A"]), entry("2. Next", &["B"])],
        );
        let (doc, _) = asm.assemble(&src, &mut images);
        assert_eq!(doc.layout, Layout::Simple);
        assert!(doc.sections.iter().all(|s| s.title.is_none()));
        assert_eq!(doc.sections[1].subsections[0].body, "two\n\n");
    }

    #[test]
    fn mismatched_counts_are_reported() {
        let dir = TempDir::new().unwrap();
        let (asm, mut images) = setup(&dir, MemoryFetcher::new());

        let short = book(vec![text_sheet("one")], vec![entry("1. S", &["A", "B"])]);
        let (doc, report) = asm.assemble(&short, &mut images);
        assert_eq!(doc.sections[0].subsections[1].body, "");
        assert_eq!(report.empty_subsections, 1);

        let long = book(
            vec![text_sheet("one"), text_sheet("two")],
            vec![entry("1. S", &["A"])],
        );
        let (_, report) = asm.assemble(&long, &mut images);
        assert_eq!(report.unused_blocks, 1);
    }

    #[test]
    fn titles_and_headers_render_as_starred_subsubsections() {
        let dir = TempDir::new().unwrap();
        let (asm, mut images) = setup(&dir, MemoryFetcher::new());
        let ws = Worksheet {
            elements: vec![
                ContentElement::Title("Task".into()),
                ContentElement::Header("".into()),
                ContentElement::Unsupported { kind: "ws-element-pdf".into() },
            ],
        };
        let src = book(vec![ws], vec![entry("1. S", &["A"])]);
        let (doc, report) = asm.assemble(&src, &mut images);
        assert_eq!(doc.sections[0].subsections[0].body, "\\subsubsection*{Task}\n\n");
        assert_eq!(report.unsupported, 1);
    }

    #[test]
    fn applet_with_local_preview() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("files")).unwrap();
        std::fs::write(dir.path().join("files/material-136381.png"), png_bytes(437, 300)).unwrap();
        let (asm, mut images) = setup(&dir, MemoryFetcher::new());

        let ws = Worksheet {
            elements: vec![ContentElement::Applet {
                script: "applet_136381.setPreviewImage('files/material-136381.png', 'x.png');".into(),
            }],
        };
        let src = book(vec![ws], vec![entry("1. S", &["A"])]);
        let (doc, _) = asm.assemble(&src, &mut images);
        assert_eq!(
            doc.sections[0].subsections[0].body,
            "\\begin{figure}[H]\n\\begin{center}\n\
             \\hrefnoref{http://www.geogebra.org/m/136381}{\\fbox{\\includegraphics[width=87.4mm]{images/1.png}}}\n\
             \\caption*{Interactive applet, \\url{http://www.geogebra.org/m/136381}}\n\
             \\end{center}\n\\end{figure}\n\n"
        );
    }

    #[test]
    fn applet_without_preview_uses_placeholder() {
        let dir = TempDir::new().unwrap();
        let fetcher = MemoryFetcher::new()
            .with(crate::pipeline::images::PLACEHOLDER_URL, png_bytes(1024, 300));
        let (asm, mut images) = setup(&dir, fetcher);
        let ws = Worksheet {
            elements: vec![ContentElement::Applet { script: "ggbApplet".into() }],
        };
        let src = book(vec![ws], vec![entry("1. S", &["A"])]);
        let (doc, _) = asm.assemble(&src, &mut images);
        assert!(doc.sections[0].subsections[0]
            .body
            .contains("\\includegraphics[width=50mm]{images/placeholder.png}"));
        assert!(dir.path().join("images/placeholder.png").exists());
    }

    #[test]
    fn video_thumbnail_figure() {
        let dir = TempDir::new().unwrap();
        let thumb = "http://img.youtube.com/vi/V-Cq2VMsiZw/maxresdefault.jpg";
        let (asm, mut images) = setup(&dir, MemoryFetcher::new().with(thumb, png_bytes(1280, 720)));
        let ws = Worksheet {
            elements: vec![
                ContentElement::Video { src: "http://www.youtube.com/embed/V-Cq2VMsiZw".into() },
                ContentElement::Video { src: "http://vimeo.com/123".into() },
            ],
        };
        let src = book(vec![ws], vec![entry("1. S", &["A"])]);
        let (doc, _) = asm.assemble(&src, &mut images);
        assert_eq!(
            doc.sections[0].subsections[0].body,
            "\\begin{figure}[H]\n\\begin{center}\n\
             \\includegraphics[width=120mm]{images/1.png}\n\
             \\caption*{Video, \\url{https://www.youtube.com/watch?v=V-Cq2VMsiZw}}\n\
             \\end{center}\n\\end{figure}\n\n"
        );
    }

    #[test]
    fn image_caption_undefined_is_dropped_upstream() {
        let dir = TempDir::new().unwrap();
        let (asm, mut images) = setup(&dir, MemoryFetcher::new());
        let ws = Worksheet {
            elements: vec![ContentElement::Image { src: "missing.png".into(), caption: None }],
        };
        let src = book(vec![ws], vec![entry("1. S", &["A"])]);
        let (doc, _) = asm.assemble(&src, &mut images);
        let body = &doc.sections[0].subsections[0].body;
        assert!(body.contains("\\includegraphics[width=30mm]{images/1.png}"));
        assert!(!body.contains("\\caption*"));
        assert_eq!(images.stats().failed, 1);
    }

    #[test]
    fn preview_parsing() {
        let script = "applet_136381.setPreviewImage('GeoGebra/files/00/00/13/63/material-136381.png', 'GeoGebra/images/GeoGebra_loading.png');";
        assert_eq!(
            applet_preview(script),
            Some(("GeoGebra/files/00/00/13/63/material-136381.png", "136381"))
        );
        assert_eq!(applet_preview("no preview here"), None);
        assert_eq!(applet_preview("x.setPreviewImage('nodash.png')"), None);
    }

    #[test]
    fn video_ids() {
        assert_eq!(youtube_id("http://www.youtube.com/embed/V-Cq2VMsiZw"), Some("V-Cq2VMsiZw"));
        assert_eq!(youtube_id("https://www.youtube.com/embed/abc?rel=0"), Some("abc"));
        assert_eq!(youtube_id("https://www.youtube.com/watch?v=abc"), None);
    }

    #[test]
    fn layout_detection() {
        assert_eq!(detect_layout(&[]), Layout::Numbered);
        assert_eq!(detect_layout(&[entry("1. A", &[])]), Layout::Numbered);
        assert_eq!(detect_layout(&[entry("A", &[])]), Layout::Simple);
    }

    #[test]
    fn title_suffix() {
        assert_eq!(strip_title_suffix("Vectors - GeoGebraBook"), "Vectors");
        assert_eq!(strip_title_suffix("Plain"), "Plain");
    }
}
