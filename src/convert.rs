//! Conversion entry points.
//!
//! [`convert`] and [`convert_to_file`] cover the common case. [`Converter`]
//! exposes the seams (image fetcher, raster backend, header timestamp) for
//! offline use and reproducible output.
//!
//! All work happens on the calling thread, in document order.

use crate::config::ConversionConfig;
use crate::error::ConvertError;
use crate::output::{ConversionOutput, ConversionStats, DocumentMetadata};
use crate::pipeline::assemble::DocumentAssembler;
use crate::pipeline::images::fetch::Fetch;
use crate::pipeline::images::raster::RasterNormalizer;
use crate::pipeline::images::{AssetBase, ImageResolver};
use crate::pipeline::latex::{LatexWriter, END_DOCUMENT};
use crate::pipeline::source::BookSource;
use crate::pipeline::{input, postprocess, references};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Convert a worksheet book page (local path or URL) to LaTeX.
///
/// Images are written to `config.image_path()`.
///
/// # Errors
/// Only fatal problems are returned: unreadable input, a page without its
/// title, author, date or description, an image directory that cannot be
/// created. Individual images
/// that fail are logged and counted in `stats.images.failed`.
pub fn convert(
    input: impl AsRef<str>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, ConvertError> {
    Converter::new(config.clone()).convert(input)
}

/// Convert and write the LaTeX to `output_path`.
///
/// Image paths in the output are relative to `config.work_dir`, so the file
/// is normally placed there.
pub fn convert_to_file(
    input: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionStats, ConvertError> {
    Converter::new(config.clone()).convert_to_file(input, output_path)
}

/// A single conversion with optional overrides.
///
/// # Example
/// ```rust,no_run
/// use worksheet2tex::{ConversionConfig, Converter, RasterBackend};
///
/// let config = ConversionConfig::builder()
///     .work_dir("out")
///     .raster(RasterBackend::Builtin)
///     .build()?;
/// let output = Converter::new(config)
///     .with_timestamp("2016-11-17 10:00:00")
///     .convert("book/index.html")?;
/// println!("{} references", output.references.len());
/// # Ok::<(), worksheet2tex::ConvertError>(())
/// ```
pub struct Converter {
    config: ConversionConfig,
    fetcher: Option<Box<dyn Fetch>>,
    normalizer: Option<Box<dyn RasterNormalizer>>,
    timestamp: Option<String>,
}

impl Converter {
    pub fn new(config: ConversionConfig) -> Self {
        Self {
            config,
            fetcher: None,
            normalizer: None,
            timestamp: None,
        }
    }

    /// Fetch images with `fetcher` instead of over HTTP.
    pub fn with_fetcher(mut self, fetcher: Box<dyn Fetch>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Normalize rasters with `normalizer` instead of the configured backend.
    pub fn with_normalizer(mut self, normalizer: Box<dyn RasterNormalizer>) -> Self {
        self.normalizer = Some(normalizer);
        self
    }

    /// Fixed header timestamp instead of the current time.
    pub fn with_timestamp(mut self, stamp: impl Into<String>) -> Self {
        self.timestamp = Some(stamp.into());
        self
    }

    /// Resolve `input` (path or URL) and convert it.
    pub fn convert(self, input: impl AsRef<str>) -> Result<ConversionOutput, ConvertError> {
        let input = input.as_ref();
        info!("Starting conversion: {}", input);
        let resolved = input::resolve_input(input, self.config.download_timeout_secs)?;
        self.convert_html(&resolved.html, resolved.base)
    }

    /// Convert page HTML that is already in memory. Relative image sources
    /// are resolved against `base`.
    pub fn convert_html(
        self,
        html: &str,
        base: AssetBase,
    ) -> Result<ConversionOutput, ConvertError> {
        let start = Instant::now();
        let config = &self.config;

        // ── Step 1: Parse the page ───────────────────────────────────────
        let source = BookSource::parse(html)?;
        debug!(
            "Page has {} worksheet(s) and {} menu entr(y/ies)",
            source.worksheets.len(),
            source.menu.len()
        );

        // ── Step 2: Image layer ──────────────────────────────────────────
        let mut images = ImageResolver::new(config)?.with_asset_base(base);
        if let Some(fetcher) = self.fetcher {
            images = images.with_fetcher(fetcher);
        }
        if let Some(normalizer) = self.normalizer {
            images = images.with_normalizer(normalizer);
        }

        // ── Step 3: Assemble ─────────────────────────────────────────────
        let (document, report) = DocumentAssembler::new(config).assemble(&source, &mut images);

        // ── Step 4: Write LaTeX ──────────────────────────────────────────
        let mut writer = LatexWriter::new(config);
        if let Some(stamp) = self.timestamp {
            writer = writer.with_timestamp(stamp);
        }
        let mut tex = writer.render(&document);

        // ── Step 5: References ───────────────────────────────────────────
        let entries = if config.references {
            info!("Creating references");
            let refs = references::process(&tex);
            tex = refs.text;
            tex.push_str(&refs.bibliography);
            refs.entries
        } else {
            Vec::new()
        };

        // ── Step 6: Final cleanup ────────────────────────────────────────
        tex.push_str(END_DOCUMENT);
        let latex = postprocess::clean_latex(&tex);

        let stats = ConversionStats {
            worksheets: report.worksheets,
            elements: report.elements,
            unsupported_elements: report.unsupported,
            empty_subsections: report.empty_subsections,
            unused_worksheets: report.unused_blocks,
            references: entries.len(),
            images: images.stats(),
            total_duration_ms: start.elapsed().as_millis() as u64,
        };
        info!(
            "Conversion complete: {} worksheet(s), {} figure(s), {} reference(s), {}ms",
            stats.worksheets, stats.images.figures, stats.references, stats.total_duration_ms
        );

        Ok(ConversionOutput {
            latex,
            metadata: DocumentMetadata::from_document(&document),
            references: entries,
            stats,
        })
    }

    /// Convert and write the result to `output_path`.
    ///
    /// Uses atomic write (temp file + rename) to prevent partial files.
    pub fn convert_to_file(
        self,
        input: impl AsRef<str>,
        output_path: impl AsRef<Path>,
    ) -> Result<ConversionStats, ConvertError> {
        let output = self.convert(input)?;
        write_atomic(output_path.as_ref(), &output.latex)?;
        Ok(output.stats)
    }
}

fn write_atomic(path: &Path, contents: &str) -> Result<(), ConvertError> {
    let failed = |e| ConvertError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(failed)?;
    }
    let tmp_path = path.with_extension("tex.tmp");
    std::fs::write(&tmp_path, contents).map_err(failed)?;
    std::fs::rename(&tmp_path, path).map_err(failed)?;
    info!("Wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RasterBackend;
    use crate::pipeline::images::fetch::MemoryFetcher;
    use tempfile::TempDir;

    const PAGE: &str = r#"<html><head><title>Links - GeoGebraBook</title></head><body>
<p class="author"><a href="https://example.org/u/a">Ann</a>, Jan 2, 2020</p>
<p class="description"></p>
<div class="worksheet_tbl"><div>
<div class="ws-element-text">See [url=http://a.org]A[/url] and [url=http://b.org]A[/url].</div>
</div></div>
<div id="content"><div id="menu-container"><div id="menu"><div id="sBook-menulist"><ul>
<li class="menu-opened"><div class="menu-wrapper"><div class="menu-item"><p>1. Only</p></div>
<div class="submenu-items"><ol><li>Links</li></ol></div></div></li>
</ul></div></div></div></div>
</body></html>"#;

    fn converter(dir: &TempDir, references: bool) -> Converter {
        let config = ConversionConfig::builder()
            .work_dir(dir.path())
            .references(references)
            .raster(RasterBackend::Builtin)
            .build()
            .unwrap();
        Converter::new(config)
            .with_fetcher(Box::new(MemoryFetcher::new()))
            .with_timestamp("2020-01-02 03:04:05")
    }

    #[test]
    fn references_enabled() {
        let dir = TempDir::new().unwrap();
        let out = converter(&dir, true)
            .convert_html(PAGE, AssetBase::Dir(dir.path().into()))
            .unwrap();
        assert_eq!(out.references.len(), 1);
        assert!(out.latex.contains("\\href{http://b.org}{A} \\textnormal{\\cite{1}}"));
        assert!(out
            .latex
            .ends_with("\\begin{thebibliography}{1}\n\\bibitem[1]{1}{\\url{http://a.org}}\n\\end{thebibliography}\n\n\\end{document}\n"));
        assert!(!out.latex.contains("\n\n\n"));
    }

    #[test]
    fn references_disabled() {
        let dir = TempDir::new().unwrap();
        let out = converter(&dir, false)
            .convert_html(PAGE, AssetBase::Dir(dir.path().into()))
            .unwrap();
        assert!(out.references.is_empty());
        assert!(!out.latex.contains("thebibliography"));
        assert!(!out.latex.contains("\\cite"));
        assert!(out.latex.ends_with("\\end{document}\n"));
    }

    #[test]
    fn writes_file_atomically() {
        let dir = TempDir::new().unwrap();
        let page = dir.path().join("book.html");
        std::fs::write(&page, PAGE).unwrap();
        let target = dir.path().join("out/book.tex");

        let stats = converter(&dir, true)
            .convert_to_file(page.to_str().unwrap(), &target)
            .unwrap();
        assert_eq!(stats.worksheets, 1);
        let tex = std::fs::read_to_string(&target).unwrap();
        assert!(tex.contains("\\title{Links}"));
        assert!(!dir.path().join("out/book.tex.tmp").exists());
    }
}
