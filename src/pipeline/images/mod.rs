//! Image resolution: fetch, cache, normalize and size remote images.
//!
//! Two cache namespaces live side by side in the image directory:
//!
//! * **content-addressed**: inline images, icons and video thumbnails are
//!   keyed by the hex MD5 of their URL (`<dir>/<hash>` raw bytes,
//!   `<dir>/<hash>.png` normalized), so the same URL resolves to the same
//!   file across runs;
//! * **sequential**: full-size figures are numbered in the order the
//!   document asks for them (`<dir>/<n>.png`). The counter is owned by the
//!   [`ImageResolver`] and starts at 1 for every document.
//!
//! A cached file is reused when it exists and caching is enabled. Nothing is
//! locked: two runs sharing a directory may race on the same file.
//!
//! Failures never abort the conversion. The resolver logs a warning and still
//! returns the path the file *would* have, so the LaTeX build reports the
//! missing asset.

pub mod fetch;
pub mod raster;

use crate::config::{ConversionConfig, ImageSizing};
use crate::diagnostics::Diagnostics;
use crate::error::{ConvertError, ImageError};
use fetch::{is_url, Fetch, HttpFetcher};
use md5::{Digest, Md5};
use raster::RasterNormalizer;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Generic logo used when an applet has no preview image.
pub const PLACEHOLDER_URL: &str = "https://static.geogebra.org/images/geogebra-logo-name-1024.png";

/// Which dimension a display length constrains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeMode {
    /// Full-size figure: width, clamped to the figure bounds.
    FigureWidth,
    /// Image inside running text: height, clamped to the inline bounds.
    InlineHeight,
}

/// Heuristic printed length in millimetres for a raster dimension.
///
/// `pixels / ratio`, clamped to the bounds of `mode`. Not DPI-aware.
pub fn display_length(pixels: u32, mode: SizeMode, sizing: &ImageSizing) -> f64 {
    let raw = f64::from(pixels) / sizing.ratio;
    match mode {
        SizeMode::FigureWidth => raw.clamp(sizing.min_width_mm, sizing.max_width_mm),
        SizeMode::InlineHeight => {
            raw.clamp(sizing.min_inline_height_mm, sizing.max_inline_height_mm)
        }
    }
}

/// Format a length without trailing zeros (`5`, `87.4`, `33.33`).
pub fn format_length(value: f64) -> String {
    let s = format!("{value:.2}");
    match s.trim_end_matches('0').trim_end_matches('.') {
        "" | "-" => "0".to_string(),
        t => t.to_string(),
    }
}

/// What relative image sources in the page are resolved against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetBase {
    /// Directory of a saved page.
    Dir(PathBuf),
    /// URL of a page fetched over HTTP.
    Url(String),
}

impl Default for AssetBase {
    fn default() -> Self {
        AssetBase::Dir(PathBuf::from("."))
    }
}

/// Where a figure's pixels come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FigureSource {
    Remote(String),
    Local(PathBuf),
}

/// An inline image ready for `\includegraphics[height=…]`.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineImage {
    pub path: String,
    pub height_mm: f64,
}

/// A full-size figure ready for `\includegraphics[width=…]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    pub number: u32,
    pub path: String,
    pub width_mm: f64,
}

/// Counters reported in [`crate::output::ConversionStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImageStats {
    pub fetched: usize,
    pub reused: usize,
    pub failed: usize,
    pub figures: u32,
}

pub struct ImageResolver {
    /// On-disk cache directory.
    dir: PathBuf,
    /// The same directory as written in LaTeX paths (always `/`-separated).
    latex_dir: String,
    /// Base for relative image sources in the input page.
    base: AssetBase,
    sizing: ImageSizing,
    use_cache: bool,
    fetcher: Box<dyn Fetch>,
    normalizer: Box<dyn RasterNormalizer>,
    next_figure: u32,
    stats: ImageStats,
    diag: Diagnostics,
}

impl ImageResolver {
    /// Create the resolver and its cache directory.
    pub fn new(config: &ConversionConfig) -> Result<Self, ConvertError> {
        let dir = config.image_path();
        fs::create_dir_all(&dir).map_err(|e| ConvertError::ImageDir {
            path: dir.clone(),
            source: e,
        })?;
        Ok(Self {
            dir,
            latex_dir: config.image_dir.trim_end_matches('/').replace('\\', "/"),
            base: AssetBase::default(),
            sizing: config.sizing,
            use_cache: config.image_cache,
            fetcher: Box::new(HttpFetcher::new(config.download_timeout_secs)?),
            normalizer: raster::from_backend(&config.raster),
            next_figure: 1,
            stats: ImageStats::default(),
            diag: Diagnostics::new(config.verbosity),
        })
    }

    pub fn with_fetcher(mut self, fetcher: Box<dyn Fetch>) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn with_normalizer(mut self, normalizer: Box<dyn RasterNormalizer>) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Directory that relative `src` attributes are resolved against.
    pub fn with_asset_root(self, root: impl Into<PathBuf>) -> Self {
        self.with_asset_base(AssetBase::Dir(root.into()))
    }

    pub fn with_asset_base(mut self, base: AssetBase) -> Self {
        self.base = base;
        self
    }

    pub fn sizing(&self) -> &ImageSizing {
        &self.sizing
    }

    pub fn stats(&self) -> ImageStats {
        self.stats
    }

    /// Classify an image reference from the page.
    pub fn locate(&self, src: &str) -> FigureSource {
        if is_url(src) {
            return FigureSource::Remote(src.to_string());
        }
        match &self.base {
            AssetBase::Dir(root) => FigureSource::Local(root.join(src)),
            AssetBase::Url(page) => match reqwest::Url::parse(page).and_then(|u| u.join(src)) {
                Ok(url) => FigureSource::Remote(url.to_string()),
                Err(e) => {
                    warn!("Cannot resolve '{src}' against '{page}': {e}");
                    FigureSource::Remote(src.to_string())
                }
            },
        }
    }

    // ── Content-addressed namespace ──────────────────────────────────────

    /// Resolve an `[img]` URL: normalized PNG plus clamped inline height.
    pub fn inline(&mut self, url: &str) -> InlineImage {
        let key = cache_key(url);
        let png = self.dir.join(format!("{key}.png"));
        self.diag
            .log(1, format_args!("Inline image {url} -> {}", png.display()));
        self.ensure_normalized(&self.locate(url), &self.dir.join(&key), &png, false);

        let height = dimensions(&png).map(|(_, h)| h).unwrap_or(0);
        self.diag
            .log(2, format_args!("Inline image height {height}px"));
        InlineImage {
            path: self.latex_path(&format!("{key}.png")),
            height_mm: display_length(height, SizeMode::InlineHeight, &self.sizing),
        }
    }

    /// Resolve an `[icon]` URL. Icons have a fixed size, so only the path
    /// is returned.
    pub fn icon(&mut self, url: &str) -> String {
        let key = cache_key(url);
        let png = self.dir.join(format!("{key}.png"));
        self.ensure_normalized(&self.locate(url), &self.dir.join(&key), &png, false);
        self.latex_path(&format!("{key}.png"))
    }

    /// Download a video thumbnail into the hash namespace without
    /// normalizing it. Returns the on-disk path for [`Self::figure`].
    pub fn thumbnail(&mut self, url: &str) -> PathBuf {
        let raw = self.dir.join(cache_key(url));
        if self.use_cache && raw.exists() {
            self.stats.reused += 1;
        } else if let Err(e) = self.download(url, &raw) {
            self.fail(e);
        }
        raw
    }

    // ── Sequential namespace ─────────────────────────────────────────────

    /// Resolve a full-size figure. Consumes the next figure number even
    /// when the source cannot be fetched.
    pub fn figure(&mut self, source: &FigureSource) -> Figure {
        let number = self.next_figure;
        self.next_figure += 1;
        self.stats.figures = number;

        let png = self.dir.join(format!("{number}.png"));
        self.diag.log(
            1,
            format_args!("Figure {number}: {source:?} -> {}", png.display()),
        );
        self.ensure_normalized(source, &self.dir.join(number.to_string()), &png, true);

        let width = dimensions(&png).map(|(w, _)| w).unwrap_or(0);
        Figure {
            number,
            path: self.latex_path(&format!("{number}.png")),
            width_mm: display_length(width, SizeMode::FigureWidth, &self.sizing),
        }
    }

    /// The generic applet logo, cached once per directory.
    pub fn placeholder(&mut self) -> String {
        let png = self.dir.join("placeholder.png");
        let source = FigureSource::Remote(PLACEHOLDER_URL.to_string());
        self.ensure_normalized(&source, &self.dir.join("placeholder"), &png, false);
        self.latex_path("placeholder.png")
    }

    // ── Internals ────────────────────────────────────────────────────────

    fn latex_path(&self, file: &str) -> String {
        format!("{}/{}", self.latex_dir, file)
    }

    /// Make sure `png` exists: reuse it, or materialize the source (into
    /// `raw` when remote) and normalize.
    fn ensure_normalized(&mut self, source: &FigureSource, raw: &Path, png: &Path, trim: bool) {
        if self.use_cache && png.exists() {
            self.stats.reused += 1;
            self.diag
                .log(2, format_args!("Reusing cached {}", png.display()));
            return;
        }
        let result = match source {
            FigureSource::Remote(url) => self
                .download(url, raw)
                .and_then(|()| self.normalizer.normalize(raw, png, trim)),
            FigureSource::Local(path) => self.normalizer.normalize(path, png, trim),
        };
        if let Err(e) = result {
            self.fail(e);
        }
    }

    fn download(&mut self, url: &str, dest: &Path) -> Result<(), ImageError> {
        self.diag
            .log(1, format_args!("Downloading {url} to {}", dest.display()));
        let bytes = self.fetcher.fetch(url)?;
        self.diag
            .log(1, format_args!("Content length: {}", bytes.len()));
        fs::write(dest, &bytes).map_err(|e| ImageError::Io {
            path: dest.to_path_buf(),
            source: e,
        })?;
        self.stats.fetched += 1;
        Ok(())
    }

    fn fail(&mut self, e: ImageError) {
        self.stats.failed += 1;
        warn!("{e}; the output will reference a missing image");
    }
}

/// Content-addressed cache key of a URL.
pub fn cache_key(url: &str) -> String {
    format!("{:x}", Md5::digest(url.as_bytes()))
}

fn dimensions(path: &Path) -> Option<(u32, u32)> {
    image::image_dimensions(path).ok()
}
