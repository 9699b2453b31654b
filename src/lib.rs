//! # worksheet2tex
//!
//! Convert an exported worksheet book (the offline HTML page of a GeoGebra
//! book) into a self-contained LaTeX document with locally cached images.
//!
//! ## Pipeline Overview
//!
//! ```text
//! HTML page (path or URL)
//!  │
//!  ├─ 1. Input      read the file or download the page
//!  ├─ 2. Source     scrape title, author, worksheets and the menu tree
//!  ├─ 3. Assemble   pair menu entries with worksheets, translate markup,
//!  │                fetch and size every image
//!  ├─ 4. LaTeX      static preamble, title block, section tree
//!  ├─ 5. Refs       number \href links by caption, build the bibliography
//!  └─ 6. Cleanup    collapse blank lines, final newline
//! ```
//!
//! Everything runs on the calling thread. Per-image failures are logged and
//! counted; only unreadable input or a page missing its title, author, date
//! or description node is fatal.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use worksheet2tex::{convert_to_file, ConversionConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::builder()
//!         .iso639_language("en")
//!         .work_dir("build")
//!         .build()?;
//!     let stats = convert_to_file("book/index.html", "build/book.tex", &config)?;
//!     eprintln!("{} figures, {} failed images", stats.images.figures, stats.images.failed);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `ws2tex` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! worksheet2tex = { version = "0.1", default-features = false }
//! ```
//!
//! ## External tools
//!
//! With the default [`RasterBackend::ImageMagick`] backend every image is
//! normalized to PNG by ImageMagick's `convert`, trimming figure borders.
//! When the tool is missing the built-in decoder is used instead.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod diagnostics;
pub mod error;
pub mod output;
pub mod pipeline;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    ConversionConfig, ConversionConfigBuilder, ImageSizing, Labels, Language, RasterBackend,
};
pub use convert::{convert, convert_to_file, Converter};
pub use error::{ConvertError, ImageError};
pub use output::{ConversionOutput, ConversionStats, DocumentMetadata};
pub use pipeline::images::fetch::{Fetch, MemoryFetcher};
pub use pipeline::images::raster::RasterNormalizer;
pub use pipeline::images::AssetBase;
