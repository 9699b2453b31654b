//! Error types for the worksheet2tex library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ConvertError`] is **fatal**: the conversion cannot proceed at all
//!   (input missing, a required node absent from the page, output not
//!   writable). Returned as `Err(ConvertError)` from the top-level
//!   `convert*` functions.
//!
//! * [`ImageError`] is **non-fatal**: one image could not be fetched or
//!   normalized. The resolver logs it and still emits a reference to the
//!   expected asset, so the problem surfaces later in the LaTeX build
//!   instead of losing the whole document to one broken link.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the worksheet2tex library.
#[derive(Debug, Error)]
pub enum ConvertError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Input file not found: '{path}'\nCheck the path exists and is readable.")]
    InputNotFound { path: PathBuf },

    /// The input file exists but could not be read as UTF-8 text.
    #[error("Failed to read input '{path}': {source}")]
    InputRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// The blocking HTTP client could not be initialised (TLS backend).
    #[error("Failed to initialise HTTP client: {0}")]
    HttpClient(String),

    // ── Document errors ───────────────────────────────────────────────────
    /// A node the document layout depends on is absent.
    #[error("Expected node is missing from the input document: {what}")]
    MissingNode { what: &'static str },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create the image cache directory.
    #[error("Failed to create image directory '{path}': {source}")]
    ImageDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not create or write the output LaTeX file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// A non-fatal failure while resolving one image.
#[derive(Debug, Error)]
pub enum ImageError {
    /// Remote fetch failed (network error or non-success status).
    #[error("fetching '{url}' failed: {reason}")]
    Fetch { url: String, reason: String },

    /// Reading or writing a cached file failed.
    #[error("I/O on '{path}' failed: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The external raster tool could not be run or exited unsuccessfully.
    #[error("'{program}' failed for '{path}': {status}")]
    Convert {
        program: String,
        path: PathBuf,
        status: String,
    },

    /// The bytes on disk are not a decodable image.
    #[error("cannot decode '{path}': {detail}")]
    Decode { path: PathBuf, detail: String },
}
