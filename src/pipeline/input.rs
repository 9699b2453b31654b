//! Input resolution: turn a user-supplied path or URL into page HTML.
//!
//! Besides the text, the resolved input remembers where the page came from,
//! because worksheet images are usually referenced relative to it
//! (`GeoGebra/files/…` next to a saved page, or a path on the book's host).

use crate::error::ConvertError;
use crate::pipeline::images::fetch::is_url;
use crate::pipeline::images::AssetBase;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// The page text plus the base for its relative asset references.
#[derive(Debug, Clone)]
pub struct ResolvedInput {
    pub html: String,
    pub base: AssetBase,
}

/// Resolve the input string to page HTML.
///
/// URLs are downloaded with a blocking client; anything else is read as a
/// local file.
pub fn resolve_input(input: &str, timeout_secs: u64) -> Result<ResolvedInput, ConvertError> {
    if is_url(input) {
        download_url(input, timeout_secs)
    } else {
        read_local(Path::new(input))
    }
}

/// Read a saved page. Its directory becomes the asset base.
pub fn read_local(path: &Path) -> Result<ResolvedInput, ConvertError> {
    if !path.exists() {
        return Err(ConvertError::InputNotFound {
            path: path.to_path_buf(),
        });
    }
    let html = std::fs::read_to_string(path).map_err(|e| ConvertError::InputRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    let root = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    debug!("Resolved local page: {} (assets under {})", path.display(), root.display());
    Ok(ResolvedInput {
        html,
        base: AssetBase::Dir(root),
    })
}

fn download_url(url: &str, timeout_secs: u64) -> Result<ResolvedInput, ConvertError> {
    info!("Downloading page from: {}", url);
    let failed = |reason: String| ConvertError::DownloadFailed {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ConvertError::HttpClient(e.to_string()))?;

    let response = client.get(url).send().map_err(|e| {
        if e.is_timeout() {
            failed(format!("timed out after {timeout_secs}s"))
        } else {
            failed(e.to_string())
        }
    })?;
    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }
    let html = response.text().map_err(|e| failed(e.to_string()))?;

    info!("Downloaded {} bytes", html.len());
    Ok(ResolvedInput {
        html,
        base: AssetBase::Url(url.to_string()),
    })
}
