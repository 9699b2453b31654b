//! Byte fetching for remote images and pages.
//!
//! The resolver talks to a [`Fetch`] implementation so tests can serve
//! images from memory instead of the network.

use crate::error::{ConvertError, ImageError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Something that can turn a URL into bytes.
pub trait Fetch {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, ImageError>;
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://") || input.starts_with("//")
}

/// Blocking HTTP(S) fetcher. One request per call, no retry.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new(timeout_secs: u64) -> Result<Self, ConvertError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("worksheet2tex/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ConvertError::HttpClient(e.to_string()))?;
        Ok(Self { client })
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, ImageError> {
        // Protocol-relative links appear in exported pages.
        let absolute = match url.strip_prefix("//") {
            Some(rest) => format!("https://{rest}"),
            None => url.to_string(),
        };
        let fail = |reason: String| ImageError::Fetch {
            url: url.to_string(),
            reason,
        };

        let response = self
            .client
            .get(&absolute)
            .send()
            .map_err(|e| fail(e.to_string()))?;
        if !response.status().is_success() {
            return Err(fail(format!("HTTP {}", response.status())));
        }
        let bytes = response.bytes().map_err(|e| fail(e.to_string()))?;
        debug!("Fetched {} ({} bytes)", absolute, bytes.len());
        Ok(bytes.to_vec())
    }
}

/// Serves pre-downloaded bytes. Unknown URLs fail like a 404.
///
/// Useful for offline conversions of a page whose images were saved next to
/// it, and in tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryFetcher {
    files: HashMap<String, Vec<u8>>,
    requests: Arc<AtomicUsize>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.files.insert(url.into(), bytes);
        self
    }

    /// Shared counter of `fetch` calls, readable after the fetcher has been
    /// boxed into a resolver.
    pub fn request_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.requests)
    }
}

impl Fetch for MemoryFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, ImageError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.files.get(url).cloned().ok_or_else(|| ImageError::Fetch {
            url: url.to_string(),
            reason: "HTTP 404 Not Found".into(),
        })
    }
}
