//! Snapshot archival of source URLs and the URL safety flag.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::info;
use url::Url;

#[async_trait]
pub trait Archiver: Send + Sync {
    /// Archive a URL and return the archive's own URL for the snapshot.
    async fn archive(&self, url: &str) -> Result<String>;
}

// --- Wayback Machine ---

const WAYBACK_SAVE_URL: &str = "https://web.archive.org/save/";
// Snapshot capture is slow; give it well beyond the usual fetch timeout.
const ARCHIVE_TIMEOUT: Duration = Duration::from_secs(60);

pub struct WaybackArchiver {
    http: reqwest::Client,
}

impl WaybackArchiver {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(ARCHIVE_TIMEOUT)
                .build()
                .expect("failed to build HTTP client"),
        }
    }
}

impl Default for WaybackArchiver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Archiver for WaybackArchiver {
    async fn archive(&self, url: &str) -> Result<String> {
        info!(url, "archiving URL");

        let response = self
            .http
            .get(format!("{WAYBACK_SAVE_URL}{url}"))
            .send()
            .await
            .context("archive request failed")?
            .error_for_status()
            .context("archive service returned an error status")?;

        // The save endpoint reports the snapshot path in Content-Location;
        // otherwise the final (redirected) URL is the snapshot itself.
        if let Some(location) = response
            .headers()
            .get("content-location")
            .and_then(|v| v.to_str().ok())
        {
            return Ok(format!("https://web.archive.org{location}"));
        }

        Ok(response.url().to_string())
    }
}

/// URL hygiene flag persisted with each fact-check record: absolute https
/// URLs only.
pub fn is_safe(url: &Url) -> bool {
    url.scheme() == "https"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn https_urls_are_safe() {
        let url: Url = "https://example.com/article".parse().unwrap();
        assert!(is_safe(&url));
    }

    #[test]
    fn http_urls_are_not_safe() {
        let url: Url = "http://example.com/article".parse().unwrap();
        assert!(!is_safe(&url));
    }
}
