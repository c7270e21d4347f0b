//! Playlist import: URL fetching plus the M3U import normalizer.

use std::time::Duration;

use tracing::{error, info};

use crate::errors::AppError;

pub mod parser;

pub use parser::parse_playlist;

/// Fetch collaborator for import-from-URL. Single-shot, no retries.
#[derive(Clone)]
pub struct PlaylistFetcher {
    client: reqwest::Client,
}

impl PlaylistFetcher {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }

    /// Download raw playlist text from a URL.
    pub async fn fetch(&self, url: &str) -> Result<String, AppError> {
        let url = url::Url::parse(url)
            .map_err(|e| AppError::validation(format!("invalid playlist url: {}", e)))?;
        let url = url.as_str();
        info!("Fetching playlist from URL: {}", url);

        let response = self.client.get(url).send().await.map_err(|e| {
            error!("Failed to connect to playlist URL '{}': {}", url, e);
            AppError::upstream_fetch(url, e.to_string())
        })?;

        if !response.status().is_success() {
            error!(
                "Playlist URL '{}' returned HTTP {}",
                url,
                response.status()
            );
            return Err(AppError::upstream_fetch(
                url,
                format!("HTTP {}", response.status()),
            ));
        }

        let content = response
            .text()
            .await
            .map_err(|e| AppError::upstream_fetch(url, e.to_string()))?;

        info!("Downloaded {} bytes from '{}'", content.len(), url);
        Ok(content)
    }
}
