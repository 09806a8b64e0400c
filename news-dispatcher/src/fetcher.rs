use crate::types::{DispatchError, FetchConfig, Result};
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// HTTP access shared by the poller and the enricher.
///
/// Every request is bounded by the client timeout and is attempted once.
pub struct Fetcher {
    client: Client,
    config: FetchConfig,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()?;

        Ok(Self { client, config })
    }

    /// Downloads a feed document.
    pub async fn fetch_feed(&self, url: &str) -> Result<String> {
        let start_time = Instant::now();
        debug!("Fetching feed: {}", url);

        let source_error = |reason: String| DispatchError::SourceFetch {
            url: url.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| source_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(source_error(format!(
                "HTTP {}: {}",
                status,
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        if let Some(content_length) = response.content_length() {
            let size_mb = content_length as usize / (1024 * 1024);
            if size_mb > self.config.max_feed_size_mb {
                return Err(DispatchError::FeedTooLarge { size_mb });
            }
        }

        let content = response
            .text()
            .await
            .map_err(|e| source_error(e.to_string()))?;

        info!(
            "Fetched feed: {} ({} bytes in {}ms)",
            url,
            content.len(),
            start_time.elapsed().as_millis()
        );
        Ok(content)
    }

    /// Downloads a landing page. Timeouts, transport errors and non-2xx
    /// statuses all come back as `None`.
    pub async fn fetch_page(&self, url: &str) -> Option<String> {
        debug!("Fetching page: {}", url);

        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                warn!("Timed out fetching page {}", url);
                return None;
            }
            Err(e) => {
                warn!("Failed to fetch page {}: {}", url, e);
                return None;
            }
        };

        if !response.status().is_success() {
            debug!("Page {} answered HTTP {}", url, response.status());
            return None;
        }

        match response.text().await {
            Ok(body) => Some(body),
            Err(e) => {
                warn!("Failed to read page body {}: {}", url, e);
                None
            }
        }
    }
}
