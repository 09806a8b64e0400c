use crate::fetcher::Fetcher;
use crate::parser::FeedParser;
use crate::types::{DispatchError, FeedItem, ParsedEntry, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Reads one syndication source at a time.
pub struct FeedPoller {
    fetcher: Arc<Fetcher>,
}

impl FeedPoller {
    pub fn new(fetcher: Arc<Fetcher>) -> Self {
        Self { fetcher }
    }

    /// Fetches `source` and returns its entries in document order.
    pub async fn entries(&self, source: &str) -> Result<Vec<ParsedEntry>> {
        let content = self.fetcher.fetch_feed(source).await?;
        let parsed = tokio::task::spawn_blocking(move || FeedParser::parse_feed(&content)).await??;

        if let Some(title) = &parsed.title {
            debug!("Feed {} is titled {:?}", source, title);
        }
        Ok(parsed.entries)
    }

    /// Newest entry of `source`, if it has one worth delivering.
    ///
    /// Only the first entry in document order is looked at. Any failure is
    /// logged and reported as nothing to deliver.
    pub async fn poll(&self, source: &str) -> Option<FeedItem> {
        let entries = match self.entries(source).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Failed to poll feed {}: {}", source, e);
                return None;
            }
        };

        let Some(newest) = entries.into_iter().next() else {
            info!("No entries found in feed: {}", source);
            return None;
        };

        match FeedItem::try_from(newest) {
            Ok(item) => Some(item),
            Err(DispatchError::NoIdentity) => {
                warn!("Newest entry of {} has no id or link, skipping", source);
                None
            }
            Err(e) => {
                warn!("Unusable newest entry in {}: {}", source, e);
                None
            }
        }
    }
}
