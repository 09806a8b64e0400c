use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use interfaces::{DeliveryRecord, Destination, DestinationConfig};

pub const DEFAULT_TITLE: &str = "No Title";

/// One entry of a syndication document, with identity already resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedItem {
    pub id: String,
    pub guid: Option<String>,
    pub title: Option<String>,
    pub summary_html: String,
    pub link: String,
    pub embedded_thumbnail_url: Option<String>,
}

impl FeedItem {
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(DEFAULT_TITLE)
    }

    /// Page scraped for a thumbnail: the provider id when it is itself a web
    /// address, otherwise the item link.
    pub fn thumbnail_page_url(&self) -> &str {
        match self.guid.as_deref() {
            Some(guid) if guid.starts_with("http://") || guid.starts_with("https://") => guid,
            _ => &self.link,
        }
    }

    pub fn delivery_record(&self) -> DeliveryRecord {
        DeliveryRecord::new(
            self.id.clone(),
            self.title.clone().unwrap_or_default(),
            self.link.clone(),
        )
    }
}

/// Feed entry as read from the document, before identity is enforced.
#[derive(Debug, Clone, Default)]
pub struct ParsedEntry {
    pub guid: Option<String>,
    pub url: Option<String>,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub thumbnail_url: Option<String>,
}

impl TryFrom<ParsedEntry> for FeedItem {
    type Error = DispatchError;

    fn try_from(entry: ParsedEntry) -> Result<Self> {
        let id = entry
            .guid
            .clone()
            .or_else(|| entry.url.clone())
            .ok_or(DispatchError::NoIdentity)?;

        Ok(FeedItem {
            id,
            guid: entry.guid,
            title: entry.title,
            summary_html: entry.summary.unwrap_or_default(),
            link: entry.url.unwrap_or_default(),
            embedded_thumbnail_url: entry.thumbnail_url,
        })
    }
}

#[derive(Debug)]
pub struct ParsedFeed {
    pub title: Option<String>,
    pub entries: Vec<ParsedEntry>,
}

/// Result of enrichment. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichedContent {
    pub message_body: String,
    pub thumbnail_url: Option<String>,
    pub video_source_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_feed_size_mb: usize,
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "news-dispatcher/0.1".to_string(),
            timeout_seconds: 30,
            max_feed_size_mb: 10,
            max_redirects: 5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EnrichConfig {
    /// Domains whose landing pages are scraped for a thumbnail.
    pub rich_domains: Vec<String>,
    /// Hosts an iframe must reference to count as an embedded video.
    pub video_hosts: Vec<String>,
    /// Base used for root-relative iframe sources.
    pub video_base_url: String,
    /// Image URLs containing any of these are ignored.
    pub placeholder_markers: Vec<String>,
    pub summary_limit: usize,
}

impl Default for EnrichConfig {
    fn default() -> Self {
        Self {
            rich_domains: vec!["animenewsnetwork.com".to_string()],
            video_hosts: vec!["youtube.com".to_string(), "youtube-nocookie.com".to_string()],
            video_base_url: "https://www.youtube.com".to_string(),
            placeholder_markers: vec!["spacer.gif".to_string()],
            summary_limit: 300,
        }
    }
}

#[derive(Debug, Clone)]
pub struct VideoConfig {
    pub binary: PathBuf,
    pub cookies_file: Option<PathBuf>,
    pub scratch_dir: PathBuf,
    pub max_height: u32,
    pub timeout: Duration,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("yt-dlp"),
            cookies_file: None,
            scratch_dir: std::env::temp_dir(),
            max_height: 1080,
            timeout: Duration::from_secs(600),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    pub sources: Vec<String>,
    pub poll_interval: Duration,
    pub error_backoff: Duration,
    pub max_error_backoff: Duration,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            poll_interval: Duration::from_secs(300),
            error_backoff: Duration::from_secs(60),
            max_error_backoff: Duration::from_secs(900),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to fetch feed {url}: {reason}")]
    SourceFetch { url: String, reason: String },

    #[error("Feed parse error: {0}")]
    Parse(String),

    #[error("Feed entry has neither an id nor a link")]
    NoIdentity,

    #[error("Delivery failed: {0}")]
    Delivery(String),

    #[error("Video fetch failed: {0}")]
    VideoFetch(String),

    #[error("Item store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("No news channel configured")]
    NoDestination,

    #[error("No entry at position {position} (feed has {available})")]
    NoSuchEntry { position: usize, available: usize },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Feed size exceeds limit: {size_mb}MB")]
    FeedTooLarge { size_mb: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl DispatchError {
    pub fn store(err: anyhow::Error) -> Self {
        DispatchError::StoreUnavailable(format!("{err:#}"))
    }

    pub fn delivery(err: anyhow::Error) -> Self {
        DispatchError::Delivery(format!("{err:#}"))
    }
}

pub type Result<T> = std::result::Result<T, DispatchError>;
