use std::fmt;
use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fixed key of the singleton configuration document.
pub const CONFIG_KEY: &str = "config";

/// Ledger entry written once a feed entry has been delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub entry_id: String,
    pub title: String,
    pub link: String,
    pub sent_at: DateTime<Utc>,
}

impl DeliveryRecord {
    pub fn new(entry_id: impl Into<String>, title: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            entry_id: entry_id.into(),
            title: title.into(),
            link: link.into(),
            sent_at: Utc::now(),
        }
    }
}

/// Where notifications go: a numeric chat id or a public handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Destination {
    ChatId(i64),
    Handle(String),
}

impl Destination {
    /// Reads back a stored `news_channel` value. Anything that parses as an
    /// integer is a chat id, everything else is a handle.
    pub fn from_stored(value: &str) -> Self {
        let value = value.trim();
        match value.parse::<i64>() {
            Ok(id) => Destination::ChatId(id),
            Err(_) => Destination::Handle(value.to_owned()),
        }
    }

    /// Value persisted in the `news_channel` field.
    pub fn to_stored(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::ChatId(id) => write!(f, "{id}"),
            Destination::Handle(handle) => f.write_str(handle),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationConfig {
    pub news_channel: Destination,
}

/// Persistent dedup ledger and delivery configuration.
///
/// Implementations must make single-record writes atomic. The check in
/// `find_delivery_record` and the write in `insert_delivery_record` are two
/// separate calls; callers get no cross-call transaction.
#[async_trait]
pub trait ItemStore: Send + Sync {
    async fn find_delivery_record(&self, entry_id: &str) -> Result<Option<DeliveryRecord>>;

    /// Returns `false` when a record with the same `entry_id` already existed,
    /// in which case nothing is written.
    async fn insert_delivery_record(&self, record: &DeliveryRecord) -> Result<bool>;

    async fn get_destination_config(&self) -> Result<Option<DestinationConfig>>;

    async fn set_destination_config(&self, destination: &Destination) -> Result<()>;
}

/// Chat platform send primitives.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_text(&self, destination: &Destination, text: &str, disable_preview: bool) -> Result<()>;

    async fn send_photo(&self, destination: &Destination, image_url: &str, caption: &str) -> Result<()>;

    async fn send_video(&self, destination: &Destination, video_path: &Path, caption: &str) -> Result<()>;
}
