#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use httpmock::prelude::*;
use interfaces::{DeliveryRecord, Destination, DestinationConfig, ItemStore, MemoryItemStore, Notifier};
use news_dispatcher::{
    DispatchScheduler, EnrichConfig, Enricher, FeedPoller, FetchConfig, Fetcher, ScheduleConfig, VideoConfig,
    VideoFetcher,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Once};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::Mutex;

pub const CHANNEL: &str = "@animenews";

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init();
    });
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Text {
        destination: Destination,
        text: String,
        disable_preview: bool,
    },
    Photo {
        destination: Destination,
        image_url: String,
        caption: String,
    },
    Video {
        destination: Destination,
        path: PathBuf,
        caption: String,
        existed: bool,
    },
}

/// Notifier double that remembers every call.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Sent>>,
    fail_all: AtomicBool,
    fail_photos: AtomicBool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail_all.store(failing, Ordering::SeqCst);
    }

    pub fn set_failing_photos(&self, failing: bool) {
        self.fail_photos.store(failing, Ordering::SeqCst);
    }

    pub async fn sent(&self) -> Vec<Sent> {
        self.sent.lock().await.clone()
    }

    pub async fn count(&self) -> usize {
        self.sent.lock().await.len()
    }

    fn check(&self) -> Result<()> {
        if self.fail_all.load(Ordering::SeqCst) {
            return Err(anyhow!("chat service unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_text(&self, destination: &Destination, text: &str, disable_preview: bool) -> Result<()> {
        self.check()?;
        self.sent.lock().await.push(Sent::Text {
            destination: destination.clone(),
            text: text.to_string(),
            disable_preview,
        });
        Ok(())
    }

    async fn send_photo(&self, destination: &Destination, image_url: &str, caption: &str) -> Result<()> {
        self.check()?;
        if self.fail_photos.load(Ordering::SeqCst) {
            return Err(anyhow!("wrong file identifier/HTTP URL specified"));
        }
        self.sent.lock().await.push(Sent::Photo {
            destination: destination.clone(),
            image_url: image_url.to_string(),
            caption: caption.to_string(),
        });
        Ok(())
    }

    async fn send_video(&self, destination: &Destination, video: &Path, caption: &str) -> Result<()> {
        self.check()?;
        self.sent.lock().await.push(Sent::Video {
            destination: destination.clone(),
            path: video.to_path_buf(),
            caption: caption.to_string(),
            existed: video.exists(),
        });
        Ok(())
    }
}

/// Store double whose dedup lookups can be made to fail.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryItemStore,
    broken: AtomicBool,
}

impl FlakyStore {
    pub async fn with_destination(destination: Destination) -> Self {
        Self {
            inner: MemoryItemStore::with_destination(destination).await,
            broken: AtomicBool::new(false),
        }
    }

    pub fn set_broken(&self, broken: bool) {
        self.broken.store(broken, Ordering::SeqCst);
    }
}

#[async_trait]
impl ItemStore for FlakyStore {
    async fn find_delivery_record(&self, entry_id: &str) -> Result<Option<DeliveryRecord>> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(anyhow!("connection refused"));
        }
        self.inner.find_delivery_record(entry_id).await
    }

    async fn insert_delivery_record(&self, record: &DeliveryRecord) -> Result<bool> {
        self.inner.insert_delivery_record(record).await
    }

    async fn get_destination_config(&self) -> Result<Option<DestinationConfig>> {
        self.inner.get_destination_config().await
    }

    async fn set_destination_config(&self, destination: &Destination) -> Result<()> {
        self.inner.set_destination_config(destination).await
    }
}

/// An entry of a test RSS document.
#[derive(Debug, Clone, Default)]
pub struct TestEntry {
    pub guid: Option<String>,
    pub title: Option<String>,
    pub link: Option<String>,
    pub description: Option<String>,
    pub thumbnail: Option<String>,
}

impl TestEntry {
    pub fn new(guid: &str, title: &str, link: &str) -> Self {
        Self {
            guid: Some(guid.to_string()),
            title: Some(title.to_string()),
            link: Some(link.to_string()),
            ..Default::default()
        }
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn thumbnail(mut self, url: &str) -> Self {
        self.thumbnail = Some(url.to_string());
        self
    }
}

fn xml_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

pub fn rss_xml(entries: &[TestEntry]) -> String {
    let items: String = entries
        .iter()
        .map(|entry| {
            let mut item = String::from("<item>");
            if let Some(guid) = &entry.guid {
                item.push_str(&format!("<guid isPermaLink=\"false\">{}</guid>", xml_escape(guid)));
            }
            if let Some(title) = &entry.title {
                item.push_str(&format!("<title>{}</title>", xml_escape(title)));
            }
            if let Some(link) = &entry.link {
                item.push_str(&format!("<link>{}</link>", xml_escape(link)));
            }
            if let Some(description) = &entry.description {
                item.push_str(&format!("<description>{}</description>", xml_escape(description)));
            }
            if let Some(thumbnail) = &entry.thumbnail {
                item.push_str(&format!("<media:thumbnail url=\"{}\"/>", xml_escape(thumbnail)));
            }
            item.push_str("</item>");
            item
        })
        .collect();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:media="http://search.yahoo.com/mrss/">
  <channel>
    <title>Test News</title>
    <link>http://127.0.0.1/</link>
    <description>Test feed</description>
    {items}
  </channel>
</rss>"#
    )
}

pub fn landing_page(head: &str, body: &str) -> String {
    format!("<!DOCTYPE html><html><head>{head}</head><body>{body}</body></html>")
}

/// Mock feed/landing-page server plus the doubles a scheduler needs.
pub struct TestContext {
    pub server: MockServer,
    pub scratch: TempDir,
    pub notifier: Arc<RecordingNotifier>,
}

impl TestContext {
    pub async fn new() -> Self {
        init_tracing();
        Self {
            server: MockServer::start_async().await,
            scratch: TempDir::new().expect("scratch dir"),
            notifier: Arc::new(RecordingNotifier::new()),
        }
    }

    pub fn url(&self, path: &str) -> String {
        self.server.url(path)
    }

    pub async fn mock_feed(&self, path: &str, entries: &[TestEntry]) -> httpmock::Mock<'_> {
        let xml = rss_xml(entries);
        self.server
            .mock_async(|when, then| {
                when.method(GET).path(path);
                then.status(200)
                    .header("Content-Type", "application/rss+xml")
                    .body(&xml);
            })
            .await
    }

    pub async fn mock_page(&self, path: &str, html: &str) -> httpmock::Mock<'_> {
        let html = html.to_string();
        self.server
            .mock_async(|when, then| {
                when.method(GET).path(path);
                then.status(200).header("Content-Type", "text/html").body(&html);
            })
            .await
    }

    pub async fn mock_status(&self, path: &str, status: u16) -> httpmock::Mock<'_> {
        self.server
            .mock_async(|when, then| {
                when.method(GET).path(path);
                then.status(status);
            })
            .await
    }

    pub fn fetcher(&self) -> Arc<Fetcher> {
        let config = FetchConfig {
            timeout_seconds: 5,
            ..FetchConfig::default()
        };
        Arc::new(Fetcher::new(config).expect("http client"))
    }

    /// Landing pages on the mock server are treated as rich sources.
    pub fn enrich_config(&self) -> EnrichConfig {
        EnrichConfig {
            rich_domains: vec!["127.0.0.1".to_string()],
            ..EnrichConfig::default()
        }
    }

    pub fn video_config(&self, binary: impl Into<PathBuf>) -> VideoConfig {
        VideoConfig {
            binary: binary.into(),
            scratch_dir: self.scratch.path().to_path_buf(),
            timeout: Duration::from_secs(10),
            ..VideoConfig::default()
        }
    }

    pub fn scheduler(&self, store: Arc<dyn ItemStore>, sources: Vec<String>) -> Arc<DispatchScheduler> {
        self.scheduler_with_video(store, sources, self.video_config(self.scratch.path().join("no-such-yt-dlp")))
    }

    pub fn scheduler_with_video(
        &self,
        store: Arc<dyn ItemStore>,
        sources: Vec<String>,
        video: VideoConfig,
    ) -> Arc<DispatchScheduler> {
        let fetcher = self.fetcher();
        Arc::new(DispatchScheduler::new(
            FeedPoller::new(Arc::clone(&fetcher)),
            Enricher::new(fetcher, self.enrich_config()),
            VideoFetcher::new(video),
            store,
            self.notifier.clone(),
            ScheduleConfig {
                sources,
                ..ScheduleConfig::default()
            },
        ))
    }
}

pub async fn store_with_channel() -> Arc<MemoryItemStore> {
    Arc::new(MemoryItemStore::with_destination(Destination::Handle(CHANNEL.to_string())).await)
}
