use crate::enricher::{video_caption, Enricher};
use crate::poller::FeedPoller;
use crate::types::{DispatchError, EnrichedContent, FeedItem, Result, ScheduleConfig};
use crate::video::VideoFetcher;
use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use interfaces::{Destination, ItemStore, Notifier};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// What happened to one source during a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceOutcome {
    /// Feed unreachable, empty, or its newest entry unusable.
    NothingNew,
    AlreadyDelivered,
    Delivered { video: VideoOutcome },
    DeliveryFailed(String),
    StoreFault(String),
    Crashed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoOutcome {
    NotFound,
    Sent,
    Failed,
}

#[derive(Debug, Default)]
pub struct CycleReport {
    /// No destination was configured, nothing was polled.
    pub skipped: bool,
    pub outcomes: Vec<(String, SourceOutcome)>,
}

impl CycleReport {
    pub fn delivered(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| matches!(outcome, SourceOutcome::Delivered { .. }))
            .count()
    }

    pub fn outcome(&self, source: &str) -> Option<&SourceOutcome> {
        self.outcomes
            .iter()
            .find(|(s, _)| s == source)
            .map(|(_, outcome)| outcome)
    }

    fn store_fault(&self) -> Option<&str> {
        self.outcomes.iter().find_map(|(_, outcome)| match outcome {
            SourceOutcome::StoreFault(reason) => Some(reason.as_str()),
            _ => None,
        })
    }
}

/// Drives poll → dedup → enrich → deliver → record → video for every
/// configured source, forever.
///
/// The dedup check and the record insert are separate store calls. Two
/// processes polling the same feed can both pass the check and deliver the
/// same entry twice; the store still keeps a single record. Run one instance.
pub struct DispatchScheduler {
    poller: FeedPoller,
    enricher: Enricher,
    videos: VideoFetcher,
    store: Arc<dyn ItemStore>,
    notifier: Arc<dyn Notifier>,
    config: ScheduleConfig,
}

impl DispatchScheduler {
    pub fn new(
        poller: FeedPoller,
        enricher: Enricher,
        videos: VideoFetcher,
        store: Arc<dyn ItemStore>,
        notifier: Arc<dyn Notifier>,
        config: ScheduleConfig,
    ) -> Self {
        Self {
            poller,
            enricher,
            videos,
            store,
            notifier,
            config,
        }
    }

    pub async fn destination(&self) -> Result<Option<Destination>> {
        self.store
            .get_destination_config()
            .await
            .map(|config| config.map(|c| c.news_channel))
            .map_err(DispatchError::store)
    }

    /// Runs cycles until the process stops. Never returns.
    pub async fn run(self: Arc<Self>) {
        info!(
            "Starting news dispatch loop over {} feeds, every {:?}",
            self.config.sources.len(),
            self.config.poll_interval
        );

        let mut backoff = ExponentialBackoff {
            current_interval: self.config.error_backoff,
            initial_interval: self.config.error_backoff,
            max_interval: self.config.max_error_backoff,
            multiplier: 2.0,
            max_elapsed_time: None,
            ..Default::default()
        };

        loop {
            let scheduler = Arc::clone(&self);
            let cycle = tokio::spawn(async move { scheduler.run_cycle().await })
                .await
                .map_err(DispatchError::from)
                .and_then(|result| result);

            let pause = match cycle {
                Ok(report) => {
                    backoff.reset();
                    debug!("Cycle finished, {} delivered", report.delivered());
                    self.config.poll_interval
                }
                Err(e) => {
                    let delay = backoff.next_backoff().unwrap_or(self.config.max_error_backoff);
                    error!("Error in news feed loop: {}, retrying in {:?}", e, delay);
                    delay
                }
            };

            tokio::time::sleep(pause).await;
        }
    }

    /// One pass over every source.
    ///
    /// Sources run concurrently in their own tasks. An entry id is claimed by
    /// the first task that polls it, so feeds sharing an entry deliver it once
    /// per cycle. Only a failure to read the destination or a store fault
    /// during a source's processing fails the cycle.
    pub async fn run_cycle(self: &Arc<Self>) -> Result<CycleReport> {
        let Some(destination) = self.destination().await? else {
            info!("No news channel configured, skipping cycle");
            return Ok(CycleReport {
                skipped: true,
                outcomes: Vec::new(),
            });
        };

        let claimed: Arc<Mutex<HashSet<String>>> = Arc::new(Mutex::new(HashSet::new()));
        let handles: Vec<_> = self
            .config
            .sources
            .iter()
            .map(|source| {
                let scheduler = Arc::clone(self);
                let task_source = source.clone();
                let destination = destination.clone();
                let claimed = Arc::clone(&claimed);
                let handle = tokio::spawn(async move {
                    scheduler
                        .process_source(&task_source, &destination, &claimed)
                        .await
                });
                (source.clone(), handle)
            })
            .collect();

        let mut report = CycleReport::default();
        for (source, handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!("Processing of {} aborted: {}", source, e);
                    SourceOutcome::Crashed(e.to_string())
                }
            };
            report.outcomes.push((source, outcome));
        }

        info!(
            "Cycle complete: {}/{} sources delivered",
            report.delivered(),
            report.outcomes.len()
        );

        if let Some(reason) = report.store_fault() {
            return Err(DispatchError::StoreUnavailable(reason.to_string()));
        }
        Ok(report)
    }

    async fn process_source(
        &self,
        source: &str,
        destination: &Destination,
        claimed: &Mutex<HashSet<String>>,
    ) -> SourceOutcome {
        debug!("Polling {}", source);
        let Some(item) = self.poller.poll(source).await else {
            return SourceOutcome::NothingNew;
        };

        if !claimed.lock().await.insert(item.id.clone()) {
            debug!("{} is handled by another source this cycle", item.id);
            return SourceOutcome::AlreadyDelivered;
        }

        match self.store.find_delivery_record(&item.id).await {
            Ok(Some(_)) => {
                debug!("Already delivered {}", item.id);
                return SourceOutcome::AlreadyDelivered;
            }
            Ok(None) => {}
            Err(e) => {
                error!("Dedup lookup for {} failed: {:#}", item.id, e);
                return SourceOutcome::StoreFault(format!("{e:#}"));
            }
        }

        let content = self.enricher.enrich(&item).await;

        if let Err(e) = self.deliver(destination, &content).await {
            error!("Error sending news {}: {}", item.id, e);
            return SourceOutcome::DeliveryFailed(e.to_string());
        }

        match self.store.insert_delivery_record(&item.delivery_record()).await {
            Ok(true) => info!("Sent news: {}", item.display_title()),
            Ok(false) => warn!("Delivery record for {} was written concurrently", item.id),
            Err(e) => {
                error!("Sent {} but could not record it: {:#}", item.id, e);
                return SourceOutcome::StoreFault(format!("{e:#}"));
            }
        }

        let video = match &content.video_source_url {
            Some(url) => self.deliver_video(destination, &item, url).await,
            None => VideoOutcome::NotFound,
        };

        SourceOutcome::Delivered { video }
    }

    /// Sends the photo message, or the text message when there is no
    /// thumbnail or the photo is rejected.
    async fn deliver(&self, destination: &Destination, content: &EnrichedContent) -> Result<()> {
        if let Some(thumbnail) = &content.thumbnail_url {
            match self
                .notifier
                .send_photo(destination, thumbnail, &content.message_body)
                .await
            {
                Ok(()) => return Ok(()),
                Err(e) => warn!("Failed to send photo {}, falling back to text: {:#}", thumbnail, e),
            }
        }

        self.notifier
            .send_text(destination, &content.message_body, true)
            .await
            .map_err(DispatchError::delivery)
    }

    /// Best effort: failures are logged and never undo the main delivery.
    async fn deliver_video(&self, destination: &Destination, item: &FeedItem, url: &str) -> VideoOutcome {
        let Some(video) = self.videos.fetch_video(url).await else {
            return VideoOutcome::Failed;
        };

        let sent = self
            .notifier
            .send_video(destination, video.path(), &video_caption(item))
            .await;

        if let Err(e) = video.close() {
            warn!("Error deleting temp video file: {}", e);
        }

        match sent {
            Ok(()) => {
                info!("Sent video for: {}", item.display_title());
                VideoOutcome::Sent
            }
            Err(e) => {
                warn!("Error sending video for {}: {:#}", item.id, e);
                VideoOutcome::Failed
            }
        }
    }

    /// Delivers entry `position` (1-based) of `source` right away, without
    /// consulting or updating the delivery ledger.
    pub async fn send_now(&self, source: &str, position: usize) -> Result<VideoOutcome> {
        let destination = self.destination().await?.ok_or(DispatchError::NoDestination)?;

        let entries = self.poller.entries(source).await?;
        let available = entries.len();
        let entry = position
            .checked_sub(1)
            .and_then(|index| entries.into_iter().nth(index))
            .ok_or(DispatchError::NoSuchEntry { position, available })?;
        let item = FeedItem::try_from(entry)?;

        let content = self.enricher.enrich(&item).await;
        self.deliver(&destination, &content).await?;
        info!("Manually sent entry {} of {}: {}", position, source, item.display_title());

        let video = match &content.video_source_url {
            Some(url) => self.deliver_video(&destination, &item, url).await,
            None => VideoOutcome::NotFound,
        };
        Ok(video)
    }
}
