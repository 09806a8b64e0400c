pub mod commands;
pub mod config;
pub mod enricher;
pub mod fetcher;
pub mod health;
pub mod parser;
pub mod poller;
pub mod scheduler;
pub mod store;
pub mod telegram;
pub mod types;
pub mod video;

pub use types::*;
pub use commands::{AdminCommands, Command};
pub use config::Config;
pub use enricher::Enricher;
pub use fetcher::Fetcher;
pub use parser::FeedParser;
pub use poller::FeedPoller;
pub use scheduler::{CycleReport, DispatchScheduler, SourceOutcome, VideoOutcome};
pub use store::PgItemStore;
pub use telegram::TelegramNotifier;
pub use video::{DownloadedVideo, VideoFetcher};
