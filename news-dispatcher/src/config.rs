use crate::types::{EnrichConfig, FetchConfig, ScheduleConfig, VideoConfig};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Runtime settings. Every flag can also come from the environment or a
/// `.env` file.
#[derive(Parser, Debug, Clone)]
#[command(name = "news-dispatcher", about = "Relays the newest feed entries to a Telegram channel")]
pub struct Config {
    #[arg(long, env = "BOT_TOKEN", hide_env_values = true)]
    pub bot_token: String,

    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: String,

    /// Feed URLs, comma separated.
    #[arg(long, env = "RSS_FEEDS", value_delimiter = ',', required = true)]
    pub feeds: Vec<String>,

    /// Telegram user ids allowed to run admin commands.
    #[arg(long, env = "ADMINS", value_delimiter = ',')]
    pub admins: Vec<u64>,

    #[arg(long, env = "POLL_INTERVAL_SECS", default_value_t = 300)]
    pub poll_interval_secs: u64,

    #[arg(long, env = "ERROR_BACKOFF_SECS", default_value_t = 60)]
    pub error_backoff_secs: u64,

    #[arg(long, env = "MAX_ERROR_BACKOFF_SECS", default_value_t = 900)]
    pub max_error_backoff_secs: u64,

    #[arg(long, env = "HTTP_TIMEOUT_SECS", default_value_t = 30)]
    pub http_timeout_secs: u64,

    #[arg(long, env = "USER_AGENT", default_value = "news-dispatcher/0.1")]
    pub user_agent: String,

    /// Hosts whose landing pages are scraped for a thumbnail.
    #[arg(long, env = "RICH_DOMAINS", value_delimiter = ',', default_value = "animenewsnetwork.com")]
    pub rich_domains: Vec<String>,

    #[arg(long, env = "VIDEO_TIMEOUT_SECS", default_value_t = 600)]
    pub video_timeout_secs: u64,

    #[arg(long, env = "YT_DLP_BIN", default_value = "yt-dlp")]
    pub yt_dlp_bin: PathBuf,

    #[arg(long, env = "COOKIES_FILE")]
    pub cookies_file: Option<PathBuf>,

    /// Defaults to the system temp directory.
    #[arg(long, env = "SCRATCH_DIR")]
    pub scratch_dir: Option<PathBuf>,

    #[arg(long, env = "MAX_VIDEO_HEIGHT", default_value_t = 1080)]
    pub max_video_height: u32,

    #[arg(long, env = "HEALTH_ADDR", default_value = "0.0.0.0:8000")]
    pub health_addr: SocketAddr,
}

impl Config {
    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            user_agent: self.user_agent.clone(),
            timeout_seconds: self.http_timeout_secs,
            ..FetchConfig::default()
        }
    }

    pub fn enrich_config(&self) -> EnrichConfig {
        EnrichConfig {
            rich_domains: self.rich_domains.clone(),
            ..EnrichConfig::default()
        }
    }

    pub fn video_config(&self) -> VideoConfig {
        let defaults = VideoConfig::default();
        VideoConfig {
            binary: self.yt_dlp_bin.clone(),
            cookies_file: self.cookies_file.clone(),
            scratch_dir: self.scratch_dir.clone().unwrap_or(defaults.scratch_dir),
            max_height: self.max_video_height,
            timeout: Duration::from_secs(self.video_timeout_secs),
        }
    }

    pub fn schedule_config(&self) -> ScheduleConfig {
        ScheduleConfig {
            sources: self.feeds.clone(),
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            error_backoff: Duration::from_secs(self.error_backoff_secs),
            max_error_backoff: Duration::from_secs(self.max_error_backoff_secs),
        }
    }
}
