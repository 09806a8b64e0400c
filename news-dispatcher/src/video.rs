use crate::types::{DispatchError, Result, VideoConfig};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tempfile::TempPath;
use tokio::process::Command;
use tracing::{debug, info, warn};
use uuid::Uuid;

const OUTPUT_PREFIX: &str = "ytvideo_";
const MERGE_FORMAT: &str = "mp4";

/// Video downloaded into the scratch directory.
///
/// The file is removed when this value is closed or dropped, whichever
/// happens first.
#[derive(Debug)]
pub struct DownloadedVideo {
    path: TempPath,
}

impl DownloadedVideo {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Deletes the file now, reporting a failed delete.
    pub fn close(self) -> std::io::Result<()> {
        self.path.close()
    }
}

/// Retrieves videos through an external `yt-dlp` binary.
pub struct VideoFetcher {
    config: VideoConfig,
}

impl VideoFetcher {
    pub fn new(config: VideoConfig) -> Self {
        Self { config }
    }

    /// `bestvideo[height<=H]+bestaudio/best[height<=H]`
    pub fn format_selector(&self) -> String {
        let height = self.config.max_height;
        format!("bestvideo[height<={height}]+bestaudio/best[height<={height}]")
    }

    pub fn build_args(&self, watch_url: &str, output_template: &Path) -> Vec<String> {
        let mut args = vec![
            "-f".to_string(),
            self.format_selector(),
            "--merge-output-format".to_string(),
            MERGE_FORMAT.to_string(),
            "-o".to_string(),
            output_template.to_string_lossy().into_owned(),
            "--no-playlist".to_string(),
            "--quiet".to_string(),
            "--no-warnings".to_string(),
            "--no-simulate".to_string(),
            "--print".to_string(),
            "after_move:filepath".to_string(),
        ];
        if let Some(cookies) = &self.config.cookies_file {
            args.push("--cookies".to_string());
            args.push(cookies.to_string_lossy().into_owned());
        }
        args.push(watch_url.to_string());
        args
    }

    /// Downloads `watch_url`. Any failure is logged and yields `None`.
    pub async fn fetch_video(&self, watch_url: &str) -> Option<DownloadedVideo> {
        let token = Uuid::new_v4().simple().to_string();
        match self.download(watch_url, &token).await {
            Ok(video) => {
                info!("Downloaded video {} to {}", watch_url, video.path().display());
                Some(video)
            }
            Err(e) => {
                warn!("Failed to download video {}: {}", watch_url, e);
                self.remove_partials(&token).await;
                None
            }
        }
    }

    async fn download(&self, watch_url: &str, token: &str) -> Result<DownloadedVideo> {
        if let Some(cookies) = &self.config.cookies_file {
            if !tokio::fs::try_exists(cookies).await.unwrap_or(false) {
                return Err(DispatchError::VideoFetch(format!(
                    "cookie file {} not found",
                    cookies.display()
                )));
            }
        }

        let template = self
            .config
            .scratch_dir
            .join(format!("{OUTPUT_PREFIX}{token}.%(ext)s"));
        let args = self.build_args(watch_url, &template);
        debug!("Running {} {:?}", self.config.binary.display(), args);

        let output = tokio::time::timeout(
            self.config.timeout,
            Command::new(&self.config.binary)
                .args(&args)
                .stdin(Stdio::null())
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| {
            DispatchError::VideoFetch(format!("timed out after {}s", self.config.timeout.as_secs()))
        })??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DispatchError::VideoFetch(format!(
                "{} exited with {}: {}",
                self.config.binary.display(),
                output.status,
                stderr.trim()
            )));
        }

        let printed = String::from_utf8_lossy(&output.stdout);
        let path = match printed.lines().map(str::trim).filter(|l| !l.is_empty()).last() {
            Some(line) => PathBuf::from(line),
            None => self.find_output(token).await?,
        };

        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(DispatchError::VideoFetch(format!(
                "expected output {} is missing",
                path.display()
            )));
        }

        Ok(DownloadedVideo {
            path: TempPath::try_from_path(path)?,
        })
    }

    async fn scratch_files(&self, token: &str) -> Vec<PathBuf> {
        let prefix = format!("{OUTPUT_PREFIX}{token}");
        let mut found = Vec::new();
        let Ok(mut dir) = tokio::fs::read_dir(&self.config.scratch_dir).await else {
            return found;
        };
        while let Ok(Some(entry)) = dir.next_entry().await {
            if entry.file_name().to_string_lossy().starts_with(&prefix) {
                found.push(entry.path());
            }
        }
        found
    }

    async fn find_output(&self, token: &str) -> Result<PathBuf> {
        self.scratch_files(token)
            .await
            .into_iter()
            .find(|p| p.extension().is_some_and(|ext| ext == MERGE_FORMAT))
            .ok_or_else(|| DispatchError::VideoFetch("no output file produced".to_string()))
    }

    async fn remove_partials(&self, token: &str) {
        for path in self.scratch_files(token).await {
            if let Err(e) = tokio::fs::remove_file(&path).await {
                warn!("Failed to remove partial download {}: {}", path.display(), e);
            }
        }
    }
}
