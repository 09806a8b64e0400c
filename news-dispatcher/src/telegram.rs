use anyhow::Result;
use async_trait::async_trait;
use interfaces::{Destination, Notifier};
use std::path::Path;
use teloxide::prelude::*;
use teloxide::types::{InputFile, ParseMode, Recipient};
use url::Url;

/// Telegram delivery. All captions and bodies are sent as HTML.
pub struct TelegramNotifier {
    bot: Bot,
}

impl TelegramNotifier {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

fn recipient(destination: &Destination) -> Recipient {
    match destination {
        Destination::ChatId(id) => Recipient::Id(ChatId(*id)),
        Destination::Handle(handle) => Recipient::ChannelUsername(handle.clone()),
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send_text(&self, destination: &Destination, text: &str, disable_preview: bool) -> Result<()> {
        self.bot
            .send_message(recipient(destination), text)
            .parse_mode(ParseMode::Html)
            .disable_web_page_preview(disable_preview)
            .await
            .map(|_| ())
            .map_err(|e| anyhow::anyhow!("Telegram send failed: {}", e))
    }

    async fn send_photo(&self, destination: &Destination, image_url: &str, caption: &str) -> Result<()> {
        let photo = InputFile::url(Url::parse(image_url)?);

        self.bot
            .send_photo(recipient(destination), photo)
            .caption(caption)
            .parse_mode(ParseMode::Html)
            .await
            .map(|_| ())
            .map_err(|e| anyhow::anyhow!("Telegram send photo failed: {}", e))
    }

    async fn send_video(&self, destination: &Destination, video: &Path, caption: &str) -> Result<()> {
        self.bot
            .send_video(recipient(destination), InputFile::file(video.to_path_buf()))
            .caption(caption)
            .parse_mode(ParseMode::Html)
            .supports_streaming(true)
            .await
            .map(|_| ())
            .map_err(|e| anyhow::anyhow!("Telegram send video failed: {}", e))
    }
}
