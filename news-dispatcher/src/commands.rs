use crate::scheduler::DispatchScheduler;
use crate::types::DispatchError;
use interfaces::{Destination, ItemStore};
use std::sync::Arc;
use teloxide::dptree;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use teloxide::utils::command::BotCommands;
use tracing::{error, info, warn};

pub const NOT_ADMIN: &str = "You do not have permission to use this command.";
pub const MISSING_CHANNEL: &str = "Please provide a channel ID or username.";
pub const SEND_NEWS_USAGE: &str = "Usage: /sendnews {rss link} {task position}";
pub const BAD_POSITION: &str = "Task position must be a positive integer.";
pub const NO_CHANNEL: &str = "No news channel configured. Use /news to set one.";
pub const NO_SUCH_ENTRY: &str = "No news found at that position.";
pub const NEWS_SENT: &str = "News sent successfully!";

#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Admin commands:")]
pub enum Command {
    #[command(description = "set the channel news is delivered to")]
    News(String),
    #[command(description = "send entry N of a feed right away")]
    SendNews(String),
}

fn reply(text: &str) -> String {
    format!("<b><blockquote>{text}</blockquote></b>")
}

/// Reads a channel argument: `-100…` ids are numeric, anything else is a
/// public handle, `@` added when missing.
pub fn parse_channel(input: &str) -> Result<Destination, String> {
    let input = input.trim();
    if input.is_empty() {
        return Err(MISSING_CHANNEL.to_string());
    }
    if input.starts_with("-100") {
        return input
            .parse::<i64>()
            .map(Destination::ChatId)
            .map_err(|_| format!("Invalid channel ID: {}", htmlescape::encode_minimal(input)));
    }
    let handle = if input.starts_with('@') {
        input.to_string()
    } else {
        format!("@{input}")
    };
    Ok(Destination::Handle(handle))
}

/// Admin command logic, independent of how messages arrive.
pub struct AdminCommands {
    store: Arc<dyn ItemStore>,
    scheduler: Arc<DispatchScheduler>,
    admins: Vec<u64>,
}

impl AdminCommands {
    pub fn new(store: Arc<dyn ItemStore>, scheduler: Arc<DispatchScheduler>, admins: Vec<u64>) -> Self {
        Self {
            store,
            scheduler,
            admins,
        }
    }

    pub fn is_admin(&self, user_id: Option<u64>) -> bool {
        user_id.is_some_and(|id| self.admins.contains(&id))
    }

    /// `/news <channel>`
    pub async fn set_channel(&self, user_id: Option<u64>, args: &str) -> String {
        if !self.is_admin(user_id) {
            return reply(NOT_ADMIN);
        }

        let destination = match parse_channel(args) {
            Ok(destination) => destination,
            Err(message) => return reply(&message),
        };

        match self.store.set_destination_config(&destination).await {
            Ok(()) => reply(&format!(
                "News channel set to: {}",
                htmlescape::encode_minimal(&destination.to_string())
            )),
            Err(e) => {
                error!("Failed to store news channel: {:#}", e);
                reply(&format!(
                    "Error saving news channel: {}",
                    htmlescape::encode_minimal(&format!("{e:#}"))
                ))
            }
        }
    }

    /// `/sendnews <feed url> <position>`
    pub async fn send_news(&self, user_id: Option<u64>, args: &str) -> String {
        if !self.is_admin(user_id) {
            return reply(NOT_ADMIN);
        }

        let mut parts = args.split_whitespace();
        let (Some(source), Some(position)) = (parts.next(), parts.next()) else {
            return reply(SEND_NEWS_USAGE);
        };

        let position = match position.parse::<usize>() {
            Ok(position) if position > 0 => position,
            _ => return reply(BAD_POSITION),
        };

        match self.scheduler.send_now(source, position).await {
            Ok(video) => {
                info!("Manual send of {} #{} done, video: {:?}", source, position, video);
                reply(NEWS_SENT)
            }
            Err(DispatchError::NoDestination) => reply(NO_CHANNEL),
            Err(DispatchError::NoSuchEntry { .. }) => reply(NO_SUCH_ENTRY),
            Err(e) => {
                warn!("Manual send of {} #{} failed: {}", source, position, e);
                reply(&format!(
                    "Error sending news: {}",
                    htmlescape::encode_minimal(&e.to_string())
                ))
            }
        }
    }
}

async fn answer(bot: Bot, msg: Message, cmd: Command, commands: Arc<AdminCommands>) -> ResponseResult<()> {
    let user_id = msg.from().map(|user| user.id.0);
    let text = match cmd {
        Command::News(args) => commands.set_channel(user_id, &args).await,
        Command::SendNews(args) => commands.send_news(user_id, &args).await,
    };

    bot.send_message(msg.chat.id, text)
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}

/// Listens for admin commands until the bot is stopped.
pub async fn run_commands(bot: Bot, commands: Arc<AdminCommands>) {
    info!("Listening for admin commands");
    let handler = Update::filter_message()
        .filter_command::<Command>()
        .endpoint(answer);

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![commands])
        .build()
        .dispatch()
        .await;
}
