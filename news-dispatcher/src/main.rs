use clap::Parser;
use interfaces::{ItemStore, Notifier};
use news_dispatcher::commands::run_commands;
use news_dispatcher::{
    health, AdminCommands, Config, DispatchScheduler, Enricher, FeedPoller, Fetcher, PgItemStore,
    TelegramNotifier, VideoFetcher,
};
use std::sync::Arc;
use teloxide::Bot;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::parse();
    info!("Starting news dispatcher for {} feeds", config.feeds.len());

    let store = PgItemStore::new(&config.database_url).await.map_err(|e| {
        error!("Failed to connect to database: {:#}", e);
        e
    })?;
    store.setup_schema().await?;
    let store: Arc<dyn ItemStore> = Arc::new(store);

    let bot = Bot::new(&config.bot_token);
    let notifier: Arc<dyn Notifier> = Arc::new(TelegramNotifier::new(bot.clone()));

    let fetcher = Arc::new(Fetcher::new(config.fetch_config())?);
    let scheduler = Arc::new(DispatchScheduler::new(
        FeedPoller::new(Arc::clone(&fetcher)),
        Enricher::new(Arc::clone(&fetcher), config.enrich_config()),
        VideoFetcher::new(config.video_config()),
        Arc::clone(&store),
        notifier,
        config.schedule_config(),
    ));
    let commands = Arc::new(AdminCommands::new(
        Arc::clone(&store),
        Arc::clone(&scheduler),
        config.admins.clone(),
    ));

    let dispatch_task = tokio::spawn(Arc::clone(&scheduler).run());
    let health_task = tokio::spawn(health::serve(config.health_addr));
    let command_task = tokio::spawn(run_commands(bot, commands));

    tokio::select! {
        result = dispatch_task => error!("Dispatch loop stopped: {:?}", result),
        result = health_task => match result {
            Ok(Err(e)) => error!("Health endpoint failed: {:#}", e),
            other => error!("Health endpoint stopped: {:?}", other),
        },
        result = command_task => error!("Command listener stopped: {:?}", result),
        _ = tokio::signal::ctrl_c() => info!("Shutting down"),
    }

    Ok(())
}
