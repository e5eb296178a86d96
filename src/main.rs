mod api;
mod bot;
mod cache;
mod config;
mod db;
mod detector;
mod error;
mod formatter;
mod notifier;
mod resolver;
mod scheduler;
mod transport;

use crate::config::{Config, TransportMode};
use anyhow::Result;
use sea_orm_migration::MigratorTrait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::load()?;

    let log_level = config.log_level();
    let log_dir = &config.logging.dir;

    // Create log directory if it doesn't exist
    std::fs::create_dir_all(log_dir)?;

    // Setup file appender (daily rotation)
    let file_appender = tracing_appender::rolling::daily(log_dir, "linktrackerd.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    // Use local time for log timestamps
    let local_timer = ChronoLocal::rfc_3339();

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_line_number(true)
        .with_file(true)
        .with_target(false)
        .with_timer(local_timer.clone());

    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_timer(local_timer)
        .with_writer(non_blocking);

    let filter_layer = EnvFilter::from_default_env()
        .add_directive(log_level.into())
        .add_directive("sqlx=warn".parse()?)
        .add_directive("sea_orm=warn".parse()?);

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    info!("Starting linktrackerd...");
    info!("Logs are written to: {}", log_dir);

    // Connect to database and apply migrations
    let db = db::establish_connection(&config.database.url).await?;
    migration::Migrator::up(&db, None).await?;
    info!("Database migrations completed");

    let repo = Arc::new(db::repo::Repo::new(db.clone()));
    repo.ping().await?;
    info!("Database ping successful");

    // Provider clients behind the resolver seam
    let link_resolver = Arc::new(resolver::LinkResolver::new(
        config.tracker.request_timeout_sec,
    )?);
    let detector = Arc::new(detector::UpdateDetector::new(repo.clone(), link_resolver));
    info!("Update detector initialized");

    let bot = teloxide::Bot::new(config.telegram.bot_token.clone());
    let update_notifier = notifier::Notifier::new(Arc::new(notifier::TelegramSender::new(bot.clone())));

    // Transport selection: direct delivery or the internal queue
    let mut consumer_handle = None;
    let mut dlq_handle = None;
    let update_transport = match config.transport.mode {
        TransportMode::Direct => {
            info!("Update transport: direct");
            Arc::new(transport::UpdateTransport::Direct(update_notifier.clone()))
        }
        TransportMode::Queue => {
            info!(
                "Update transport: queue (capacity {})",
                config.transport.queue_capacity
            );
            let (publisher, consumer, mut dlq) =
                transport::queue::channel(config.transport.queue_capacity);

            let consumer_notifier = update_notifier.clone();
            consumer_handle = Some(tokio::spawn(async move {
                consumer.run(consumer_notifier).await;
            }));
            dlq_handle = Some(tokio::spawn(async move {
                while let Some(letter) = dlq.recv().await {
                    error!(
                        "Dead letter: {} (payload: {})",
                        letter.error, letter.original_message
                    );
                }
            }));

            Arc::new(transport::UpdateTransport::Queue(publisher))
        }
    };

    // Scheduler starts in immediate mode; chats switch it via the bot
    let notification_scheduler = Arc::new(scheduler::NotificationScheduler::new(
        detector.clone(),
        update_transport,
        Duration::from_secs(config.scheduler.immediate_interval_sec),
        config.scheduler.digest_hour,
    ));
    notification_scheduler
        .set_mode(scheduler::NotificationMode::Immediate)
        .await;
    info!("Notification scheduler started");

    let links_cache = cache::LinksCache::new(Duration::from_secs(config.cache.links_ttl_sec));

    // HTTP API
    let api_state = api::AppState {
        repo: repo.clone(),
        detector: detector.clone(),
        cache: links_cache.clone(),
    };
    let api_host = config.api.host.clone();
    let api_port = config.api.port;
    let api_handle = tokio::spawn(async move {
        if let Err(e) = api::serve(api_state, &api_host, api_port).await {
            error!("HTTP API error: {:?}", e);
        }
    });

    // Telegram bot
    let dialogues =
        bot::state::TrackDialogues::new(Duration::from_secs(config.tracker.dialogue_ttl_sec));
    let handler = bot::BotHandler::new(
        repo.clone(),
        detector.clone(),
        links_cache,
        dialogues,
        notification_scheduler.clone(),
    );
    let bot_handle = tokio::spawn(async move {
        if let Err(e) = bot::run(bot, handler).await {
            error!("Bot error: {:?}", e);
        }
    });

    info!("linktrackerd initialization complete");

    // Setup Ctrl+C handler
    let (shutdown_tx, mut shutdown_rx) = tokio::sync::mpsc::channel::<()>(1);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down...");
            let _ = shutdown_tx.send(()).await;
        }
    });

    shutdown_rx.recv().await;
    info!("Shutting down gracefully...");

    notification_scheduler.shutdown().await;
    bot_handle.abort();
    api_handle.abort();
    if let Some(handle) = consumer_handle {
        handle.abort();
    }
    if let Some(handle) = dlq_handle {
        handle.abort();
    }

    info!("Shutdown complete");
    Ok(())
}
