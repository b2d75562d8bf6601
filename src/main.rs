//! # Attendance Bot Main Entry Point
//!
//! Initializes logging, loads configuration, sets up the database and the
//! timetable source, restores registered groups and runs the Telegram bot
//! next to the health server.

use anyhow::{anyhow, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use teloxide::prelude::*;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use attendance_bot::bot::chat::ChatFactory;
use attendance_bot::bot::context::BotContext;
use attendance_bot::bot::handlers::BotHandler;
use attendance_bot::bot::registration::{generate_token, Registrar};
use attendance_bot::bot::registry::ChatRegistry;
use attendance_bot::bot::telegram::TelegramChatFactory;
use attendance_bot::config::Config;
use attendance_bot::database::connection::DatabaseManager;
use attendance_bot::schedule::cache::ScheduleCache;
use attendance_bot::schedule::source::{FileScheduleSource, ScheduleSource, WebScheduleSource};
use attendance_bot::services::display_names::DisplayNames;
use attendance_bot::services::group::{GroupServices, GroupSettings};
use attendance_bot::services::health::HealthService;
use attendance_bot::services::refresh::ScheduleRefreshService;
use attendance_bot::services::scheduler::DailyScheduler;
use attendance_bot::services::transfer::HttpTransfer;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "attendance_bot=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    info!("Starting Attendance Bot v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration loaded - Database: {}, HTTP Port: {}",
        config.database_url, config.http_port
    );

    // Initialize database
    info!("Initializing database connection...");
    ensure_sqlite_dir(&config.database_url)?;
    let db_manager = DatabaseManager::new(&config.database_url).await?;
    info!("Running database migrations...");
    db_manager.run_migrations().await?;
    info!("Database initialized successfully");

    // Initialize bot
    info!("Initializing Telegram bot...");
    let bot = Bot::new(&config.telegram_bot_token);
    let me = bot.get_me().await?;
    let bot_name = me.username().to_string();
    info!("Telegram bot @{} initialized successfully", bot_name);

    // Timetable source
    let source: Arc<dyn ScheduleSource> = if !config.schedule_files.is_empty() {
        info!("Reading timetables from {} local workbooks", config.schedule_files.len());
        Arc::new(FileScheduleSource::new(config.schedule_files.clone()))
    } else if !config.schedule_url.is_empty() {
        info!("Reading timetables from {}", config.schedule_url);
        let transfer = HttpTransfer::new(Duration::from_secs(30))?;
        Arc::new(WebScheduleSource::in_temp_dir(config.schedule_url.clone(), transfer))
    } else {
        return Err(anyhow!("No timetable source configured: set SCHEDULE_FILES or SCHEDULE_URL"));
    };
    let schedules = Arc::new(ScheduleCache::new(source));

    let chats: Arc<dyn ChatFactory> = Arc::new(TelegramChatFactory::new(bot.clone()));
    let registry = Arc::new(ChatRegistry::new());

    let admin_token = generate_token();
    info!("Admin registration token: {}", admin_token);
    if let Some(admin_chat_id) = config.admin_chat_id {
        registry.bind_admin(chats.open(admin_chat_id));
        info!("Admin chat {} bound from configuration", admin_chat_id);
    }

    let services = GroupServices {
        names: Arc::new(DisplayNames::load(db_manager.clone()).await?),
        db: db_manager,
        registry,
        schedules: schedules.clone(),
    };
    let settings = GroupSettings {
        poll_time: config.poll_time,
        attachment_time: config.attachment_time,
        attachments_dir: config.attachments_dir.clone(),
    };
    info!("Starting daily poll and attachment scheduler...");
    let daily_scheduler = DailyScheduler::new()
        .await
        .map_err(|e| anyhow!("Failed to create daily scheduler: {}", e))?;
    daily_scheduler
        .start()
        .await
        .map_err(|e| anyhow!("Failed to start daily scheduler: {}", e))?;

    let ctx = Arc::new(
        BotContext::new(services, chats, Registrar::new(&admin_token), settings, bot_name)
            .with_scheduler(daily_scheduler),
    );

    let restored = ctx.restore_groups().await?;
    info!("Restored {} registered groups", restored);

    // Initialize and start the timetable refresh job
    info!("Initializing schedule refresh service...");
    let mut refresh_service = ScheduleRefreshService::new(schedules)
        .await
        .map_err(|e| anyhow!("Failed to create schedule refresh service: {}", e))?;

    if let Err(e) = refresh_service.start(&config.schedule_refresh_cron).await {
        tracing::error!("Failed to start schedule refresh service: {}", e);
    } else {
        info!("Schedule refresh service started successfully");
    }

    // Initialize health service
    let health_service = HealthService::new(ctx.clone());
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.http_port))
        .await
        .map_err(|e| anyhow!("Failed to bind to port {}: {}", config.http_port, e))?;

    info!("Health check server starting on port {}", config.http_port);

    let handler = BotHandler::new(ctx.clone());

    // Run both the bot and health server concurrently
    let bot_task = tokio::spawn(async move {
        Dispatcher::builder(bot, handler.schema())
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;
    });

    let health_task = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, health_service.router).await {
            tracing::error!("Health server error: {}", e);
        }
    });

    // Wait for either task to complete (which would indicate shutdown)
    tokio::select! {
        result = bot_task => {
            if let Err(e) = result {
                tracing::error!("Bot task error: {}", e);
            }
        }
        result = health_task => {
            if let Err(e) = result {
                tracing::error!("Health task error: {}", e);
            }
        }
    }

    ctx.shutdown().await;

    if let Err(e) = refresh_service.stop().await {
        tracing::warn!("Error stopping schedule refresh service: {}", e);
    }

    info!("Application stopped");
    Ok(())
}

fn ensure_sqlite_dir(database_url: &str) -> Result<()> {
    if let Some(db_path) = database_url.strip_prefix("sqlite:") {
        if let Some(parent) = Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
    }
    Ok(())
}
