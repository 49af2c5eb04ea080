use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use engagement_server::config::{AppConfig, CliConfig, FileConfig, NotificationSettings};
use engagement_server::notifications::NotificationService;
use engagement_server::server::{metrics, run_server, ServerConfig, ServerState, ServiceSettings};
use engagement_server::{
    EngagementStore, InMemoryEngagementStore, InMemoryNotificationStore, NotificationStore,
    RequestsLoggingLevel, SqliteEngagementStore, SqliteNotificationStore,
};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Directory holding engagement.db and notifications.db.
    #[clap(long, value_parser = parse_path)]
    pub db_dir: Option<PathBuf>,

    /// Keep all state in process memory instead of SQLite.
    #[clap(long)]
    pub in_memory: bool,

    /// Path to a TOML config file. Its values override the CLI.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3001)]
    pub port: u16,

    /// The port for the metrics server (Prometheus scraping).
    #[clap(long, default_value_t = 9091)]
    pub metrics_port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,
}

fn open_stores(
    config: &AppConfig,
) -> Result<(Arc<dyn EngagementStore>, Arc<dyn NotificationStore>)> {
    match (config.engagement_db_path(), config.notifications_db_path()) {
        (Some(engagement_db), Some(notifications_db)) => {
            info!("Opening SQLite engagement database at {:?}...", engagement_db);
            let engagement_store: Arc<dyn EngagementStore> =
                Arc::new(SqliteEngagementStore::new(&engagement_db)?);
            info!(
                "Opening SQLite notifications database at {:?}...",
                notifications_db
            );
            let notification_store: Arc<dyn NotificationStore> =
                Arc::new(SqliteNotificationStore::new(&notifications_db)?);
            Ok((engagement_store, notification_store))
        }
        _ => {
            info!("Using in-memory stores, nothing will be persisted");
            let engagement_store: Arc<dyn EngagementStore> =
                Arc::new(InMemoryEngagementStore::new());
            let notification_store: Arc<dyn NotificationStore> =
                Arc::new(InMemoryNotificationStore::new());
            Ok((engagement_store, notification_store))
        }
    }
}

fn spawn_notification_pruning(
    service: Arc<NotificationService>,
    settings: &NotificationSettings,
    shutdown: CancellationToken,
) {
    if !settings.pruning_enabled() {
        info!("Notification pruning disabled");
        return;
    }
    info!(
        "Notification pruning enabled: retaining read notifications for {} days, pruning every {} hours",
        settings.retention_days, settings.prune_interval_hours
    );

    let retention = settings.retention();
    let mut ticker = tokio::time::interval(settings.prune_interval());
    tokio::spawn(async move {
        // Skip the first immediate tick, wait for the first interval
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }
            if let Err(e) = service.prune_read_older_than(retention) {
                error!("Failed to prune notifications: {}", e);
            }
        }
    });
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config file {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let cli_config = CliConfig {
        db_dir: cli_args.db_dir,
        in_memory: cli_args.in_memory,
        port: cli_args.port,
        metrics_port: cli_args.metrics_port,
        logging_level: cli_args.logging_level,
    };
    let config = AppConfig::resolve(&cli_config, file_config)?;

    info!("Initializing metrics...");
    metrics::init_metrics();

    let (engagement_store, notification_store) = open_stores(&config)?;

    let shutdown = CancellationToken::new();
    let state = ServerState::build(
        ServerConfig {
            requests_logging_level: config.logging_level.clone(),
            port: config.port,
            cors_origin: config.cors_origin.clone(),
        },
        &ServiceSettings {
            follow_repair_attempts: config.follow_repair_attempts,
            max_page_size: config.max_page_size,
            ws_connection_buffer: config.ws_connection_buffer,
            notification_queue_capacity: config.notifications.queue_capacity,
            notification_workers: config.notifications.workers,
        },
        engagement_store,
        notification_store,
        shutdown.clone(),
    )?;

    spawn_notification_pruning(
        state.notification_service.clone(),
        &config.notifications,
        shutdown.clone(),
    );

    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl-C, shutting down...");
                signal_shutdown.cancel();
            }
            Err(e) => error!("Unable to listen for Ctrl-C: {}", e),
        }
    });

    run_server(state, config.metrics_port, shutdown).await
}
