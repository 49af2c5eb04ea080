mod file_config;

pub use file_config::{FileConfig, NotificationsConfig};

use crate::engagement::DEFAULT_FOLLOW_REPAIR_ATTEMPTS;
use crate::feed::DEFAULT_MAX_PAGE_SIZE;
use crate::server::websocket::DEFAULT_CONNECTION_BUFFER;
use crate::server::RequestsLoggingLevel;
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;
use std::time::Duration;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub in_memory: bool,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// None when running on in-memory stores.
    pub db_dir: Option<PathBuf>,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub cors_origin: Option<String>,
    pub follow_repair_attempts: usize,
    pub max_page_size: usize,
    pub ws_connection_buffer: usize,
    pub notifications: NotificationSettings,
}

#[derive(Debug, Clone)]
pub struct NotificationSettings {
    pub queue_capacity: usize,
    pub workers: usize,
    pub retention_days: u64,
    pub prune_interval_hours: u64,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            workers: 4,
            retention_days: 90,
            prune_interval_hours: 24,
        }
    }
}

impl NotificationSettings {
    /// Pruning runs only with a non-zero interval and retention.
    pub fn pruning_enabled(&self) -> bool {
        self.prune_interval_hours > 0 && self.retention_days > 0
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_days * 24 * 60 * 60)
    }

    pub fn prune_interval(&self) -> Duration {
        Duration::from_secs(self.prune_interval_hours * 60 * 60)
    }
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let in_memory = file.in_memory.unwrap_or(cli.in_memory);
        let db_dir = if in_memory {
            None
        } else {
            let db_dir = file
                .db_dir
                .map(PathBuf::from)
                .or_else(|| cli.db_dir.clone())
                .ok_or_else(|| {
                    anyhow::anyhow!(
                        "db_dir must be specified via --db-dir or in config file (or use --in-memory)"
                    )
                })?;
            if !db_dir.exists() {
                bail!("Database directory does not exist: {:?}", db_dir);
            }
            if !db_dir.is_dir() {
                bail!("db_dir is not a directory: {:?}", db_dir);
            }
            Some(db_dir)
        };

        let port = file.port.unwrap_or(cli.port);
        let metrics_port = file.metrics_port.unwrap_or(cli.metrics_port);

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let max_page_size = file.max_page_size.unwrap_or(DEFAULT_MAX_PAGE_SIZE);
        if max_page_size == 0 {
            bail!("max_page_size must be at least 1");
        }

        let defaults = NotificationSettings::default();
        let notifications_file = file.notifications.unwrap_or_default();
        let notifications = NotificationSettings {
            queue_capacity: notifications_file
                .queue_capacity
                .unwrap_or(defaults.queue_capacity),
            workers: notifications_file.workers.unwrap_or(defaults.workers),
            retention_days: notifications_file
                .retention_days
                .unwrap_or(defaults.retention_days),
            prune_interval_hours: notifications_file
                .prune_interval_hours
                .unwrap_or(defaults.prune_interval_hours),
        };
        if notifications.queue_capacity == 0 || notifications.workers == 0 {
            bail!("notification queue_capacity and workers must be at least 1");
        }

        Ok(Self {
            db_dir,
            port,
            metrics_port,
            logging_level,
            cors_origin: file.cors_origin,
            follow_repair_attempts: file
                .follow_repair_attempts
                .unwrap_or(DEFAULT_FOLLOW_REPAIR_ATTEMPTS),
            max_page_size,
            ws_connection_buffer: file
                .ws_connection_buffer
                .unwrap_or(DEFAULT_CONNECTION_BUFFER),
            notifications,
        })
    }

    pub fn engagement_db_path(&self) -> Option<PathBuf> {
        self.db_dir.as_ref().map(|dir| dir.join("engagement.db"))
    }

    pub fn notifications_db_path(&self) -> Option<PathBuf> {
        self.db_dir.as_ref().map(|dir| dir.join("notifications.db"))
    }
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
