use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub db_dir: Option<String>,
    pub in_memory: Option<bool>,
    pub port: Option<u16>,
    pub metrics_port: Option<u16>,
    pub logging_level: Option<String>,
    pub cors_origin: Option<String>,

    // Engagement settings
    pub follow_repair_attempts: Option<usize>,
    pub max_page_size: Option<usize>,
    pub ws_connection_buffer: Option<usize>,

    pub notifications: Option<NotificationsConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct NotificationsConfig {
    pub queue_capacity: Option<usize>,
    pub workers: Option<usize>,
    pub retention_days: Option<u64>,
    /// 0 disables pruning.
    pub prune_interval_hours: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
