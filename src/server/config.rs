use super::RequestsLoggingLevel;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub requests_logging_level: RequestsLoggingLevel,
    pub port: u16,
    /// Allowed browser origin. No CORS layer is installed when unset.
    pub cors_origin: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            requests_logging_level: RequestsLoggingLevel::Path,
            port: 3001,
            cors_origin: None,
        }
    }
}

/// Sizing of the engagement services behind the HTTP surface.
#[derive(Clone, Debug)]
pub struct ServiceSettings {
    pub follow_repair_attempts: usize,
    pub max_page_size: usize,
    pub ws_connection_buffer: usize,
    pub notification_queue_capacity: usize,
    pub notification_workers: usize,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        ServiceSettings {
            follow_repair_attempts: 3,
            max_page_size: 50,
            ws_connection_buffer: 32,
            notification_queue_capacity: 1024,
            notification_workers: 4,
        }
    }
}
