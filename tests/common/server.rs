//! Test server lifecycle management
//!
//! Each test gets an isolated server with its own SQLite databases.

use super::constants::*;
use engagement_server::server::websocket::BrokerSlot;
use engagement_server::server::{make_app, ServerConfig, ServerState, ServiceSettings};
use engagement_server::{RequestsLoggingLevel, SqliteEngagementStore, SqliteNotificationStore};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// Test server instance with isolated databases
///
/// When dropped, the server shuts down and temp resources are cleaned up.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// The port the server is listening on
    pub port: u16,

    /// Server state, for direct access to services in tests
    pub state: ServerState,

    // Private fields - keep resources alive until drop
    _temp_db_dir: TempDir,
    shutdown: CancellationToken,
}

impl TestServer {
    /// Spawns a new test server on a random port
    pub async fn spawn() -> Self {
        Self::spawn_with(ServiceSettings::default()).await
    }

    pub async fn spawn_with(settings: ServiceSettings) -> Self {
        Self::spawn_inner(settings, true).await
    }

    /// Spawns a server whose realtime broker was never attached
    pub async fn spawn_without_realtime() -> Self {
        Self::spawn_inner(ServiceSettings::default(), false).await
    }

    async fn spawn_inner(settings: ServiceSettings, realtime: bool) -> Self {
        let temp_db_dir = TempDir::new().expect("Failed to create temp db dir");
        let engagement_store = Arc::new(
            SqliteEngagementStore::new(temp_db_dir.path().join("engagement.db"))
                .expect("Failed to open engagement store"),
        );
        let notification_store = Arc::new(
            SqliteNotificationStore::new(temp_db_dir.path().join("notifications.db"))
                .expect("Failed to open notification store"),
        );

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let shutdown = CancellationToken::new();
        let config = ServerConfig {
            port,
            requests_logging_level: RequestsLoggingLevel::None,
            cors_origin: None,
        };
        let state = ServerState::build(
            config,
            &settings,
            engagement_store,
            notification_store,
            shutdown.clone(),
        )
        .expect("Failed to build server state");
        let state = if realtime {
            state
        } else {
            ServerState {
                realtime: Arc::new(BrokerSlot::detached()),
                ..state
            }
        };
        let app = make_app(state.clone()).expect("Failed to build app");

        let server_shutdown = shutdown.clone();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(server_shutdown.cancelled_owned())
                .await
                .expect("Server failed");
        });

        let server = Self {
            base_url,
            port,
            state,
            _temp_db_dir: temp_db_dir,
            shutdown,
        };

        server.wait_for_ready().await;

        server
    }

    /// Waits until every notification job submitted so far has been processed.
    pub async fn drain_notifications(&self) {
        self.state
            .notification_dispatcher
            .drain()
            .await
            .expect("Notification dispatcher stopped");
    }

    /// Waits for the server to become ready by polling the home endpoint
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => return,
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
