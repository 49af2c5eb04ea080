use anyhow::{Context, Result};
use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use axum::{
    extract::State,
    http::{header, HeaderName, HeaderValue, Method},
    middleware,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::CorsLayer;

use super::engagement_routes::{make_comment_routes, make_post_routes, make_user_routes};
use super::metrics::metrics_handler;
use super::notification_routes::make_notification_routes;
use super::session::HEADER_USER_ID_KEY;
use super::websocket::{ws_handler, BrokerSlot, ConnectionManager};
use super::{log_requests, state::*, ServerConfig, ServiceSettings};
use crate::engagement::EngagementManager;
use crate::engagement_store::EngagementStore;
use crate::feed::FeedAssembler;
use crate::notifications::{NotificationDispatcher, NotificationService, NotificationStore};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ServerStats {
    pub uptime: String,
    pub version: String,
    pub connected_users: usize,
    pub live_connections: usize,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        version: env!("CARGO_PKG_VERSION").to_string(),
        connected_users: state.ws_connection_manager.connected_user_count().await,
        live_connections: state.ws_connection_manager.total_connections().await,
    };
    Json(stats)
}

impl ServerState {
    /// Wires the services together and starts the notification dispatcher.
    ///
    /// Must be called inside a tokio runtime. The realtime broker handed to
    /// the notification service starts detached and is attached to the room
    /// registry before this returns.
    pub fn build(
        config: ServerConfig,
        settings: &ServiceSettings,
        engagement_store: Arc<dyn EngagementStore>,
        notification_store: Arc<dyn NotificationStore>,
        shutdown: CancellationToken,
    ) -> Result<ServerState> {
        let broker = Arc::new(BrokerSlot::detached());
        let notification_service = Arc::new(NotificationService::new(
            notification_store,
            engagement_store.clone(),
            broker.clone(),
        ));
        let notification_dispatcher = NotificationDispatcher::start(
            notification_service.clone(),
            engagement_store.clone(),
            settings.notification_queue_capacity,
            settings.notification_workers,
            shutdown,
        );

        let ws_connection_manager =
            Arc::new(ConnectionManager::new(settings.ws_connection_buffer));
        broker
            .attach(ws_connection_manager.clone())
            .context("Failed to attach realtime broker")?;

        let engagement_manager = Arc::new(EngagementManager::new(
            engagement_store.clone(),
            notification_dispatcher.clone(),
            settings.follow_repair_attempts,
        ));
        let feed_assembler = Arc::new(FeedAssembler::new(
            engagement_store,
            settings.max_page_size,
        ));

        Ok(ServerState {
            config,
            start_time: Instant::now(),
            engagement_manager,
            feed_assembler,
            notification_service,
            ws_connection_manager,
            realtime: broker,
            notification_dispatcher,
        })
    }
}

fn make_cors_layer(origin: &str) -> Result<CorsLayer> {
    let origin: HeaderValue = origin
        .parse()
        .with_context(|| format!("Invalid CORS origin: {}", origin))?;
    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static("x-user-id"),
        ]))
}

pub fn make_app(state: ServerState) -> Result<Router> {
    let ws_routes: Router = Router::new()
        .route("/", get(ws_handler))
        .with_state(state.clone());

    let mut app: Router = Router::new()
        .route("/", get(home))
        .with_state(state.clone())
        .nest("/v1/users", make_user_routes(state.clone()))
        .nest("/v1/posts", make_post_routes(state.clone()))
        .nest("/v1/comments", make_comment_routes(state.clone()))
        .nest(
            "/v1/notifications",
            make_notification_routes(state.clone()),
        )
        .nest("/v1/ws", ws_routes);

    app = app.layer(middleware::from_fn_with_state(state.clone(), log_requests));

    if let Some(origin) = &state.config.cors_origin {
        info!("CORS enabled for origin {}", origin);
        app = app.layer(make_cors_layer(origin)?);
    }

    Ok(app)
}

pub fn make_metrics_app() -> Router {
    Router::new().route("/metrics", get(metrics_handler))
}

/// Serves the API and the metrics endpoint until `shutdown` is cancelled.
pub async fn run_server(
    state: ServerState,
    metrics_port: u16,
    shutdown: CancellationToken,
) -> Result<()> {
    let port = state.config.port;
    let app = make_app(state)?;

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;
    let metrics_listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", metrics_port))
        .await
        .with_context(|| format!("Failed to bind metrics port {}", metrics_port))?;

    info!("Ready to serve at port {}!", port);
    info!("Metrics available at port {}!", metrics_port);

    let metrics_shutdown = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = axum::serve(metrics_listener, make_metrics_app())
            .with_graceful_shutdown(metrics_shutdown.cancelled_owned())
            .await
        {
            warn!("Metrics server stopped: {}", e);
        }
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;
    info!("Server stopped");
    Ok(())
}
