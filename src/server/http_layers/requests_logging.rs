//! Request logging middleware

use super::super::state::ServerState;
use crate::server::metrics::{record_error, record_http_request};
use axum::extract::{MatchedPath, State};
use axum::{
    body::Body,
    http::{header::HeaderMap, Request, Response, StatusCode},
    middleware::Next,
    response::IntoResponse,
};
use std::time::Instant;
use tracing::{error, info};

#[derive(PartialEq, PartialOrd, Clone, Debug, Default, clap::ValueEnum)]
pub enum RequestsLoggingLevel {
    None,
    #[default]
    Path,
    Headers,
    Body,
}

impl std::fmt::Display for RequestsLoggingLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

const MAX_LOGGABLE_BODY_LENGTH: usize = 1024;

/// Declared body length, or why it can't be used.
fn declared_length(headers: &HeaderMap) -> Result<usize, &'static str> {
    headers
        .get("content-length")
        .ok_or("Content-length not set.")?
        .to_str()
        .map_err(|_| "Could not get Content-length string value.")?
        .parse::<usize>()
        .map_err(|_| "Could not parse Content-length numeric value.")
}

fn log_headers(label: &str, headers: &HeaderMap) {
    info!("  {} Headers:", label);
    for (name, value) in headers.iter() {
        info!("    {:?}: {:?}", name, value);
    }
}

/// Logs a small body and hands back an equivalent one. Bodies above
/// [`MAX_LOGGABLE_BODY_LENGTH`] pass through unread.
async fn capture_body(label: &str, headers: &HeaderMap, body: Body) -> Result<Body, ()> {
    let size = match declared_length(headers) {
        Ok(size) => size,
        Err(reason) => {
            info!("  {} Body: {}", label, reason);
            return Ok(body);
        }
    };
    if size >= MAX_LOGGABLE_BODY_LENGTH {
        info!(
            "  {} Body: Too big to log ({:#})",
            label,
            byte_unit::Byte::from(size)
        );
        return Ok(body);
    }

    match axum::body::to_bytes(body, size).await {
        Ok(bytes) => {
            info!("  {} Body:\n{}", label, String::from_utf8_lossy(&bytes));
            Ok(Body::from(bytes))
        }
        Err(err) => {
            error!("Failed to read {} body: {:?}", label.to_lowercase(), err);
            Err(())
        }
    }
}

fn internal_error() -> Response<Body> {
    let mut response = Response::new(Body::from("Internal Server Error"));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
}

pub async fn log_requests(
    State(state): State<ServerState>,
    mut request: Request<Body>,
    next: Next,
) -> impl IntoResponse {
    let level = state.config.requests_logging_level.clone();
    let start = Instant::now();

    let method = request.method().to_string();
    // Route template keeps the metric label set bounded.
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    if level > RequestsLoggingLevel::None {
        info!(">>> {} {}", method, request.uri());
    }
    if level >= RequestsLoggingLevel::Headers {
        log_headers("Req", request.headers());
    }
    if level >= RequestsLoggingLevel::Body {
        let (parts, body) = request.into_parts();
        let Ok(body) = capture_body("Req", &parts.headers, body).await else {
            return internal_error();
        };
        request = Request::from_parts(parts, body);
    }

    let mut response = next.run(request).await;

    if level >= RequestsLoggingLevel::Headers {
        log_headers("Resp", response.headers());
    }
    if level >= RequestsLoggingLevel::Body {
        let (parts, body) = response.into_parts();
        let Ok(body) = capture_body("Resp", &parts.headers, body).await else {
            return internal_error();
        };
        response = Response::from_parts(parts, body);
    }

    let status = response.status();
    let duration = start.elapsed();
    if level > RequestsLoggingLevel::None {
        info!("<<< {} ({}ms)", status.as_u16(), duration.as_millis());
    }

    record_http_request(&method, &route, status.as_u16(), duration);
    if status.is_server_error() {
        record_error("server_error", &route);
    } else if status.is_client_error() {
        record_error("client_error", &route);
    }

    response
}
