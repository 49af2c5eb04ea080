use axum::{http::StatusCode, response::IntoResponse};
use lazy_static::lazy_static;
use prometheus::{
    CounterVec, Encoder, Gauge, HistogramOpts, HistogramVec, IntCounter, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::time::Duration;

/// Metric name prefix for all engagement-server metrics
const PREFIX: &str = "engagement";

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Request Metrics
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_http_requests_total"), "Total number of HTTP requests"),
        &["method", "path", "status"]
    ).expect("Failed to create http_requests_total metric");

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_http_request_duration_seconds"),
            "HTTP request duration in seconds"
        )
        .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
        &["method", "path"]
    ).expect("Failed to create http_request_duration_seconds metric");

    // Engagement Metrics
    pub static ref TOGGLES_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_toggles_total"), "Like/follow toggles by kind and result"),
        &["kind", "result"]
    ).expect("Failed to create toggles_total metric");

    pub static ref FOLLOW_REPAIRS_TOTAL: IntCounter = IntCounter::new(
        format!("{PREFIX}_follow_repairs_total"),
        "Follow edge sides re-written after a post-write mismatch"
    ).expect("Failed to create follow_repairs_total metric");

    // Notification Metrics
    pub static ref NOTIFICATIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_notifications_total"), "Notifications by type and outcome"),
        &["type", "outcome"]
    ).expect("Failed to create notifications_total metric");

    pub static ref DISPATCHER_DROPPED_TOTAL: IntCounter = IntCounter::new(
        format!("{PREFIX}_dispatcher_dropped_total"),
        "Notification jobs dropped because the intake queue was full"
    ).expect("Failed to create dispatcher_dropped_total metric");

    pub static ref DISPATCHER_QUEUE_DEPTH: IntGauge = IntGauge::new(
        format!("{PREFIX}_dispatcher_queue_depth"),
        "Notification jobs waiting in the intake queue"
    ).expect("Failed to create dispatcher_queue_depth metric");

    // Realtime Metrics
    pub static ref WS_CONNECTIONS: IntGauge = IntGauge::new(
        format!("{PREFIX}_ws_connections"),
        "Live WebSocket connections"
    ).expect("Failed to create ws_connections metric");

    // Error Metrics
    pub static ref ERRORS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_errors_total"), "Total errors by type and endpoint"),
        &["error_type", "endpoint"]
    ).expect("Failed to create errors_total metric");

    pub static ref PROCESS_MEMORY_BYTES: Gauge = Gauge::new(
        format!("{PREFIX}_process_memory_bytes"),
        "Process memory usage in bytes"
    ).expect("Failed to create process_memory_bytes metric");
}

/// Initialize all metrics and register them with the Prometheus registry
pub fn init_metrics() {
    // Registering twice fails; that's fine in tests.
    let _ = REGISTRY.register(Box::new(HTTP_REQUESTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(TOGGLES_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(FOLLOW_REPAIRS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(NOTIFICATIONS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(DISPATCHER_DROPPED_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(DISPATCHER_QUEUE_DEPTH.clone()));
    let _ = REGISTRY.register(Box::new(WS_CONNECTIONS.clone()));
    let _ = REGISTRY.register(Box::new(ERRORS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(PROCESS_MEMORY_BYTES.clone()));

    tracing::info!("Metrics system initialized successfully");
}

pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();

    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration.as_secs_f64());
}

/// `kind` is "post_like", "comment_like" or "follow"; `result` is "on", "off" or "error".
pub fn record_toggle(kind: &str, result: &str) {
    TOGGLES_TOTAL.with_label_values(&[kind, result]).inc();
}

pub fn record_follow_repair() {
    FOLLOW_REPAIRS_TOTAL.inc();
}

/// `outcome` is one of "persisted", "delivered", "suppressed", "failed".
pub fn record_notification(notification_type: &str, outcome: &str) {
    NOTIFICATIONS_TOTAL
        .with_label_values(&[notification_type, outcome])
        .inc();
}

pub fn record_dispatcher_drop() {
    DISPATCHER_DROPPED_TOTAL.inc();
}

pub fn set_dispatcher_queue_depth(depth: usize) {
    DISPATCHER_QUEUE_DEPTH.set(depth as i64);
}

pub fn ws_connection_opened() {
    WS_CONNECTIONS.inc();
}

pub fn ws_connection_closed() {
    WS_CONNECTIONS.dec();
}

pub fn record_error(error_type: &str, endpoint: &str) {
    ERRORS_TOTAL
        .with_label_values(&[error_type, endpoint])
        .inc();
}

/// Update process memory usage
pub fn update_memory_usage() {
    #[cfg(target_os = "linux")]
    {
        if let Ok(status) = std::fs::read_to_string("/proc/self/status") {
            for line in status.lines() {
                if line.starts_with("VmRSS:") {
                    // RSS is reported in kB
                    if let Some(kb) = line
                        .split_whitespace()
                        .nth(1)
                        .and_then(|kb| kb.parse::<f64>().ok())
                    {
                        PROCESS_MEMORY_BYTES.set(kb * 1024.0);
                    }
                    return;
                }
            }
        }
    }
}

/// Handler for the /metrics endpoint
pub async fn metrics_handler() -> impl IntoResponse {
    update_memory_usage();

    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = vec![];
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => {
            let response = String::from_utf8(buffer).unwrap_or_default();
            (StatusCode::OK, response)
        }
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_metric(name: &str) -> bool {
        REGISTRY.gather().iter().any(|m| m.get_name() == name)
    }

    #[test]
    fn test_metrics_initialization() {
        init_metrics();
        assert!(!REGISTRY.gather().is_empty(), "Metrics should be registered");
    }

    #[test]
    fn test_record_http_request() {
        init_metrics();
        record_http_request("GET", "/v1/posts/feed", 200, Duration::from_millis(50));
        assert!(has_metric("engagement_http_requests_total"));
    }

    #[test]
    fn test_record_toggle_and_notification() {
        init_metrics();
        record_toggle("post_like", "on");
        record_notification("like_post", "persisted");
        assert!(has_metric("engagement_toggles_total"));
        assert!(has_metric("engagement_notifications_total"));
    }

    #[test]
    fn test_dispatcher_drop_counter() {
        init_metrics();
        let before = DISPATCHER_DROPPED_TOTAL.get();
        record_dispatcher_drop();
        assert!(DISPATCHER_DROPPED_TOTAL.get() > before);
    }
}
