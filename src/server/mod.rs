pub mod config;
mod engagement_routes;
mod http_layers;
pub mod metrics;
mod notification_routes;
mod responses;
#[allow(clippy::module_inception)]
pub mod server;
pub mod session;
pub mod state;
pub mod websocket;

pub use config::{ServerConfig, ServiceSettings};
pub use http_layers::*;
pub use server::{make_app, make_metrics_app, run_server};
pub use state::ServerState;
