//! Common test infrastructure
//!
//! This module provides all the infrastructure needed for end-to-end tests.
//! Tests should only import from this module, not from internal submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{TestServer, TestClient, ALICE};
//! use reqwest::StatusCode;
//!
//! #[tokio::test]
//! async fn test_get_me() {
//!     let server = TestServer::spawn().await;
//!     let alice = TestClient::signed_up(server.base_url.clone(), ALICE).await;
//!
//!     let response = alice.get_me().await;
//!     assert_eq!(response.status(), StatusCode::OK);
//! }
//! ```

mod client;
mod constants;
mod server;
mod websocket;

// Public API - this is what tests import
#[allow(unused_imports)]
pub use client::TestClient;
#[allow(unused_imports)]
pub use constants::*;
#[allow(unused_imports)]
pub use server::TestServer;
#[allow(unused_imports)]
pub use websocket::{connect_ws, expect_silence, wait_for_message, TestWebSocket};
