//! Shared constants for end-to-end tests

// ============================================================================
// Timeouts
// ============================================================================

/// Max time to wait for the server to answer its first request
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Poll interval while waiting for the server
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 20;

/// Per-request timeout of the test client
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Max time to wait for a WebSocket message
pub const WS_MESSAGE_TIMEOUT_MS: u64 = 3000;

// ============================================================================
// Test Users
// ============================================================================

pub const ALICE: &str = "alice";
pub const BOB: &str = "bob";
pub const CAROL: &str = "carol";
pub const DAVE: &str = "dave";
