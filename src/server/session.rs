//! Caller identity.
//!
//! Authentication happens upstream; the gateway forwards the authenticated
//! user id in the `X-User-Id` header.

use std::convert::Infallible;

use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts},
    http::{request::Parts, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use tracing::debug;

pub const HEADER_USER_ID_KEY: &str = "X-User-Id";

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub user_id: String,
}

pub enum SessionExtractionError {
    MissingIdentity,
}

impl IntoResponse for SessionExtractionError {
    fn into_response(self) -> axum::response::Response {
        match self {
            SessionExtractionError::MissingIdentity => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "message": "Missing user identity" })),
            )
                .into_response(),
        }
    }
}

fn extract_session_from_headers(parts: &Parts) -> Option<Session> {
    let user_id = parts
        .headers
        .get(HEADER_USER_ID_KEY)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())?;
    Some(Session {
        user_id: user_id.to_string(),
    })
}

impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = SessionExtractionError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        extract_session_from_headers(parts).ok_or_else(|| {
            debug!("No {} header on {}", HEADER_USER_ID_KEY, parts.uri.path());
            SessionExtractionError::MissingIdentity
        })
    }
}

impl<S> OptionalFromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(extract_session_from_headers(parts))
    }
}
