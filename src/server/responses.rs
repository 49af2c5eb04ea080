use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::engagement::EngagementError;

impl EngagementError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            EngagementError::NotFound(_) => StatusCode::NOT_FOUND,
            EngagementError::Unauthorized(_) => StatusCode::FORBIDDEN,
            EngagementError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            EngagementError::Conflict(_) => StatusCode::CONFLICT,
            EngagementError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            EngagementError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for EngagementError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            EngagementError::Store(err) => {
                error!("Store failure: {:#}", err);
                "Server error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(json!({ "message": message }))).into_response()
    }
}
