//! Notification query routes.

use axum::{
    extract::{Path, Query, State},
    routing::{get, patch},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::session::Session;
use super::state::{GuardedNotificationService, ServerState};
use crate::engagement::EngagementError;
use crate::notifications::{MarkAllReadOutcome, NotificationPage};

#[derive(Deserialize, Debug, Default)]
struct ListParams {
    #[serde(default)]
    skip: usize,
    limit: Option<usize>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UnreadCountResponse {
    unread_count: usize,
}

async fn list_notifications(
    session: Session,
    State(service): State<GuardedNotificationService>,
    Query(params): Query<ListParams>,
) -> Result<Json<NotificationPage>, EngagementError> {
    Ok(Json(service.list(
        &session.user_id,
        params.skip,
        params.limit,
    )?))
}

async fn get_unread_count(
    session: Session,
    State(service): State<GuardedNotificationService>,
) -> Result<Json<UnreadCountResponse>, EngagementError> {
    let unread_count = service.unread_count(&session.user_id)?;
    Ok(Json(UnreadCountResponse { unread_count }))
}

async fn mark_read(
    session: Session,
    State(service): State<GuardedNotificationService>,
    Path(id): Path<String>,
) -> Result<Json<UnreadCountResponse>, EngagementError> {
    let unread_count = service.mark_read(&session.user_id, &id).await?;
    Ok(Json(UnreadCountResponse { unread_count }))
}

async fn mark_all_read(
    session: Session,
    State(service): State<GuardedNotificationService>,
) -> Result<Json<MarkAllReadOutcome>, EngagementError> {
    Ok(Json(service.mark_all_read(&session.user_id).await?))
}

pub fn make_notification_routes(state: ServerState) -> Router {
    Router::new()
        .route("/", get(list_notifications))
        .route("/unread-count", get(get_unread_count))
        .route("/read-all", patch(mark_all_read))
        .route("/{id}/read", patch(mark_read))
        .with_state(state)
}
