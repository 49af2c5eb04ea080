//! Users, posts and comments routes.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::session::Session;
use super::state::{GuardedEngagementManager, GuardedFeedAssembler, ServerState};
use crate::engagement::{EngagementError, FollowToggle, LikeToggle, UserProfile};
use crate::engagement_store::{Comment, NewPost, NewUser, Post, ProfileUpdate};
use crate::feed::{FeedPage, DEFAULT_PAGE_SIZE};

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct PageParams {
    page: Option<usize>,
    page_size: Option<usize>,
}

impl PageParams {
    fn resolve(&self) -> (usize, usize) {
        (
            self.page.unwrap_or(1),
            self.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        )
    }
}

#[derive(Deserialize, Debug)]
struct EditPostBody {
    caption: String,
}

#[derive(Deserialize, Debug)]
struct CommentBody {
    text: String,
    #[serde(default)]
    parent: Option<String>,
}

#[derive(Deserialize, Debug)]
struct EditCommentBody {
    text: String,
}

// Users

async fn create_user(
    State(manager): State<GuardedEngagementManager>,
    Json(body): Json<NewUser>,
) -> Result<impl IntoResponse, EngagementError> {
    let profile = manager.create_user(body)?;
    Ok((StatusCode::CREATED, Json(profile)))
}

async fn get_me(
    session: Session,
    State(manager): State<GuardedEngagementManager>,
) -> Result<Json<UserProfile>, EngagementError> {
    Ok(Json(manager.get_profile(&session.user_id)?))
}

async fn update_me(
    session: Session,
    State(manager): State<GuardedEngagementManager>,
    Json(body): Json<ProfileUpdate>,
) -> Result<Json<UserProfile>, EngagementError> {
    Ok(Json(manager.update_profile(&session.user_id, body)?))
}

async fn follow_user(
    session: Session,
    State(manager): State<GuardedEngagementManager>,
    Path(id): Path<String>,
) -> Result<Json<FollowToggle>, EngagementError> {
    Ok(Json(manager.toggle_follow(&session.user_id, &id)?))
}

// Posts

async fn create_post(
    session: Session,
    State(manager): State<GuardedEngagementManager>,
    Json(body): Json<NewPost>,
) -> Result<impl IntoResponse, EngagementError> {
    let post = manager.create_post(&session.user_id, body)?;
    Ok((StatusCode::CREATED, Json(post)))
}

async fn get_own_posts(
    session: Session,
    State(feed): State<GuardedFeedAssembler>,
    Query(params): Query<PageParams>,
) -> Result<Json<FeedPage>, EngagementError> {
    let (page, page_size) = params.resolve();
    Ok(Json(feed.assemble_own_posts(
        &session.user_id,
        page,
        page_size,
    )?))
}

async fn get_feed(
    session: Session,
    State(feed): State<GuardedFeedAssembler>,
    Query(params): Query<PageParams>,
) -> Result<Json<FeedPage>, EngagementError> {
    let (page, page_size) = params.resolve();
    Ok(Json(feed.assemble_feed(&session.user_id, page, page_size)?))
}

async fn edit_post(
    session: Session,
    State(manager): State<GuardedEngagementManager>,
    Path(id): Path<String>,
    Json(body): Json<EditPostBody>,
) -> Result<Json<Post>, EngagementError> {
    Ok(Json(manager.edit_post(&session.user_id, &id, &body.caption)?))
}

async fn delete_post(
    session: Session,
    State(manager): State<GuardedEngagementManager>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, EngagementError> {
    manager.delete_post(&session.user_id, &id)?;
    Ok(Json(json!({ "message": "Post deleted" })))
}

async fn like_post(
    session: Session,
    State(manager): State<GuardedEngagementManager>,
    Path(id): Path<String>,
) -> Result<Json<LikeToggle>, EngagementError> {
    Ok(Json(manager.toggle_post_like(&session.user_id, &id)?))
}

// Comments

async fn create_comment(
    session: Session,
    State(manager): State<GuardedEngagementManager>,
    Path(post_id): Path<String>,
    Json(body): Json<CommentBody>,
) -> Result<impl IntoResponse, EngagementError> {
    let comment = manager.create_comment(
        &session.user_id,
        &post_id,
        &body.text,
        body.parent.as_deref(),
    )?;
    Ok((StatusCode::CREATED, Json(comment)))
}

async fn list_comments(
    _session: Session,
    State(manager): State<GuardedEngagementManager>,
    Path(post_id): Path<String>,
) -> Result<Json<Vec<Comment>>, EngagementError> {
    Ok(Json(manager.list_comments(&post_id)?))
}

async fn edit_comment(
    session: Session,
    State(manager): State<GuardedEngagementManager>,
    Path(id): Path<String>,
    Json(body): Json<EditCommentBody>,
) -> Result<Json<Comment>, EngagementError> {
    Ok(Json(manager.edit_comment(&session.user_id, &id, &body.text)?))
}

async fn delete_comment(
    session: Session,
    State(manager): State<GuardedEngagementManager>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, EngagementError> {
    manager.delete_comment(&session.user_id, &id)?;
    Ok(Json(json!({ "message": "Comment deleted" })))
}

async fn like_comment(
    session: Session,
    State(manager): State<GuardedEngagementManager>,
    Path(id): Path<String>,
) -> Result<Json<LikeToggle>, EngagementError> {
    Ok(Json(manager.toggle_comment_like(&session.user_id, &id)?))
}

pub fn make_user_routes(state: ServerState) -> Router {
    Router::new()
        .route("/", post(create_user))
        .route("/me", get(get_me).put(update_me))
        .route("/{id}/follow", post(follow_user))
        .with_state(state)
}

pub fn make_post_routes(state: ServerState) -> Router {
    Router::new()
        .route("/", post(create_post).get(get_own_posts))
        .route("/feed", get(get_feed))
        .route("/{id}", put(edit_post).delete(delete_post))
        .route("/{id}/like", post(like_post))
        .route("/{id}/comments", post(create_comment).get(list_comments))
        .with_state(state)
}

pub fn make_comment_routes(state: ServerState) -> Router {
    Router::new()
        .route("/{id}", put(edit_comment).delete(delete_comment))
        .route("/{id}/like", post(like_comment))
        .with_state(state)
}
