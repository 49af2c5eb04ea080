//! HTTP client for end-to-end tests
//!
//! Wraps reqwest and provides methods for all engagement-server endpoints.
//! When API routes or request formats change, update only this file.

use super::constants::*;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;

/// HTTP test client acting as one user
pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
    /// Sent as `X-User-Id`; None for anonymous requests
    pub user_id: Option<String>,
}

impl TestClient {
    /// Creates a new anonymous client
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self {
            client,
            base_url,
            user_id: None,
        }
    }

    /// Creates a user with the given handle and returns a client acting as it
    ///
    /// # Panics
    ///
    /// Panics if the user can't be created (indicates test infrastructure problem).
    pub async fn signed_up(base_url: String, handle: &str) -> Self {
        let mut client = Self::new(base_url);

        let response = client.create_user(handle).await;
        assert_eq!(
            response.status(),
            StatusCode::CREATED,
            "User creation failed for {}",
            handle
        );
        let body: Value = response.json().await.expect("Invalid user body");
        client.user_id = Some(body["id"].as_str().expect("Missing user id").to_string());

        client
    }

    pub fn id(&self) -> &str {
        self.user_id.as_deref().expect("Client has no identity")
    }

    fn request(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        match &self.user_id {
            Some(user_id) => builder.header("X-User-Id", user_id),
            None => builder,
        }
    }

    async fn send(builder: RequestBuilder) -> Response {
        builder.send().await.expect("Request failed")
    }

    // ========================================================================
    // Users
    // ========================================================================

    /// POST /v1/users
    pub async fn create_user(&self, handle: &str) -> Response {
        Self::send(self.request(reqwest::Method::POST, "/v1/users").json(&json!({
            "handle": handle,
            "name": handle.to_uppercase(),
        })))
        .await
    }

    /// GET /v1/users/me
    pub async fn get_me(&self) -> Response {
        Self::send(self.request(reqwest::Method::GET, "/v1/users/me")).await
    }

    /// PUT /v1/users/me
    pub async fn update_me(&self, update: Value) -> Response {
        Self::send(self.request(reqwest::Method::PUT, "/v1/users/me").json(&update)).await
    }

    /// POST /v1/users/{id}/follow
    pub async fn follow(&self, user_id: &str) -> Response {
        Self::send(self.request(
            reqwest::Method::POST,
            &format!("/v1/users/{}/follow", user_id),
        ))
        .await
    }

    // ========================================================================
    // Posts
    // ========================================================================

    /// POST /v1/posts
    pub async fn create_post(&self, caption: &str) -> Response {
        Self::send(self.request(reqwest::Method::POST, "/v1/posts").json(&json!({
            "caption": caption,
            "images": [format!("https://media.example/{}.jpg", caption.replace(' ', "-"))],
        })))
        .await
    }

    /// POST /v1/posts and returns the new post id
    pub async fn create_post_id(&self, caption: &str) -> String {
        let response = self.create_post(caption).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let body: Value = response.json().await.expect("Invalid post body");
        body["id"].as_str().expect("Missing post id").to_string()
    }

    /// GET /v1/posts
    pub async fn get_own_posts(&self, page: usize, page_size: usize) -> Response {
        Self::send(self.request(
            reqwest::Method::GET,
            &format!("/v1/posts?page={}&pageSize={}", page, page_size),
        ))
        .await
    }

    /// GET /v1/posts/feed
    pub async fn get_feed(&self, page: usize, page_size: usize) -> Response {
        Self::send(self.request(
            reqwest::Method::GET,
            &format!("/v1/posts/feed?page={}&pageSize={}", page, page_size),
        ))
        .await
    }

    /// PUT /v1/posts/{id}
    pub async fn edit_post(&self, post_id: &str, caption: &str) -> Response {
        Self::send(
            self.request(reqwest::Method::PUT, &format!("/v1/posts/{}", post_id))
                .json(&json!({ "caption": caption })),
        )
        .await
    }

    /// DELETE /v1/posts/{id}
    pub async fn delete_post(&self, post_id: &str) -> Response {
        Self::send(self.request(reqwest::Method::DELETE, &format!("/v1/posts/{}", post_id)))
            .await
    }

    /// POST /v1/posts/{id}/like
    pub async fn like_post(&self, post_id: &str) -> Response {
        Self::send(self.request(
            reqwest::Method::POST,
            &format!("/v1/posts/{}/like", post_id),
        ))
        .await
    }

    // ========================================================================
    // Comments
    // ========================================================================

    /// POST /v1/posts/{id}/comments
    pub async fn comment(&self, post_id: &str, text: &str, parent: Option<&str>) -> Response {
        Self::send(
            self.request(
                reqwest::Method::POST,
                &format!("/v1/posts/{}/comments", post_id),
            )
            .json(&json!({ "text": text, "parent": parent })),
        )
        .await
    }

    /// POST /v1/posts/{id}/comments and returns the new comment id
    pub async fn comment_id(&self, post_id: &str, text: &str, parent: Option<&str>) -> String {
        let response = self.comment(post_id, text, parent).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let body: Value = response.json().await.expect("Invalid comment body");
        body["id"].as_str().expect("Missing comment id").to_string()
    }

    /// GET /v1/posts/{id}/comments
    pub async fn list_comments(&self, post_id: &str) -> Response {
        Self::send(self.request(
            reqwest::Method::GET,
            &format!("/v1/posts/{}/comments", post_id),
        ))
        .await
    }

    /// PUT /v1/comments/{id}
    pub async fn edit_comment(&self, comment_id: &str, text: &str) -> Response {
        Self::send(
            self.request(
                reqwest::Method::PUT,
                &format!("/v1/comments/{}", comment_id),
            )
            .json(&json!({ "text": text })),
        )
        .await
    }

    /// DELETE /v1/comments/{id}
    pub async fn delete_comment(&self, comment_id: &str) -> Response {
        Self::send(self.request(
            reqwest::Method::DELETE,
            &format!("/v1/comments/{}", comment_id),
        ))
        .await
    }

    /// POST /v1/comments/{id}/like
    pub async fn like_comment(&self, comment_id: &str) -> Response {
        Self::send(self.request(
            reqwest::Method::POST,
            &format!("/v1/comments/{}/like", comment_id),
        ))
        .await
    }

    // ========================================================================
    // Notifications
    // ========================================================================

    /// GET /v1/notifications
    pub async fn get_notifications(&self, skip: usize, limit: Option<usize>) -> Response {
        let path = match limit {
            Some(limit) => format!("/v1/notifications?skip={}&limit={}", skip, limit),
            None => format!("/v1/notifications?skip={}", skip),
        };
        Self::send(self.request(reqwest::Method::GET, &path)).await
    }

    /// GET /v1/notifications and returns the body
    pub async fn notifications_json(&self) -> Value {
        let response = self.get_notifications(0, None).await;
        assert_eq!(response.status(), StatusCode::OK);
        response.json().await.expect("Invalid notifications body")
    }

    /// GET /v1/notifications/unread-count
    pub async fn get_unread_count(&self) -> Response {
        Self::send(self.request(reqwest::Method::GET, "/v1/notifications/unread-count")).await
    }

    /// PATCH /v1/notifications/{id}/read
    pub async fn mark_read(&self, notification_id: &str) -> Response {
        Self::send(self.request(
            reqwest::Method::PATCH,
            &format!("/v1/notifications/{}/read", notification_id),
        ))
        .await
    }

    /// PATCH /v1/notifications/read-all
    pub async fn mark_all_read(&self) -> Response {
        Self::send(self.request(reqwest::Method::PATCH, "/v1/notifications/read-all")).await
    }
}
