//! End-to-end tests for notification creation, listing and read state

mod common;

use common::{TestClient, TestServer, ALICE, BOB, CAROL, DAVE};
use reqwest::StatusCode;
use serde_json::Value;

fn types_of(page: &Value) -> Vec<String> {
    page["notifications"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["type"].as_str().unwrap().to_string())
        .collect()
}

async fn unread_count(client: &TestClient) -> u64 {
    let response = client.get_unread_count().await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    body["unreadCount"].as_u64().unwrap()
}

#[tokio::test]
async fn test_new_post_reaches_every_follower() {
    let server = TestServer::spawn().await;
    let alice = TestClient::signed_up(server.base_url.clone(), ALICE).await;
    let bob = TestClient::signed_up(server.base_url.clone(), BOB).await;
    let carol = TestClient::signed_up(server.base_url.clone(), CAROL).await;
    let dave = TestClient::signed_up(server.base_url.clone(), DAVE).await;

    for follower in [&bob, &carol, &dave] {
        follower.follow(alice.id()).await;
    }
    let post_id = alice.create_post_id("announcement").await;
    server.drain_notifications().await;

    for follower in [&bob, &carol, &dave] {
        let page = follower.notifications_json().await;
        let new_posts: Vec<&Value> = page["notifications"]
            .as_array()
            .unwrap()
            .iter()
            .filter(|n| n["type"] == "new_post")
            .collect();
        assert_eq!(new_posts.len(), 1);
        assert_eq!(new_posts[0]["sender"]["handle"], ALICE);
        assert_eq!(new_posts[0]["post"]["id"], post_id.as_str());
        assert_eq!(new_posts[0]["read"], false);
    }

    // The author hears about each follow, never about their own post
    let page = alice.notifications_json().await;
    let types = types_of(&page);
    assert_eq!(types.len(), 3);
    assert!(types.iter().all(|t| t == "follow"));
}

#[tokio::test]
async fn test_like_notifies_owner_once_per_activation() {
    let server = TestServer::spawn().await;
    let alice = TestClient::signed_up(server.base_url.clone(), ALICE).await;
    let bob = TestClient::signed_up(server.base_url.clone(), BOB).await;
    let post_id = alice.create_post_id("likeable").await;

    bob.like_post(&post_id).await; // on
    bob.like_post(&post_id).await; // off
    alice.like_post(&post_id).await; // own like
    server.drain_notifications().await;

    let page = alice.notifications_json().await;
    assert_eq!(types_of(&page), vec!["like_post".to_string()]);
    assert_eq!(page["notifications"][0]["sender"]["handle"], BOB);
}

#[tokio::test]
async fn test_reply_notifies_parent_owner_and_post_owner() {
    let server = TestServer::spawn().await;
    let alice = TestClient::signed_up(server.base_url.clone(), ALICE).await;
    let bob = TestClient::signed_up(server.base_url.clone(), BOB).await;
    let carol = TestClient::signed_up(server.base_url.clone(), CAROL).await;
    let post_id = alice.create_post_id("thread").await;

    let parent = bob.comment_id(&post_id, "top level", None).await;
    carol.comment_id(&post_id, "reply", Some(&parent)).await;
    server.drain_notifications().await;

    let bob_page = bob.notifications_json().await;
    assert_eq!(types_of(&bob_page), vec!["reply_comment".to_string()]);
    assert_eq!(bob_page["notifications"][0]["parent"], parent.as_str());

    let alice_types = types_of(&alice.notifications_json().await);
    assert_eq!(alice_types.len(), 2);
    assert!(alice_types.iter().all(|t| t == "comment_post"));
}

#[tokio::test]
async fn test_unread_count_and_mark_read() {
    let server = TestServer::spawn().await;
    let alice = TestClient::signed_up(server.base_url.clone(), ALICE).await;
    let bob = TestClient::signed_up(server.base_url.clone(), BOB).await;
    let carol = TestClient::signed_up(server.base_url.clone(), CAROL).await;
    let dave = TestClient::signed_up(server.base_url.clone(), DAVE).await;

    for follower in [&bob, &carol, &dave] {
        follower.follow(alice.id()).await;
    }
    server.drain_notifications().await;
    assert_eq!(unread_count(&alice).await, 3);

    let page = alice.notifications_json().await;
    let ids: Vec<String> = page["notifications"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["id"].as_str().unwrap().to_string())
        .collect();

    let response = alice.mark_read(&ids[0]).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["unreadCount"], 2);

    // Marking the same notification again changes nothing
    let body: Value = alice.mark_read(&ids[0]).await.json().await.unwrap();
    assert_eq!(body["unreadCount"], 2);

    alice.mark_read(&ids[1]).await;
    assert_eq!(unread_count(&alice).await, 1);

    let page = alice.notifications_json().await;
    assert_eq!(page["total"], 3);
    assert_eq!(page["unreadCount"], 1);
}

#[tokio::test]
async fn test_mark_read_of_foreign_notification_is_not_found() {
    let server = TestServer::spawn().await;
    let alice = TestClient::signed_up(server.base_url.clone(), ALICE).await;
    let bob = TestClient::signed_up(server.base_url.clone(), BOB).await;

    bob.follow(alice.id()).await;
    server.drain_notifications().await;
    let page = alice.notifications_json().await;
    let id = page["notifications"][0]["id"].as_str().unwrap().to_string();

    let response = bob.mark_read(&id).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = alice.mark_read("missing").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    assert_eq!(unread_count(&alice).await, 1);
}

#[tokio::test]
async fn test_mark_all_read() {
    let server = TestServer::spawn().await;
    let alice = TestClient::signed_up(server.base_url.clone(), ALICE).await;
    let bob = TestClient::signed_up(server.base_url.clone(), BOB).await;
    let post_id = alice.create_post_id("busy").await;

    bob.follow(alice.id()).await;
    bob.like_post(&post_id).await;
    bob.comment_id(&post_id, "hi", None).await;
    server.drain_notifications().await;

    let response = alice.mark_all_read().await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["updatedCount"], 3);
    assert_eq!(body["unreadCount"], 0);

    let body: Value = alice.mark_all_read().await.json().await.unwrap();
    assert_eq!(body["updatedCount"], 0);

    let page = alice.notifications_json().await;
    assert!(page["notifications"]
        .as_array()
        .unwrap()
        .iter()
        .all(|n| n["read"] == true));
}

#[tokio::test]
async fn test_notifications_pagination() {
    let server = TestServer::spawn().await;
    let alice = TestClient::signed_up(server.base_url.clone(), ALICE).await;
    let bob = TestClient::signed_up(server.base_url.clone(), BOB).await;
    let post_id = alice.create_post_id("many likes").await;

    // Each activation creates one like_post notification
    for _ in 0..4 {
        bob.like_post(&post_id).await;
        bob.like_post(&post_id).await;
    }
    server.drain_notifications().await;

    let response = alice.get_notifications(1, Some(2)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let page: Value = response.json().await.unwrap();
    assert_eq!(page["notifications"].as_array().unwrap().len(), 2);
    assert_eq!(page["total"], 4);
    assert_eq!(page["unreadCount"], 4);
}

#[tokio::test]
async fn test_deleted_post_is_left_out_of_enrichment() {
    let server = TestServer::spawn().await;
    let alice = TestClient::signed_up(server.base_url.clone(), ALICE).await;
    let bob = TestClient::signed_up(server.base_url.clone(), BOB).await;
    let post_id = alice.create_post_id("ephemeral").await;

    bob.like_post(&post_id).await;
    server.drain_notifications().await;
    alice.delete_post(&post_id).await;

    let page = alice.notifications_json().await;
    assert_eq!(page["notifications"][0]["type"], "like_post");
    assert!(page["notifications"][0].get("post").is_none());
    assert_eq!(page["notifications"][0]["sender"]["handle"], BOB);
}
