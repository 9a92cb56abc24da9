use chrono::{Duration, Utc};
use dashboard::configuration::SessionBackend;
use serde_json::{json, Value};

use crate::helpers::{spawn_app, spawn_app_with};

#[tokio::test]
async fn session_endpoint_returns_token_identity() {
    let app = spawn_app().await;
    let token = app.signed_jwt("alice");

    let response = app.get("/api/session", Some(&token)).await;

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(
        body,
        json!({ "user": { "id": "alice", "username": "alice-name" } })
    );
}

#[tokio::test]
async fn session_endpoint_requires_credentials() {
    let app = spawn_app().await;

    let response = app.get("/api/session", None).await;

    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn stored_session_cookie_authenticates() {
    let app = spawn_app_with(SessionBackend::Database).await;
    let token = app.add_session("user-1", Utc::now() + Duration::hours(1)).await;

    let response = app
        .request(reqwest::Method::GET, "/api/session", None)
        .header("Cookie", format!("{}={}", app.session_cookie, token))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["user"]["id"], "user-1");
    assert_eq!(body["user"]["username"], "user-1-name");
}

#[tokio::test]
async fn stored_session_bearer_token_can_create_buttons() {
    let app = spawn_app_with(SessionBackend::Database).await;
    let token = app.add_session("user-1", Utc::now() + Duration::hours(1)).await;

    let created = app.create_button(&token, "Stored session").await;

    assert_eq!(created["userId"], "user-1");
}

#[tokio::test]
async fn expired_stored_session_is_rejected() {
    let app = spawn_app_with(SessionBackend::Database).await;
    let token = app.add_session("user-1", Utc::now() - Duration::minutes(1)).await;

    let response = app.get("/api/custom-buttons", Some(&token)).await;

    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn unknown_stored_session_is_rejected() {
    let app = spawn_app_with(SessionBackend::Database).await;

    let response = app.get("/api/custom-buttons", Some("no-such-session")).await;

    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn signed_tokens_are_not_stored_sessions() {
    let app = spawn_app_with(SessionBackend::Database).await;
    let token = app.signed_jwt("alice");

    let response = app.get("/api/custom-buttons", Some(&token)).await;

    assert_eq!(response.status(), 401);
}
