//! Backend adapter tests against a mock auth and table API.
//!
//! Validates:
//! - First login creates the admin account
//! - Requests carry the session token once logged in
//! - Failures surface as `false`, `None` or an empty list

use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};
use wpp_cloud::{CloudClient, CloudConfig, CloudError, DEFAULT_ADMIN_EMAIL};
use wpp_core::{AuthProvider, BotStatus, CommandKind, CommandSource, SettingsStore, UserId};

const ANON: &str = "anon-key";

fn client(server: &MockServer) -> CloudClient {
    wpp_telemetry::init_test_tracing();
    CloudClient::new(CloudConfig::new(server.uri(), ANON)).unwrap()
}

fn session_body(token: &str, user_id: &str) -> serde_json::Value {
    serde_json::json!({
        "access_token": token,
        "token_type": "bearer",
        "expires_in": 3600,
        "refresh_token": "refresh",
        "user": { "id": user_id, "email": DEFAULT_ADMIN_EMAIL }
    })
}

async fn mount_login(server: &MockServer, token: &str, user_id: &str) {
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .respond_with(ResponseTemplate::new(200).set_body_json(session_body(token, user_id)))
        .mount(server)
        .await;
}

async fn logged_in(server: &MockServer) -> CloudClient {
    mount_login(server, "jwt-1", "u-1").await;
    let client = client(server);
    assert!(client.authenticate("secret").await.ok);
    client
}

// ============================================================================
// Auth
// ============================================================================

#[tokio::test]
async fn login_stores_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .and(header("apikey", ANON))
        .and(body_partial_json(serde_json::json!({
            "email": DEFAULT_ADMIN_EMAIL,
            "password": "secret"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(session_body("jwt-1", "u-1")))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    assert!(client.current_user().await.is_none());

    let outcome = client.authenticate("secret").await;
    assert!(outcome.ok);
    assert!(outcome.error_message.is_none());

    let user = client.current_user().await.unwrap();
    assert_eq!(user.id.as_str(), "u-1");
    assert_eq!(client.session().unwrap().access_token.as_deref(), Some("jwt-1"));
}

#[tokio::test]
async fn first_login_signs_up() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": "invalid_grant",
            "error_description": "Invalid login credentials"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/signup"))
        .and(body_partial_json(serde_json::json!({ "email": DEFAULT_ADMIN_EMAIL })))
        .respond_with(ResponseTemplate::new(200).set_body_json(session_body("jwt-new", "u-new")))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    assert!(client.authenticate("secret").await.ok);
    assert_eq!(client.current_user().await.unwrap().id.as_str(), "u-new");
}

#[tokio::test]
async fn failed_sign_up_reports_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "msg": "Invalid login credentials"
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/signup"))
        .respond_with(ResponseTemplate::new(422).set_body_json(serde_json::json!({
            "msg": "User already registered"
        })))
        .mount(&server)
        .await;

    let client = client(&server);
    let outcome = client.authenticate("wrong-pass").await;
    assert!(!outcome.ok);
    assert_eq!(outcome.error_message.as_deref(), Some("User already registered"));
    assert!(client.current_user().await.is_none());
}

#[tokio::test]
async fn other_login_errors_do_not_sign_up() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
            "msg": "Too many requests"
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/signup"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = client(&server);
    let outcome = client.authenticate("secret").await;
    assert!(!outcome.ok);
    assert_eq!(outcome.error_message.as_deref(), Some("Too many requests"));

    let err = client.try_sign_in("secret").await.unwrap_err();
    assert!(err.is_retryable());
}

#[tokio::test]
async fn short_password_is_rejected_without_requests() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(session_body("jwt-1", "u-1")))
        .expect(0)
        .mount(&server)
        .await;

    let client = client(&server);
    for secret in ["", "abc", "12345", "äöüßé"] {
        let outcome = client.authenticate(secret).await;
        assert!(!outcome.ok, "accepted {secret:?}");
        assert!(outcome.error_message.unwrap().contains("at least 6"));
    }
    assert!(client.current_user().await.is_none());
}

#[tokio::test]
async fn sign_up_without_session_has_no_current_user() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error_description": "Invalid login credentials"
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/signup"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "u-new",
            "email": DEFAULT_ADMIN_EMAIL,
            "confirmation_sent_at": "2026-03-01T10:00:00Z"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    assert!(client.authenticate("secret").await.ok);
    assert!(client.session().unwrap().access_token.is_none());
    assert!(client.current_user().await.is_none());
}

#[tokio::test]
async fn logout_clears_session_even_when_request_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/logout"))
        .and(header("authorization", "Bearer jwt-1"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let client = logged_in(&server).await;
    client.end_session().await;
    assert!(client.current_user().await.is_none());
    assert!(client.session().is_none());
}

// ============================================================================
// Settings
// ============================================================================

#[tokio::test]
async fn settings_load_returns_document() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/user_settings"))
        .and(query_param("select", "settings"))
        .and(query_param("user_id", "eq.u-1"))
        .and(header("authorization", "Bearer jwt-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            { "settings": { "interval_minutes": 30, "sites": ["a.example"] } }
        ])))
        .mount(&server)
        .await;

    let client = logged_in(&server).await;
    let settings = client.load(&UserId::new("u-1")).await.unwrap();
    assert_eq!(settings["interval_minutes"], 30);
}

#[tokio::test]
async fn settings_load_without_row_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/user_settings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&server)
        .await;

    let client = client(&server);
    assert!(client.load(&UserId::new("u-1")).await.is_none());
    assert!(client.try_load_settings(&UserId::new("u-1")).await.unwrap().is_none());
}

#[tokio::test]
async fn settings_load_failure_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/user_settings"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "message": "JWT expired"
        })))
        .mount(&server)
        .await;

    let client = client(&server);
    assert!(client.load(&UserId::new("u-1")).await.is_none());

    let err = client.try_load_settings(&UserId::new("u-1")).await.unwrap_err();
    assert!(matches!(err, CloudError::Api { status: 401, ref message } if message == "JWT expired"));
}

#[tokio::test]
async fn settings_save_upserts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/user_settings"))
        .and(query_param("on_conflict", "user_id"))
        .and(header("prefer", "resolution=merge-duplicates"))
        .and(body_partial_json(serde_json::json!({
            "user_id": "u-1",
            "settings": { "interval_minutes": 15 }
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let settings = serde_json::json!({ "interval_minutes": 15 });
    assert!(client.save(&UserId::new("u-1"), &settings).await);
}

#[tokio::test]
async fn settings_save_failure_is_false() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/user_settings"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = client(&server);
    assert!(!client.save(&UserId::new("u-1"), &serde_json::json!({})).await);
}

// ============================================================================
// Commands and status
// ============================================================================

#[tokio::test]
async fn list_unprocessed_filters_and_orders() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/remote_commands"))
        .and(query_param("user_id", "eq.u-1"))
        .and(query_param("processed", "eq.false"))
        .and(query_param("order", "created_at.asc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            { "id": "c1", "user_id": "u-1", "command": "pause", "created_at": "2026-03-01T10:00:00+00:00", "processed": false },
            { "id": "c2", "user_id": "u-1", "command": "status", "created_at": "2026-03-01T10:01:00+00:00", "processed": false }
        ])))
        .mount(&server)
        .await;

    let client = client(&server);
    let commands = client.list_unprocessed(&UserId::new("u-1")).await;
    assert_eq!(commands.len(), 2);
    assert_eq!(commands[0].id, "c1");
    assert_eq!(commands[0].command, CommandKind::Pause);
    assert_eq!(commands[1].command, CommandKind::Status);
}

#[tokio::test]
async fn list_unprocessed_failure_is_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/remote_commands"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = client(&server);
    assert!(client.list_unprocessed(&UserId::new("u-1")).await.is_empty());
}

#[tokio::test]
async fn mark_processed_patches_by_id() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/remote_commands"))
        .and(query_param("id", "eq.c1"))
        .and(body_partial_json(serde_json::json!({ "processed": true })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    client.mark_processed("c1").await;
}

#[tokio::test]
async fn publish_status_upserts_flat_row() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/bot_status"))
        .and(query_param("on_conflict", "user_id"))
        .and(body_partial_json(serde_json::json!({
            "user_id": "u-1",
            "isPaused": false,
            "queueLength": 3,
            "completedCount": 5,
            "failedCount": 0
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let status = BotStatus {
        queue_length: 3,
        completed_count: 5,
        ..BotStatus::default()
    };
    client.publish_status(&UserId::new("u-1"), &status).await;
}
