//! Session state machine behavior against a mock backend.

use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use poldash::api::{ApiClient, ApiError};
use poldash::auth::{AuthStatus, SessionManager};

async fn manager(server: &MockServer) -> Arc<SessionManager> {
    let client = ApiClient::new(&server.uri()).expect("client should build");
    Arc::new(SessionManager::new(client))
}

#[tokio::test]
async fn login_runs_login_then_verify_and_authenticates() {
    let server = MockServer::start().await;
    let session = manager(&server).await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/session"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"authenticated": true, "user": "alice"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    session
        .login("alice", "hunter2")
        .await
        .expect("login should succeed");

    let state = session.current();
    assert_eq!(state.status, AuthStatus::Authenticated);
    assert_eq!(state.user.as_deref(), Some("alice"));
    assert_eq!(state.identity(), Some("alice"));
    assert!(state.last_error.is_none());
}

#[tokio::test]
async fn login_with_bad_credentials_errors_and_never_verifies() {
    let server = MockServer::start().await;
    let session = manager(&server).await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"error": "invalid credentials"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    // The verification phase must never run after a failed login call
    Mock::given(method("GET"))
        .and(path("/session"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"authenticated": false})))
        .expect(0)
        .mount(&server)
        .await;

    let err = session
        .login("alice", "wrong")
        .await
        .expect_err("login should fail");
    assert!(matches!(err, ApiError::Application { status: 401, .. }));

    let state = session.current();
    assert_eq!(state.status, AuthStatus::Error);
    assert!(state.user.is_none());
    assert_eq!(state.last_error.as_deref(), Some("invalid credentials"));
}

#[tokio::test]
async fn login_errors_when_verification_reports_anonymous() {
    let server = MockServer::start().await;
    let session = manager(&server).await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/session"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"authenticated": false})))
        .expect(1)
        .mount(&server)
        .await;

    let err = session
        .login("alice", "hunter2")
        .await
        .expect_err("login should fail on unverified session");
    assert_eq!(err.to_string(), "session verification failed");

    let state = session.current();
    assert_eq!(state.status, AuthStatus::Error);
    assert!(state.user.is_none());
    assert_eq!(
        state.last_error.as_deref(),
        Some("session verification failed")
    );
}

#[tokio::test]
async fn verify_session_settles_authenticated_or_anonymous() {
    let server = MockServer::start().await;
    let session = manager(&server).await;

    let guard = Mock::given(method("GET"))
        .and(path("/session"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"authenticated": true, "user": "alice"})),
        )
        .mount_as_scoped(&server)
        .await;
    assert!(session.verify_session().await);
    assert_eq!(session.current().status, AuthStatus::Authenticated);
    drop(guard);

    Mock::given(method("GET"))
        .and(path("/session"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"authenticated": false})))
        .mount(&server)
        .await;
    assert!(!session.verify_session().await);

    let state = session.current();
    assert_eq!(state.status, AuthStatus::Anonymous);
    assert!(state.user.is_none());
}

#[tokio::test]
async fn verify_session_transport_failure_lands_anonymous() {
    // Nothing is listening here, so the request fails at the transport level
    let client = ApiClient::new("http://127.0.0.1:1").expect("client should build");
    let session = SessionManager::new(client);

    assert!(!session.verify_session().await);
    assert_eq!(session.current().status, AuthStatus::Anonymous);
}

#[tokio::test]
async fn logout_clears_state_even_when_server_fails() {
    let server = MockServer::start().await;
    let session = manager(&server).await;

    Mock::given(method("GET"))
        .and(path("/session"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"authenticated": true, "user": "alice"})),
        )
        .mount(&server)
        .await;
    assert!(session.verify_session().await);

    Mock::given(method("POST"))
        .and(path("/logout"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    // Never rejects; failure only shows up in the stored message
    session.logout().await;

    let state = session.current();
    assert_eq!(state.status, AuthStatus::Anonymous);
    assert!(state.user.is_none());
    assert_eq!(state.last_error.as_deref(), Some("logout failed"));
}

#[tokio::test]
async fn logout_succeeding_leaves_no_error() {
    let server = MockServer::start().await;
    let session = manager(&server).await;

    Mock::given(method("POST"))
        .and(path("/logout"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    session.logout().await;

    let state = session.current();
    assert_eq!(state.status, AuthStatus::Anonymous);
    assert!(state.last_error.is_none());
}

#[tokio::test]
async fn subscribers_observe_transitions() {
    let server = MockServer::start().await;
    let session = manager(&server).await;
    let mut updates = session.subscribe();

    Mock::given(method("GET"))
        .and(path("/session"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"authenticated": true, "user": "bob"})),
        )
        .mount(&server)
        .await;

    assert!(session.verify_session().await);
    updates.changed().await.expect("state change should arrive");
    assert_eq!(updates.borrow().status, AuthStatus::Authenticated);
}
