mod common;

use std::time::Duration;

use common::{api_client, spawn_backend, GOOD_TOKEN, SLOW_REPLY};
use dev_connect::error::GENERIC_NOTICE;
use dev_connect::history::load_history;
use dev_connect::models::Gender;
use dev_connect::{ApiClient, ApiError, AppSession, Backend, Route};

fn client(addr: std::net::SocketAddr, token: Option<&str>) -> ApiClient {
    api_client(addr, token, Duration::from_secs(5))
}

#[tokio::test]
async fn current_user_requires_the_session_cookie() {
    let addr = spawn_backend();

    let user = client(addr, Some(GOOD_TOKEN)).current_user().await.unwrap();
    assert_eq!(user.id, "u2");
    assert_eq!(user.gender, Some(Gender::Female));

    assert_eq!(
        client(addr, Some("stale")).current_user().await,
        Err(ApiError::Unauthorized)
    );
    assert_eq!(client(addr, None).current_user().await, Err(ApiError::Unauthorized));
}

#[tokio::test]
async fn peer_profile_and_missing_peer() {
    let addr = spawn_backend();
    let api = client(addr, Some(GOOD_TOKEN));

    let peer = api.profile("u1").await.unwrap();
    assert_eq!(peer.display_name(), "Linus T");
    assert_eq!(api.profile("ghost").await, Err(ApiError::NotFound));
    assert_eq!(
        client(addr, Some("stale")).profile("u1").await,
        Err(ApiError::Unauthorized)
    );
}

#[tokio::test]
async fn history_keeps_server_order() {
    let addr = spawn_backend();
    let api = client(addr, Some(GOOD_TOKEN));

    let messages = load_history(&api, "u2", "u1").await.unwrap();
    let summary: Vec<_> = messages
        .iter()
        .map(|m| (m.id.as_str(), m.text.as_str(), m.sender_is_self))
        .collect();
    assert_eq!(summary, [("m1", "hi", false), ("m2", "hey", true)]);
}

#[tokio::test]
async fn history_edge_cases() {
    let addr = spawn_backend();
    let api = client(addr, Some(GOOD_TOKEN));

    assert!(api.chat_history("fresh").await.unwrap().is_empty());
    assert!(matches!(api.chat_history("broken").await, Err(ApiError::Decode(_))));
    assert_eq!(api.chat_history("anything").await, Err(ApiError::Status(500)));
}

#[tokio::test]
async fn network_failure_is_generic() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let res = client(addr, Some(GOOD_TOKEN)).chat_history("u1").await;
    assert!(matches!(res, Err(ApiError::Network(_))));
}

#[tokio::test]
async fn stalled_request_times_out_with_the_generic_notice() {
    let addr = spawn_backend();
    let api = api_client(addr, Some(GOOD_TOKEN), Duration::from_millis(200));

    let started = std::time::Instant::now();
    let err = api.chat_history("slow").await.unwrap_err();
    assert!(started.elapsed() < SLOW_REPLY);
    assert!(matches!(err, ApiError::Network(_)));
    assert_eq!(err.notice(), GENERIC_NOTICE);
}

#[tokio::test]
async fn session_restore_and_logout_against_the_server() {
    let addr = spawn_backend();
    let session = AppSession::new();

    let expired = client(addr, Some("stale"));
    assert!(session.restore(&expired).await.is_err());
    assert_eq!(session.route(), Route::Login);

    let api = client(addr, Some(GOOD_TOKEN));
    session.restore(&api).await.unwrap();
    assert_eq!(session.user_id().as_deref(), Some("u2"));
    assert_eq!(session.route(), Route::Feed);

    session.logout(&api).await.unwrap();
    assert!(session.user().is_none());
    assert_eq!(session.route(), Route::Login);
}
