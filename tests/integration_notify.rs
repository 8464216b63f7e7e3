//! Integration tests for notification delivery over real HTTP.
//!
//! Uses wiremock to simulate the self-hosted services. The blocking
//! transport runs on `spawn_blocking` so it never touches the async runtime.

use std::sync::Arc;
use std::time::Duration;

use herald::{Asset, Dispatcher, NotifyType, Registry, ReqwestTransport, Transport};
use wiremock::matchers::{
    body_partial_json, body_string_contains, header, header_exists, method, path, query_param,
};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MATTERMOST_TOKEN: &str = "3ccdd113474722377935511fc85d3dd4";

/// Host and port of the mock server, as used inside identifiers.
fn authority(server: &MockServer) -> String {
    server.address().to_string()
}

/// Build a dispatcher for `identifiers` and send one notification.
///
/// Returns how many notifiers were usable and the overall outcome.
async fn dispatch(
    identifiers: Vec<String>,
    title: &'static str,
    body: &'static str,
    notify_type: NotifyType,
) -> (usize, bool) {
    tokio::task::spawn_blocking(move || {
        let transport: Arc<dyn Transport> = Arc::new(
            ReqwestTransport::new(Duration::from_secs(5), "herald-test").expect("client"),
        );
        let registry = Registry::new(transport).with_throttle_interval(Duration::ZERO);
        let mut dispatcher = Dispatcher::new(registry, Arc::new(Asset::disabled()));
        for identifier in &identifiers {
            dispatcher.add(identifier);
        }
        let usable = dispatcher.len();
        (usable, dispatcher.notify(title, body, notify_type))
    })
    .await
    .expect("dispatch task panicked")
}

// ============================================================================
// JSON / XML
// ============================================================================

#[tokio::test]
async fn json_posts_document_with_auth_and_headers() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/hook"))
        .and(header_exists("authorization"))
        .and(header("x-team", "ops"))
        .and(body_partial_json(serde_json::json!({
            "version": "1.0",
            "title": "Backup",
            "message": "nightly backup finished",
            "type": "success"
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let identifier = format!("json://user:pass@{}/hook?+X-Team=ops", authority(&server));
    let (usable, ok) = dispatch(
        vec![identifier],
        "Backup",
        "nightly backup finished",
        NotifyType::Success,
    )
    .await;

    assert_eq!(usable, 1);
    assert!(ok);
}

#[tokio::test]
async fn xml_posts_soap_envelope() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/"))
        .and(body_string_contains("<Subject>Disk</Subject>"))
        .and(body_string_contains("<MessageType>warning</MessageType>"))
        .and(body_string_contains("<Message>90% &amp; rising</Message>"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let identifier = format!("xml://{}", authority(&server));
    let (_, ok) = dispatch(vec![identifier], "Disk", "90% & rising", NotifyType::Warning).await;
    assert!(ok);
}

#[tokio::test]
async fn server_error_is_reported_as_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let identifier = format!("json://{}/hook", authority(&server));
    let (usable, ok) = dispatch(vec![identifier], "t", "b", NotifyType::Info).await;
    assert_eq!(usable, 1);
    assert!(!ok);
}

#[tokio::test]
async fn unreachable_host_fails_without_panicking() {
    // Port 9 (discard) is closed on test machines
    let (usable, ok) = dispatch(
        vec!["json://127.0.0.1:9/hook".to_string()],
        "t",
        "b",
        NotifyType::Info,
    )
    .await;
    assert_eq!(usable, 1);
    assert!(!ok);
}

// ============================================================================
// Mattermost / Kodi / Pushjet
// ============================================================================

#[tokio::test]
async fn mattermost_posts_to_incoming_hook() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("/hooks/{}", MATTERMOST_TOKEN)))
        .and(body_partial_json(serde_json::json!({
            "text": "###### Deploy\nversion 2 is live",
            "username": "bot",
            "channel": "releases"
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let identifier = format!(
        "mmost://bot@{}/{}?channel=releases",
        authority(&server),
        MATTERMOST_TOKEN
    );
    let (_, ok) = dispatch(vec![identifier], "Deploy", "version 2 is live", NotifyType::Info).await;
    assert!(ok);
}

#[tokio::test]
async fn kodi_calls_show_notification() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/jsonrpc"))
        .and(body_partial_json(serde_json::json!({
            "jsonrpc": "2.0",
            "method": "GUI.ShowNotification",
            "params": {"title": "Doorbell", "message": "front door", "image": "error"}
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let identifier = format!("kodi://{}", authority(&server));
    let (_, ok) = dispatch(vec![identifier], "Doorbell", "front door", NotifyType::Failure).await;
    assert!(ok);
}

#[tokio::test]
async fn pushjet_posts_form_with_secret() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/message"))
        .and(query_param("secret", "s3cr3t"))
        .and(body_string_contains("level=5"))
        .and(body_string_contains("title=Job"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let identifier = format!("pjet://s3cr3t@{}", authority(&server));
    let (_, ok) = dispatch(vec![identifier], "Job", "failed", NotifyType::Failure).await;
    assert!(ok);
}

// ============================================================================
// Rocket.Chat session
// ============================================================================

#[tokio::test]
async fn rocketchat_logs_in_posts_and_logs_out() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/login"))
        .and(body_string_contains("username=bot"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "success",
            "data": {"authToken": "tok-1", "userId": "uid-1"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v1/chat.postMessage"))
        .and(header("x-auth-token", "tok-1"))
        .and(header("x-user-id", "uid-1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v1/logout"))
        .and(header("x-auth-token", "tok-1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let identifier = format!("rocket://bot:pw@{}/#ops/ROOM42", authority(&server));
    let (_, ok) = dispatch(vec![identifier], "Alert", "cpu hot", NotifyType::Warning).await;
    assert!(ok);
}

#[tokio::test]
async fn rocketchat_rejected_login_sends_nothing() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/login"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v1/chat.postMessage"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let identifier = format!("rocket://bot:wrong@{}/#ops", authority(&server));
    let (_, ok) = dispatch(vec![identifier], "Alert", "cpu hot", NotifyType::Warning).await;
    assert!(!ok);
}

// ============================================================================
// Fan-out
// ============================================================================

#[tokio::test]
async fn partial_failure_still_reaches_every_service() {
    let good = MockServer::start().await;
    let bad = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&good)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&bad)
        .await;

    let identifiers = vec![
        format!("json://{}/a", authority(&good)),
        format!("json://{}/b", authority(&bad)),
        format!("xml://{}/c", authority(&good)),
        "nosuch://ignored".to_string(),
    ];
    let (usable, ok) = dispatch(identifiers, "t", "b", NotifyType::Info).await;

    assert_eq!(usable, 3);
    assert!(!ok);
}
