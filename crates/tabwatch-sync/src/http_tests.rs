use super::*;
use tabwatch_protocols::{EventKind, HostTab, TabRecord};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn record() -> TabRecord {
    TabRecord::from_host(
        &HostTab::new(7, 2, "https://example.com").with_title("Example"),
        1_000,
    )
}

fn peer(server: &MockServer) -> HttpPeer {
    HttpPeer::new(server.uri(), Duration::from_secs(2)).unwrap()
}

#[test]
fn test_base_url_trailing_slash() {
    let peer = HttpPeer::new("http://localhost:21890/", Duration::from_secs(1)).unwrap();
    assert_eq!(peer.base_url(), "http://localhost:21890");
}

#[tokio::test]
async fn test_post_event() {
    let server = MockServer::start().await;
    let event = TabEvent::new(EventKind::Activated, record(), 2_000);

    Mock::given(method("POST"))
        .and(path("/event"))
        .and(header("Content-Type", "application/json"))
        .and(body_json(serde_json::to_value(&event).unwrap()))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    peer(&server).post_event(&event).await.unwrap();
}

#[tokio::test]
async fn test_post_capture_wire_format() {
    let server = MockServer::start().await;
    let payload = CapturePayload {
        tab: record(),
        screenshot_base64: Some("AAAA".to_string()),
        captured_at: 3_000,
    };

    Mock::given(method("POST"))
        .and(path("/capture"))
        .and(body_json(serde_json::json!({
            "tab": serde_json::to_value(record()).unwrap(),
            "screenshotBase64": "AAAA",
            "capturedAt": 3_000
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    peer(&server).post_capture(&payload).await.unwrap();
}

#[tokio::test]
async fn test_post_sync() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/sync"))
        .and(body_json(serde_json::json!({ "tab_ids": [1, 2, 3] })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    peer(&server)
        .post_sync(&SyncRequest {
            tab_ids: vec![1, 2, 3],
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn test_error_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/event"))
        .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
        .mount(&server)
        .await;

    let event = TabEvent::new(EventKind::Created, record(), 1);
    let err = peer(&server).post_event(&event).await.unwrap_err();
    match err {
        SyncError::Status { status, body } => {
            assert_eq!(status, 503);
            assert_eq!(body, "busy");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_unreachable_peer() {
    // Nothing listens on port 9 locally.
    let peer = HttpPeer::new("http://127.0.0.1:9", Duration::from_millis(500)).unwrap();
    let event = TabEvent::new(EventKind::Created, record(), 1);

    assert!(matches!(
        peer.post_event(&event).await,
        Err(SyncError::Connection(_))
    ));
    assert!(!peer.health().await);
}

#[tokio::test]
async fn test_health() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let peer = peer(&server);
    assert!(peer.health().await);
    assert!(!peer.health().await);
}
