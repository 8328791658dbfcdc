use super::*;
use async_trait::async_trait;
use axum::{
    body::{Body, to_bytes},
    http::Request,
};
use serde_json::{Value, json};
use tabwatch_core::{ResyncSummary, TrackerStatus};
use tabwatch_protocols::{CapturePayload, SyncError, SyncRequest, TabEvent};
use tower::ServiceExt;

struct StubTracker {
    active: Option<TabId>,
    running: bool,
    outcome: CaptureOutcome,
}

#[async_trait]
impl TrackerControl for StubTracker {
    async fn status(&self) -> Result<TrackerStatus, RuntimeStopped> {
        if !self.running {
            return Err(RuntimeStopped);
        }
        Ok(TrackerStatus {
            tab_count: 3,
            active_tab_id: self.active,
        })
    }

    async fn capture_active(&self) -> Result<Option<CaptureOutcome>, RuntimeStopped> {
        if !self.running {
            return Err(RuntimeStopped);
        }
        Ok(self.active.map(|_| self.outcome))
    }

    async fn resync(&self) -> Result<ResyncSummary, RuntimeStopped> {
        if !self.running {
            return Err(RuntimeStopped);
        }
        Ok(ResyncSummary {
            total: 3,
            ..Default::default()
        })
    }
}

struct StubPeer {
    alive: bool,
}

#[async_trait]
impl PeerSink for StubPeer {
    async fn post_event(&self, _event: &TabEvent) -> Result<(), SyncError> {
        Ok(())
    }

    async fn post_capture(&self, _payload: &CapturePayload) -> Result<(), SyncError> {
        Ok(())
    }

    async fn post_sync(&self, _request: &SyncRequest) -> Result<(), SyncError> {
        Ok(())
    }

    async fn health(&self) -> bool {
        self.alive
    }
}

const DELIVERED: CaptureOutcome = CaptureOutcome::Sent {
    screenshot: true,
    delivered: true,
};

fn app(active: Option<TabId>, running: bool, alive: bool) -> Router {
    app_with(active, running, alive, DELIVERED)
}

fn app_with(
    active: Option<TabId>,
    running: bool,
    alive: bool,
    outcome: CaptureOutcome,
) -> Router {
    router(Arc::new(ControlState {
        tracker: Arc::new(StubTracker {
            active,
            running,
            outcome,
        }),
        peer: Arc::new(StubPeer { alive }),
        channel: Arc::new(ChannelStats::default()),
        delivery: Arc::new(DeliveryMetrics::new()),
    }))
}

async fn call(app: Router, method: &str, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn test_status_reports_tracker_and_links() {
    let (status, body) = call(app(Some(7), true, true), "GET", "/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["connected"], json!(true));
    assert_eq!(body["commandChannel"], json!(false));
    assert_eq!(body["tabCount"], json!(3));
    assert_eq!(body["activeTabId"], json!(7));
    assert_eq!(body["delivery"]["eventsDropped"], json!(0));
}

#[tokio::test]
async fn test_status_with_unreachable_peer() {
    let (_, body) = call(app(None, true, false), "GET", "/status").await;
    assert_eq!(body["connected"], json!(false));
    assert_eq!(body["activeTabId"], Value::Null);
}

#[tokio::test]
async fn test_capture_active_tab() {
    let (status, body) = call(app(Some(7), true, true), "POST", "/capture").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "ok": true }));
}

#[tokio::test]
async fn test_capture_reports_failed_delivery() {
    let undelivered = CaptureOutcome::Sent {
        screenshot: true,
        delivered: false,
    };
    let (status, body) = call(app_with(Some(7), true, true, undelivered), "POST", "/capture").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "ok": false }));

    let (_, body) = call(
        app_with(Some(7), true, true, CaptureOutcome::Privileged),
        "POST",
        "/capture",
    )
    .await;
    assert_eq!(body, json!({ "ok": false }));
}

#[tokio::test]
async fn test_capture_without_screenshot_still_counts() {
    let text_only = CaptureOutcome::Sent {
        screenshot: false,
        delivered: true,
    };
    let (_, body) = call(app_with(Some(7), true, true, text_only), "POST", "/capture").await;
    assert_eq!(body, json!({ "ok": true }));
}

#[tokio::test]
async fn test_capture_without_active_tab() {
    let (status, body) = call(app(None, true, true), "POST", "/capture").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "error": "No active tab" }));
}

#[tokio::test]
async fn test_resync() {
    let (status, body) = call(app(None, true, true), "POST", "/resync").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "ok": true }));
}

#[tokio::test]
async fn test_stopped_runtime_is_unavailable() {
    for (method, uri) in [("GET", "/status"), ("POST", "/capture"), ("POST", "/resync")] {
        let (status, body) = call(app(Some(1), false, true), method, uri).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE, "{}", uri);
        assert_eq!(body["error"], json!("Tracker runtime is not running"));
    }
}

#[tokio::test]
async fn test_health() {
    let response = app(None, true, true)
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_route() {
    let (status, _) = call(app(None, true, true), "GET", "/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[test]
fn test_action_response_wire_format() {
    let ok: ActionResponse = serde_json::from_str(r#"{"ok":true}"#).unwrap();
    assert_eq!(ok, ActionResponse::ok());
    let failed: ActionResponse = serde_json::from_str(r#"{"ok":false}"#).unwrap();
    assert_eq!(failed, ActionResponse::done(false));
    let err: ActionResponse = serde_json::from_str(r#"{"error":"No active tab"}"#).unwrap();
    assert_eq!(err, ActionResponse::error(NO_ACTIVE_TAB));
    assert_eq!(
        serde_json::to_value(ActionResponse::done(false)).unwrap(),
        json!({ "ok": false })
    );
}
