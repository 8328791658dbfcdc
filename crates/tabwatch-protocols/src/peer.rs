//! Peer (companion app) protocol definitions.
//!
//! Pushes are fire-and-forget: a failed delivery is reported to the
//! [`DeliveryObserver`] and dropped. Consistency is restored by the next
//! full resync, not by redelivery.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SyncError;
use crate::state::{TabId, TabRecord};

/// Lifecycle event type on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Created,
    Updated,
    Activated,
    Removed,
}

/// Body of `POST /event`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub tab: TabRecord,
    pub timestamp: i64,
}

impl TabEvent {
    pub fn new(kind: EventKind, tab: TabRecord, timestamp: i64) -> Self {
        Self {
            kind,
            tab,
            timestamp,
        }
    }
}

/// Body of `POST /capture`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturePayload {
    pub tab: TabRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot_base64: Option<String>,
    pub captured_at: i64,
}

/// Body of `POST /sync`: the authoritative set of open tab ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRequest {
    pub tab_ids: Vec<TabId>,
}

/// Push channel to the companion app.
#[async_trait]
pub trait PeerSink: Send + Sync {
    async fn post_event(&self, event: &TabEvent) -> Result<(), SyncError>;

    async fn post_capture(&self, payload: &CapturePayload) -> Result<(), SyncError>;

    async fn post_sync(&self, request: &SyncRequest) -> Result<(), SyncError>;

    /// Liveness probe. Never errors; an unreachable peer is simply not alive.
    async fn health(&self) -> bool;
}

/// Which push a delivery outcome refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeliveryKind {
    Event,
    Capture,
    Sync,
}

impl DeliveryKind {
    pub fn path(&self) -> &'static str {
        match self {
            DeliveryKind::Event => "/event",
            DeliveryKind::Capture => "/capture",
            DeliveryKind::Sync => "/sync",
        }
    }
}

/// Hook notified about every push outcome.
pub trait DeliveryObserver: Send + Sync {
    fn on_delivered(&self, kind: DeliveryKind);

    fn on_dropped(&self, kind: DeliveryKind, error: &SyncError);
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl DeliveryObserver for NoopObserver {
    fn on_delivered(&self, _kind: DeliveryKind) {}

    fn on_dropped(&self, _kind: DeliveryKind, _error: &SyncError) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::HostTab;

    fn record() -> TabRecord {
        TabRecord::from_host(&HostTab::new(5, 1, "https://example.com"), 1_000)
    }

    #[test]
    fn test_event_wire_format() {
        let event = TabEvent::new(EventKind::Activated, record(), 2_000);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "activated");
        assert_eq!(json["timestamp"], 2_000);
        assert_eq!(json["tab"]["id"], 5);
    }

    #[test]
    fn test_capture_omits_missing_screenshot() {
        let payload = CapturePayload {
            tab: record(),
            screenshot_base64: None,
            captured_at: 3_000,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert!(json.get("screenshotBase64").is_none());
        assert_eq!(json["capturedAt"], 3_000);
    }

    #[test]
    fn test_sync_request_uses_snake_case() {
        let json = serde_json::to_string(&SyncRequest { tab_ids: vec![1, 2] }).unwrap();
        assert_eq!(json, r#"{"tab_ids":[1,2]}"#);
    }

    #[test]
    fn test_delivery_paths() {
        assert_eq!(DeliveryKind::Event.path(), "/event");
        assert_eq!(DeliveryKind::Capture.path(), "/capture");
        assert_eq!(DeliveryKind::Sync.path(), "/sync");
    }
}
