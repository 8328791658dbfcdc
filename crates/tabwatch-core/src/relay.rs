//! Fire-and-forget delivery to the peer.

use std::sync::Arc;

use tabwatch_protocols::{
    CapturePayload, DeliveryKind, DeliveryObserver, EventKind, PeerSink, SyncError, SyncRequest,
    TabEvent, TabId, TabRecord,
};
use tracing::{debug, warn};

/// Pushes events to the peer and swallows failures.
///
/// Every outcome is reported to the observer; nothing is retried.
#[derive(Clone)]
pub struct PeerRelay {
    sink: Arc<dyn PeerSink>,
    observer: Arc<dyn DeliveryObserver>,
}

impl PeerRelay {
    pub fn new(sink: Arc<dyn PeerSink>, observer: Arc<dyn DeliveryObserver>) -> Self {
        Self { sink, observer }
    }

    fn report(&self, kind: DeliveryKind, result: Result<(), SyncError>) -> bool {
        match result {
            Ok(()) => {
                self.observer.on_delivered(kind);
                true
            }
            Err(e) => {
                warn!("Dropped {} push: {}", kind.path(), e);
                self.observer.on_dropped(kind, &e);
                false
            }
        }
    }

    /// Push a lifecycle event. Returns whether the peer accepted it.
    pub async fn send_event(&self, kind: EventKind, tab: TabRecord, timestamp: i64) -> bool {
        let event = TabEvent::new(kind, tab, timestamp);
        debug!("Pushing {:?} event for tab {}", kind, event.tab.id);
        let result = self.sink.post_event(&event).await;
        self.report(DeliveryKind::Event, result)
    }

    pub async fn send_capture(&self, payload: &CapturePayload) -> bool {
        debug!(
            "Pushing capture for tab {} (screenshot: {})",
            payload.tab.id,
            payload.screenshot_base64.is_some()
        );
        let result = self.sink.post_capture(payload).await;
        self.report(DeliveryKind::Capture, result)
    }

    pub async fn send_sync(&self, tab_ids: Vec<TabId>) -> bool {
        let request = SyncRequest { tab_ids };
        debug!("Pushing sync with {} tab ids", request.tab_ids.len());
        let result = self.sink.post_sync(&request).await;
        self.report(DeliveryKind::Sync, result)
    }

    pub async fn peer_alive(&self) -> bool {
        self.sink.health().await
    }
}
