//! Delivery counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tabwatch_protocols::{DeliveryKind, DeliveryObserver, SyncError};

#[derive(Debug, Default)]
struct Counter {
    delivered: AtomicU64,
    dropped: AtomicU64,
}

/// Counts delivered and dropped pushes per kind.
#[derive(Debug, Default)]
pub struct DeliveryMetrics {
    events: Counter,
    captures: Counter,
    syncs: Counter,
}

/// Point-in-time copy of [`DeliveryMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryStats {
    pub events_delivered: u64,
    pub events_dropped: u64,
    pub captures_delivered: u64,
    pub captures_dropped: u64,
    pub syncs_delivered: u64,
    pub syncs_dropped: u64,
}

impl DeliveryStats {
    pub fn total_dropped(&self) -> u64 {
        self.events_dropped + self.captures_dropped + self.syncs_dropped
    }
}

impl DeliveryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn counter(&self, kind: DeliveryKind) -> &Counter {
        match kind {
            DeliveryKind::Event => &self.events,
            DeliveryKind::Capture => &self.captures,
            DeliveryKind::Sync => &self.syncs,
        }
    }

    pub fn snapshot(&self) -> DeliveryStats {
        DeliveryStats {
            events_delivered: self.events.delivered.load(Ordering::SeqCst),
            events_dropped: self.events.dropped.load(Ordering::SeqCst),
            captures_delivered: self.captures.delivered.load(Ordering::SeqCst),
            captures_dropped: self.captures.dropped.load(Ordering::SeqCst),
            syncs_delivered: self.syncs.delivered.load(Ordering::SeqCst),
            syncs_dropped: self.syncs.dropped.load(Ordering::SeqCst),
        }
    }
}

impl DeliveryObserver for DeliveryMetrics {
    fn on_delivered(&self, kind: DeliveryKind) {
        self.counter(kind).delivered.fetch_add(1, Ordering::SeqCst);
    }

    fn on_dropped(&self, kind: DeliveryKind, _error: &SyncError) {
        self.counter(kind).dropped.fetch_add(1, Ordering::SeqCst);
    }
}
