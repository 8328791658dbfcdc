//! The tracker: one owner for state, timer and capture scheduling.
//!
//! Behavior is split across sibling modules:
//! - `tracker_lifecycle` - create/update/activate/remove/focus handlers
//! - `tracker_capture` - dwell captures, forced captures, refresh-all sweep
//! - `tracker_resync` - full reconciliation with the host tab list

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tabwatch_protocols::{
    Clock, CommandAck, HostTab, PeerCommand, StateStore, TabHost, TabId, TabRecord, TabSignal,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::accumulator::TimeAccumulator;
use crate::relay::PeerRelay;
use crate::scheduler::CaptureScheduler;
use crate::store::StateHandle;

/// Tracker tuning.
#[derive(Debug, Clone)]
pub struct TrackerSettings {
    pub dwell_threshold: Duration,
    pub description_max_words: usize,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            dwell_threshold: Duration::from_millis(3000),
            description_max_words: 8000,
        }
    }
}

/// Snapshot for status queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerStatus {
    pub tab_count: usize,
    pub active_tab_id: Option<TabId>,
}

pub struct Tracker {
    pub(crate) state: StateHandle,
    pub(crate) timer: TimeAccumulator,
    pub(crate) scheduler: CaptureScheduler,
    pub(crate) host: Arc<dyn TabHost>,
    pub(crate) relay: PeerRelay,
    pub(crate) settings: TrackerSettings,
}

impl Tracker {
    /// Build a tracker. The returned receiver yields tab ids whose dwell
    /// threshold elapsed; feed them to [`Tracker::on_capture_due`].
    pub fn new(
        store: Arc<dyn StateStore>,
        host: Arc<dyn TabHost>,
        relay: PeerRelay,
        clock: Arc<dyn Clock>,
        settings: TrackerSettings,
    ) -> (Self, mpsc::UnboundedReceiver<TabId>) {
        let state = StateHandle::new(store);
        let timer = TimeAccumulator::new(state.clone(), clock.clone());
        let (scheduler, due_rx) = CaptureScheduler::new(settings.dwell_threshold, clock);
        let tracker = Self {
            state,
            timer,
            scheduler,
            host,
            relay,
            settings,
        };
        (tracker, due_rx)
    }

    /// Route a host signal to its handler.
    pub async fn dispatch(&mut self, signal: TabSignal) {
        debug!("Dispatching {} signal", signal.name());
        match signal {
            TabSignal::Created(tab) => self.on_created(tab).await,
            TabSignal::Updated { tab_id, change, tab } => {
                self.on_updated(tab_id, change, tab).await
            }
            TabSignal::Activated { tab_id, window_id } => {
                self.on_activated(tab_id, window_id).await
            }
            TabSignal::Removed { tab_id } => self.on_removed(tab_id).await,
            TabSignal::FocusChanged { window_id } => self.on_focus_changed(window_id).await,
        }
    }

    /// Run a command received from the peer.
    pub async fn execute(&mut self, command: PeerCommand) -> CommandAck {
        match command {
            PeerCommand::RefreshAll => {
                self.refresh_all().await;
                CommandAck::RefreshAllDone
            }
            PeerCommand::CloseTab(tab_id) => match self.host.close_tab(tab_id).await {
                Ok(()) => {
                    info!("Closed tab {} on peer request", tab_id);
                    CommandAck::CloseTabDone(tab_id)
                }
                Err(e) => {
                    warn!("Failed to close tab {}: {}", tab_id, e);
                    CommandAck::CloseTabError(tab_id)
                }
            },
        }
    }

    /// Forget a timer restored from a previous run.
    ///
    /// Must run before the first flush or resync, which would otherwise
    /// credit the whole downtime to the restored tab.
    pub async fn recover(&self) {
        if let Some(tab_id) = self.timer.discard_stale().await {
            info!("Dropped unflushed time for tab {} from previous run", tab_id);
        }
    }

    /// Periodic active-time flush.
    pub async fn flush(&self) {
        self.timer.sync_tick().await;
    }

    pub async fn status(&self) -> TrackerStatus {
        let state = self.state.read().await;
        TrackerStatus {
            tab_count: state.tabs.len(),
            active_tab_id: state.active_tab_id,
        }
    }

    pub fn state(&self) -> &StateHandle {
        &self.state
    }

    pub fn scheduler(&self) -> &CaptureScheduler {
        &self.scheduler
    }

    pub(crate) fn now(&self) -> i64 {
        self.timer.now()
    }

    /// Insert or merge a host tab and return the stored record.
    pub(crate) async fn upsert(&self, tab: HostTab) -> TabRecord {
        let now = self.now();
        let record = self
            .state
            .read()
            .await
            .upsert_from_host(&tab, now)
            .clone();
        self.put(record.clone()).await;
        record
    }

    /// Replace a record wholesale.
    ///
    /// The timer's window follows the record when the tab holds the timer.
    pub(crate) async fn put(&self, record: TabRecord) {
        self.state
            .transact(move |mut s| {
                if s.active_tab_id == Some(record.id) {
                    s.active_window_id = Some(record.window_id);
                }
                s.tabs.insert(record.id, record);
                s
            })
            .await;
    }
}

#[cfg(test)]
#[path = "tracker_tests.rs"]
mod tests;
