//! Tab lifecycle handlers.

use tabwatch_protocols::{
    EventKind, HostTab, LoadStatus, TabChange, TabId, TabRecord, WindowId,
};
use tracing::{debug, info, warn};

use crate::accumulator::accumulated_ms;
use crate::tracker::Tracker;

impl Tracker {
    /// Stop the running timer and push the stopped record as an update.
    async fn stop_and_report(&self) {
        if let Some(previous) = self.timer.stop_timer().await {
            self.relay
                .send_event(EventKind::Updated, previous, self.now())
                .await;
        }
    }

    /// Shared activate sequence: stop previous, upsert, start, report,
    /// schedule a capture.
    async fn activate(&mut self, tab_id: TabId, host_tab: Option<HostTab>) {
        self.stop_and_report().await;

        let record = match host_tab {
            Some(tab) => self.upsert(tab).await,
            None => match self.state.read().await.tab(tab_id).cloned() {
                Some(record) => record,
                None => {
                    warn!("Cannot activate tab {}: unknown to host and tracker", tab_id);
                    return;
                }
            },
        };

        let state = self.timer.start_timer(record.id).await;
        let activated = state.tab(record.id).cloned().unwrap_or(record);
        self.relay
            .send_event(EventKind::Activated, activated, self.now())
            .await;
        self.scheduler.schedule(tab_id);
    }

    pub(crate) async fn on_activated(&mut self, tab_id: TabId, window_id: WindowId) {
        debug!("Tab {} activated in window {}", tab_id, window_id);
        let host_tab = match self.host.get_tab(tab_id).await {
            Ok(tab) => Some(tab),
            Err(e) => {
                warn!("Failed to look up activated tab {}: {}", tab_id, e);
                None
            }
        };
        self.activate(tab_id, host_tab).await;
    }

    pub(crate) async fn on_created(&mut self, tab: HostTab) {
        let record = TabRecord::from_host(&tab, self.now());
        self.put(record.clone()).await;
        debug!("Tab {} created: {}", record.id, record.url);
        self.relay
            .send_event(EventKind::Created, record, self.now())
            .await;
    }

    pub(crate) async fn on_updated(&mut self, tab_id: TabId, change: TabChange, tab: HostTab) {
        let before = self.state.read().await;
        let was_discarded = before.tab(tab_id).is_some_and(|r| r.discarded);
        let is_foreground = before.active_tab_id == Some(tab_id);
        let now_discarded = tab.discarded;

        let record = self.upsert(tab).await;
        if !change.is_meaningful() {
            return;
        }

        let state = self.state.read().await;
        let total = accumulated_ms(&record, &state, self.now());
        self.relay
            .send_event(EventKind::Updated, record.with_active_ms(total), self.now())
            .await;

        let finished_loading = change.status == Some(LoadStatus::Complete);
        let undiscarded = was_discarded && !now_discarded;
        if is_foreground && (finished_loading || undiscarded) {
            debug!("Foreground tab {} reloaded, rescheduling capture", tab_id);
            self.scheduler.schedule(tab_id);
        }
    }

    pub(crate) async fn on_removed(&mut self, tab_id: TabId) {
        if self.state.read().await.tab(tab_id).is_none() {
            return;
        }

        if self.state.read().await.active_tab_id == Some(tab_id) {
            self.timer.stop_timer().await;
        }
        self.scheduler.cancel(tab_id);

        let now = self.now();
        let state = self.state.read().await;
        let Some(record) = state.tab(tab_id) else {
            return;
        };
        let mut closed = record.with_active_ms(accumulated_ms(record, &state, now));
        closed.closed_at = Some(now);
        closed.is_active = false;

        self.state
            .transact(move |mut s| {
                s.tabs.remove(&tab_id);
                if s.active_tab_id == Some(tab_id) {
                    s.active_tab_id = None;
                    s.active_window_id = None;
                    s.active_since = None;
                }
                s
            })
            .await;

        info!(
            "Tab {} closed after {}ms active",
            tab_id, closed.total_active_ms
        );
        self.relay
            .send_event(EventKind::Removed, closed, now)
            .await;
    }

    pub(crate) async fn on_focus_changed(&mut self, window_id: Option<WindowId>) {
        let Some(window_id) = window_id else {
            debug!("Browser lost focus");
            self.stop_and_report().await;
            return;
        };

        let foreground = match self.host.foreground_tab(window_id).await {
            Ok(Some(tab)) => tab,
            Ok(None) => return,
            Err(e) => {
                warn!("Failed to query window {}: {}", window_id, e);
                return;
            }
        };

        if self.state.read().await.active_tab_id == Some(foreground.id) {
            return;
        }
        debug!("Window {} focused, tab {} in front", window_id, foreground.id);
        self.activate(foreground.id, Some(foreground)).await;
    }
}
