//! Full reconciliation with the host's tab list.

use std::collections::BTreeMap;

use serde::Serialize;
use tabwatch_protocols::{EventKind, LoadStatus, TabRecord, is_privileged_url};
use tracing::{debug, info, warn};

use crate::tracker::Tracker;

/// Counters from one resync.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResyncSummary {
    pub total: usize,
    pub created: usize,
    pub updated: usize,
    pub pruned: usize,
}

impl Tracker {
    /// Re-derive local state from the host and tell the peer which tabs
    /// are open.
    ///
    /// The running timer is flushed first. Every open tab is pushed as a
    /// `created` event (the peer upserts), then `/sync` carries the full id
    /// set so the peer can drop anything else. Records for tabs that no
    /// longer exist are dropped locally too.
    pub async fn full_resync(&mut self) -> ResyncSummary {
        let mut summary = ResyncSummary::default();

        let host_tabs = match self.host.list_tabs().await {
            Ok(tabs) => tabs,
            Err(e) => {
                warn!("Resync skipped, cannot list tabs: {}", e);
                return summary;
            }
        };

        self.timer.stop_timer().await;
        let previous = self.state.read().await;
        let now = self.now();

        let mut rebuilt: BTreeMap<_, TabRecord> = BTreeMap::new();
        let mut tab_ids = Vec::new();
        for tab in host_tabs {
            if is_privileged_url(&tab.url) {
                continue;
            }

            let description = if tab.status == LoadStatus::Complete {
                self.describe(tab.id).await
            } else {
                None
            };

            let mut record = match previous.tab(tab.id) {
                Some(existing) => {
                    summary.updated += 1;
                    let mut record = existing.clone();
                    record.merge_host(&tab);
                    record
                }
                None => {
                    summary.created += 1;
                    TabRecord::from_host(&tab, now)
                }
            };
            record.is_active = false;
            if description.is_some() {
                record.description = description;
            }

            tab_ids.push(tab.id);
            self.relay
                .send_event(EventKind::Created, record.clone(), self.now())
                .await;
            rebuilt.insert(tab.id, record);
        }

        summary.total = rebuilt.len();
        summary.pruned = previous
            .tabs
            .keys()
            .filter(|id| !rebuilt.contains_key(*id))
            .count();

        self.relay.send_sync(tab_ids).await;
        self.state
            .transact(move |mut s| {
                s.tabs = rebuilt;
                s.active_tab_id = None;
                s.active_window_id = None;
                s.active_since = None;
                s
            })
            .await;

        self.resume_foreground().await;

        info!(
            "Sync complete: {} new, {} updated, {} pruned, {} total",
            summary.created, summary.updated, summary.pruned, summary.total
        );
        summary
    }

    /// Restart the timer on the focused window's foreground tab.
    async fn resume_foreground(&mut self) {
        let window_id = match self.host.focused_window().await {
            Ok(Some(window_id)) => window_id,
            Ok(None) => {
                debug!("No focused window after resync, timer stays idle");
                return;
            }
            Err(e) => {
                warn!("Failed to query focused window: {}", e);
                return;
            }
        };

        let foreground = match self.host.foreground_tab(window_id).await {
            Ok(Some(tab)) => tab,
            Ok(None) => return,
            Err(e) => {
                warn!("Failed to query window {}: {}", window_id, e);
                return;
            }
        };

        if self.state.read().await.tab(foreground.id).is_none() {
            return;
        }
        self.timer.start_timer(foreground.id).await;
        self.scheduler.schedule(foreground.id);
    }
}

#[cfg(test)]
#[path = "tracker_resync_tests.rs"]
mod tests;
