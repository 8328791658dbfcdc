//! Capture orchestration: dwell captures, forced captures and the
//! refresh-all sweep.

use std::collections::HashSet;

use serde::Serialize;
use tabwatch_protocols::{
    CapturePayload, EventKind, TabId, WindowKind, is_privileged_url, strip_data_url_prefix,
    truncate_words,
};
use tracing::{debug, info, trace, warn};

use crate::accumulator::accumulated_ms;
use crate::tracker::Tracker;

/// Result of a single capture attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// No record for the tab.
    Untracked,
    /// Dwell threshold not met, or the user moved on.
    NotDue,
    /// Internal browser page; nothing to capture.
    Privileged,
    /// A payload was built and pushed.
    Sent { screenshot: bool, delivered: bool },
}

impl CaptureOutcome {
    /// Pushed successfully with a screenshot.
    pub fn is_full_capture(&self) -> bool {
        matches!(
            self,
            CaptureOutcome::Sent {
                screenshot: true,
                delivered: true
            }
        )
    }
}

/// Counters from one refresh-all sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RefreshSummary {
    pub captured: usize,
    pub synced: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl Tracker {
    /// Best-effort text description, truncated to the configured limit.
    pub(crate) async fn describe(&self, tab_id: TabId) -> Option<String> {
        match self.host.extract_description(tab_id).await {
            Ok(text) if !text.trim().is_empty() => {
                Some(truncate_words(&text, self.settings.description_max_words))
            }
            Ok(_) => None,
            Err(e) => {
                debug!("No description for tab {}: {}", tab_id, e);
                None
            }
        }
    }

    /// Best-effort screenshot. Only the visible tab of a window can be
    /// captured, so anything else yields `None`.
    async fn screenshot(&self, tab_id: TabId) -> Option<String> {
        let tab = match self.host.get_tab(tab_id).await {
            Ok(tab) => tab,
            Err(e) => {
                debug!("Tab {} gone before screenshot: {}", tab_id, e);
                return None;
            }
        };
        if !tab.active || tab.discarded || is_privileged_url(&tab.url) {
            return None;
        }
        match self.host.capture_visible(tab.window_id).await {
            Ok(data) => Some(strip_data_url_prefix(&data).to_string()),
            Err(e) => {
                debug!("Screenshot of tab {} failed: {}", tab_id, e);
                None
            }
        }
    }

    /// Capture a tab and push the payload.
    ///
    /// Unless `forced`, the tab must still be the pending one and have been
    /// in front for at least the dwell threshold.
    pub async fn capture_and_send(&self, tab_id: TabId, forced: bool) -> CaptureOutcome {
        let Some(record) = self.state.read().await.tab(tab_id).cloned() else {
            return CaptureOutcome::Untracked;
        };
        if !forced && !self.scheduler.is_due(tab_id) {
            return CaptureOutcome::NotDue;
        }
        if is_privileged_url(&record.url) {
            trace!("Skipping capture of privileged tab {}", tab_id);
            return CaptureOutcome::Privileged;
        }

        let description = self.describe(tab_id).await;
        let screenshot = self.screenshot(tab_id).await;

        let now = self.now();
        let state = self.state.read().await;
        let current = state.tab(tab_id).cloned().unwrap_or(record);
        let mut tab = current.with_active_ms(accumulated_ms(&current, &state, now));
        tab.last_active_at = now;
        if description.is_some() {
            tab.description = description.clone();
        }

        let payload = CapturePayload {
            tab,
            screenshot_base64: screenshot,
            captured_at: now,
        };
        let delivered = self.relay.send_capture(&payload).await;
        let has_screenshot = payload.screenshot_base64.is_some();

        let mark_screenshot = delivered && has_screenshot;
        if description.is_some() || mark_screenshot {
            self.state
                .transact(move |mut s| {
                    if let Some(record) = s.tabs.get_mut(&tab_id) {
                        if description.is_some() {
                            record.description = description;
                        }
                        if mark_screenshot {
                            record.last_screenshot_at = Some(now);
                        }
                    }
                    s
                })
                .await;
        }

        debug!(
            "Captured tab {} (screenshot: {}, delivered: {})",
            tab_id, has_screenshot, delivered
        );
        CaptureOutcome::Sent {
            screenshot: has_screenshot,
            delivered,
        }
    }

    /// Handle a dwell timer firing.
    pub async fn on_capture_due(&self, tab_id: TabId) -> CaptureOutcome {
        if self.scheduler.pending_tab() != Some(tab_id) {
            trace!("Stale capture notice for tab {}", tab_id);
            return CaptureOutcome::NotDue;
        }
        self.capture_and_send(tab_id, false).await
    }

    /// Forced capture of the current foreground tab.
    ///
    /// Cancels a pending dwell capture for the same tab so the peer gets a
    /// single capture.
    pub async fn capture_active(&mut self) -> Option<CaptureOutcome> {
        let tab_id = self.state.read().await.active_tab_id?;
        self.scheduler.cancel(tab_id);
        Some(self.capture_and_send(tab_id, true).await)
    }

    /// Capture every window's foreground tab and push metadata for the rest.
    ///
    /// Per-tab failures are counted and never abort the sweep.
    pub async fn refresh_all(&mut self) -> RefreshSummary {
        let mut summary = RefreshSummary::default();
        let windows = match self.host.list_windows().await {
            Ok(windows) => windows,
            Err(e) => {
                warn!("Refresh aborted, cannot list windows: {}", e);
                summary.failed += 1;
                return summary;
            }
        };

        let mut attempted: HashSet<TabId> = HashSet::new();
        for window in windows.iter().filter(|w| w.kind == WindowKind::Normal) {
            let Some(foreground) = window.foreground() else {
                continue;
            };
            if is_privileged_url(&foreground.url) || foreground.discarded {
                summary.skipped += 1;
                continue;
            }

            let tab_id = foreground.id;
            self.scheduler.cancel(tab_id);
            self.upsert(foreground.clone()).await;
            attempted.insert(tab_id);

            let outcome = self.capture_and_send(tab_id, true).await;
            if outcome.is_full_capture() {
                summary.captured += 1;
            } else {
                debug!("Refresh capture of tab {} incomplete: {:?}", tab_id, outcome);
                summary.failed += 1;
            }
        }

        let tabs = match self.host.list_tabs().await {
            Ok(tabs) => tabs,
            Err(e) => {
                warn!("Refresh metadata pass skipped: {}", e);
                summary.failed += 1;
                Vec::new()
            }
        };
        for tab in tabs {
            if attempted.contains(&tab.id) || is_privileged_url(&tab.url) {
                continue;
            }
            let record = self.upsert(tab).await;
            let state = self.state.read().await;
            let total = accumulated_ms(&record, &state, self.now());
            self.relay
                .send_event(EventKind::Updated, record.with_active_ms(total), self.now())
                .await;
            summary.synced += 1;
        }

        info!(
            "Refresh complete: {} screenshots, {} tabs synced, {} failed, {} skipped",
            summary.captured, summary.synced, summary.failed, summary.skipped
        );
        summary
    }
}

#[cfg(test)]
#[path = "tracker_capture_tests.rs"]
mod tests;
