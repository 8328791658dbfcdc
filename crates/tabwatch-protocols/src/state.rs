//! Tracker state definitions.
//!
//! [`TrackerState`] is the single durable document the tracker owns. Every
//! mutation replaces it wholesale through a [`StateStore`](crate::StateStore)
//! transaction, so the JSON layout here is also the on-disk layout.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::host::HostTab;

/// Stable integer handle the host assigns to a tab.
pub type TabId = i64;

/// Stable integer handle the host assigns to a window.
pub type WindowId = i64;

/// One tracked tab.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabRecord {
    pub id: TabId,
    pub window_id: WindowId,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fav_icon_url: Option<String>,
    /// Epoch ms, set once.
    pub created_at: i64,
    /// Epoch ms of the last activation or deactivation.
    pub last_active_at: i64,
    /// Accumulated foreground time. Never decreases.
    #[serde(default)]
    pub total_active_ms: i64,
    #[serde(default)]
    pub is_active: bool,
    /// Terminal marker, set once when the tab closes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<i64>,
    #[serde(default)]
    pub discarded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_screenshot_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl TabRecord {
    /// Create a fresh record for a tab the tracker has not seen before.
    pub fn from_host(tab: &HostTab, now: i64) -> Self {
        Self {
            id: tab.id,
            window_id: tab.window_id,
            url: tab.url.clone(),
            title: tab.title.clone(),
            fav_icon_url: tab.fav_icon_url.clone(),
            created_at: now,
            last_active_at: now,
            total_active_ms: 0,
            is_active: false,
            closed_at: None,
            discarded: tab.discarded,
            last_screenshot_at: None,
            description: None,
        }
    }

    /// Merge host-reported fields into an existing record.
    ///
    /// Accounting fields (`created_at`, `last_active_at`, `total_active_ms`)
    /// are left untouched.
    pub fn merge_host(&mut self, tab: &HostTab) {
        self.window_id = tab.window_id;
        self.url = tab.url.clone();
        self.title = tab.title.clone();
        self.fav_icon_url = tab.fav_icon_url.clone();
        self.discarded = tab.discarded;
    }

    /// Returns a copy with `total_active_ms` replaced.
    pub fn with_active_ms(&self, total_active_ms: i64) -> Self {
        Self {
            total_active_ms,
            ..self.clone()
        }
    }
}

/// Explicit view of the foreground timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerPhase {
    Idle,
    Running { tab_id: TabId, since: i64 },
}

/// Process-wide tracker state.
///
/// `active_since` is set exactly when `active_tab_id` is set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerState {
    #[serde(default)]
    pub tabs: BTreeMap<TabId, TabRecord>,
    #[serde(default)]
    pub active_tab_id: Option<TabId>,
    #[serde(default)]
    pub active_window_id: Option<WindowId>,
    #[serde(default)]
    pub active_since: Option<i64>,
}

impl TrackerState {
    /// Current timer phase derived from the active fields.
    pub fn timer_phase(&self) -> TimerPhase {
        match (self.active_tab_id, self.active_since) {
            (Some(tab_id), Some(since)) => TimerPhase::Running { tab_id, since },
            _ => TimerPhase::Idle,
        }
    }

    pub fn tab(&self, tab_id: TabId) -> Option<&TabRecord> {
        self.tabs.get(&tab_id)
    }

    /// Insert a record for a host tab or merge into the existing one.
    pub fn upsert_from_host(&mut self, tab: &HostTab, now: i64) -> &TabRecord {
        self.tabs
            .entry(tab.id)
            .and_modify(|record| record.merge_host(tab))
            .or_insert_with(|| TabRecord::from_host(tab, now))
    }

    /// Ids of all live records, in ascending order.
    pub fn tab_ids(&self) -> Vec<TabId> {
        self.tabs.keys().copied().collect()
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
