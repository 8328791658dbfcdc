//! Active-time accounting.
//!
//! The timer is the pair (`active_tab_id`, `active_since`) inside
//! [`TrackerState`], viewed as a [`TimerPhase`]. Transitions are pure
//! functions of `(state, now)`; [`TimeAccumulator`] runs each one as a
//! single store transaction.

use std::sync::Arc;

use tabwatch_protocols::{Clock, TabId, TabRecord, TimerPhase, TrackerState};
use tracing::{debug, trace};

use crate::store::StateHandle;

fn elapsed(since: i64, now: i64) -> i64 {
    (now - since).max(0)
}

/// Stop the running timer, folding elapsed time into its record.
///
/// Returns the updated record, or `None` when no timer was running. The
/// active fields are cleared together so `active_since` is set iff
/// `active_tab_id` is.
pub fn stop_timer(mut state: TrackerState, now: i64) -> (TrackerState, Option<TabRecord>) {
    let TimerPhase::Running { tab_id, since } = state.timer_phase() else {
        state.active_tab_id = None;
        state.active_window_id = None;
        state.active_since = None;
        return (state, None);
    };

    state.active_tab_id = None;
    state.active_window_id = None;
    state.active_since = None;

    let stopped = state.tabs.get_mut(&tab_id).map(|record| {
        record.total_active_ms += elapsed(since, now);
        record.is_active = false;
        record.last_active_at = now;
        record.clone()
    });
    (state, stopped)
}

/// Start the timer on `tab_id`. No-op when the tab has no record.
///
/// A timer still running for any tab is stopped first, in the same
/// transition, so foreground intervals never overlap.
pub fn start_timer(state: TrackerState, tab_id: TabId, now: i64) -> TrackerState {
    if !state.tabs.contains_key(&tab_id) {
        return state;
    }

    let (mut state, _) = stop_timer(state, now);
    if let Some(record) = state.tabs.get_mut(&tab_id) {
        record.is_active = true;
        record.last_active_at = now;
        state.active_window_id = Some(record.window_id);
        state.active_tab_id = Some(tab_id);
        state.active_since = Some(now);
    }
    state
}

/// Fold elapsed time into the running tab without stopping it.
pub fn flush_timer(mut state: TrackerState, now: i64) -> TrackerState {
    let TimerPhase::Running { tab_id, since } = state.timer_phase() else {
        return state;
    };

    if let Some(record) = state.tabs.get_mut(&tab_id) {
        record.total_active_ms += elapsed(since, now);
        record.last_active_at = now;
        state.active_since = Some(now);
    }
    state
}

/// Drop a timer left running by an earlier process without crediting it.
///
/// Only time already flushed counts; the interval since the last flush is
/// lost. Returns the tab that held the timer.
pub fn discard_timer(mut state: TrackerState) -> (TrackerState, Option<TabId>) {
    let TimerPhase::Running { tab_id, .. } = state.timer_phase() else {
        return (state, None);
    };

    state.active_tab_id = None;
    state.active_window_id = None;
    state.active_since = None;
    if let Some(record) = state.tabs.get_mut(&tab_id) {
        record.is_active = false;
    }
    (state, Some(tab_id))
}

/// Up-to-the-moment active time for `record` without mutating anything.
pub fn accumulated_ms(record: &TabRecord, state: &TrackerState, now: i64) -> i64 {
    match state.timer_phase() {
        TimerPhase::Running { tab_id, since } if tab_id == record.id => {
            record.total_active_ms + elapsed(since, now)
        }
        _ => record.total_active_ms,
    }
}

/// Runs timer transitions against the store.
#[derive(Clone)]
pub struct TimeAccumulator {
    state: StateHandle,
    clock: Arc<dyn Clock>,
}

impl TimeAccumulator {
    pub fn new(state: StateHandle, clock: Arc<dyn Clock>) -> Self {
        Self { state, clock }
    }

    pub fn now(&self) -> i64 {
        self.clock.now_ms()
    }

    /// Start timing `tab_id` and return the resulting state.
    pub async fn start_timer(&self, tab_id: TabId) -> TrackerState {
        let now = self.now();
        let state = self.state.transact(move |s| start_timer(s, tab_id, now)).await;
        debug!("Timer started for tab {} at {}", tab_id, now);
        state
    }

    /// Stop the running timer. Idempotent.
    pub async fn stop_timer(&self) -> Option<TabRecord> {
        let TimerPhase::Running { tab_id, .. } = self.state.read().await.timer_phase() else {
            return None;
        };

        let now = self.now();
        let state = self.state.transact(move |s| stop_timer(s, now).0).await;
        let record = state.tab(tab_id).cloned();
        if let Some(record) = &record {
            debug!(
                "Timer stopped for tab {} (total {}ms)",
                tab_id, record.total_active_ms
            );
        }
        record
    }

    /// Periodic flush of the running timer.
    pub async fn sync_tick(&self) {
        let now = self.now();
        let state = self.state.transact(move |s| flush_timer(s, now)).await;
        if let TimerPhase::Running { tab_id, .. } = state.timer_phase() {
            trace!("Flushed active time for tab {}", tab_id);
        }
    }

    /// Clear a timer restored from durable state. See [`discard_timer`].
    pub async fn discard_stale(&self) -> Option<TabId> {
        let TimerPhase::Running { tab_id, since } = self.state.read().await.timer_phase() else {
            return None;
        };
        self.state.transact(|s| discard_timer(s).0).await;
        debug!("Discarded stale timer for tab {} (since {})", tab_id, since);
        Some(tab_id)
    }

    /// Projection of `record`'s active time at this instant.
    pub fn accumulated_ms(&self, record: &TabRecord, state: &TrackerState) -> i64 {
        accumulated_ms(record, state, self.now())
    }
}

#[cfg(test)]
#[path = "accumulator_tests.rs"]
mod tests;
