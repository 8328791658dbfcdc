//! Dwell-time capture scheduling.
//!
//! Only one capture is ever outstanding. When the delay elapses the tab id
//! is posted back to the tracker task over the due channel; the tracker then
//! re-checks [`CaptureScheduler::is_due`] before capturing, which filters out
//! a firing that raced with a tab switch.

use std::sync::Arc;
use std::time::Duration;

use tabwatch_protocols::{Clock, TabId};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Pending {
    tab_id: TabId,
    since: i64,
}

pub struct CaptureScheduler {
    threshold: Duration,
    clock: Arc<dyn Clock>,
    pending: Option<Pending>,
    task: Option<JoinHandle<()>>,
    due_tx: mpsc::UnboundedSender<TabId>,
}

impl CaptureScheduler {
    /// Create a scheduler and the receiver its delayed tasks post to.
    pub fn new(
        threshold: Duration,
        clock: Arc<dyn Clock>,
    ) -> (Self, mpsc::UnboundedReceiver<TabId>) {
        let (due_tx, due_rx) = mpsc::unbounded_channel();
        let scheduler = Self {
            threshold,
            clock,
            pending: None,
            task: None,
            due_tx,
        };
        (scheduler, due_rx)
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    /// Tab currently waiting out its dwell threshold.
    pub fn pending_tab(&self) -> Option<TabId> {
        self.pending.map(|p| p.tab_id)
    }

    /// Restart the dwell countdown for `tab_id`, replacing any other.
    pub fn schedule(&mut self, tab_id: TabId) {
        self.abort_task();
        let since = self.clock.now_ms();
        self.pending = Some(Pending { tab_id, since });

        let delay = self.threshold;
        let due_tx = self.due_tx.clone();
        self.task = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = due_tx.send(tab_id);
        }));
        debug!("Capture scheduled for tab {} in {:?}", tab_id, delay);
    }

    /// Whether a non-forced capture of `tab_id` may run now.
    pub fn is_due(&self, tab_id: TabId) -> bool {
        match self.pending {
            Some(p) if p.tab_id == tab_id => {
                let dwelt = self.clock.now_ms() - p.since;
                dwelt >= self.threshold.as_millis() as i64
            }
            _ => false,
        }
    }

    /// Drop the outstanding capture if it targets `tab_id`.
    pub fn cancel(&mut self, tab_id: TabId) -> bool {
        if self.pending_tab() != Some(tab_id) {
            return false;
        }
        self.abort_task();
        self.pending = None;
        trace!("Capture for tab {} cancelled", tab_id);
        true
    }

    fn abort_task(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for CaptureScheduler {
    fn drop(&mut self) {
        self.abort_task();
    }
}
