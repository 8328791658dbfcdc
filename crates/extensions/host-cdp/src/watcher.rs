//! Polls the browser and turns successive snapshots into tab signals.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tabwatch_protocols::{HostError, HostTab, HostWindow, LoadStatus, TabChange, TabSignal};
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::snapshot::HostSnapshot;

/// Anything that can produce a [`HostSnapshot`].
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn snapshot(&self) -> Result<HostSnapshot, HostError>;
}

/// Signals that turn `prev` into `next`.
///
/// Order: removals, creations, updates, foreground changes, then focus.
/// A tab that moved windows yields an update with no changed fields so the
/// record picks up its new window silently.
pub fn diff(prev: &HostSnapshot, next: &HostSnapshot) -> Vec<TabSignal> {
    let mut signals = Vec::new();

    for tab in prev.tabs() {
        if next.tab(tab.id).is_none() {
            signals.push(TabSignal::Removed { tab_id: tab.id });
        }
    }

    for tab in next.tabs() {
        let Some(old) = prev.tab(tab.id) else {
            signals.push(TabSignal::Created(tab.clone()));
            continue;
        };
        let change = changes(old, tab);
        if change.is_meaningful() || old.window_id != tab.window_id {
            signals.push(TabSignal::Updated {
                tab_id: tab.id,
                change,
                tab: tab.clone(),
            });
        }
    }

    for window in &next.windows {
        let Some(foreground) = window.foreground() else {
            continue;
        };
        let before = prev
            .window(window.id)
            .and_then(HostWindow::foreground)
            .map(|t| t.id);
        if before != Some(foreground.id) {
            signals.push(TabSignal::Activated {
                tab_id: foreground.id,
                window_id: window.id,
            });
        }
    }

    if prev.focused != next.focused {
        signals.push(TabSignal::FocusChanged {
            window_id: next.focused,
        });
    }

    signals
}

fn changes(old: &HostTab, new: &HostTab) -> TabChange {
    let navigated = old.url != new.url;
    TabChange {
        // Listings only show settled pages, so a new url is a finished load.
        status: navigated.then_some(LoadStatus::Complete),
        url: navigated.then(|| new.url.clone()),
        title: (old.title != new.title).then(|| new.title.clone()),
        fav_icon_url: if old.fav_icon_url != new.fav_icon_url {
            new.fav_icon_url.clone()
        } else {
            None
        },
        discarded: (old.discarded != new.discarded).then_some(new.discarded),
    }
}

/// Poll loop feeding [`TabSignal`]s to the tracker.
pub struct TabWatcher {
    source: Arc<dyn SnapshotSource>,
    interval: Duration,
}

impl TabWatcher {
    pub fn new(source: Arc<dyn SnapshotSource>, interval: Duration) -> Self {
        Self { source, interval }
    }

    /// Poll until shutdown, or until `emit` returns `false`.
    ///
    /// The first successful snapshot is the baseline and emits nothing.
    /// Failed polls are skipped and the last good snapshot is kept.
    pub async fn run<F>(self, mut emit: F, mut shutdown: broadcast::Receiver<()>)
    where
        F: FnMut(TabSignal) -> bool + Send,
    {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut previous: Option<HostSnapshot> = None;
        let mut available = true;

        info!("Tab watcher polling every {:?}", self.interval);
        loop {
            tokio::select! {
                _ = shutdown.recv() => break,
                _ = ticker.tick() => {}
            }

            let next = match self.source.snapshot().await {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    if available {
                        warn!("Browser unavailable: {}", e);
                        available = false;
                    }
                    continue;
                }
            };
            if !available {
                info!("Browser available again");
                available = true;
            }

            match &previous {
                Some(prev) => {
                    for signal in diff(prev, &next) {
                        debug!("Host signal: {}", signal.name());
                        if !emit(signal) {
                            info!("Signal receiver gone, tab watcher stopping");
                            return;
                        }
                    }
                }
                None => info!("Watching {} tabs", next.tabs().count()),
            }
            previous = Some(next);
        }
        info!("Tab watcher stopped");
    }
}

#[cfg(test)]
#[path = "watcher_tests.rs"]
mod tests;
