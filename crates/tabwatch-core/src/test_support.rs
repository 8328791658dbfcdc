//! In-crate fakes for the host and the peer.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tabwatch_protocols::{
    CapturePayload, EventKind, HostError, HostTab, HostWindow, PeerSink, SyncError, SyncRequest,
    TabEvent, TabHost, TabId, WindowId, WindowKind,
};
use tokio::sync::mpsc;

use crate::clock::TokioClock;
use crate::metrics::DeliveryMetrics;
use crate::relay::PeerRelay;
use crate::store::MemoryStateStore;
use crate::tracker::{Tracker, TrackerSettings};

pub const START_MS: i64 = 1_700_000_000_000;
pub const DWELL_MS: u64 = 3_000;

#[derive(Default)]
struct HostModel {
    windows: Vec<HostWindow>,
    focused: Option<WindowId>,
    descriptions: HashMap<TabId, String>,
    failing_captures: HashSet<WindowId>,
    capture_calls: Vec<WindowId>,
    closed: Vec<TabId>,
}

/// Scriptable browser.
#[derive(Default)]
pub struct FakeHost {
    model: Mutex<HostModel>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_window(&self, id: WindowId, focused: bool) {
        let mut model = self.model.lock();
        model.windows.push(HostWindow {
            id,
            kind: WindowKind::Normal,
            focused,
            tabs: Vec::new(),
        });
        if focused {
            model.focused = Some(id);
        }
    }

    pub fn add_popup(&self, id: WindowId) {
        self.model.lock().windows.push(HostWindow {
            id,
            kind: WindowKind::Popup,
            focused: false,
            tabs: Vec::new(),
        });
    }

    /// Add a tab to its window. An active tab becomes the window's only
    /// foreground tab.
    pub fn add_tab(&self, tab: HostTab) {
        let mut model = self.model.lock();
        if let Some(window) = model.windows.iter_mut().find(|w| w.id == tab.window_id) {
            if tab.active {
                window.tabs.iter_mut().for_each(|t| t.active = false);
            }
            window.tabs.push(tab);
        }
    }

    pub fn activate(&self, tab_id: TabId) {
        let mut model = self.model.lock();
        for window in model.windows.iter_mut() {
            if window.tabs.iter().any(|t| t.id == tab_id) {
                for tab in window.tabs.iter_mut() {
                    tab.active = tab.id == tab_id;
                }
            }
        }
    }

    pub fn update_tab(&self, tab: HostTab) {
        let mut model = self.model.lock();
        for window in model.windows.iter_mut() {
            if let Some(existing) = window.tabs.iter_mut().find(|t| t.id == tab.id) {
                *existing = tab.clone();
            }
        }
    }

    pub fn remove_tab(&self, tab_id: TabId) {
        let mut model = self.model.lock();
        for window in model.windows.iter_mut() {
            window.tabs.retain(|t| t.id != tab_id);
        }
    }

    pub fn set_focused(&self, window_id: Option<WindowId>) {
        let mut model = self.model.lock();
        model.focused = window_id;
        for window in model.windows.iter_mut() {
            window.focused = Some(window.id) == window_id;
        }
    }

    pub fn set_description(&self, tab_id: TabId, text: &str) {
        self.model.lock().descriptions.insert(tab_id, text.to_string());
    }

    pub fn fail_capture(&self, window_id: WindowId) {
        self.model.lock().failing_captures.insert(window_id);
    }

    pub fn capture_calls(&self) -> Vec<WindowId> {
        self.model.lock().capture_calls.clone()
    }

    pub fn closed_tabs(&self) -> Vec<TabId> {
        self.model.lock().closed.clone()
    }

    pub fn tab(&self, tab_id: TabId) -> Option<HostTab> {
        self.model
            .lock()
            .windows
            .iter()
            .flat_map(|w| w.tabs.iter())
            .find(|t| t.id == tab_id)
            .cloned()
    }
}

#[async_trait]
impl TabHost for FakeHost {
    async fn get_tab(&self, tab_id: TabId) -> Result<HostTab, HostError> {
        self.tab(tab_id).ok_or(HostError::TabNotFound(tab_id))
    }

    async fn list_tabs(&self) -> Result<Vec<HostTab>, HostError> {
        Ok(self
            .model
            .lock()
            .windows
            .iter()
            .flat_map(|w| w.tabs.iter().cloned())
            .collect())
    }

    async fn list_windows(&self) -> Result<Vec<HostWindow>, HostError> {
        Ok(self.model.lock().windows.clone())
    }

    async fn focused_window(&self) -> Result<Option<WindowId>, HostError> {
        Ok(self.model.lock().focused)
    }

    async fn capture_visible(&self, window_id: WindowId) -> Result<String, HostError> {
        let mut model = self.model.lock();
        model.capture_calls.push(window_id);
        if model.failing_captures.contains(&window_id) {
            return Err(HostError::CaptureFailed(format!("window {}", window_id)));
        }
        Ok(format!("data:image/jpeg;base64,SHOT{}", window_id))
    }

    async fn extract_description(&self, tab_id: TabId) -> Result<String, HostError> {
        self.model
            .lock()
            .descriptions
            .get(&tab_id)
            .cloned()
            .ok_or_else(|| HostError::ExtractionFailed(format!("tab {}", tab_id)))
    }

    async fn close_tab(&self, tab_id: TabId) -> Result<(), HostError> {
        if self.tab(tab_id).is_none() {
            return Err(HostError::TabNotFound(tab_id));
        }
        self.remove_tab(tab_id);
        self.model.lock().closed.push(tab_id);
        Ok(())
    }
}

/// Peer that records everything it is sent.
#[derive(Default)]
pub struct RecordingPeer {
    events: Mutex<Vec<TabEvent>>,
    captures: Mutex<Vec<CapturePayload>>,
    syncs: Mutex<Vec<SyncRequest>>,
    failing: AtomicBool,
}

impl RecordingPeer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn events(&self) -> Vec<TabEvent> {
        self.events.lock().clone()
    }

    pub fn events_of(&self, kind: EventKind) -> Vec<TabEvent> {
        self.events().into_iter().filter(|e| e.kind == kind).collect()
    }

    pub fn captures(&self) -> Vec<CapturePayload> {
        self.captures.lock().clone()
    }

    pub fn syncs(&self) -> Vec<SyncRequest> {
        self.syncs.lock().clone()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
        self.captures.lock().clear();
        self.syncs.lock().clear();
    }

    fn check(&self) -> Result<(), SyncError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SyncError::Connection("peer offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl PeerSink for RecordingPeer {
    async fn post_event(&self, event: &TabEvent) -> Result<(), SyncError> {
        self.check()?;
        self.events.lock().push(event.clone());
        Ok(())
    }

    async fn post_capture(&self, payload: &CapturePayload) -> Result<(), SyncError> {
        self.check()?;
        self.captures.lock().push(payload.clone());
        Ok(())
    }

    async fn post_sync(&self, request: &SyncRequest) -> Result<(), SyncError> {
        self.check()?;
        self.syncs.lock().push(request.clone());
        Ok(())
    }

    async fn health(&self) -> bool {
        !self.failing.load(Ordering::SeqCst)
    }
}

/// A tracker wired to fakes, on a clock that follows paused tokio time.
pub struct Harness {
    pub tracker: Tracker,
    pub due_rx: mpsc::UnboundedReceiver<TabId>,
    pub host: Arc<FakeHost>,
    pub peer: Arc<RecordingPeer>,
    pub metrics: Arc<DeliveryMetrics>,
}

impl Harness {
    pub fn new() -> Self {
        let host = Arc::new(FakeHost::new());
        let peer = Arc::new(RecordingPeer::new());
        let metrics = Arc::new(DeliveryMetrics::new());
        let relay = PeerRelay::new(peer.clone(), metrics.clone());
        let settings = TrackerSettings {
            dwell_threshold: Duration::from_millis(DWELL_MS),
            description_max_words: 5,
        };
        let (tracker, due_rx) = Tracker::new(
            Arc::new(MemoryStateStore::new()),
            host.clone(),
            relay,
            Arc::new(TokioClock::starting_at(START_MS)),
            settings,
        );
        Self {
            tracker,
            due_rx,
            host,
            peer,
            metrics,
        }
    }

    /// Two normal windows; window 1 focused.
    pub fn with_two_windows() -> Self {
        let harness = Self::new();
        harness.host.add_window(1, true);
        harness.host.add_window(2, false);
        harness
    }

    /// Let `ms` of virtual time pass, giving timer tasks a chance to run.
    pub async fn advance(&self, ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
        settle().await;
    }

    /// Drain due notices that have fired so far and run their captures.
    pub async fn run_due(&mut self) {
        settle().await;
        while let Ok(tab_id) = self.due_rx.try_recv() {
            self.tracker.on_capture_due(tab_id).await;
        }
    }
}

pub async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

pub fn web_tab(id: TabId, window_id: WindowId) -> HostTab {
    HostTab::new(id, window_id, format!("https://site{}.example", id)).with_title(format!("Tab {}", id))
}
