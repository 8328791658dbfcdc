//! Host (browser) protocol definitions.
//!
//! The host is whatever owns the tabs: a browser reached over CDP in
//! production, a scripted fake in tests. The tracker only ever sees it
//! through [`TabHost`] and the [`TabSignal`]s an adapter feeds in.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::HostError;
use crate::state::{TabId, WindowId};

/// Page load status reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadStatus {
    Loading,
    #[default]
    Complete,
}

/// A snapshot of one tab as the host sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostTab {
    pub id: TabId,
    pub window_id: WindowId,
    pub url: String,
    pub title: String,
    pub fav_icon_url: Option<String>,
    /// Foreground tab of its window.
    pub active: bool,
    pub discarded: bool,
    pub status: LoadStatus,
}

impl HostTab {
    pub fn new(id: TabId, window_id: WindowId, url: impl Into<String>) -> Self {
        Self {
            id,
            window_id,
            url: url.into(),
            title: String::new(),
            fav_icon_url: None,
            active: false,
            discarded: false,
            status: LoadStatus::Complete,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    pub fn with_discarded(mut self, discarded: bool) -> Self {
        self.discarded = discarded;
        self
    }

    pub fn with_status(mut self, status: LoadStatus) -> Self {
        self.status = status;
        self
    }
}

/// Window type. Only normal windows carry capturable tabs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowKind {
    #[default]
    Normal,
    Popup,
    Other,
}

/// A window and the tabs it holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostWindow {
    pub id: WindowId,
    pub kind: WindowKind,
    pub focused: bool,
    pub tabs: Vec<HostTab>,
}

impl HostWindow {
    /// The window's foreground tab, if any.
    pub fn foreground(&self) -> Option<&HostTab> {
        self.tabs.iter().find(|t| t.active)
    }
}

/// Fields that changed in an update signal. `None` means unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TabChange {
    pub status: Option<LoadStatus>,
    pub url: Option<String>,
    pub title: Option<String>,
    pub fav_icon_url: Option<String>,
    pub discarded: Option<bool>,
}

impl TabChange {
    /// Load completion, title/url change, or a discarded flip.
    pub fn is_meaningful(&self) -> bool {
        self.status == Some(LoadStatus::Complete)
            || self.title.is_some()
            || self.url.is_some()
            || self.discarded.is_some()
    }
}

/// Tagged host notification routed to the tracker.
#[derive(Debug, Clone, PartialEq)]
pub enum TabSignal {
    Created(HostTab),
    Updated {
        tab_id: TabId,
        change: TabChange,
        tab: HostTab,
    },
    Activated {
        tab_id: TabId,
        window_id: WindowId,
    },
    Removed {
        tab_id: TabId,
    },
    /// `None` means no browser window has focus.
    FocusChanged {
        window_id: Option<WindowId>,
    },
}

impl TabSignal {
    pub fn name(&self) -> &'static str {
        match self {
            TabSignal::Created(_) => "created",
            TabSignal::Updated { .. } => "updated",
            TabSignal::Activated { .. } => "activated",
            TabSignal::Removed { .. } => "removed",
            TabSignal::FocusChanged { .. } => "focus_changed",
        }
    }
}

/// The browser the tracker observes.
#[async_trait]
pub trait TabHost: Send + Sync {
    /// Look up a single tab.
    async fn get_tab(&self, tab_id: TabId) -> Result<HostTab, HostError>;

    /// All open tabs across all windows.
    async fn list_tabs(&self) -> Result<Vec<HostTab>, HostError>;

    /// All windows with their tabs populated.
    async fn list_windows(&self) -> Result<Vec<HostWindow>, HostError>;

    /// Id of the window that currently has focus.
    async fn focused_window(&self) -> Result<Option<WindowId>, HostError>;

    /// Capture the visible area of a window as a (possibly data-URL) jpeg.
    async fn capture_visible(&self, window_id: WindowId) -> Result<String, HostError>;

    /// Extract a text description of a tab's content.
    async fn extract_description(&self, tab_id: TabId) -> Result<String, HostError>;

    /// Close a tab.
    async fn close_tab(&self, tab_id: TabId) -> Result<(), HostError>;

    /// Foreground tab of a window.
    async fn foreground_tab(&self, window_id: WindowId) -> Result<Option<HostTab>, HostError> {
        Ok(self
            .list_tabs()
            .await?
            .into_iter()
            .find(|t| t.window_id == window_id && t.active))
    }
}
