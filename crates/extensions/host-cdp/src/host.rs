//! [`TabHost`] backed by a browser's remote-debugging endpoint.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tabwatch_protocols::{HostError, HostTab, HostWindow, TabHost, TabId, WindowId};
use tracing::{debug, info};

use crate::client::CdpClient;
use crate::protocol::{PageInfo, ScreenshotFormat};
use crate::snapshot::HostSnapshot;
use crate::targets::TargetMap;
use crate::watcher::SnapshotSource;

const DESCRIPTION_SCRIPT: &str = "document.body ? document.body.innerText : ''";

#[derive(Debug, Clone)]
pub struct CdpHostSettings {
    /// HTTP endpoint, e.g. "http://localhost:9222".
    pub endpoint: String,
    /// JPEG quality, 1-100.
    pub screenshot_quality: u8,
}

impl Default for CdpHostSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:9222".to_string(),
            screenshot_quality: 60,
        }
    }
}

/// Browser host reached over CDP.
///
/// The connection is opened on first use and reopened after the browser
/// goes away. Every query works from a fresh [`HostSnapshot`].
pub struct CdpTabHost {
    settings: CdpHostSettings,
    client: tokio::sync::Mutex<Option<Arc<CdpClient>>>,
    targets: Mutex<TargetMap>,
}

impl CdpTabHost {
    pub fn new(settings: CdpHostSettings) -> Self {
        Self {
            settings,
            client: tokio::sync::Mutex::new(None),
            targets: Mutex::new(TargetMap::new()),
        }
    }

    pub fn settings(&self) -> &CdpHostSettings {
        &self.settings
    }

    async fn client(&self) -> Result<Arc<CdpClient>, HostError> {
        let mut slot = self.client.lock().await;
        if let Some(client) = slot.as_ref() {
            if !client.is_closed() {
                return Ok(client.clone());
            }
            info!("CDP connection lost, reconnecting");
        }
        let client = Arc::new(CdpClient::connect(&self.settings.endpoint).await?);
        info!("CDP connected to {}", self.settings.endpoint);
        *slot = Some(client.clone());
        Ok(client)
    }

    /// Current windows and tabs.
    pub async fn snapshot(&self) -> Result<HostSnapshot, HostError> {
        let client = self.client().await?;
        let pages = client.list_pages().await?;

        let mut located = Vec::new();
        for page in pages.into_iter().filter(PageInfo::is_tab) {
            match client.window_for_target(&page.id).await {
                Ok(window) => located.push((page, window)),
                // The page can close between listing and lookup.
                Err(e) => debug!("No window for target {}: {}", page.id, e),
            }
        }

        let mut targets = self.targets.lock();
        let live: HashSet<&str> = located.iter().map(|(page, _)| page.id.as_str()).collect();
        targets.retain(&live);
        Ok(HostSnapshot::build(located, &mut targets))
    }

    fn target_for(&self, tab_id: TabId) -> Result<String, HostError> {
        self.targets
            .lock()
            .target_for(tab_id)
            .map(|t| t.to_string())
            .ok_or(HostError::TabNotFound(tab_id))
    }
}

#[async_trait]
impl SnapshotSource for CdpTabHost {
    async fn snapshot(&self) -> Result<HostSnapshot, HostError> {
        CdpTabHost::snapshot(self).await
    }
}

#[async_trait]
impl TabHost for CdpTabHost {
    async fn get_tab(&self, tab_id: TabId) -> Result<HostTab, HostError> {
        self.snapshot()
            .await?
            .tab(tab_id)
            .cloned()
            .ok_or(HostError::TabNotFound(tab_id))
    }

    async fn list_tabs(&self) -> Result<Vec<HostTab>, HostError> {
        Ok(self.snapshot().await?.tabs().cloned().collect())
    }

    async fn list_windows(&self) -> Result<Vec<HostWindow>, HostError> {
        Ok(self.snapshot().await?.windows)
    }

    async fn focused_window(&self) -> Result<Option<WindowId>, HostError> {
        Ok(self.snapshot().await?.focused)
    }

    async fn capture_visible(&self, window_id: WindowId) -> Result<String, HostError> {
        let snapshot = self.snapshot().await?;
        let window = snapshot
            .window(window_id)
            .ok_or(HostError::WindowNotFound(window_id))?;
        let foreground = window
            .foreground()
            .ok_or_else(|| HostError::CaptureFailed(format!("window {} has no tabs", window_id)))?;
        let target = self.target_for(foreground.id)?;

        let format = ScreenshotFormat::Jpeg;
        let data = self
            .client()
            .await?
            .capture_screenshot(&target, format, self.settings.screenshot_quality)
            .await
            .map_err(|e| HostError::CaptureFailed(e.to_string()))?;
        Ok(format!("data:{};base64,{}", format.mime(), data))
    }

    async fn extract_description(&self, tab_id: TabId) -> Result<String, HostError> {
        let target = self.target_for(tab_id)?;
        let value = self
            .client()
            .await?
            .evaluate(&target, DESCRIPTION_SCRIPT)
            .await
            .map_err(|e| HostError::ExtractionFailed(e.to_string()))?;
        value
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| HostError::ExtractionFailed(format!("tab {} returned no text", tab_id)))
    }

    async fn close_tab(&self, tab_id: TabId) -> Result<(), HostError> {
        let target = self.target_for(tab_id)?;
        self.client().await?.close_target(&target).await?;
        debug!("Closed target {} (tab {})", target, tab_id);
        Ok(())
    }
}
