//! State store implementations.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tabwatch_protocols::{StateStore, StoreError, TrackerState, Transform};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// In-memory state store for testing.
pub struct MemoryStateStore {
    state: Mutex<TrackerState>,
}

impl MemoryStateStore {
    /// Create an empty memory store.
    pub fn new() -> Self {
        Self::with_state(TrackerState::default())
    }

    /// Create a memory store seeded with `state`.
    pub fn with_state(state: TrackerState) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }
}

impl Default for MemoryStateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn read(&self) -> TrackerState {
        self.state.lock().await.clone()
    }

    async fn transact(&self, transform: Transform) -> Result<TrackerState, StoreError> {
        let mut guard = self.state.lock().await;
        let next = transform(guard.clone());
        *guard = next.clone();
        Ok(next)
    }

    async fn clear(&self) -> Result<(), StoreError> {
        *self.state.lock().await = TrackerState::default();
        Ok(())
    }
}

/// JSON file backed state store.
///
/// The whole document is rewritten on every transaction. The write goes to
/// a sibling temp file that is then renamed over the target, so a crash
/// leaves either the old or the new document on disk.
pub struct FileStateStore {
    path: PathBuf,
    cache: Mutex<TrackerState>,
}

impl FileStateStore {
    /// Open (or lazily create) the store at `path`.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let state = Self::load(&path).await;
        debug!(
            "FileStateStore opened at {:?} ({} tabs)",
            path,
            state.tabs.len()
        );

        Ok(Self {
            path,
            cache: Mutex::new(state),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(path: &Path) -> TrackerState {
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return TrackerState::default(),
            Err(e) => {
                warn!("Failed to read state file {:?}: {}", path, e);
                return TrackerState::default();
            }
        };

        match serde_json::from_str(&content) {
            Ok(state) => state,
            Err(e) => {
                warn!("Ignoring corrupt state file {:?}: {}", path, e);
                TrackerState::default()
            }
        }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    async fn persist(&self, state: &TrackerState) -> Result<(), StoreError> {
        let content = serde_json::to_vec(state)?;
        let tmp = self.temp_path();
        fs::write(&tmp, content).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn read(&self) -> TrackerState {
        self.cache.lock().await.clone()
    }

    async fn transact(&self, transform: Transform) -> Result<TrackerState, StoreError> {
        let mut guard = self.cache.lock().await;
        let next = transform(guard.clone());
        self.persist(&next).await?;
        *guard = next.clone();
        Ok(next)
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let mut guard = self.cache.lock().await;
        match fs::remove_file(&self.path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        *guard = TrackerState::default();
        debug!("Cleared state file {:?}", self.path);
        Ok(())
    }
}

/// Shared handle over a [`StateStore`].
///
/// A failed write is logged and the previous state is returned; the tracker
/// carries on with what it has and the next resync repairs the peer's view.
#[derive(Clone)]
pub struct StateHandle {
    store: Arc<dyn StateStore>,
}

impl StateHandle {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }

    pub async fn read(&self) -> TrackerState {
        self.store.read().await
    }

    pub async fn transact<F>(&self, transform: F) -> TrackerState
    where
        F: FnOnce(TrackerState) -> TrackerState + Send + 'static,
    {
        match self.store.transact(Box::new(transform)).await {
            Ok(state) => state,
            Err(e) => {
                warn!("State transaction not persisted: {}", e);
                self.store.read().await
            }
        }
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
