//! State store protocol.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::state::TrackerState;

/// A pure whole-state transform. Must not perform I/O.
pub type Transform = Box<dyn FnOnce(TrackerState) -> TrackerState + Send>;

/// Durable holder of the [`TrackerState`] document.
///
/// Each `transact` is the unit of durability: the new state is fully
/// computed before anything is written, so a restart never observes a
/// half-applied transform.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Current state, or the default state when nothing was stored yet.
    async fn read(&self) -> TrackerState;

    /// Apply `transform` to the current state, persist and return the result.
    async fn transact(&self, transform: Transform) -> Result<TrackerState, StoreError>;

    /// Drop all stored state.
    async fn clear(&self) -> Result<(), StoreError>;
}
