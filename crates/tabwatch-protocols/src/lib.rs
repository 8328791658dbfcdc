//! # Tabwatch Protocols
//!
//! Shared data model and seam traits for the tabwatch tracking pipeline.
//! Contains only definitions - no implementations.
//!
//! ## Core Traits
//!
//! - [`StateStore`] - Durable, transactional holder of [`TrackerState`]
//! - [`TabHost`] - The browser the tracker observes and captures from
//! - [`PeerSink`] - Fire-and-forget push channel to the companion app
//! - [`CommandExecutor`] - Runs commands received from the companion app
//! - [`DeliveryObserver`] - Hook notified about every push outcome
//! - [`Clock`] - Source of epoch milliseconds

pub mod clock;
pub mod command;
pub mod error;
pub mod host;
pub mod peer;
pub mod state;
pub mod store;
pub mod text;

pub use clock::Clock;
pub use command::{CommandAck, CommandExecutor, PeerCommand};
pub use error::{CommandParseError, HostError, StoreError, SyncError};
pub use host::{HostTab, HostWindow, LoadStatus, TabChange, TabHost, TabSignal, WindowKind};
pub use peer::{
    CapturePayload, DeliveryKind, DeliveryObserver, EventKind, NoopObserver, PeerSink,
    SyncRequest, TabEvent,
};
pub use state::{TabId, TabRecord, TimerPhase, TrackerState, WindowId};
pub use store::{StateStore, Transform};
pub use text::{is_privileged_url, strip_data_url_prefix, truncate_words};
