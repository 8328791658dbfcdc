//! Tabwatch host adapter for Chromium-based browsers.
//!
//! Talks to a browser started with `--remote-debugging-port` through the
//! Chrome DevTools Protocol:
//!
//! - [`CdpTabHost`] answers [`TabHost`](tabwatch_protocols::TabHost)
//!   queries from page discovery and per-page sessions
//! - [`TabWatcher`] polls discovery and diffs listings into
//!   [`TabSignal`](tabwatch_protocols::TabSignal)s

pub mod client;
pub mod error;
pub mod host;
pub mod protocol;
pub mod snapshot;
pub mod targets;
pub mod watcher;

pub use client::CdpClient;
pub use error::CdpError;
pub use host::{CdpHostSettings, CdpTabHost};
pub use snapshot::HostSnapshot;
pub use targets::TargetMap;
pub use watcher::{SnapshotSource, TabWatcher, diff};
