//! # Tabwatch Sync
//!
//! Both directions of the link to the companion app:
//!
//! - [`HttpPeer`] - fire-and-forget JSON pushes (`/event`, `/capture`,
//!   `/sync`) and the `/health` probe
//! - [`CommandChannel`] - persistent text-frame connection that receives
//!   commands, runs them through a [`CommandExecutor`] and replies with an
//!   ack, reconnecting after a fixed delay or when the health probe sees
//!   the peer come back
//!
//! [`CommandExecutor`]: tabwatch_protocols::CommandExecutor

mod channel;
mod http;
mod socket;

pub use channel::{ChannelSettings, ChannelStats, CommandChannel, CommandConnector, CommandSocket};
pub use http::HttpPeer;
pub use socket::TungsteniteConnector;
