//! Command channel protocol.
//!
//! The companion app sends plain text frames; each recognised command is
//! answered with exactly one acknowledgement frame.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;

use crate::error::CommandParseError;
use crate::state::TabId;

const REFRESH_ALL: &str = "refresh_all";
const CLOSE_TAB_PREFIX: &str = "close_tab:";

/// A command received from the peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerCommand {
    RefreshAll,
    CloseTab(TabId),
}

impl FromStr for PeerCommand {
    type Err = CommandParseError;

    fn from_str(frame: &str) -> Result<Self, Self::Err> {
        let frame = frame.trim();
        if frame == REFRESH_ALL {
            return Ok(PeerCommand::RefreshAll);
        }
        if let Some(raw) = frame.strip_prefix(CLOSE_TAB_PREFIX) {
            return raw
                .trim()
                .parse::<TabId>()
                .map(PeerCommand::CloseTab)
                .map_err(|_| CommandParseError::InvalidTabId(raw.to_string()));
        }
        Err(CommandParseError::Unknown(frame.to_string()))
    }
}

/// Reply frame for a completed command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandAck {
    RefreshAllDone,
    CloseTabDone(TabId),
    CloseTabError(TabId),
}

impl fmt::Display for CommandAck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandAck::RefreshAllDone => write!(f, "refresh_all_done"),
            CommandAck::CloseTabDone(id) => write!(f, "close_tab_done:{}", id),
            CommandAck::CloseTabError(id) => write!(f, "close_tab_error:{}", id),
        }
    }
}

/// Runs peer commands against the tracker.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn execute(&self, command: PeerCommand) -> CommandAck;
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
