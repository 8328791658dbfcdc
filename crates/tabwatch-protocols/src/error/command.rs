//! Command frame parse errors.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandParseError {
    #[error("Unknown command: {0}")]
    Unknown(String),

    #[error("Invalid tab id in command: {0}")]
    InvalidTabId(String),
}
