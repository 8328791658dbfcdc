//! Peer sync errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Peer returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Channel closed")]
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error() {
        let err = SyncError::Status {
            status: 503,
            body: "busy".to_string(),
        };
        let display = err.to_string();
        assert!(display.contains("503"));
        assert!(display.contains("busy"));
    }

    #[test]
    fn test_connection_error() {
        let err = SyncError::Connection("refused".to_string());
        assert!(err.to_string().contains("Connection failed"));
    }

    #[test]
    fn test_closed_error() {
        assert_eq!(SyncError::Closed.to_string(), "Channel closed");
    }
}
