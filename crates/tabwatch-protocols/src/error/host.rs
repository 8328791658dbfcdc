//! Host (browser) errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HostError {
    #[error("Tab not found: {0}")]
    TabNotFound(i64),

    #[error("Window not found: {0}")]
    WindowNotFound(i64),

    #[error("Capture failed: {0}")]
    CaptureFailed(String),

    #[error("Content extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("Host unavailable: {0}")]
    Unavailable(String),

    #[error("Host protocol error: {0}")]
    Protocol(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tab_not_found_error() {
        let err = HostError::TabNotFound(42);
        let display = err.to_string();
        assert!(display.contains("not found"));
        assert!(display.contains("42"));
    }

    #[test]
    fn test_capture_failed_error() {
        let err = HostError::CaptureFailed("tab hidden".to_string());
        assert!(err.to_string().contains("Capture failed"));
        assert!(err.to_string().contains("tab hidden"));
    }

    #[test]
    fn test_all_error_variants_display() {
        let errors = vec![
            HostError::TabNotFound(1),
            HostError::WindowNotFound(2),
            HostError::CaptureFailed("c".to_string()),
            HostError::ExtractionFailed("e".to_string()),
            HostError::Unavailable("u".to_string()),
            HostError::Protocol("p".to_string()),
        ];

        for err in errors {
            assert!(!err.to_string().is_empty());
        }
    }
}
