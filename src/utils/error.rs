// src/utils/error.rs
use std::time::Duration;
use thiserror::Error;

// Define specific error types for different parts of the application
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error), // Automatically convert IO errors

    #[error("Failed to parse document input: {0}")]
    Parse(String),

    #[error("Document has no pages")]
    Empty,

    #[error("Page {page} out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },
}

#[derive(Error, Debug)]
pub enum LocateError {
    #[error("Document access failed: {0}")]
    Document(#[from] DocumentError),

    #[error("Detector '{detector}' failed: {message}")]
    Detector { detector: String, message: String },

    #[error("Page location timed out after {0:?}")]
    Timeout(Duration),

    #[error("Page location worker failed: {0}")]
    Worker(String),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Document loading failed: {0}")]
    Document(#[from] DocumentError),

    #[error("Page location failed: {0}")]
    Locate(#[from] LocateError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Data processing failed: {0}")]
    Processing(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detector_failure_names_its_origin() {
        let err = LocateError::Detector {
            detector: "toc".to_string(),
            message: "contents page unreadable".to_string(),
        };
        assert_eq!(err.to_string(), "Detector 'toc' failed: contents page unreadable");
    }

    #[test]
    fn test_page_errors_chain_into_app_error() {
        let err = AppError::from(LocateError::from(DocumentError::PageOutOfRange {
            page: 7,
            total: 5,
        }));
        assert_eq!(
            err.to_string(),
            "Page location failed: Document access failed: Page 7 out of range (document has 5 pages)"
        );
    }

    #[test]
    fn test_timeout_reports_the_deadline() {
        let err = LocateError::Timeout(Duration::from_secs(60));
        assert_eq!(err.to_string(), "Page location timed out after 60s");
    }
}
