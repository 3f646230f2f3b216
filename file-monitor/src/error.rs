//! Error types for the file monitor.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for monitor operations.
pub type Result<T> = std::result::Result<T, MonitorError>;

/// Errors that can occur in the file monitor.
#[derive(Error, Debug)]
pub enum MonitorError {
    /// `start` was called on a monitor that is already running.
    #[error("monitor already running for: {0}")]
    AlreadyRunning(String),

    /// A filesystem error during a directory walk. Fatal to that scan only.
    #[error("scan failed at {}: {source}", path.display())]
    ScanIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file could not be hashed. Only disqualifies that file's fingerprint.
    #[error("failed to fingerprint {}: {source}", path.display())]
    Fingerprint {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// The event sink rejected an event.
    #[error("event sink error: {0}")]
    Sink(String),

    /// The background scan task panicked or was aborted.
    #[error("scan task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl From<walkdir::Error> for MonitorError {
    fn from(err: walkdir::Error) -> Self {
        let path = err.path().map(PathBuf::from).unwrap_or_default();
        let message = err.to_string();
        let source = err
            .into_io_error()
            .unwrap_or_else(|| std::io::Error::other(message));
        Self::ScanIo { path, source }
    }
}
