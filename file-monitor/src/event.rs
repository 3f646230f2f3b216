//! Change events and the sinks that receive them.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::{MonitorError, Result};

/// Kind of change detected between two snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// Path is new since the previous scan.
    Created,

    /// File size, modification time or fingerprint changed.
    Modified,

    /// Path disappeared since the previous scan.
    Deleted,
}

impl ChangeKind {
    /// Upper-case label used in log lines.
    pub fn label(self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::Modified => "MODIFIED",
            Self::Deleted => "DELETED",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single detected change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// The kind of change.
    pub kind: ChangeKind,

    /// Path to the affected file or directory.
    pub path: PathBuf,

    /// When the change was detected.
    pub detected_at: DateTime<Utc>,
}

impl ChangeEvent {
    /// Create a new change event stamped with the current time.
    pub fn new(kind: ChangeKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
            detected_at: Utc::now(),
        }
    }
}

/// Receiver of change events.
///
/// `record` is called once per change, before the snapshot that produced it
/// becomes the baseline for the next scan. Both methods run on tokio's
/// blocking pool and may do blocking I/O. Errors are logged by the monitor
/// and never fail the scan.
pub trait EventSink: Send + Sync {
    fn record(&self, event: &ChangeEvent) -> Result<()>;

    /// Free-form diagnostic line, such as a failed background scan.
    fn log(&self, _message: &str) -> Result<()> {
        Ok(())
    }
}

/// Sink that forwards events over a tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<ChangeEvent>,
}

impl ChannelSink {
    /// Create a sink and the receiver it feeds.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ChangeEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn record(&self, event: &ChangeEvent) -> Result<()> {
        self.tx
            .send(event.clone())
            .map_err(|_| MonitorError::Sink("event receiver dropped".to_string()))
    }
}

/// Sink that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn record(&self, _event: &ChangeEvent) -> Result<()> {
        Ok(())
    }
}
