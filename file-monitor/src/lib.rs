//! # File Monitor
//!
//! Polling file monitor: periodically walks a directory tree, compares the
//! result with the previous walk, and reports every created, modified, or
//! deleted path exactly once.
//!
//! ## Features
//!
//! - **Snapshot Diffing**: size, mtime, and optional SHA-256 fingerprints
//! - **Background Polling**: fixed-interval scans with cooperative cancellation
//! - **Filtering**: extension ignore-list and one pruned subtree
//! - **Event Log**: rotating log file sink
//! - **Statistics**: file counts and sizes per extension, saved as JSON
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Directory Monitor                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  MonitorConfig ──► Snapshot::capture ──► detect_changes         │
//! │       │                  │                     │                │
//! │       ▼                  ▼                     ▼                │
//! │  poll loop         RwLock<Snapshot>        EventSink            │
//! │                          │                                      │
//! │                          ▼                                      │
//! │                     StatsReport                                 │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod diff;
pub mod error;
pub mod event;
pub mod event_log;
pub mod fingerprint;
pub mod monitor;
pub mod snapshot;
pub mod stats;

pub use config::MonitorConfig;
pub use diff::detect_changes;
pub use error::{MonitorError, Result};
pub use event::{ChangeEvent, ChangeKind, ChannelSink, EventSink, NullSink};
pub use event_log::EventLog;
pub use fingerprint::fingerprint_file;
pub use monitor::{DirectoryMonitor, ScanSummary};
pub use snapshot::{Entry, Snapshot};
pub use stats::{StatsReport, format_size};
