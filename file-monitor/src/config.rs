//! Configuration for a monitored directory tree.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{MonitorError, Result};

/// Default time between two scans.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Configuration for a [`DirectoryMonitor`](crate::DirectoryMonitor).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Root of the watched tree.
    pub root: PathBuf,

    /// Time between two background scans.
    pub poll_interval: Duration,

    /// Subtree pruned from every walk, usually the log directory.
    pub exclude_path: Option<PathBuf>,

    /// File extensions never recorded, each with its leading dot (`.tmp`).
    pub ignored_extensions: Vec<String>,

    /// Whether regular files are hashed on every scan.
    pub fingerprints: bool,
}

impl MonitorConfig {
    /// Create a config for `root` with default settings.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            exclude_path: None,
            ignored_extensions: Vec::new(),
            fingerprints: false,
        }
    }

    /// Set the poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Prune `path` from traversal.
    pub fn exclude_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.exclude_path = Some(path.into());
        self
    }

    /// Ignore files ending in `ext` (e.g. `.swp`).
    pub fn ignore_extension(mut self, ext: impl Into<String>) -> Self {
        self.ignored_extensions.push(ext.into());
        self
    }

    /// Enable or disable content fingerprints.
    pub fn with_fingerprints(mut self, enabled: bool) -> Self {
        self.fingerprints = enabled;
        self
    }

    /// Reject settings the monitor cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            return Err(MonitorError::Config(
                "poll interval must be greater than zero".to_string(),
            ));
        }

        for ext in &self.ignored_extensions {
            if !ext.starts_with('.') || ext.len() < 2 {
                return Err(MonitorError::Config(format!(
                    "ignored extension must start with '.': {ext:?}"
                )));
            }
        }

        Ok(())
    }

    /// Check whether a regular file is on the ignore-list.
    ///
    /// The extension is everything from the last `.` of the file name, so a
    /// file named `.swp` has the extension `.swp`.
    pub fn is_ignored(&self, path: &Path) -> bool {
        let ext = file_extension(path);
        !ext.is_empty() && self.ignored_extensions.iter().any(|ignored| ignored == ext)
    }
}

/// Suffix of the file name starting at its last `.`, or `""` when the name
/// has no dot.
pub(crate) fn file_extension(path: &Path) -> &str {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return "";
    };

    name.rfind('.').map_or("", |dot| &name[dot..])
}
