//! Periodic statistics over the monitored tree.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::monitor::DirectoryMonitor;
use crate::snapshot::Snapshot;

/// Aggregate view of one snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsReport {
    /// When the report was generated.
    pub timestamp: DateTime<Local>,

    /// Number of files.
    pub file_count: usize,

    /// Total size of all files in bytes.
    pub total_size: u64,

    /// `total_size` rendered for humans.
    pub total_size_human: String,

    /// Files by extension (with leading dot, `""` for none).
    pub by_extension: BTreeMap<String, ExtensionStats>,
}

/// Count and size of the files sharing one extension.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionStats {
    pub count: usize,
    pub size_bytes: u64,
}

impl StatsReport {
    /// Build a report from the monitor's current snapshot.
    pub async fn generate(monitor: &DirectoryMonitor) -> Self {
        Self::from_snapshot(&*monitor.snapshot().await)
    }

    /// Build a report from a snapshot.
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        let mut by_extension: BTreeMap<String, ExtensionStats> = BTreeMap::new();
        for entry in snapshot.entries().filter(|e| !e.is_dir) {
            let stats = by_extension.entry(entry.extension()).or_default();
            stats.count += 1;
            stats.size_bytes += entry.size;
        }

        let total_size = snapshot.total_size();
        Self {
            timestamp: Local::now(),
            file_count: snapshot.file_count(),
            total_size,
            total_size_human: format_size(total_size),
            by_extension,
        }
    }

    /// Write the report as pretty JSON under `<log_dir>/stats/`.
    pub fn save(&self, log_dir: &Path) -> Result<PathBuf> {
        let stats_dir = log_dir.join("stats");
        fs::create_dir_all(&stats_dir)?;

        let name = format!("stats_{}.json", self.timestamp.format("%Y-%m-%d_%H-%M-%S"));
        let path = stats_dir.join(name);
        fs::write(&path, serde_json::to_string_pretty(self)?)?;

        debug!("Saved statistics to {}", path.display());
        Ok(path)
    }
}

/// Render a byte count with a binary unit suffix.
pub fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    const TB: u64 = GB * 1024;

    let scaled = |unit: u64| size as f64 / unit as f64;
    match size {
        s if s >= TB => format!("{:.2} TB", scaled(TB)),
        s if s >= GB => format!("{:.2} GB", scaled(GB)),
        s if s >= MB => format!("{:.2} MB", scaled(MB)),
        s if s >= KB => format!("{:.2} KB", scaled(KB)),
        s => format!("{s} B"),
    }
}
