//! Append-only event log with size-based rotation.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Local;
use tracing::info;

use crate::error::{MonitorError, Result};
use crate::event::{ChangeEvent, EventSink};

/// Default rotation threshold.
pub const DEFAULT_MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Event sink writing timestamped lines to `<dir>/file_monitor_<date>.log`.
///
/// Once the current file grows past `max_size` it is closed and a new file
/// with a time-qualified name is opened.
pub struct EventLog {
    dir: PathBuf,
    max_size: u64,
    current: Mutex<LogFile>,
}

struct LogFile {
    file: File,
    path: PathBuf,
    size: u64,
}

impl LogFile {
    fn open(path: PathBuf) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let size = file.metadata()?.len();
        Ok(Self { file, path, size })
    }
}

impl EventLog {
    /// Open (or create) today's log file in `dir`.
    pub fn open(dir: impl Into<PathBuf>, max_size: u64) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        let name = format!("file_monitor_{}.log", Local::now().format("%Y-%m-%d"));
        let current = LogFile::open(dir.join(name))?;
        info!("Writing event log to {}", current.path.display());

        Ok(Self {
            dir,
            max_size,
            current: Mutex::new(current),
        })
    }

    /// Directory holding the log files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file currently written to.
    pub fn current_path(&self) -> Result<PathBuf> {
        Ok(self.lock()?.path.clone())
    }

    /// Append a timestamped line.
    pub fn write_line(&self, message: &str) -> Result<()> {
        let mut current = self.lock()?;

        let line = format!(
            "[{}] {message}\n",
            Local::now().format("%Y-%m-%d %H:%M:%S")
        );
        current.file.write_all(line.as_bytes())?;
        current.size += line.len() as u64;

        if current.size > self.max_size {
            let next = self.rotated_path(&current.path);
            *current = LogFile::open(next)?;
            info!("Rotated event log to {}", current.path.display());
        }

        Ok(())
    }

    /// Time-qualified name for the next file. Rotations within the same
    /// second get a `_<n>` suffix so no file is reopened.
    fn rotated_path(&self, current: &Path) -> PathBuf {
        let stamp = Local::now().format("%Y-%m-%d_%H%M%S").to_string();
        let mut path = self.dir.join(format!("file_monitor_{stamp}.log"));
        let mut seq = 1;
        while path == current || path.exists() {
            path = self.dir.join(format!("file_monitor_{stamp}_{seq}.log"));
            seq += 1;
        }
        path
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, LogFile>> {
        self.current
            .lock()
            .map_err(|_| MonitorError::Sink("event log lock poisoned".to_string()))
    }
}

impl EventSink for EventLog {
    fn record(&self, event: &ChangeEvent) -> Result<()> {
        self.write_line(&format!(
            "EVENT: {} | File: {}",
            event.kind,
            event.path.display()
        ))
    }

    fn log(&self, message: &str) -> Result<()> {
        self.write_line(message)
    }
}
