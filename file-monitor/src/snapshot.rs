//! Directory snapshots.
//!
//! A [`Snapshot`] is the complete set of entries observed by one walk of the
//! watched root. Snapshots are never mutated after capture; the monitor swaps
//! in a new one at the end of every scan.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::{MonitorConfig, file_extension};
use crate::error::{MonitorError, Result};
use crate::fingerprint::fingerprint_file;

/// One observed filesystem path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Absolute path, the identity key.
    pub path: PathBuf,

    /// Size in bytes.
    pub size: u64,

    /// Last modification time, if the platform reports one.
    pub modified: Option<SystemTime>,

    /// SHA-256 of the contents, when fingerprints are enabled and hashing
    /// succeeded.
    pub fingerprint: Option<String>,

    /// Whether the path is a directory.
    pub is_dir: bool,
}

impl Entry {
    /// Check whether this entry counts as a modification of `previous`.
    ///
    /// Directories are never modified. Size or mtime differences are enough
    /// on their own; fingerprints only add a trigger when both sides have one.
    pub fn is_modified_from(&self, previous: &Entry) -> bool {
        if self.is_dir {
            return false;
        }

        let fingerprint_changed = match (&self.fingerprint, &previous.fingerprint) {
            (Some(current), Some(old)) => current != old,
            _ => false,
        };

        self.size != previous.size || self.modified != previous.modified || fingerprint_changed
    }

    /// File extension with its leading dot, or `""`.
    pub fn extension(&self) -> String {
        file_extension(&self.path).to_string()
    }
}

/// Mapping from path to [`Entry`] for one scan instant.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    entries: HashMap<PathBuf, Entry>,
}

impl Snapshot {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Walk the configured root and record every visible entry.
    ///
    /// The excluded subtree is pruned, ignored files are skipped, and any
    /// walk or stat error aborts the capture: a partial snapshot would report
    /// every unvisited path as deleted.
    pub fn capture(config: &MonitorConfig) -> Result<Self> {
        let root = config
            .root
            .canonicalize()
            .map_err(|source| MonitorError::ScanIo {
                path: config.root.clone(),
                source,
            })?;
        let excluded = config
            .exclude_path
            .as_ref()
            .and_then(|path| path.canonicalize().ok());

        let walker = WalkDir::new(&root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| excluded.as_deref() != Some(entry.path()));

        let mut snapshot = Self::new();
        for entry in walker {
            let entry = entry?;
            let file_type = entry.file_type();
            let is_dir = file_type.is_dir();

            if !is_dir && config.is_ignored(entry.path()) {
                continue;
            }

            let metadata = entry.metadata()?;
            let fingerprint = if config.fingerprints && file_type.is_file() {
                match fingerprint_file(entry.path()) {
                    Ok(digest) => Some(digest),
                    Err(e) => {
                        warn!("{e}");
                        None
                    }
                }
            } else {
                None
            };

            snapshot.insert(Entry {
                path: entry.into_path(),
                size: metadata.len(),
                modified: metadata.modified().ok(),
                fingerprint,
                is_dir,
            });
        }

        debug!("Captured {} entries under {}", snapshot.len(), root.display());
        Ok(snapshot)
    }

    /// Add an entry, replacing any entry with the same path.
    pub fn insert(&mut self, entry: Entry) {
        self.entries.insert(entry.path.clone(), entry);
    }

    /// Get an entry by path.
    pub fn get(&self, path: &Path) -> Option<&Entry> {
        self.entries.get(path)
    }

    /// Check whether a path was observed.
    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    /// All entries, in no particular order.
    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.entries.values()
    }

    /// Number of entries, directories included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the snapshot is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of non-directory entries.
    pub fn file_count(&self) -> usize {
        self.entries.values().filter(|e| !e.is_dir).count()
    }

    /// Sum of the sizes of non-directory entries.
    pub fn total_size(&self) -> u64 {
        self.entries
            .values()
            .filter(|e| !e.is_dir)
            .map(|e| e.size)
            .sum()
    }
}
