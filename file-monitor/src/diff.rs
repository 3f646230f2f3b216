//! Change detection between two snapshots.

use crate::event::{ChangeEvent, ChangeKind};
use crate::snapshot::Snapshot;

/// Compare `old` against `new` and return one event per changed path.
///
/// Paths only in `new` are created, paths in both whose entry changed are
/// modified, and paths only in `old` are deleted. Events are sorted by path
/// within each kind.
pub fn detect_changes(old: &Snapshot, new: &Snapshot) -> Vec<ChangeEvent> {
    let mut created = Vec::new();
    let mut modified = Vec::new();

    for entry in new.entries() {
        match old.get(&entry.path) {
            None => created.push(entry.path.clone()),
            Some(previous) if entry.is_modified_from(previous) => {
                modified.push(entry.path.clone());
            }
            Some(_) => {}
        }
    }

    let mut deleted: Vec<_> = old
        .entries()
        .filter(|entry| !new.contains(&entry.path))
        .map(|entry| entry.path.clone())
        .collect();

    created.sort();
    modified.sort();
    deleted.sort();

    created
        .into_iter()
        .map(|path| ChangeEvent::new(ChangeKind::Created, path))
        .chain(
            modified
                .into_iter()
                .map(|path| ChangeEvent::new(ChangeKind::Modified, path)),
        )
        .chain(
            deleted
                .into_iter()
                .map(|path| ChangeEvent::new(ChangeKind::Deleted, path)),
        )
        .collect()
}
