//! Pure comparisons between a source and a target snapshot history.
//!
//! Histories arrive sorted by `createtxg` ascending. Snapshots correspond
//! across sides by short name only; txg values are pool-local and never
//! compared between sides.

use std::collections::BTreeSet;

use crate::zfs_types::{SnapshotName, SnapshotRecord};

/// The newest source snapshot whose name also exists on the target, scanning
/// the source history newest to oldest. Source order decides "latest" even if
/// the target disagrees about creation order.
pub fn latest_common_snapshot<'s>(
    source: &'s [SnapshotRecord],
    target: &[SnapshotRecord],
) -> Option<&'s SnapshotRecord> {
    let target_names: BTreeSet<&str> = target.iter().map(|s| s.name.as_str()).collect();
    source
        .iter()
        .rev()
        .find(|s| target_names.contains(s.name.as_str()))
}

/// Target snapshots whose names no longer exist on the source, in target
/// history order (oldest first). Empty when either history is empty: with no
/// source history nothing can be called obsolete, and an empty target has
/// nothing to prune.
pub fn obsolete_on_target(
    source: &[SnapshotRecord],
    target: &[SnapshotRecord],
) -> Vec<SnapshotRecord> {
    if source.is_empty() || target.is_empty() {
        return Vec::new();
    }
    let source_names: BTreeSet<&str> = source.iter().map(|s| s.name.as_str()).collect();
    target
        .iter()
        .filter(|s| !source_names.contains(s.name.as_str()))
        .cloned()
        .collect()
}

/// Source snapshots strictly after `from`, in history order. `None` means
/// everything; a `from` that is missing from the history yields nothing.
pub fn pending_after<'s>(
    source: &'s [SnapshotRecord],
    from: Option<&SnapshotName>,
) -> &'s [SnapshotRecord] {
    match from {
        None => source,
        Some(name) => match source.iter().position(|s| &s.name == name) {
            Some(at) => source.get(at + 1..).unwrap_or(&[]),
            None => &[],
        },
    }
}
