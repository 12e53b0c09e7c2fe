use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;

// E.g. `tank/enc/freqsnap@autosnap_2025-10-12_21:40:13_daily`
pub type SnapshotFullName = String;
// E.g. `autosnap_2025-10-12_21:40:13_daily`
pub type SnapshotName = String;
// E.g. `tank/enc/freqsnap`
pub type DatasetName = String;

/// One snapshot of one dataset. A history is a `Vec<SnapshotRecord>` sorted
/// ascending by `createtxg`, which is creation order regardless of what either
/// side's wall clock claims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotRecord {
    pub dataset: DatasetName,
    pub name: SnapshotName,
    pub createtxg: u64,
}

impl SnapshotRecord {
    pub fn new(
        dataset: impl Into<DatasetName>,
        name: impl Into<SnapshotName>,
        createtxg: u64,
    ) -> Self {
        Self {
            dataset: dataset.into(),
            name: name.into(),
            createtxg,
        }
    }

    pub fn id(&self) -> SnapshotId {
        SnapshotId {
            dataset: self.dataset.clone(),
            name: self.name.clone(),
        }
    }

    pub fn full_name(&self) -> SnapshotFullName {
        format!("{}@{}", self.dataset, self.name)
    }
}

impl PartialOrd for SnapshotRecord {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for SnapshotRecord {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Order first by dataset name (for nice "a", "a/b", "a/b/c", "a/d"
        // ordering), then by creation order within the dataset. The name
        // tiebreak keeps the order total when two snapshots share a txg.
        self.dataset
            .cmp(&other.dataset)
            .then(self.createtxg.cmp(&other.createtxg))
            .then(self.name.cmp(&other.name))
    }
}

/// `dataset@name`, the operand form taken by `zfs send`, `zfs snapshot` and
/// `zfs destroy`. Both halves are always present, so a bare dataset name can
/// never reach a destructive command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotId {
    pub dataset: DatasetName,
    pub name: SnapshotName,
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.dataset, self.name)
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SnapshotListEntry {
    // Checked during parsing, never read afterwards.
    #[serde(rename = "type")]
    #[allow(dead_code)]
    pub datasettype: SnapshotType,
    pub createtxg: u64,
    pub dataset: DatasetName,
    pub snapshot_name: SnapshotName,
}

impl From<SnapshotListEntry> for SnapshotRecord {
    fn from(entry: SnapshotListEntry) -> Self {
        SnapshotRecord {
            dataset: entry.dataset,
            name: entry.snapshot_name,
            createtxg: entry.createtxg,
        }
    }
}

// By only implementing the snapshot value we reject anything that's not a snapshot.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SnapshotType {
    #[serde(rename = "SNAPSHOT")]
    Snapshot,
}

/// Parsed `zfs list -t snapshot --json --json-int` output. The map is keyed
/// by full snapshot name; creation order lives in `createtxg`, not here.
#[derive(Deserialize, Debug, Clone)]
pub struct ZfsListSnapshotOutput {
    pub datasets: BTreeMap<SnapshotFullName, SnapshotListEntry>,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DatasetListEntry {
    // Checked during parsing, never read afterwards.
    #[serde(rename = "type")]
    #[allow(dead_code)]
    pub datasettype: FilesystemType,
}

// Same trick as `SnapshotType`: volumes and bookmarks fail to parse.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FilesystemType {
    #[serde(rename = "FILESYSTEM")]
    Filesystem,
}

/// Parsed `zfs list -t filesystem --json` output, keyed (and therefore
/// name-ordered) by dataset path.
#[derive(Deserialize, Debug, Clone)]
pub struct ZfsListDatasetOutput {
    pub datasets: BTreeMap<DatasetName, DatasetListEntry>,
}
