use std::fmt;

use crate::error::Result;
use crate::zfs_types::{DatasetName, SnapshotId, SnapshotRecord};

/// Which half of the replication pair an operation runs against. Whether a
/// side sits behind a remote shell is invisible above this boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Source,
    Target,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Side::Source => "source",
            Side::Target => "target",
        })
    }
}

/// A mutating operation described as data. The engine builds these, then
/// either applies them or renders them, so a dry run and a real run take the
/// same path right up to the final step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetOp {
    CreateDataset {
        side: Side,
        dataset: DatasetName,
    },
    CreateSnapshot {
        side: Side,
        snapshot: SnapshotId,
        recursive: bool,
    },
    DestroySnapshot {
        side: Side,
        snapshot: SnapshotId,
    },
    TransferFull {
        snapshot: SnapshotId,
        target_dataset: DatasetName,
        preserve_properties: bool,
    },
    TransferIncremental {
        from: SnapshotId,
        through: Vec<SnapshotId>,
        target_dataset: DatasetName,
        preserve_properties: bool,
    },
}

impl fmt::Display for DatasetOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetOp::CreateDataset { side, dataset } => {
                write!(f, "create dataset `{dataset}` on the {side}")
            }
            DatasetOp::CreateSnapshot {
                side,
                snapshot,
                recursive,
            } => {
                let suffix = if *recursive { " and its children" } else { "" };
                write!(f, "create snapshot `{snapshot}`{suffix} on the {side}")
            }
            DatasetOp::DestroySnapshot { side, snapshot } => {
                write!(f, "destroy snapshot `{snapshot}` on the {side}")
            }
            DatasetOp::TransferFull {
                snapshot,
                target_dataset,
                ..
            } => write!(f, "send `{snapshot}` in full to `{target_dataset}`"),
            DatasetOp::TransferIncremental {
                from,
                through,
                target_dataset,
                ..
            } => write!(
                f,
                "send {} incremental snapshot(s) after `{from}` to `{target_dataset}`",
                through.len()
            ),
        }
    }
}

/// Everything the engine needs from the outside world. The real
/// implementation shells out to `zfs`; tests substitute an in-memory pair of
/// pools. Reads are plain methods; every mutation goes through `apply` so
/// there is exactly one seam to close for a dry run.
pub trait DatasetOps {
    /// Datasets at and under `root` on one side, in name order. Without
    /// `include_descendants` only the root itself is listed.
    fn list_datasets(
        &self,
        side: Side,
        root: &DatasetName,
        include_descendants: bool,
    ) -> Result<Vec<DatasetName>>;

    /// The dataset's own snapshots in creation order, oldest first.
    fn list_snapshots(&self, side: Side, dataset: &DatasetName) -> Result<Vec<SnapshotRecord>>;

    fn dataset_exists(&self, side: Side, dataset: &DatasetName) -> Result<bool>;

    fn snapshot_exists(&self, side: Side, snapshot: &SnapshotId) -> Result<bool>;

    /// Carry out one mutating operation.
    fn apply(&self, op: &DatasetOp) -> Result<()>;

    /// The command `apply` would run, for dry-run output.
    fn render(&self, op: &DatasetOp) -> String;
}
