use thiserror::Error;

use crate::zfs_types::{DatasetName, SnapshotFullName};

pub type Result<T> = std::result::Result<T, ReplicateError>;

/// Everything that can go wrong while replicating one dataset. Failures are
/// recorded per dataset in the run report rather than aborting the run.
#[derive(Debug, Error)]
pub enum ReplicateError {
    #[error("snapshot `{snapshot}` does not exist on the source")]
    NotFound { snapshot: SnapshotFullName },

    #[error("snapshot `{snapshot}` already exists; refusing to recreate it")]
    AlreadyExists { snapshot: SnapshotFullName },

    #[error(
        "snapshot `{snapshot}` is older than `{ancestor}`, which the target \
         already has; converging would roll the target back"
    )]
    TargetAhead {
        snapshot: SnapshotFullName,
        ancestor: SnapshotFullName,
    },

    #[error("dataset `{dataset}` is not under `{source_root}`, cannot map it onto the target")]
    PathMapping {
        dataset: DatasetName,
        source_root: DatasetName,
    },

    /// An external command failed. The wrapped error carries the command and
    /// its captured output.
    #[error("{0:#}")]
    OperationFailed(anyhow::Error),
}

impl From<anyhow::Error> for ReplicateError {
    fn from(err: anyhow::Error) -> Self {
        ReplicateError::OperationFailed(err)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, clippy::indexing_slicing)]

    use super::*;

    #[test]
    fn operation_failed_renders_the_context_chain() {
        let inner = anyhow::anyhow!("exit status 1");
        let err = ReplicateError::from(inner.context("failed to list snapshots"));
        assert_eq!(err.to_string(), "failed to list snapshots: exit status 1");
    }

    #[test]
    fn target_ahead_names_both_snapshots() {
        let err = ReplicateError::TargetAhead {
            snapshot: "tank/a@s1".to_string(),
            ancestor: "tank/a@s2".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("tank/a@s1"));
        assert!(message.contains("tank/a@s2"));
    }
}
