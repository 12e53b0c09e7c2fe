use tracing::{debug, info, warn};

use crate::endpoint::Endpoint;
use crate::error::ReplicateError;
use crate::history;
use crate::ops::{DatasetOp, DatasetOps, Side};
use crate::plan::{plan_transfer, TransferPlan};
use crate::zfs_types::{DatasetName, SnapshotId, SnapshotName, SnapshotRecord};

/// Behaviour switches for one run, built once from the CLI and passed down by
/// reference.
#[derive(Debug, Clone, Default)]
pub struct ReplicationOptions {
    /// Replicate child datasets of the source root too.
    pub children: bool,
    /// Send every intermediate snapshot instead of jumping to the newest.
    pub recursive_snapshots: bool,
    /// Destroy target snapshots that no longer exist on the source.
    pub destroy: bool,
    /// Print the commands that would run without executing any of them.
    pub dry_run: bool,
    /// Include dataset properties in the send streams.
    pub preserve_properties: bool,
    /// Create the snapshot named by the source operand before replicating.
    pub create_snapshot: bool,
    /// Remote shell override, `ssh` plus arguments by default.
    pub remote_shell: Option<String>,
}

/// What happened (or, on a dry run, what would happen) to one dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    pub transfer: TransferPlan,
    pub destroyed: usize,
}

#[derive(Debug)]
pub struct DatasetReport {
    pub source: DatasetName,
    /// `None` when the failure happened before a target path existed.
    pub target: Option<DatasetName>,
    pub outcome: Result<Applied, ReplicateError>,
}

/// Per-dataset outcomes in processing order, collected no matter how many
/// datasets fail along the way.
#[derive(Debug)]
pub struct RunReport {
    dry_run: bool,
    pub datasets: Vec<DatasetReport>,
}

impl RunReport {
    fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            datasets: Vec::new(),
        }
    }

    fn push(&mut self, entry: DatasetReport) {
        if let Err(err) = &entry.outcome {
            warn!("`{}` failed: {err}", entry.source);
        }
        self.datasets.push(entry);
    }

    pub fn failures(&self) -> usize {
        self.datasets
            .iter()
            .filter(|entry| entry.outcome.is_err())
            .count()
    }

    pub fn render(&self) -> String {
        use std::fmt::Write;

        let mut out = String::new();
        for entry in &self.datasets {
            let _ = writeln!(out, "{}", self.render_entry(entry));
        }
        let _ = writeln!(
            out,
            "{} dataset(s), {} failure(s)",
            self.datasets.len(),
            self.failures()
        );
        out
    }

    fn render_entry(&self, entry: &DatasetReport) -> String {
        let heading = match &entry.target {
            Some(target) => format!("{} -> {target}", entry.source),
            None => entry.source.clone(),
        };
        let applied = match &entry.outcome {
            Err(err) => return format!("{heading}: failed: {err}"),
            Ok(applied) => applied,
        };
        let action = match &applied.transfer {
            TransferPlan::NoOp => "up to date".to_string(),
            TransferPlan::FullSend { snapshot } => format!(
                "{} `{}` in full",
                self.verb("sent", "would send"),
                snapshot.full_name()
            ),
            TransferPlan::IncrementalChain { from, through } => format!(
                "{} {} snapshot(s) after `{}`",
                self.verb("sent", "would send"),
                through.len(),
                from.full_name()
            ),
        };
        let pruned = if applied.destroyed > 0 {
            format!(
                ", {} {} obsolete snapshot(s)",
                self.verb("destroyed", "would destroy"),
                applied.destroyed
            )
        } else {
            String::new()
        };
        format!("{heading}: {action}{pruned}")
    }

    fn verb<'a>(&self, did: &'a str, would: &'a str) -> &'a str {
        if self.dry_run {
            would
        } else {
            did
        }
    }
}

/// Replicate the source endpoint onto the target: one dataset, or its whole
/// subtree with `children`. Dataset failures are recorded and the remaining
/// datasets still run.
pub fn replicate(
    ops: &impl DatasetOps,
    source: &Endpoint,
    target: &Endpoint,
    options: &ReplicationOptions,
) -> RunReport {
    let mut report = RunReport::new(options.dry_run);

    // Snapshot creation happens once, up front. If it fails there is nothing
    // sensible to replicate afterwards.
    if options.create_snapshot {
        if let Err(err) = create_requested_snapshot(ops, source, options) {
            report.push(DatasetReport {
                source: source.dataset.clone(),
                target: Some(target.dataset.clone()),
                outcome: Err(err),
            });
            return report;
        }
    }

    let datasets = match ops.list_datasets(Side::Source, &source.dataset, options.children) {
        Ok(datasets) => datasets,
        Err(err) => {
            report.push(DatasetReport {
                source: source.dataset.clone(),
                target: Some(target.dataset.clone()),
                outcome: Err(err),
            });
            return report;
        }
    };

    for dataset in datasets {
        // Keep only names that extend the root at a `/` boundary; a name
        // like `tank/src2` is not under `tank/src`.
        if !in_subtree(&source.dataset, &dataset) {
            debug!("skipping `{dataset}`: not under `{}`", source.dataset);
            continue;
        }
        let entry = match map_dataset_path(&source.dataset, &target.dataset, &dataset) {
            Ok(target_dataset) => {
                let outcome = replicate_dataset(
                    ops,
                    &dataset,
                    &target_dataset,
                    source.snapshot.as_ref(),
                    options,
                );
                DatasetReport {
                    source: dataset,
                    target: Some(target_dataset),
                    outcome,
                }
            }
            Err(err) => DatasetReport {
                source: dataset,
                target: None,
                outcome: Err(err),
            },
        };
        report.push(entry);
    }
    report
}

fn create_requested_snapshot(
    ops: &impl DatasetOps,
    source: &Endpoint,
    options: &ReplicationOptions,
) -> Result<(), ReplicateError> {
    let Some(name) = source.snapshot.clone() else {
        // The CLI refuses this combination before we get here.
        warn!("snapshot creation requested but the source operand names no snapshot");
        return Ok(());
    };
    let snapshot = SnapshotId {
        dataset: source.dataset.clone(),
        name,
    };
    if ops.snapshot_exists(Side::Source, &snapshot)? {
        return Err(ReplicateError::AlreadyExists {
            snapshot: snapshot.to_string(),
        });
    }
    perform(
        ops,
        &DatasetOp::CreateSnapshot {
            side: Side::Source,
            snapshot,
            recursive: options.children,
        },
        options.dry_run,
    )
}

fn replicate_dataset(
    ops: &impl DatasetOps,
    dataset: &DatasetName,
    target_dataset: &DatasetName,
    requested: Option<&SnapshotName>,
    options: &ReplicationOptions,
) -> Result<Applied, ReplicateError> {
    let target_exists = ops.dataset_exists(Side::Target, target_dataset)?;
    if !target_exists {
        // The stream needs somewhere to land.
        perform(
            ops,
            &DatasetOp::CreateDataset {
                side: Side::Target,
                dataset: target_dataset.clone(),
            },
            options.dry_run,
        )?;
    }

    let mut source_history = ops.list_snapshots(Side::Source, dataset)?;
    if options.create_snapshot && options.dry_run {
        // The snapshot was only notionally created; give the planner the
        // history it would have seen.
        simulate_created_snapshot(&mut source_history, dataset, requested);
    }
    // A dataset we just created, or would create, has nothing to list.
    let target_history = if target_exists {
        ops.list_snapshots(Side::Target, target_dataset)?
    } else {
        Vec::new()
    };

    let transfer = plan_transfer(
        dataset,
        &source_history,
        &target_history,
        requested,
        options.recursive_snapshots,
    )?;
    execute_transfer(ops, &transfer, target_dataset, options)?;

    let destroyed = if options.destroy {
        prune_dataset(ops, &source_history, &target_history, options.dry_run)?
    } else {
        0
    };

    Ok(Applied {
        transfer,
        destroyed,
    })
}

fn simulate_created_snapshot(
    history: &mut Vec<SnapshotRecord>,
    dataset: &DatasetName,
    requested: Option<&SnapshotName>,
) {
    let Some(name) = requested else { return };
    if history.iter().any(|record| &record.name == name) {
        return;
    }
    let next_txg = history.last().map_or(1, |record| record.createtxg + 1);
    history.push(SnapshotRecord::new(dataset.clone(), name.clone(), next_txg));
}

fn execute_transfer(
    ops: &impl DatasetOps,
    transfer: &TransferPlan,
    target_dataset: &DatasetName,
    options: &ReplicationOptions,
) -> Result<(), ReplicateError> {
    match transfer {
        TransferPlan::NoOp => {
            debug!("`{target_dataset}` is already up to date");
            Ok(())
        }
        TransferPlan::FullSend { snapshot } => perform(
            ops,
            &DatasetOp::TransferFull {
                snapshot: snapshot.id(),
                target_dataset: target_dataset.clone(),
                preserve_properties: options.preserve_properties,
            },
            options.dry_run,
        ),
        TransferPlan::IncrementalChain { from, through } => perform(
            ops,
            &DatasetOp::TransferIncremental {
                from: from.id(),
                through: through.iter().map(SnapshotRecord::id).collect(),
                target_dataset: target_dataset.clone(),
                preserve_properties: options.preserve_properties,
            },
            options.dry_run,
        ),
    }
}

/// Destroy target snapshots the source no longer has, oldest first. Only runs
/// once the transfer step has finished cleanly, and the first failed destroy
/// stops the rest of this dataset's destroys.
fn prune_dataset(
    ops: &impl DatasetOps,
    source_history: &[SnapshotRecord],
    target_history: &[SnapshotRecord],
    dry_run: bool,
) -> Result<usize, ReplicateError> {
    let mut destroyed = 0;
    for obsolete in history::obsolete_on_target(source_history, target_history) {
        perform(
            ops,
            &DatasetOp::DestroySnapshot {
                side: Side::Target,
                snapshot: obsolete.id(),
            },
            dry_run,
        )?;
        destroyed += 1;
    }
    Ok(destroyed)
}

/// The one gate every mutation passes through: apply the operation, or under
/// dry-run print the command it stands for and touch nothing.
fn perform(
    ops: &impl DatasetOps,
    op: &DatasetOp,
    dry_run: bool,
) -> Result<(), ReplicateError> {
    if dry_run {
        println!("DRY RUN: {}", ops.render(op));
        return Ok(());
    }
    info!("{op}");
    ops.apply(op)
}

/// `path` is the root itself or extends it at a `/` boundary; `tank/src`
/// covers `tank/src/db` but never `tank/src2/db`.
fn in_subtree(root: &str, path: &str) -> bool {
    match path.strip_prefix(root) {
        Some("") => true,
        Some(rest) => rest.starts_with('/'),
        None => false,
    }
}

fn map_dataset_path(
    source_root: &str,
    target_root: &str,
    dataset: &str,
) -> Result<DatasetName, ReplicateError> {
    match dataset.strip_prefix(source_root) {
        Some("") => Ok(target_root.to_string()),
        Some(rest) if rest.starts_with('/') => Ok(format!("{target_root}{rest}")),
        _ => Err(ReplicateError::PathMapping {
            dataset: dataset.to_string(),
            source_root: source_root.to_string(),
        }),
    }
}
