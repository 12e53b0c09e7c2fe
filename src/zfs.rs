use anyhow::Context;
use tracing::debug;

use crate::commands::{
    make_run_via_remote_shell_command, make_which_zfs_command, make_zfs_create_dataset_command,
    make_zfs_create_snapshot_command, make_zfs_dataset_exists_command,
    make_zfs_destroy_snapshot_command, make_zfs_list_datasets_command,
    make_zfs_list_snapshots_command, make_zfs_receive_command, make_zfs_send_full_command,
    make_zfs_send_incremental_command, make_zfs_snapshot_exists_command, RemoteShell,
};
use crate::endpoint::Endpoint;
use crate::error::Result;
use crate::ops::{DatasetOp, DatasetOps, Side};
use crate::typed_command::{OutputType, PipedCommand, Runnable, TypedCommand};
use crate::zfs_types::{DatasetName, SnapshotId, SnapshotRecord};

/// One side's `zfs`: where the binary lives and how to reach the host.
struct ZfsExec {
    side: Side,
    host: Option<String>,
    shell: RemoteShell,
    zfs: String,
}

impl ZfsExec {
    fn new(side: Side, host: Option<String>, shell: RemoteShell) -> Self {
        Self {
            side,
            host,
            shell,
            zfs: "zfs".to_string(),
        }
    }

    /// Ask the side where its `zfs` lives, since remote non-interactive
    /// shells often lack the sbin directories in PATH. A failed probe keeps
    /// the plain name.
    fn resolve_zfs(&mut self) {
        let mut probe = self.command(make_which_zfs_command());
        match probe.run() {
            Ok(found) => {
                let path = found.output.trim();
                if !path.is_empty() {
                    debug!("zfs on the {} is `{path}`", self.side);
                    self.zfs = path.to_string();
                }
            }
            Err(err) => {
                debug!("`which zfs` probe on the {} failed, keeping `zfs`: {err:#}", self.side);
            }
        }
    }

    /// Route a command through the remote shell when this side is remote.
    fn command<O: OutputType>(&self, command: TypedCommand<O>) -> TypedCommand<O> {
        match &self.host {
            Some(host) => make_run_via_remote_shell_command(&self.shell, host, command),
            None => command,
        }
    }
}

/// The real `DatasetOps`: shells out to `zfs` on each side, locally or over
/// the remote shell.
pub struct ZfsOps {
    source: ZfsExec,
    target: ZfsExec,
}

impl ZfsOps {
    pub fn new(
        source: &Endpoint,
        target: &Endpoint,
        remote_shell: Option<&str>,
    ) -> anyhow::Result<Self> {
        let shell = RemoteShell::from_override(remote_shell)?;
        let mut ops = Self {
            source: ZfsExec::new(Side::Source, source.host.clone(), shell.clone()),
            target: ZfsExec::new(Side::Target, target.host.clone(), shell),
        };
        ops.source.resolve_zfs();
        ops.target.resolve_zfs();
        Ok(ops)
    }

    fn exec(&self, side: Side) -> &ZfsExec {
        match side {
            Side::Source => &self.source,
            Side::Target => &self.target,
        }
    }

    /// The command(s) behind one mutating operation. `None` only for an
    /// incremental transfer with an empty chain, which has nothing to run.
    fn build(&self, op: &DatasetOp) -> Option<BuiltOp> {
        match op {
            DatasetOp::CreateDataset { side, dataset } => {
                let exec = self.exec(*side);
                Some(BuiltOp::Single(
                    exec.command(make_zfs_create_dataset_command(&exec.zfs, dataset)),
                ))
            }
            DatasetOp::CreateSnapshot {
                side,
                snapshot,
                recursive,
            } => {
                let exec = self.exec(*side);
                Some(BuiltOp::Single(exec.command(
                    make_zfs_create_snapshot_command(&exec.zfs, snapshot, *recursive),
                )))
            }
            DatasetOp::DestroySnapshot { side, snapshot } => {
                let exec = self.exec(*side);
                Some(BuiltOp::Single(
                    exec.command(make_zfs_destroy_snapshot_command(&exec.zfs, snapshot)),
                ))
            }
            DatasetOp::TransferFull {
                snapshot,
                target_dataset,
                preserve_properties,
            } => {
                let send = self.source.command(make_zfs_send_full_command(
                    &self.source.zfs,
                    snapshot,
                    *preserve_properties,
                ));
                let receive = self
                    .target
                    .command(make_zfs_receive_command(&self.target.zfs, target_dataset));
                Some(BuiltOp::Pipe(PipedCommand::new(send, receive)))
            }
            DatasetOp::TransferIncremental {
                from,
                through,
                target_dataset,
                preserve_properties,
            } => {
                let end = through.last()?;
                let send = self.source.command(make_zfs_send_incremental_command(
                    &self.source.zfs,
                    from,
                    end,
                    through.len() > 1,
                    *preserve_properties,
                ));
                let receive = self
                    .target
                    .command(make_zfs_receive_command(&self.target.zfs, target_dataset));
                Some(BuiltOp::Pipe(PipedCommand::new(send, receive)))
            }
        }
    }
}

enum BuiltOp {
    Single(TypedCommand<()>),
    Pipe(PipedCommand<()>),
}

impl BuiltOp {
    fn run(&mut self) -> anyhow::Result<()> {
        match self {
            BuiltOp::Single(command) => command.run(),
            BuiltOp::Pipe(pipe) => pipe.run(),
        }
    }
}

impl std::fmt::Display for BuiltOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuiltOp::Single(command) => write!(f, "{command}"),
            BuiltOp::Pipe(pipe) => write!(f, "{pipe}"),
        }
    }
}

impl DatasetOps for ZfsOps {
    fn list_datasets(
        &self,
        side: Side,
        root: &DatasetName,
        include_descendants: bool,
    ) -> Result<Vec<DatasetName>> {
        let exec = self.exec(side);
        let listed = exec
            .command(make_zfs_list_datasets_command(&exec.zfs, root, include_descendants))
            .run()
            .with_context(|| format!("failed to list datasets under `{root}` on the {side}"))?;
        Ok(listed.output.datasets.into_keys().collect())
    }

    fn list_snapshots(&self, side: Side, dataset: &DatasetName) -> Result<Vec<SnapshotRecord>> {
        let exec = self.exec(side);
        let listed = exec
            .command(make_zfs_list_snapshots_command(&exec.zfs, dataset))
            .run()
            .with_context(|| format!("failed to list snapshots of `{dataset}` on the {side}"))?;
        let mut history: Vec<SnapshotRecord> = listed
            .output
            .datasets
            .into_values()
            // -d 1 already keeps the listing to this dataset; the filter
            // guards against surprises in what zfs decides to include.
            .filter(|entry| &entry.dataset == dataset)
            .map(SnapshotRecord::from)
            .collect();
        history.sort();
        Ok(history)
    }

    fn dataset_exists(&self, side: Side, dataset: &DatasetName) -> Result<bool> {
        let exec = self.exec(side);
        let exists = exec
            .command(make_zfs_dataset_exists_command(&exec.zfs, dataset))
            .succeeds()
            .with_context(|| format!("failed to check for `{dataset}` on the {side}"))?;
        Ok(exists)
    }

    fn snapshot_exists(&self, side: Side, snapshot: &SnapshotId) -> Result<bool> {
        let exec = self.exec(side);
        let exists = exec
            .command(make_zfs_snapshot_exists_command(&exec.zfs, snapshot))
            .succeeds()
            .with_context(|| format!("failed to check for `{snapshot}` on the {side}"))?;
        Ok(exists)
    }

    fn apply(&self, op: &DatasetOp) -> Result<()> {
        let Some(mut built) = self.build(op) else {
            return Ok(());
        };
        built.run().with_context(|| format!("failed to {op}"))?;
        Ok(())
    }

    fn render(&self, op: &DatasetOp) -> String {
        match self.build(op) {
            Some(built) => built.to_string(),
            None => format!("nothing to run for `{op}`"),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, clippy::indexing_slicing)]

    use super::*;

    fn endpoint(operand: &str) -> Endpoint {
        operand.parse().unwrap()
    }

    fn snapshot(dataset: &str, name: &str) -> SnapshotId {
        SnapshotId {
            dataset: dataset.to_string(),
            name: name.to_string(),
        }
    }

    #[test]
    fn renders_a_local_transfer_as_a_pipe() {
        let ops = ZfsOps::new(&endpoint("tank/a"), &endpoint("back/a"), None).unwrap();
        let rendered = ops.render(&DatasetOp::TransferFull {
            snapshot: snapshot("tank/a", "s1"),
            target_dataset: "back/a".to_string(),
            preserve_properties: false,
        });
        assert!(rendered.contains("send"), "no send in `{rendered}`");
        assert!(rendered.contains(" | "), "no pipe in `{rendered}`");
        assert!(rendered.contains("receive"), "no receive in `{rendered}`");
    }

    #[test]
    fn renders_remote_sides_behind_the_shell() {
        let ops = ZfsOps::new(&endpoint("tank/a"), &endpoint("nas:back/a"), None).unwrap();
        let rendered = ops.render(&DatasetOp::DestroySnapshot {
            side: Side::Target,
            snapshot: snapshot("back/a", "old"),
        });
        assert!(rendered.starts_with("ssh nas "), "unexpected `{rendered}`");
        assert!(rendered.contains("destroy"), "no destroy in `{rendered}`");
    }

    #[test]
    fn empty_incremental_chain_runs_nothing() {
        let ops = ZfsOps::new(&endpoint("tank/a"), &endpoint("back/a"), None).unwrap();
        let op = DatasetOp::TransferIncremental {
            from: snapshot("tank/a", "s1"),
            through: Vec::new(),
            target_dataset: "back/a".to_string(),
            preserve_properties: false,
        };
        assert!(ops.apply(&op).is_ok());
        assert!(ops.render(&op).contains("nothing to run"));
    }
}
