//! Constructors for every external command the tool runs. Nothing here
//! executes anything; callers decide where and whether to run them.

use anyhow::Context;
use shell_quote::QuoteInto;

use crate::typed_command::{OutputType, ParseableOutput, RawOutput, StringOutput, TypedCommand};
use crate::zfs_types::{DatasetName, SnapshotId, ZfsListDatasetOutput, ZfsListSnapshotOutput};

pub fn make_zfs_list_snapshots_command(
    zfs: &str,
    dataset: &DatasetName,
) -> TypedCommand<ParseableOutput<ZfsListSnapshotOutput>> {
    let mut c = TypedCommand::new(zfs);
    // Depth 1: the dataset's own snapshots, not its children's.
    c.args(["list", "-t", "snapshot", "--json", "--json-int", "-d", "1"]);
    c.arg(dataset);
    c
}

pub fn make_zfs_list_datasets_command(
    zfs: &str,
    root: &DatasetName,
    include_descendants: bool,
) -> TypedCommand<ParseableOutput<ZfsListDatasetOutput>> {
    let mut c = TypedCommand::new(zfs);
    c.args(["list", "-t", "filesystem", "--json"]);
    if include_descendants {
        c.arg("-r");
    }
    c.arg(root);
    c
}

pub fn make_zfs_dataset_exists_command(zfs: &str, dataset: &DatasetName) -> TypedCommand<()> {
    let mut c = TypedCommand::new(zfs);
    c.args(["list", "-Ho", "name"]);
    c.arg(dataset);
    c
}

pub fn make_zfs_snapshot_exists_command(zfs: &str, snapshot: &SnapshotId) -> TypedCommand<()> {
    let mut c = TypedCommand::new(zfs);
    c.args(["list", "-t", "snapshot", "-Ho", "name"]);
    c.arg(snapshot.to_string());
    c
}

pub fn make_zfs_create_dataset_command(zfs: &str, dataset: &DatasetName) -> TypedCommand<()> {
    let mut c = TypedCommand::new(zfs);
    // -p creates missing parents, like mkdir -p.
    c.args(["create", "-p"]);
    c.arg(dataset);
    c
}

pub fn make_zfs_create_snapshot_command(
    zfs: &str,
    snapshot: &SnapshotId,
    recursive: bool,
) -> TypedCommand<()> {
    let mut c = TypedCommand::new(zfs);
    c.arg("snapshot");
    if recursive {
        c.arg("-r");
    }
    c.arg(snapshot.to_string());
    c
}

/// The operand is a `SnapshotId`, never a bare dataset name, so this can only
/// ever destroy a snapshot.
pub fn make_zfs_destroy_snapshot_command(zfs: &str, snapshot: &SnapshotId) -> TypedCommand<()> {
    let mut c = TypedCommand::new(zfs);
    c.arg("destroy");
    c.arg(snapshot.to_string());
    c
}

pub fn make_zfs_send_full_command(
    zfs: &str,
    snapshot: &SnapshotId,
    preserve_properties: bool,
) -> TypedCommand<RawOutput> {
    let mut c = TypedCommand::new(zfs);
    c.arg("send");
    if preserve_properties {
        c.arg("-p");
    }
    c.arg(snapshot.to_string());
    c
}

pub fn make_zfs_send_incremental_command(
    zfs: &str,
    from: &SnapshotId,
    through: &SnapshotId,
    with_intermediates: bool,
    preserve_properties: bool,
) -> TypedCommand<RawOutput> {
    let mut c = TypedCommand::new(zfs);
    c.arg("send");
    if preserve_properties {
        c.arg("-p");
    }
    // -I replays every intermediate snapshot, -i jumps straight to the end.
    c.arg(if with_intermediates { "-I" } else { "-i" });
    c.arg(from.to_string());
    c.arg(through.to_string());
    c
}

pub fn make_zfs_receive_command(zfs: &str, dataset: &DatasetName) -> TypedCommand<()> {
    let mut c = TypedCommand::new(zfs);
    // -F rolls the target back to the incremental ancestor if it has drifted.
    c.args(["receive", "-F"]);
    c.arg(dataset);
    c
}

pub fn make_which_zfs_command() -> TypedCommand<StringOutput> {
    let mut c = TypedCommand::new("which");
    c.arg("zfs");
    c
}

/// The remote shell program and its leading arguments, `ssh` unless
/// overridden with something like `ssh -p 2222`.
#[derive(Debug, Clone)]
pub struct RemoteShell {
    program: String,
    args: Vec<String>,
}

impl RemoteShell {
    pub fn from_override(shell: Option<&str>) -> anyhow::Result<Self> {
        match shell {
            None => Ok(Self {
                program: "ssh".to_string(),
                args: Vec::new(),
            }),
            Some(raw) => {
                let mut words = raw.split_whitespace().map(str::to_string);
                let program = words.next().context("the remote shell command is empty")?;
                Ok(Self {
                    program,
                    args: words.collect(),
                })
            }
        }
    }
}

/// Wrap a command so it runs on `host` via the remote shell. The shell joins
/// its trailing words with spaces and hands them to a shell on the far side,
/// so every nested word is quoted for that shell first.
pub fn make_run_via_remote_shell_command<O: OutputType>(
    shell: &RemoteShell,
    host: &str,
    nested_command: TypedCommand<O>,
) -> TypedCommand<O> {
    let mut c = TypedCommand::new(&shell.program);
    c.args(&shell.args);
    c.arg(host);
    let mut quoted = std::ffi::OsString::new();
    shell_quote::Sh::quote_into(nested_command.get_program(), &mut quoted);
    c.arg(&quoted);
    for arg in nested_command.get_args() {
        let mut quoted = std::ffi::OsString::new();
        shell_quote::Sh::quote_into(arg, &mut quoted);
        c.arg(&quoted);
    }
    c
}
