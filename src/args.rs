use clap::{Args, Parser, Subcommand};

use crate::replicate::ReplicationOptions;

#[derive(Parser, Debug)]
#[command(version, about = "Snapshot-based ZFS backup and restore over ssh")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replicate snapshots from a source dataset to a backup target.
    Backup(BackupArgs),
    /// Replicate snapshots from a backup back onto a target dataset.
    Restore(RestoreArgs),
}

impl Command {
    /// The source and target operands, in transfer direction.
    pub fn operands(&self) -> (&str, &str) {
        match self {
            Command::Backup(args) => (&args.source, &args.target),
            Command::Restore(args) => (&args.source, &args.target),
        }
    }

    pub fn verbose(&self) -> bool {
        match self {
            Command::Backup(args) => args.verbose,
            Command::Restore(args) => args.verbose,
        }
    }

    pub fn options(&self) -> ReplicationOptions {
        match self {
            Command::Backup(args) => ReplicationOptions {
                children: args.children,
                recursive_snapshots: args.recursive,
                destroy: args.destroy,
                dry_run: args.dry_run,
                preserve_properties: args.preserve_properties,
                create_snapshot: args.snapshot,
                remote_shell: args.rsh.clone(),
            },
            // Restoring is a plain copy back: nothing on the backup side gets
            // created or destroyed.
            Command::Restore(args) => ReplicationOptions {
                children: args.children,
                recursive_snapshots: false,
                destroy: false,
                dry_run: args.dry_run,
                preserve_properties: args.preserve_properties,
                create_snapshot: false,
                remote_shell: args.rsh.clone(),
            },
        }
    }
}

#[derive(Args, Debug)]
pub struct BackupArgs {
    /// Source, `[USER@]HOST:DATASET[@SNAPSHOT]` or `DATASET[@SNAPSHOT]`.
    pub source: String,
    /// Target, `[USER@]HOST:DATASET` or `DATASET`.
    pub target: String,

    /// Replicate child datasets of the source as well.
    #[arg(short, long)]
    pub children: bool,
    /// Send every intermediate snapshot, not just the newest.
    #[arg(short, long)]
    pub recursive: bool,
    /// Destroy target snapshots that no longer exist on the source.
    #[arg(short, long)]
    pub destroy: bool,
    /// Print the commands that would run without executing them.
    #[arg(short = 'n', long)]
    pub dry_run: bool,
    /// Preserve dataset properties in the send streams.
    #[arg(short, long)]
    pub preserve_properties: bool,
    /// Create the snapshot named by the source operand first.
    #[arg(short, long)]
    pub snapshot: bool,
    /// Remote shell to use instead of `ssh`, e.g. `ssh -p 2222`.
    #[arg(short = 'e', long = "rsh", value_name = "COMMAND")]
    pub rsh: Option<String>,
    /// Print verbose tracelogs.
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Args, Debug)]
pub struct RestoreArgs {
    /// Source, `[USER@]HOST:DATASET[@SNAPSHOT]` or `DATASET[@SNAPSHOT]`.
    pub source: String,
    /// Target, `[USER@]HOST:DATASET` or `DATASET`.
    pub target: String,

    /// Restore child datasets of the source as well.
    #[arg(short, long)]
    pub children: bool,
    /// Print the commands that would run without executing them.
    #[arg(short = 'n', long)]
    pub dry_run: bool,
    /// Preserve dataset properties in the send streams.
    #[arg(short, long)]
    pub preserve_properties: bool,
    /// Remote shell to use instead of `ssh`, e.g. `ssh -p 2222`.
    #[arg(short = 'e', long = "rsh", value_name = "COMMAND")]
    pub rsh: Option<String>,
    /// Print verbose tracelogs.
    #[arg(short, long)]
    pub verbose: bool,
}
