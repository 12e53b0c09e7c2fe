#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod args;
mod commands;
mod endpoint;
mod error;
mod history;
mod ops;
mod plan;
mod replicate;
mod typed_command;
mod zfs;
mod zfs_types;

use args::{Cli, Command};
use endpoint::Endpoint;
use replicate::{replicate, RunReport};
use zfs::ZfsOps;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.command.verbose());

    match run(&cli.command) {
        Ok(report) => {
            print!("{}", report.render());
            if report.failures() == 0 {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(err) => {
            eprintln!("zefyr: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: &Command) -> anyhow::Result<RunReport> {
    let (source_operand, target_operand) = command.operands();
    let source: Endpoint = source_operand.parse().context("invalid source operand")?;
    let target: Endpoint = target_operand.parse().context("invalid target operand")?;
    if target.snapshot.is_some() {
        anyhow::bail!("the target operand cannot name a snapshot: `{target_operand}`");
    }
    let options = command.options();
    if options.create_snapshot && source.snapshot.is_none() {
        anyhow::bail!(
            "creating a snapshot needs the source operand to name one, \
             e.g. `{source_operand}@backup1`"
        );
    }

    let ops = ZfsOps::new(&source, &target, options.remote_shell.as_deref())?;
    Ok(replicate(&ops, &source, &target, &options))
}

/// Default to warnings only; -v turns on the debug-level command trace.
/// RUST_LOG still wins when set.
fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "zefyr=debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
