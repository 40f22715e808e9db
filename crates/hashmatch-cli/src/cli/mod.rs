//! CLI for hashmatch.

mod commands;
pub mod control_socket;

use anyhow::Result;
use clap::{Parser, Subcommand};
use hashmatch_core::{config, UserAction};
use std::path::PathBuf;

use commands::{run_action, run_checksum, run_copy, run_open_folder, run_status, run_watch};

/// Top-level CLI for hashmatch.
#[derive(Debug, Parser)]
#[command(name = "hashmatch")]
#[command(
    about = "hashmatch: digest finished downloads and check them against a copied checksum",
    long_about = None
)]
pub struct Cli {
    /// Use this config file instead of the default one.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Watch download folders and the clipboard until interrupted.
    Watch,

    /// Ask the running watcher to compare the next copied digest with the current file.
    Verify,

    /// Forget the current file.
    Ignore,

    /// Stop waiting for a digest, keeping the current file.
    Dismiss,

    /// Copy the current file's digest to the clipboard.
    #[command(alias = "copy-actual")]
    Copy,

    /// Open the folder holding the current file.
    OpenFolder,

    /// Show what the running watcher is tracking.
    Status {
        /// Print the raw JSON snapshot.
        #[arg(long)]
        json: bool,
    },

    /// Print the configured digests of a file.
    Checksum {
        /// Path to the file.
        path: PathBuf,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = match &cli.config {
            Some(path) => config::load_or_init_at(path)?,
            None => config::load_or_init()?,
        };
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Watch => run_watch(&cfg).await?,
            CliCommand::Verify => run_action(UserAction::RequestVerify).await?,
            CliCommand::Ignore => run_action(UserAction::Ignore).await?,
            CliCommand::Dismiss => run_action(UserAction::Dismiss).await?,
            CliCommand::Copy => run_copy().await?,
            CliCommand::OpenFolder => run_open_folder().await?,
            CliCommand::Status { json } => run_status(json).await?,
            CliCommand::Checksum { path } => run_checksum(&cfg, &path).await?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
