//! Tests for watch, verify, ignore, dismiss, copy, open-folder, status, checksum and --config.

use super::parse;
use crate::cli::{Cli, CliCommand};
use clap::Parser;
use std::path::PathBuf;

#[test]
fn cli_parse_watch() {
    match parse(&["hashmatch", "watch"]) {
        CliCommand::Watch => {}
        _ => panic!("expected Watch"),
    }
}

#[test]
fn cli_parse_actions() {
    assert!(matches!(parse(&["hashmatch", "verify"]), CliCommand::Verify));
    assert!(matches!(parse(&["hashmatch", "ignore"]), CliCommand::Ignore));
    assert!(matches!(parse(&["hashmatch", "dismiss"]), CliCommand::Dismiss));
}

#[test]
fn cli_parse_copy_and_open_folder() {
    assert!(matches!(parse(&["hashmatch", "copy"]), CliCommand::Copy));
    assert!(matches!(parse(&["hashmatch", "copy-actual"]), CliCommand::Copy));
    assert!(matches!(
        parse(&["hashmatch", "open-folder"]),
        CliCommand::OpenFolder
    ));
}

#[test]
fn cli_parse_status() {
    match parse(&["hashmatch", "status"]) {
        CliCommand::Status { json } => assert!(!json),
        _ => panic!("expected Status"),
    }
    match parse(&["hashmatch", "status", "--json"]) {
        CliCommand::Status { json } => assert!(json),
        _ => panic!("expected Status"),
    }
}

#[test]
fn cli_parse_checksum() {
    match parse(&["hashmatch", "checksum", "/tmp/debian.iso"]) {
        CliCommand::Checksum { path } => assert_eq!(path, PathBuf::from("/tmp/debian.iso")),
        _ => panic!("expected Checksum"),
    }
}

#[test]
fn cli_parse_checksum_requires_path() {
    assert!(Cli::try_parse_from(["hashmatch", "checksum"]).is_err());
}

#[test]
fn cli_parse_global_config() {
    let cli = Cli::try_parse_from(["hashmatch", "watch", "--config", "/etc/hm.toml"]).unwrap();
    assert_eq!(cli.config, Some(PathBuf::from("/etc/hm.toml")));
    assert!(matches!(cli.command, CliCommand::Watch));

    let cli = Cli::try_parse_from(["hashmatch", "--config", "x.toml", "status"]).unwrap();
    assert_eq!(cli.config, Some(PathBuf::from("x.toml")));
}

#[test]
fn cli_rejects_unknown_subcommand() {
    assert!(Cli::try_parse_from(["hashmatch", "pause"]).is_err());
}
