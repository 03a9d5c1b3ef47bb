//! Tests for verify, verify-dir, list, checksum and hash.

use super::{parse, Cli};
use crate::cli::CliCommand;
use clap::Parser;
use std::path::PathBuf;

#[test]
fn cli_parse_verify() {
    match parse(&["objsync", "verify", "backups/db.dump", "/var/db.dump"]) {
        CliCommand::Verify { key, path } => {
            assert_eq!(key, "backups/db.dump");
            assert_eq!(path, PathBuf::from("/var/db.dump"));
        }
        _ => panic!("expected Verify"),
    }
}

#[test]
fn cli_parse_verify_dir() {
    match parse(&["objsync", "verify-dir", "site", "public", "--threads", "64", "--network-threads", "4"]) {
        CliCommand::VerifyDir {
            remote_root,
            local_root,
            threads,
            network_threads,
        } => {
            assert_eq!(remote_root, "site");
            assert_eq!(local_root, PathBuf::from("public"));
            assert_eq!(threads, Some(64));
            assert_eq!(network_threads, Some(4));
        }
        _ => panic!("expected VerifyDir"),
    }
    assert!(Cli::try_parse_from(["objsync", "verify-dir", "a", "b", "--threads", "0"]).is_err());
}

#[test]
fn cli_parse_list() {
    match parse(&["objsync", "list"]) {
        CliCommand::List { prefix } => assert_eq!(prefix, ""),
        _ => panic!("expected List"),
    }
    match parse(&["objsync", "--store", "/s", "list", "--prefix", "logs/"]) {
        CliCommand::List { prefix } => assert_eq!(prefix, "logs/"),
        _ => panic!("expected List"),
    }
}

#[test]
fn cli_parse_checksum() {
    match parse(&["objsync", "checksum", "a/b.bin"]) {
        CliCommand::Checksum { key } => assert_eq!(key, "a/b.bin"),
        _ => panic!("expected Checksum"),
    }
}

#[test]
fn cli_parse_hash() {
    match parse(&["objsync", "hash", "/tmp/file.iso", "--sha1"]) {
        CliCommand::Hash { path, sha1 } => {
            assert_eq!(path, PathBuf::from("/tmp/file.iso"));
            assert!(sha1);
        }
        _ => panic!("expected Hash"),
    }
}

#[test]
fn cli_requires_a_subcommand() {
    assert!(Cli::try_parse_from(["objsync"]).is_err());
}
