//! CLI for objsync.

mod commands;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use objsync_core::config::{self, ObjsyncConfig};
use objsync_core::store::{DirStore, RemoteStore};
use std::path::PathBuf;
use std::sync::Arc;

use commands::{run_checksum, run_hash, run_list, run_sync, run_verify, run_verify_dir, SyncArgs};

/// Top-level CLI for objsync.
#[derive(Debug, Parser)]
#[command(name = "objsync")]
#[command(about = "objsync: sync a local tree to an object store and verify it by checksum", long_about = None)]
pub struct Cli {
    /// Root directory of the object store (overrides `store_dir` in config.toml).
    #[arg(long, global = true, value_name = "DIR")]
    pub store: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Upload a file or directory tree to a remote path.
    Sync(SyncArgs),

    /// Verify one local file against a remote object's checksums.
    Verify {
        /// Remote object key.
        key: String,
        /// Local file to check.
        path: PathBuf,
    },

    /// Verify every file under a local root against a remote root.
    VerifyDir {
        /// Remote root (prefix).
        remote_root: String,
        /// Local root directory.
        local_root: PathBuf,
        /// Files hashed concurrently (default from config: 512).
        #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
        threads: Option<u32>,
        /// Concurrent checksum requests (default from config: 16).
        #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
        network_threads: Option<u32>,
    },

    /// List remote objects.
    List {
        /// Only list keys starting with this prefix.
        #[arg(long, default_value = "")]
        prefix: String,
    },

    /// Print a remote object's checksum metadata as JSON.
    Checksum {
        /// Remote object key.
        key: String,
    },

    /// Compute the digest of a local file.
    Hash {
        /// Path to the file.
        path: PathBuf,
        /// Use SHA-1 instead of SHA-256.
        #[arg(long)]
        sha1: bool,
    },
}

impl CliCommand {
    /// Parse arguments and run. `Ok(false)` means the command ran but found
    /// failures (exit status 1).
    pub async fn run_from_args() -> Result<bool> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        if let CliCommand::Hash { path, sha1 } = &cli.command {
            run_hash(path, *sha1)?;
            return Ok(true);
        }

        let store = open_store(cli.store.as_ref(), &cfg).await?;
        match cli.command {
            CliCommand::Sync(args) => run_sync(store, &cfg, args).await,
            CliCommand::Verify { key, path } => run_verify(store, &cfg, &key, &path).await,
            CliCommand::VerifyDir {
                remote_root,
                local_root,
                threads,
                network_threads,
            } => {
                run_verify_dir(store, &cfg, &remote_root, &local_root, threads, network_threads).await
            }
            CliCommand::List { prefix } => run_list(store, &cfg, &prefix).await,
            CliCommand::Checksum { key } => run_checksum(store, &cfg, &key).await,
            CliCommand::Hash { .. } => Ok(true),
        }
    }
}

async fn open_store(flag: Option<&PathBuf>, cfg: &ObjsyncConfig) -> Result<Arc<dyn RemoteStore>> {
    let Some(dir) = flag.or(cfg.store_dir.as_ref()) else {
        bail!(
            "no store configured: pass --store <DIR> or set store_dir in {}",
            config::config_path()?.display()
        );
    };
    let store = DirStore::open(dir)
        .await
        .with_context(|| format!("open store at {}", dir.display()))?;
    Ok(Arc::new(store))
}

#[cfg(test)]
mod tests;
