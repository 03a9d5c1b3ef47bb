//! Verify-dir command: a whole local tree against a remote root.

use anyhow::{Context, Result};
use objsync_core::config::ObjsyncConfig;
use objsync_core::retry::RetryPolicy;
use objsync_core::store::RemoteStore;
use objsync_core::verify::{verify_tree, VerifyOptions, VerifyStatus};
use std::path::Path;
use std::sync::Arc;

pub async fn run_verify_dir(
    store: Arc<dyn RemoteStore>,
    cfg: &ObjsyncConfig,
    remote_root: &str,
    local_root: &Path,
    threads: Option<u32>,
    network_threads: Option<u32>,
) -> Result<bool> {
    let retry = RetryPolicy::from_config(cfg.retry.as_ref());
    let options = VerifyOptions {
        network_lanes: network_threads.map_or(cfg.network_threads, |n| n as usize),
        verify_lanes: threads.map_or(cfg.verify_threads, |n| n as usize),
    };
    let report = verify_tree(store, retry, remote_root, local_root, &options)
        .await
        .with_context(|| format!("verify {} against {}", local_root.display(), remote_root))?;

    for entry in &report.entries {
        match (&entry.status, &entry.detail) {
            (VerifyStatus::Passed, _) => println!("{}: {}", entry.path, entry.status),
            (_, Some(detail)) => eprintln!("{}: {}", entry.path, detail),
            (status, None) => eprintln!("{}: {}", entry.path, status),
        }
    }
    println!();
    println!("Total passed: {}", report.passed);
    println!("Total mismatch: {}", report.mismatched);
    println!("Total missing (either local or remote): {}", report.missing);
    println!("Total skipped (due to error): {}", report.skipped);
    Ok(report.is_clean())
}
