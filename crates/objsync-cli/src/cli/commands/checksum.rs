//! Checksum command: print an object's checksum metadata.

use anyhow::Result;
use objsync_core::config::ObjsyncConfig;
use objsync_core::retry::{run_with_retry, RetryPolicy};
use objsync_core::store::RemoteStore;
use std::sync::Arc;

/// Fetch and print the checksum of `key` as pretty JSON.
pub async fn run_checksum(store: Arc<dyn RemoteStore>, cfg: &ObjsyncConfig, key: &str) -> Result<bool> {
    let retry = RetryPolicy::from_config(cfg.retry.as_ref());
    let key = key.trim_start_matches('/');
    let checksum = run_with_retry(&retry, "get object checksum", || store.get_checksum(key)).await?;
    println!("{}", serde_json::to_string_pretty(&checksum)?);
    Ok(true)
}
