//! List command: remote objects under a prefix.

use anyhow::Result;
use objsync_core::config::ObjsyncConfig;
use objsync_core::retry::{run_with_retry, RetryPolicy};
use objsync_core::store::RemoteStore;
use std::sync::Arc;
use std::time::UNIX_EPOCH;

pub async fn run_list(store: Arc<dyn RemoteStore>, cfg: &ObjsyncConfig, prefix: &str) -> Result<bool> {
    let retry = RetryPolicy::from_config(cfg.retry.as_ref());
    let listing = run_with_retry(&retry, "list objects", || store.list(prefix)).await?;
    let mut keys: Vec<_> = listing.keys().collect();
    keys.sort();
    for key in &keys {
        let entry = &listing[key.as_str()];
        let modified = entry
            .last_modified
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        println!("{:>14}  {:>10}  {}", entry.size, modified, key);
    }
    println!();
    println!("Total object count: {}", keys.len());
    Ok(true)
}
