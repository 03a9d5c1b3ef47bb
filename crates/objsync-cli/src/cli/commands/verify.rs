//! Verify command: one local file against one remote object.

use anyhow::{Context, Result};
use objsync_core::config::ObjsyncConfig;
use objsync_core::retry::RetryPolicy;
use objsync_core::store::RemoteStore;
use objsync_core::verify::verify_object;
use std::path::Path;
use std::sync::Arc;

pub async fn run_verify(
    store: Arc<dyn RemoteStore>,
    cfg: &ObjsyncConfig,
    key: &str,
    path: &Path,
) -> Result<bool> {
    let retry = RetryPolicy::from_config(cfg.retry.as_ref());
    let matched = verify_object(store.as_ref(), &retry, key, path)
        .await
        .with_context(|| format!("verify {} against {}", path.display(), key))?;
    if matched {
        println!("Checksums match.");
    } else {
        eprintln!("Checksums do not match.");
    }
    Ok(matched)
}
