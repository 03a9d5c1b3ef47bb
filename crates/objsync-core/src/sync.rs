//! End-to-end sync of a local file or directory to a remote prefix.

use std::path::Path;
use std::sync::Arc;

use crate::error::SyncError;
use crate::filter::PathFilter;
use crate::local;
use crate::planner::{self, run_deletes, FileFailure, PlanOptions, TransferTask};
use crate::retry::run_with_retry;
use crate::scheduler::{run_transfers, LaneTally};
use crate::upload::{upload_file, TransferContext};

#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Applied to local relative paths and to remote keys below the root.
    pub filter: PathFilter,
    /// Delete remote objects with no local counterpart.
    pub delete_remote: bool,
    /// Concurrent upload lanes.
    pub lanes: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            filter: PathFilter::default(),
            delete_remote: false,
            lanes: 8,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub total_local: usize,
    pub total_remote: usize,
    pub uploaded: usize,
    pub uploaded_bytes: u64,
    pub failed: usize,
    pub deleted: usize,
    pub failed_delete: usize,
    pub skipped: usize,
    pub excluded_local: usize,
    pub excluded_remote: usize,
    pub failures: Vec<FileFailure>,
}

impl SyncReport {
    pub fn has_failures(&self) -> bool {
        self.failed > 0 || self.failed_delete > 0
    }
}

/// Strip a leading `/`; a directory root also gets a trailing `/` unless empty.
pub fn normalize_remote_path(remote: &str, directory: bool) -> String {
    let mut path = remote.trim_start_matches('/').to_string();
    if directory && !path.is_empty() && !path.ends_with('/') {
        path.push('/');
    }
    path
}

/// Sync `local_path` (a file or a directory tree) to `remote_path`.
pub async fn sync(
    ctx: Arc<TransferContext>,
    local_path: &Path,
    remote_path: &str,
    options: &SyncOptions,
) -> Result<SyncReport, SyncError> {
    let info = local::stat(local_path)?;
    if info.is_dir {
        sync_dir(ctx, local_path, remote_path, options).await
    } else if info.is_file {
        sync_file(&ctx, local_path, remote_path).await
    } else {
        Err(SyncError::NotFileOrDirectory(local_path.to_path_buf()))
    }
}

async fn sync_dir(
    ctx: Arc<TransferContext>,
    local_root: &Path,
    remote_path: &str,
    options: &SyncOptions,
) -> Result<SyncReport, SyncError> {
    let remote_root = normalize_remote_path(remote_path, true);
    let listing = async {
        run_with_retry(&ctx.retry, "list objects", || ctx.store.list(&remote_root))
            .await
            .map_err(SyncError::from)
    };
    let (listing, files) = tokio::try_join!(listing, local::scan_dir_async(local_root))?;

    let plan_options = PlanOptions {
        filter: options.filter.clone(),
        ignore_mtime: ctx.options.ignore_mtime,
        delete_remote: options.delete_remote,
    };
    let plan = planner::plan(listing, &files, local_root, &remote_root, &plan_options);
    tracing::info!(
        local = plan.total_local,
        remote = plan.total_remote,
        pending = plan.pending.len(),
        pending_bytes = plan.pending_bytes(),
        deletes = plan.delete_count(),
        "sync planned"
    );

    let deletes = run_deletes(Arc::clone(&ctx.store), ctx.retry, plan.delete_batches);
    let transfers = run_transfers(Arc::clone(&ctx), plan.pending, options.lanes);
    let (deleted, transferred) = tokio::join!(deletes, transfers);

    let mut failures = plan.unreadable;
    let unreadable = failures.len();
    failures.extend(transferred.failures);
    failures.extend(deleted.failed_keys.into_iter().map(|key| FileFailure {
        path: key,
        error: "delete failed".to_string(),
    }));

    Ok(SyncReport {
        total_local: plan.total_local,
        total_remote: plan.total_remote,
        uploaded: transferred.uploaded,
        uploaded_bytes: transferred.uploaded_bytes,
        failed: transferred.failed + unreadable,
        deleted: deleted.deleted,
        failed_delete: deleted.failed,
        skipped: plan.skipped + transferred.skipped,
        excluded_local: plan.excluded_local,
        excluded_remote: plan.excluded_remote,
        failures,
    })
}

/// Single file: filters and deletion do not apply.
async fn sync_file(ctx: &TransferContext, path: &Path, remote_path: &str) -> Result<SyncReport, SyncError> {
    let mut remote_key = normalize_remote_path(remote_path, false);
    if remote_key.is_empty() || remote_key.ends_with('/') {
        if let Some(name) = path.file_name() {
            remote_key.push_str(&name.to_string_lossy());
        }
    }
    let info = local::stat(path)?;
    let task = TransferTask {
        remote_key,
        local_path: path.to_path_buf(),
        relative_path: path.display().to_string(),
        size: info.size,
    };

    let mut tally = LaneTally::default();
    match upload_file(ctx, &task).await {
        Ok(outcome) => tally.record(&task.remote_key, outcome),
        Err(e) => {
            tracing::warn!(key = %task.remote_key, "upload failed: {}", e);
            tally.fail(&task.remote_key, e.to_string());
        }
    }
    Ok(SyncReport {
        total_local: 1,
        uploaded: tally.uploaded,
        uploaded_bytes: tally.uploaded_bytes,
        failed: tally.failed,
        skipped: tally.skipped,
        failures: tally.failures,
        ..SyncReport::default()
    })
}
