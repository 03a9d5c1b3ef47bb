//! Reconcile a remote listing with a local scan.
//!
//! Every local file is either excluded by the path filter, skipped because the
//! remote copy is current, or planned for upload. Remote keys left unmatched
//! are deletion candidates, grouped into store-sized batches.

mod delete;

use std::path::{Path, PathBuf};
use std::time::SystemTime;

pub use delete::{delete_batches, run_deletes, DeleteSummary};

use crate::filter::PathFilter;
use crate::local;
use crate::store::{RemoteEntry, RemoteListing};

/// A file planned for upload. Consumed by exactly one lane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferTask {
    pub remote_key: String,
    pub local_path: PathBuf,
    /// Path relative to the local root, `/`-separated.
    pub relative_path: String,
    /// Size at plan time; re-checked before transfer.
    pub size: u64,
}

/// A file that could not be processed, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFailure {
    pub path: String,
    pub error: String,
}

#[derive(Debug, Clone, Default)]
pub struct PlanOptions {
    pub filter: PathFilter,
    pub ignore_mtime: bool,
    pub delete_remote: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SyncPlan {
    pub total_local: usize,
    pub total_remote: usize,
    pub pending: Vec<TransferTask>,
    pub skipped: usize,
    pub excluded_local: usize,
    /// Local files that vanished or could not be stat'ed during planning.
    pub unreadable: Vec<FileFailure>,
    pub delete_batches: Vec<Vec<String>>,
    pub excluded_remote: usize,
}

impl SyncPlan {
    pub fn pending_bytes(&self) -> u64 {
        self.pending.iter().map(|t| t.size).sum()
    }

    pub fn delete_count(&self) -> usize {
        self.delete_batches.iter().map(Vec::len).sum()
    }
}

/// Whether a remote object is at least as new as the local file.
pub fn is_up_to_date(remote: &RemoteEntry, size: u64, modified: SystemTime, ignore_mtime: bool) -> bool {
    remote.size == size && (ignore_mtime || remote.last_modified >= modified)
}

/// Build the plan. `remote_root` is empty or ends with `/`.
pub fn plan(
    mut listing: RemoteListing,
    local_files: &[PathBuf],
    local_root: &Path,
    remote_root: &str,
    options: &PlanOptions,
) -> SyncPlan {
    let mut plan = SyncPlan {
        total_local: local_files.len(),
        total_remote: listing.len(),
        ..SyncPlan::default()
    };

    for path in local_files {
        let Some(relative) = local::relative_path(path, local_root) else {
            continue;
        };
        if options.filter.is_excluded(&relative) {
            tracing::debug!(path = %relative, "excluded");
            plan.excluded_local += 1;
            continue;
        }
        let info = match local::stat(path) {
            Ok(info) => info,
            Err(e) => {
                plan.unreadable.push(FileFailure {
                    path: path.display().to_string(),
                    error: e.to_string(),
                });
                continue;
            }
        };
        let remote_key = format!("{}{}", remote_root, relative);
        let remote = listing.remove(&remote_key);
        if remote.is_some_and(|r| is_up_to_date(&r, info.size, info.modified, options.ignore_mtime)) {
            tracing::debug!(key = %remote_key, "up to date");
            plan.skipped += 1;
            continue;
        }
        plan.pending.push(TransferTask {
            remote_key,
            local_path: path.clone(),
            relative_path: relative,
            size: info.size,
        });
    }

    if options.delete_remote {
        let mut doomed = Vec::with_capacity(listing.len());
        for key in listing.into_keys() {
            let relative = key.strip_prefix(remote_root).unwrap_or(&key);
            if options.filter.is_excluded(relative) {
                plan.excluded_remote += 1;
                continue;
            }
            doomed.push(key);
        }
        doomed.sort();
        plan.delete_batches = delete_batches(doomed);
    }
    plan
}
