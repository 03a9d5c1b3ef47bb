//! Per-file transfer: recheck against the remote, then direct put or multipart.

mod context;
mod direct;

pub use context::{TransferContext, TransferOptions};
pub use direct::put_file;

use crate::error::SyncError;
use crate::local;
use crate::multipart::upload_multipart;
use crate::planner::{is_up_to_date, TransferTask};
use crate::retry::run_with_retry;
use crate::store::MAX_OBJECT_SIZE;

/// How a file of a given size is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferPath {
    Direct,
    Multipart,
    TooLarge,
}

pub fn choose_path(size: u64, multipart_threshold: u64) -> TransferPath {
    if size <= multipart_threshold {
        TransferPath::Direct
    } else if size <= MAX_OBJECT_SIZE {
        TransferPath::Multipart
    } else {
        TransferPath::TooLarge
    }
}

/// Result of a transfer that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    Uploaded { bytes: u64, multipart: bool },
    /// The remote copy became current after planning.
    Skipped,
    /// A remote copy exists and overwriting is disabled.
    NotOverwritten,
}

/// Transfer one planned file, re-checking local and remote state first.
pub async fn upload_file(ctx: &TransferContext, task: &TransferTask) -> Result<UploadOutcome, SyncError> {
    let path = task.local_path.as_path();
    let key = task.remote_key.as_str();
    let info = local::stat(path)?;
    if !info.is_file {
        return Err(SyncError::NotFileOrDirectory(task.local_path.clone()));
    }

    let remote = match run_with_retry(&ctx.retry, "head object", || ctx.store.head(key)).await {
        Ok(entry) => Some(entry),
        Err(e) if e.is_not_found() => None,
        Err(e) => return Err(e.into()),
    };
    if let Some(remote) = remote {
        if is_up_to_date(&remote, info.size, info.modified, ctx.options.ignore_mtime) {
            tracing::debug!(key, "up to date at transfer time");
            return Ok(UploadOutcome::Skipped);
        }
        if !ctx.options.overwrite {
            tracing::warn!(key, "remote object exists; not overwriting");
            return Ok(UploadOutcome::NotOverwritten);
        }
    }

    let attributes = ctx.attributes.attributes_for(&task.relative_path);
    let multipart = match choose_path(info.size, ctx.options.multipart_threshold) {
        TransferPath::Direct => {
            put_file(ctx, key, path, info.size, &attributes).await?;
            false
        }
        TransferPath::Multipart => {
            upload_multipart(ctx, key, path, info.size, &attributes).await?;
            true
        }
        TransferPath::TooLarge => {
            return Err(SyncError::SizeTooLarge {
                path: task.local_path.clone(),
                size: info.size,
                max: MAX_OBJECT_SIZE,
            })
        }
    };
    tracing::info!(key, bytes = info.size, multipart, "uploaded");
    Ok(UploadOutcome::Uploaded {
        bytes: info.size,
        multipart,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MIB;

    #[test]
    fn threshold_selects_path() {
        let threshold = 512 * MIB;
        assert_eq!(choose_path(100 * MIB, threshold), TransferPath::Direct);
        assert_eq!(choose_path(threshold, threshold), TransferPath::Direct);
        assert_eq!(choose_path(threshold + 1, threshold), TransferPath::Multipart);
        assert_eq!(choose_path(1024 * MIB, threshold), TransferPath::Multipart);
        assert_eq!(choose_path(MAX_OBJECT_SIZE + 1, threshold), TransferPath::TooLarge);
    }
}
