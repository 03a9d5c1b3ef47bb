//! Typed errors for transfers and verification.
//!
//! Per-file errors: the scheduler and the verify workflow count them and move
//! on to the next file. A checksum mismatch is never an error; it is a
//! `false` verification result.

use std::io;
use std::path::PathBuf;

use crate::checksum::ChecksumAlgorithm;
use crate::retry::StoreError;

/// Failure of a single file's transfer.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The local file shrank or grew between stat and read.
    #[error("short read on {}: expected {expected} bytes, read {read}", .path.display())]
    ShortRead {
        path: PathBuf,
        expected: u64,
        read: u64,
    },

    #[error("{} is too large: {size} bytes exceeds the store maximum of {max}", .path.display())]
    SizeTooLarge { path: PathBuf, size: u64, max: u64 },

    /// Completed part list is not exactly 1..=n.
    #[error("invalid part list for {key}: {reason}")]
    InvalidPartList { key: String, reason: String },

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{} is not a file or directory", .0.display())]
    NotFileOrDirectory(PathBuf),

    #[error("task join: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl SyncError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        SyncError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Failure to verify (as opposed to a verified mismatch).
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("{0} checksums are not currently supported")]
    UnsupportedChecksum(ChecksumAlgorithm),

    #[error("remote object reports no checksum")]
    MissingChecksum,

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Scanning the local tree failed.
    #[error(transparent)]
    Local(#[from] SyncError),
}

impl VerifyError {
    /// True for errors caused by the remote's checksum type rather than I/O.
    pub fn is_unsupported(&self) -> bool {
        matches!(
            self,
            VerifyError::UnsupportedChecksum(_) | VerifyError::MissingChecksum
        )
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        VerifyError::Io {
            path: path.into(),
            source,
        }
    }
}
