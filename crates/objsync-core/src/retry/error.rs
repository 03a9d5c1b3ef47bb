//! Error surfaced by every remote-store operation.

use std::fmt;

/// How the store tagged a failure. Drives retry classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    /// Server-side failure (5xx-equivalent); assumed to self-resolve.
    Transient,
    /// Client-side failure (permission, bad digest, malformed request).
    Permanent,
    /// The key or session does not exist.
    NotFound,
}

/// Error returned by a [`RemoteStore`](crate::store::RemoteStore) call.
#[derive(Debug)]
pub struct StoreError {
    pub kind: StoreErrorKind,
    pub message: String,
}

impl StoreError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            kind: StoreErrorKind::Transient,
            message: message.into(),
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            kind: StoreErrorKind::Permanent,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            kind: StoreErrorKind::NotFound,
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == StoreErrorKind::NotFound
    }

    pub fn is_transient(&self) -> bool {
        self.kind == StoreErrorKind::Transient
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            StoreErrorKind::Transient => write!(f, "transient store error: {}", self.message),
            StoreErrorKind::Permanent => write!(f, "store error: {}", self.message),
            StoreErrorKind::NotFound => write!(f, "not found: {}", self.message),
        }
    }
}

impl std::error::Error for StoreError {}
