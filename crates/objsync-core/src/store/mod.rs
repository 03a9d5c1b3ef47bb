//! Remote object store contract consumed by the engine.
//!
//! The engine never speaks a wire protocol itself; it drives any
//! [`RemoteStore`] implementation. Every call reports failures as a
//! [`StoreError`] tagged transient or permanent so the retry policy can
//! classify them. [`DirStore`] is the bundled implementation backed by a
//! local directory.

mod dir;

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::time::SystemTime;

use crate::checksum::ObjectChecksum;
use crate::retry::StoreError;

pub use dir::DirStore;

/// Maximum number of parts in one multipart object.
pub const MAX_PARTS: u64 = 10_000;
/// Largest object the store accepts (5 TiB).
pub const MAX_OBJECT_SIZE: u64 = 5 * 1024 * 1024 * 1024 * 1024;
/// Maximum number of keys in one batch delete request.
pub const DELETE_BATCH_LIMIT: usize = 1000;

/// Size and modification time of a stored object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteEntry {
    pub size: u64,
    pub last_modified: SystemTime,
}

/// Remote key -> entry, for every object under a prefix.
pub type RemoteListing = HashMap<String, RemoteEntry>;

/// Optional headers attached to an uploaded object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectAttributes {
    pub content_type: Option<String>,
    pub cache_control: Option<String>,
    pub metadata: BTreeMap<String, String>,
}

/// Handle for an open multipart upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartSession {
    pub key: String,
    pub upload_id: String,
}

/// A part acknowledged by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedPart {
    pub part_number: u32,
    /// Opaque token (ETag) returned by `upload_part`.
    pub completion_token: String,
    /// Base64 SHA-256 of the part.
    pub checksum: String,
}

/// Per-key result of a batch delete.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub deleted: Vec<String>,
    pub failed: Vec<String>,
}

/// Capabilities the engine needs from an object store.
///
/// Digest arguments are base64 strings; `sha256` is the content checksum the
/// store must record, `md5` is a transport integrity check.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Every object under `prefix` (pagination is internal).
    async fn list(&self, prefix: &str) -> Result<RemoteListing, StoreError>;

    /// Size and mtime of one object; `NotFound` when absent.
    async fn head(&self, key: &str) -> Result<RemoteEntry, StoreError>;

    /// Whole-object and per-part checksums (part pagination is internal).
    async fn get_checksum(&self, key: &str) -> Result<ObjectChecksum, StoreError>;

    async fn put(
        &self,
        key: &str,
        body: &[u8],
        sha256: &str,
        md5: &str,
        attributes: &ObjectAttributes,
    ) -> Result<(), StoreError>;

    async fn create_multipart(
        &self,
        key: &str,
        attributes: &ObjectAttributes,
    ) -> Result<MultipartSession, StoreError>;

    /// Upload one part; returns its completion token.
    async fn upload_part(
        &self,
        session: &MultipartSession,
        part_number: u32,
        body: &[u8],
        sha256: &str,
        md5: &str,
    ) -> Result<String, StoreError>;

    /// `parts` must be in ascending part-number order.
    async fn complete_multipart(
        &self,
        session: &MultipartSession,
        aggregate_sha256: &str,
        parts: &[CompletedPart],
    ) -> Result<(), StoreError>;

    async fn abort_multipart(&self, session: &MultipartSession) -> Result<(), StoreError>;

    /// Delete up to [`DELETE_BATCH_LIMIT`] keys; failures are reported per key.
    async fn delete_batch(&self, keys: &[String]) -> Result<DeleteOutcome, StoreError>;
}
