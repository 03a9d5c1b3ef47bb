//! Content checksums: the remote checksum model, digest helpers, and the
//! verifier that recomputes part-level and aggregate digests of a local file.
//!
//! Digests travel as base64 strings, the store's convention. The aggregate
//! checksum of a multipart object is the hash of the concatenated raw part
//! digests, in part-number order.

mod digest;
mod file;
mod verify;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use digest::{
    aggregate_digest, decode_digest, encode_digest, md5_digest, sha256_digest, DigestHasher,
};
pub use file::{digest_path, sha256_path};
pub use verify::{verify_file, verify_file_blocking, VERIFY_BUFFER_SIZE};

/// Checksum algorithms a store may report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumAlgorithm {
    Crc32,
    Crc32c,
    Sha1,
    Sha256,
}

impl ChecksumAlgorithm {
    pub fn as_str(self) -> &'static str {
        match self {
            ChecksumAlgorithm::Crc32 => "crc32",
            ChecksumAlgorithm::Crc32c => "crc32c",
            ChecksumAlgorithm::Sha1 => "sha1",
            ChecksumAlgorithm::Sha256 => "sha256",
        }
    }

    /// Whether the verifier can recompute this digest locally.
    pub fn is_supported(self) -> bool {
        matches!(self, ChecksumAlgorithm::Sha1 | ChecksumAlgorithm::Sha256)
    }
}

impl fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A digest reported by the store: algorithm plus base64 value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checksum {
    pub algorithm: ChecksumAlgorithm,
    pub digest: String,
}

impl Checksum {
    /// SHA-256 checksum from a raw digest.
    pub fn sha256(raw: &[u8]) -> Self {
        Self {
            algorithm: ChecksumAlgorithm::Sha256,
            digest: encode_digest(raw),
        }
    }
}

/// Checksum metadata for one part of a multipart object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartChecksum {
    pub part_number: u32,
    pub size: u64,
    #[serde(default)]
    pub checksum: Option<Checksum>,
}

/// Checksum metadata for a stored object, as returned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectChecksum {
    pub size: u64,
    #[serde(default)]
    pub checksum: Option<Checksum>,
    /// Present only for objects uploaded in parts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parts: Option<Vec<PartChecksum>>,
}
