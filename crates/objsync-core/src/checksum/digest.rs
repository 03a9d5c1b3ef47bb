//! Digest primitives shared by the uploader, the store and the verifier.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256};

use super::ChecksumAlgorithm;
use crate::error::VerifyError;

/// Incremental hasher for the algorithms the verifier supports.
pub enum DigestHasher {
    Sha1(Sha1),
    Sha256(Sha256),
}

impl DigestHasher {
    /// CRC32/CRC32C are rejected explicitly rather than skipped.
    pub fn for_algorithm(algorithm: ChecksumAlgorithm) -> Result<Self, VerifyError> {
        match algorithm {
            ChecksumAlgorithm::Sha1 => Ok(DigestHasher::Sha1(Sha1::new())),
            ChecksumAlgorithm::Sha256 => Ok(DigestHasher::Sha256(Sha256::new())),
            ChecksumAlgorithm::Crc32 | ChecksumAlgorithm::Crc32c => {
                Err(VerifyError::UnsupportedChecksum(algorithm))
            }
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        match self {
            DigestHasher::Sha1(h) => h.update(data),
            DigestHasher::Sha256(h) => h.update(data),
        }
    }

    pub fn finalize(self) -> Vec<u8> {
        match self {
            DigestHasher::Sha1(h) => h.finalize().to_vec(),
            DigestHasher::Sha256(h) => h.finalize().to_vec(),
        }
    }
}

/// Base64 form of a raw digest (the store's wire representation).
pub fn encode_digest(raw: &[u8]) -> String {
    STANDARD.encode(raw)
}

/// Raw bytes of a base64 digest; `None` if it is not valid base64.
pub fn decode_digest(encoded: &str) -> Option<Vec<u8>> {
    STANDARD.decode(encoded).ok()
}

pub fn sha256_digest(data: &[u8]) -> Vec<u8> {
    Sha256::digest(data).to_vec()
}

pub fn md5_digest(data: &[u8]) -> Vec<u8> {
    Md5::digest(data).to_vec()
}

/// Hash of the concatenated raw part digests, in the order given.
pub fn aggregate_digest<'a, I>(algorithm: ChecksumAlgorithm, parts: I) -> Result<Vec<u8>, VerifyError>
where
    I: IntoIterator<Item = &'a [u8]>,
{
    let mut hasher = DigestHasher::for_algorithm(algorithm)?;
    for part in parts {
        hasher.update(part);
    }
    Ok(hasher.finalize())
}
