//! Whole-file digests computed on demand (the `objsync hash` command).

use anyhow::{Context, Result};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::digest::DigestHasher;
use super::ChecksumAlgorithm;

const BUF_SIZE: usize = 64 * 1024;

/// Compute the raw digest of a file with the given algorithm.
/// Reads in chunks to keep memory use bounded; suitable for large files.
pub fn digest_path(path: &Path, algorithm: ChecksumAlgorithm) -> Result<Vec<u8>> {
    let mut hasher = DigestHasher::for_algorithm(algorithm)?;
    let mut f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut buf = [0u8; BUF_SIZE];
    loop {
        let n = f
            .read(&mut buf)
            .with_context(|| format!("read {}", path.display()))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize())
}

/// SHA-256 of a file as raw bytes.
pub fn sha256_path(path: &Path) -> Result<Vec<u8>> {
    digest_path(path, ChecksumAlgorithm::Sha256)
}
