//! Hash command: digest of a local file.

use anyhow::Result;
use objsync_core::checksum::{digest_path, encode_digest, ChecksumAlgorithm};
use std::path::Path;

/// Print the hex and base64 digest of the given file.
pub fn run_hash(path: &Path, sha1: bool) -> Result<()> {
    let algorithm = if sha1 {
        ChecksumAlgorithm::Sha1
    } else {
        ChecksumAlgorithm::Sha256
    };
    let digest = digest_path(path, algorithm)?;
    println!("{}  {}", hex::encode(&digest), path.display());
    println!("{}:{}", algorithm, encode_digest(&digest));
    Ok(())
}
