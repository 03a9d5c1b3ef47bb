//! Recompute a local file's digests and match them against remote checksums.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use super::digest::{aggregate_digest, encode_digest, DigestHasher};
use super::{Checksum, ObjectChecksum};
use crate::config::MIB;
use crate::error::VerifyError;

/// Read window used while hashing; a part is streamed through it.
pub const VERIFY_BUFFER_SIZE: usize = 16 * MIB as usize;

/// Verify `path` against `object` off the async executor.
///
/// `Ok(false)` means the file was read and differs; `Err` means it could not
/// be verified (I/O failure, unsupported or missing remote checksum).
pub async fn verify_file(object: &ObjectChecksum, path: &Path) -> Result<bool, VerifyError> {
    let object = object.clone();
    let owned = path.to_path_buf();
    tokio::task::spawn_blocking(move || verify_file_blocking(&object, &owned))
        .await
        .map_err(|e| VerifyError::io(path, io::Error::new(io::ErrorKind::Other, e)))?
}

/// Blocking body of [`verify_file`].
pub fn verify_file_blocking(object: &ObjectChecksum, path: &Path) -> Result<bool, VerifyError> {
    // Reject unsupported algorithms before touching the file.
    let whole = supported(object.checksum.as_ref())?;
    if let Some(parts) = &object.parts {
        for part in parts {
            supported(part.checksum.as_ref())?;
        }
    }

    let mut file = File::open(path).map_err(|e| VerifyError::io(path, e))?;
    let mut buf = vec![0u8; VERIFY_BUFFER_SIZE];

    let Some(parts) = &object.parts else {
        let mut hasher = DigestHasher::for_algorithm(whole.algorithm)?;
        let read = hash_from(&mut file, &mut hasher, &mut buf, None)
            .map_err(|e| VerifyError::io(path, e))?;
        if read != object.size {
            return Ok(false);
        }
        return Ok(encode_digest(&hasher.finalize()) == whole.digest);
    };

    let mut raw_parts = Vec::with_capacity(parts.len());
    let mut total = 0u64;
    for part in parts {
        let remote = supported(part.checksum.as_ref())?;
        let mut hasher = DigestHasher::for_algorithm(remote.algorithm)?;
        total += hash_from(&mut file, &mut hasher, &mut buf, Some(part.size))
            .map_err(|e| VerifyError::io(path, e))?;
        let local = hasher.finalize();
        if encode_digest(&local) != remote.digest {
            tracing::debug!(part = part.part_number, path = %path.display(), "part checksum mismatch");
            return Ok(false);
        }
        raw_parts.push(local);
    }

    if total != object.size {
        return Ok(false);
    }
    let trailing = file
        .read(&mut buf[..1])
        .map_err(|e| VerifyError::io(path, e))?;
    if trailing != 0 {
        return Ok(false);
    }

    let aggregate = aggregate_digest(whole.algorithm, raw_parts.iter().map(Vec::as_slice))?;
    Ok(encode_digest(&aggregate) == whole.digest)
}

fn supported(checksum: Option<&Checksum>) -> Result<&Checksum, VerifyError> {
    let checksum = checksum.ok_or(VerifyError::MissingChecksum)?;
    if !checksum.algorithm.is_supported() {
        return Err(VerifyError::UnsupportedChecksum(checksum.algorithm));
    }
    Ok(checksum)
}

/// Feed up to `limit` bytes (or everything until EOF) into `hasher`.
/// Returns the number of bytes consumed.
fn hash_from(
    file: &mut File,
    hasher: &mut DigestHasher,
    buf: &mut [u8],
    limit: Option<u64>,
) -> io::Result<u64> {
    let mut read = 0u64;
    loop {
        let want = match limit {
            Some(limit) => (limit - read).min(buf.len() as u64) as usize,
            None => buf.len(),
        };
        if want == 0 {
            return Ok(read);
        }
        let n = match file.read(&mut buf[..want]) {
            Ok(0) => return Ok(read),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buf[..n]);
        read += n as u64;
    }
}
