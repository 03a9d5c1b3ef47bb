//! Single-request upload for files at or below the multipart threshold.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use super::TransferContext;
use crate::checksum::{encode_digest, md5_digest, sha256_digest};
use crate::error::SyncError;
use crate::retry::run_with_retry;
use crate::store::ObjectAttributes;

struct Body {
    bytes: Vec<u8>,
    sha256: String,
    md5: String,
}

/// Read `path` whole (it must still be `expected_size` bytes) and put it.
pub async fn put_file(
    ctx: &TransferContext,
    key: &str,
    path: &Path,
    expected_size: u64,
    attributes: &ObjectAttributes,
) -> Result<(), SyncError> {
    let owned = path.to_path_buf();
    let body = tokio::task::spawn_blocking(move || read_body(owned, expected_size)).await??;
    run_with_retry(&ctx.retry, "put object", || {
        ctx.store
            .put(key, &body.bytes, &body.sha256, &body.md5, attributes)
    })
    .await?;
    Ok(())
}

fn read_body(path: PathBuf, expected_size: u64) -> Result<Body, SyncError> {
    let file = File::open(&path).map_err(|e| SyncError::io(&path, e))?;
    let mut bytes = Vec::with_capacity(expected_size as usize);
    // One byte past the expected size reveals a file that grew.
    file.take(expected_size + 1)
        .read_to_end(&mut bytes)
        .map_err(|e| SyncError::io(&path, e))?;
    if bytes.len() as u64 != expected_size {
        return Err(SyncError::ShortRead {
            path,
            expected: expected_size,
            read: bytes.len() as u64,
        });
    }
    Ok(Body {
        sha256: encode_digest(&sha256_digest(&bytes)),
        md5: encode_digest(&md5_digest(&bytes)),
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grown_and_shrunk_files_are_short_reads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f");
        std::fs::write(&path, b"0123456789").unwrap();

        assert_eq!(read_body(path.clone(), 10).unwrap().bytes.len(), 10);
        assert!(matches!(
            read_body(path.clone(), 8),
            Err(SyncError::ShortRead { expected: 8, read: 9, .. })
        ));
        assert!(matches!(
            read_body(path, 12),
            Err(SyncError::ShortRead { expected: 12, read: 10, .. })
        ));
    }
}
