//! Splitting a local file into hashed parts.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use crate::checksum::{encode_digest, md5_digest, sha256_digest};
use crate::error::SyncError;
use crate::store::MAX_PARTS;

/// One part read from disk, ready to upload.
#[derive(Debug)]
pub struct PartChunk {
    pub part_number: u32,
    pub bytes: Vec<u8>,
    /// Raw SHA-256 of `bytes`; input to the aggregate checksum.
    pub sha256: Vec<u8>,
    /// Base64 MD5 of `bytes` for transport integrity.
    pub md5: String,
}

/// Part size for a file of `size` bytes: `max(min_part_size, ceil(size / MAX_PARTS))`.
pub fn part_size_for(size: u64, min_part_size: u64) -> u64 {
    min_part_size.max(size.div_ceil(MAX_PARTS)).max(1)
}

/// Sequential reader producing [`PartChunk`]s numbered from 1.
///
/// Reads and hashing run on the blocking pool.
#[derive(Debug)]
pub struct ChunkReader {
    path: PathBuf,
    file: Option<File>,
    part_size: u64,
    next_part: u32,
    bytes_read: u64,
}

impl ChunkReader {
    pub fn open(path: &Path, part_size: u64) -> Result<Self, SyncError> {
        let file = File::open(path).map_err(|e| SyncError::io(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Some(file),
            part_size,
            next_part: 1,
            bytes_read: 0,
        })
    }

    /// Total bytes handed out so far.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Number of parts handed out so far.
    pub fn parts_read(&self) -> u32 {
        self.next_part - 1
    }

    /// Next part, or `None` at end of file.
    pub async fn next_chunk(&mut self) -> Result<Option<PartChunk>, SyncError> {
        let Some(mut file) = self.file.take() else {
            return Ok(None);
        };
        let part_size = self.part_size;
        let part_number = self.next_part;
        let (file, read) = tokio::task::spawn_blocking(move || {
            let read = read_chunk(&mut file, part_size, part_number);
            (file, read)
        })
        .await?;

        match read.map_err(|e| SyncError::io(&self.path, e))? {
            Some(chunk) => {
                self.file = Some(file);
                self.next_part += 1;
                self.bytes_read += chunk.bytes.len() as u64;
                Ok(Some(chunk))
            }
            None => Ok(None),
        }
    }
}

fn read_chunk(file: &mut File, part_size: u64, part_number: u32) -> io::Result<Option<PartChunk>> {
    let mut bytes = Vec::with_capacity(part_size.min(64 * 1024 * 1024) as usize);
    file.by_ref().take(part_size).read_to_end(&mut bytes)?;
    if bytes.is_empty() {
        return Ok(None);
    }
    let sha256 = sha256_digest(&bytes);
    let md5 = encode_digest(&md5_digest(&bytes));
    Ok(Some(PartChunk {
        part_number,
        bytes,
        sha256,
        md5,
    }))
}
