//! Object store backed by a local directory.
//!
//! Objects live at `<root>/<key>`. Checksums, modification times and
//! attributes live in JSON sidecars at `<root>/.objsync/meta/<key>/.objsync.json`, open
//! multipart uploads under `<root>/.objsync/uploads/<id>/`. Objects are written
//! to `<root>/.objsync/tmp/` first and renamed into place, so a reader never
//! sees a partially written object.
//!
//! Like a real object store it checks the MD5 and SHA-256 supplied with every
//! body, and the aggregate checksum supplied on completion.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use super::{
    CompletedPart, DeleteOutcome, MultipartSession, ObjectAttributes, RemoteEntry, RemoteListing,
    RemoteStore, DELETE_BATCH_LIMIT, MAX_PARTS,
};
use crate::checksum::{
    aggregate_digest, decode_digest, encode_digest, md5_digest, sha256_digest, Checksum,
    ChecksumAlgorithm, ObjectChecksum, PartChecksum,
};
use crate::retry::{kind_for_io, StoreError};

/// Reserved top-level directory holding sidecars, uploads and temp files.
pub const META_DIR: &str = ".objsync";

/// Leaf name of a sidecar inside its per-key directory. Reserved as a key segment.
pub const RECORD_FILE: &str = ".objsync.json";

#[derive(Debug, Serialize, Deserialize)]
struct ObjectRecord {
    checksum: ObjectChecksum,
    last_modified_ns: u64,
    #[serde(default)]
    content_type: Option<String>,
    #[serde(default)]
    cache_control: Option<String>,
    #[serde(default)]
    metadata: BTreeMap<String, String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionRecord {
    key: String,
    #[serde(default)]
    content_type: Option<String>,
    #[serde(default)]
    cache_control: Option<String>,
    #[serde(default)]
    metadata: BTreeMap<String, String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PartRecord {
    size: u64,
    sha256: String,
    token: String,
}

/// Directory-backed [`RemoteStore`].
#[derive(Debug)]
pub struct DirStore {
    root: PathBuf,
    next_id: AtomicU64,
}

impl DirStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        for sub in ["meta", "uploads", "tmp"] {
            let dir = root.join(META_DIR).join(sub);
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|e| io_error(&dir, e))?;
        }
        Ok(Self {
            root,
            next_id: AtomicU64::new(0),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, key: &str) -> Result<PathBuf, StoreError> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }

    fn meta_path(&self, key: &str) -> Result<PathBuf, StoreError> {
        validate_key(key)?;
        Ok(self
            .root
            .join(META_DIR)
            .join("meta")
            .join(key)
            .join(RECORD_FILE))
    }

    fn upload_dir(&self, upload_id: &str) -> Result<PathBuf, StoreError> {
        if upload_id.is_empty() || !upload_id.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(StoreError::not_found(format!("no such upload: {}", upload_id)));
        }
        Ok(self.root.join(META_DIR).join("uploads").join(upload_id))
    }

    fn unique_id(&self) -> String {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let n = self.next_id.fetch_add(1, Ordering::Relaxed);
        format!("{:x}{:08x}", nanos, n)
    }

    fn temp_path(&self) -> PathBuf {
        self.root.join(META_DIR).join("tmp").join(self.unique_id())
    }

    async fn read_record(&self, key: &str) -> Result<Option<ObjectRecord>, StoreError> {
        let path = self.meta_path(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| StoreError::permanent(format!("corrupt metadata for {}: {}", key, e))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(&path, e)),
        }
    }

    async fn write_record(&self, key: &str, record: &ObjectRecord) -> Result<(), StoreError> {
        let path = self.meta_path(key)?;
        let json = serde_json::to_vec_pretty(record)
            .map_err(|e| StoreError::permanent(format!("encode metadata for {}: {}", key, e)))?;
        write_file(&path, &json).await
    }

    /// Install a finished temp file and its record. If the record cannot be
    /// written the object is removed again, so no object is left without one.
    async fn commit(&self, temp: &Path, key: &str, record: &ObjectRecord) -> Result<(), StoreError> {
        if let Err(e) = self.install(temp, key).await {
            let _ = tokio::fs::remove_file(temp).await;
            return Err(e);
        }
        if let Err(e) = self.write_record(key, record).await {
            if let Ok(path) = self.object_path(key) {
                let _ = tokio::fs::remove_file(path).await;
            }
            self.remove_record(key).await;
            return Err(e);
        }
        Ok(())
    }

    async fn remove_record(&self, key: &str) {
        let Ok(path) = self.meta_path(key) else {
            return;
        };
        let _ = tokio::fs::remove_file(&path).await;
        if let Some(dir) = path.parent() {
            // Fails while records of longer keys remain below it.
            let _ = tokio::fs::remove_dir(dir).await;
        }
    }

    /// Move a finished temp file to the object's path.
    async fn install(&self, temp: &Path, key: &str) -> Result<(), StoreError> {
        let dest = self.object_path(key)?;
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(parent, e))?;
        }
        tokio::fs::rename(temp, &dest)
            .await
            .map_err(|e| io_error(&dest, e))
    }

    async fn read_session(&self, session: &MultipartSession) -> Result<(PathBuf, SessionRecord), StoreError> {
        let dir = self.upload_dir(&session.upload_id)?;
        let path = dir.join("session.json");
        let bytes = tokio::fs::read(&path).await.map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => {
                StoreError::not_found(format!("no such upload: {}", session.upload_id))
            }
            _ => io_error(&path, e),
        })?;
        let record: SessionRecord = serde_json::from_slice(&bytes).map_err(|e| {
            StoreError::permanent(format!("corrupt upload {}: {}", session.upload_id, e))
        })?;
        if record.key != session.key {
            return Err(StoreError::permanent(format!(
                "upload {} belongs to {}, not {}",
                session.upload_id, record.key, session.key
            )));
        }
        Ok((dir, record))
    }
}

#[async_trait]
impl RemoteStore for DirStore {
    async fn list(&self, prefix: &str) -> Result<RemoteListing, StoreError> {
        let root = self.root.clone();
        let wanted = prefix.to_string();
        let found = tokio::task::spawn_blocking(move || scan_objects(&root, &wanted))
            .await
            .map_err(|e| StoreError::transient(format!("list task join: {}", e)))??;

        let mut listing = RemoteListing::with_capacity(found.len());
        for (key, size, fs_mtime) in found {
            let last_modified = match self.read_record(&key).await? {
                Some(record) => from_nanos(record.last_modified_ns),
                None => fs_mtime,
            };
            listing.insert(key, RemoteEntry { size, last_modified });
        }
        Ok(listing)
    }

    async fn head(&self, key: &str) -> Result<RemoteEntry, StoreError> {
        let path = self.object_path(key)?;
        let meta = tokio::fs::metadata(&path)
            .await
            .map_err(|e| io_error(&path, e))?;
        if !meta.is_file() {
            return Err(StoreError::not_found(key));
        }
        let last_modified = match self.read_record(key).await? {
            Some(record) => from_nanos(record.last_modified_ns),
            None => meta.modified().unwrap_or(UNIX_EPOCH),
        };
        Ok(RemoteEntry {
            size: meta.len(),
            last_modified,
        })
    }

    async fn get_checksum(&self, key: &str) -> Result<ObjectChecksum, StoreError> {
        let entry = self.head(key).await?;
        match self.read_record(key).await? {
            Some(record) => Ok(record.checksum),
            // Object placed without going through the store: no checksum on record.
            None => Ok(ObjectChecksum {
                size: entry.size,
                checksum: None,
                parts: None,
            }),
        }
    }

    async fn put(
        &self,
        key: &str,
        body: &[u8],
        sha256: &str,
        md5: &str,
        attributes: &ObjectAttributes,
    ) -> Result<(), StoreError> {
        validate_key(key)?;
        check_body(body, sha256, md5)?;

        let temp = self.temp_path();
        write_file(&temp, body).await?;

        let record = ObjectRecord {
            checksum: ObjectChecksum {
                size: body.len() as u64,
                checksum: Some(Checksum {
                    algorithm: ChecksumAlgorithm::Sha256,
                    digest: sha256.to_string(),
                }),
                parts: None,
            },
            last_modified_ns: to_nanos(SystemTime::now()),
            content_type: attributes.content_type.clone(),
            cache_control: attributes.cache_control.clone(),
            metadata: attributes.metadata.clone(),
        };
        self.commit(&temp, key, &record).await
    }

    async fn create_multipart(
        &self,
        key: &str,
        attributes: &ObjectAttributes,
    ) -> Result<MultipartSession, StoreError> {
        validate_key(key)?;
        let upload_id = self.unique_id();
        let dir = self.upload_dir(&upload_id)?;
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| io_error(&dir, e))?;
        let record = SessionRecord {
            key: key.to_string(),
            content_type: attributes.content_type.clone(),
            cache_control: attributes.cache_control.clone(),
            metadata: attributes.metadata.clone(),
        };
        let json = serde_json::to_vec(&record)
            .map_err(|e| StoreError::permanent(format!("encode upload: {}", e)))?;
        write_file(&dir.join("session.json"), &json).await?;
        tracing::debug!(key, upload_id = %upload_id, "multipart upload created");
        Ok(MultipartSession {
            key: key.to_string(),
            upload_id,
        })
    }

    async fn upload_part(
        &self,
        session: &MultipartSession,
        part_number: u32,
        body: &[u8],
        sha256: &str,
        md5: &str,
    ) -> Result<String, StoreError> {
        let (dir, _) = self.read_session(session).await?;
        if part_number == 0 || u64::from(part_number) > MAX_PARTS {
            return Err(StoreError::permanent(format!(
                "part number {} outside 1..={}",
                part_number, MAX_PARTS
            )));
        }
        let token = check_body(body, sha256, md5)?;

        write_file(&dir.join(format!("part-{}", part_number)), body).await?;
        let record = PartRecord {
            size: body.len() as u64,
            sha256: sha256.to_string(),
            token: token.clone(),
        };
        let json = serde_json::to_vec(&record)
            .map_err(|e| StoreError::permanent(format!("encode part: {}", e)))?;
        write_file(&dir.join(format!("part-{}.json", part_number)), &json).await?;
        Ok(token)
    }

    async fn complete_multipart(
        &self,
        session: &MultipartSession,
        aggregate_sha256: &str,
        parts: &[CompletedPart],
    ) -> Result<(), StoreError> {
        let (dir, session_record) = self.read_session(session).await?;
        if parts.is_empty() {
            return Err(StoreError::permanent("multipart completion with no parts"));
        }
        if parts.windows(2).any(|w| w[0].part_number >= w[1].part_number) {
            return Err(StoreError::permanent("parts must be in ascending order"));
        }

        let mut raw_digests = Vec::with_capacity(parts.len());
        let mut part_checksums = Vec::with_capacity(parts.len());
        for part in parts {
            let path = dir.join(format!("part-{}.json", part.part_number));
            let bytes = tokio::fs::read(&path).await.map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => {
                    StoreError::permanent(format!("part {} was never uploaded", part.part_number))
                }
                _ => io_error(&path, e),
            })?;
            let record: PartRecord = serde_json::from_slice(&bytes)
                .map_err(|e| StoreError::permanent(format!("corrupt part record: {}", e)))?;
            if record.token != part.completion_token || record.sha256 != part.checksum {
                return Err(StoreError::permanent(format!(
                    "part {} does not match the uploaded part",
                    part.part_number
                )));
            }
            let raw = decode_digest(&record.sha256)
                .ok_or_else(|| StoreError::permanent("part checksum is not base64"))?;
            raw_digests.push(raw);
            part_checksums.push(PartChecksum {
                part_number: part.part_number,
                size: record.size,
                checksum: Some(Checksum {
                    algorithm: ChecksumAlgorithm::Sha256,
                    digest: record.sha256,
                }),
            });
        }

        let aggregate = aggregate_digest(
            ChecksumAlgorithm::Sha256,
            raw_digests.iter().map(Vec::as_slice),
        )
        .map_err(|e| StoreError::permanent(e.to_string()))?;
        if encode_digest(&aggregate) != aggregate_sha256 {
            return Err(StoreError::permanent("aggregate checksum mismatch"));
        }

        let temp = self.temp_path();
        let mut out = tokio::fs::File::create(&temp)
            .await
            .map_err(|e| io_error(&temp, e))?;
        let mut size = 0u64;
        for part in parts {
            let path = dir.join(format!("part-{}", part.part_number));
            let mut src = tokio::fs::File::open(&path)
                .await
                .map_err(|e| io_error(&path, e))?;
            size += tokio::io::copy(&mut src, &mut out)
                .await
                .map_err(|e| io_error(&temp, e))?;
        }
        out.sync_all().await.map_err(|e| io_error(&temp, e))?;
        drop(out);

        let record = ObjectRecord {
            checksum: ObjectChecksum {
                size,
                checksum: Some(Checksum {
                    algorithm: ChecksumAlgorithm::Sha256,
                    digest: aggregate_sha256.to_string(),
                }),
                parts: Some(part_checksums),
            },
            last_modified_ns: to_nanos(SystemTime::now()),
            content_type: session_record.content_type,
            cache_control: session_record.cache_control,
            metadata: session_record.metadata,
        };
        self.commit(&temp, &session.key, &record).await?;

        if let Err(e) = tokio::fs::remove_dir_all(&dir).await {
            tracing::warn!(path = %dir.display(), "could not clean up upload: {}", e);
        }
        Ok(())
    }

    async fn abort_multipart(&self, session: &MultipartSession) -> Result<(), StoreError> {
        let dir = self.upload_dir(&session.upload_id)?;
        tokio::fs::remove_dir_all(&dir)
            .await
            .map_err(|e| io_error(&dir, e))?;
        tracing::debug!(key = %session.key, upload_id = %session.upload_id, "multipart upload aborted");
        Ok(())
    }

    async fn delete_batch(&self, keys: &[String]) -> Result<DeleteOutcome, StoreError> {
        if keys.len() > DELETE_BATCH_LIMIT {
            return Err(StoreError::permanent(format!(
                "batch of {} keys exceeds the limit of {}",
                keys.len(),
                DELETE_BATCH_LIMIT
            )));
        }
        let mut outcome = DeleteOutcome::default();
        for key in keys {
            let path = match self.object_path(key) {
                Ok(p) => p,
                Err(_) => {
                    outcome.failed.push(key.clone());
                    continue;
                }
            };
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::debug!(key = %key, "delete failed: {}", e);
                    outcome.failed.push(key.clone());
                    continue;
                }
            }
            self.remove_record(key).await;
            outcome.deleted.push(key.clone());
        }
        Ok(outcome)
    }
}

/// Keys are relative, slash-separated, with no empty, `.`, `..` or
/// [`RECORD_FILE`] segments.
fn validate_key(key: &str) -> Result<(), StoreError> {
    let bad = key.is_empty()
        || key
            .split('/')
            .any(|seg| seg.is_empty() || seg == "." || seg == ".." || seg == RECORD_FILE)
        || key.split('/').next() == Some(META_DIR)
        || key.contains('\\');
    if bad {
        return Err(StoreError::permanent(format!("invalid key: {:?}", key)));
    }
    Ok(())
}

/// Check the transport and content digests of a body. Returns the part token (quoted MD5 hex).
fn check_body(body: &[u8], sha256: &str, md5: &str) -> Result<String, StoreError> {
    let md5_raw = md5_digest(body);
    if encode_digest(&md5_raw) != md5 {
        return Err(StoreError::permanent("Content-MD5 does not match the body"));
    }
    if encode_digest(&sha256_digest(body)) != sha256 {
        return Err(StoreError::permanent("SHA-256 checksum does not match the body"));
    }
    Ok(format!("\"{}\"", hex::encode(md5_raw)))
}

/// Walk the store root, skipping the reserved directory.
fn scan_objects(root: &Path, prefix: &str) -> Result<Vec<(String, u64, SystemTime)>, StoreError> {
    let mut out = Vec::new();
    let walker = walkdir::WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_entry(|e| !(e.depth() == 1 && e.file_name() == META_DIR));
    for entry in walker {
        let entry = entry.map_err(|e| StoreError::transient(format!("list {}: {}", root.display(), e)))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(rel) = entry.path().strip_prefix(root) else {
            continue;
        };
        let key = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        if !key.starts_with(prefix) {
            continue;
        }
        let meta = entry
            .metadata()
            .map_err(|e| StoreError::transient(format!("stat {}: {}", entry.path().display(), e)))?;
        out.push((key, meta.len(), meta.modified().unwrap_or(UNIX_EPOCH)));
    }
    Ok(out)
}

async fn write_file(path: &Path, data: &[u8]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| io_error(parent, e))?;
    }
    tokio::fs::write(path, data)
        .await
        .map_err(|e| io_error(path, e))
}

fn io_error(path: &Path, e: io::Error) -> StoreError {
    StoreError {
        kind: kind_for_io(&e),
        message: format!("{}: {}", path.display(), e),
    }
}

fn to_nanos(t: SystemTime) -> u64 {
    t.duration_since(UNIX_EPOCH).unwrap_or_default().as_nanos() as u64
}

fn from_nanos(ns: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_nanos(ns)
}
