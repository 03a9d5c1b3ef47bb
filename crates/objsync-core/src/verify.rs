//! Verification workflows: one object, or a whole tree against a prefix.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::checksum::{verify_file, ObjectChecksum};
use crate::error::VerifyError;
use crate::local;
use crate::queue::WorkQueue;
use crate::retry::{run_with_retry, RetryPolicy, StoreError};
use crate::store::RemoteStore;
use crate::sync::normalize_remote_path;

/// Fetch the remote checksum of `key` and verify `path` against it.
pub async fn verify_object(
    store: &dyn RemoteStore,
    retry: &RetryPolicy,
    key: &str,
    path: &Path,
) -> Result<bool, VerifyError> {
    let key = normalize_remote_path(key, false);
    let checksum = run_with_retry(retry, "get object checksum", || store.get_checksum(&key)).await?;
    verify_file(&checksum, path).await
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyStatus {
    Passed,
    Mismatched,
    MissingRemote,
    MissingLocal,
    /// Could not be verified (I/O error, unsupported checksum, fetch failure).
    Skipped,
}

impl fmt::Display for VerifyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VerifyStatus::Passed => "OK",
            VerifyStatus::Mismatched => "checksums do not match",
            VerifyStatus::MissingRemote => "missing from remote",
            VerifyStatus::MissingLocal => "missing from local",
            VerifyStatus::Skipped => "skipped",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyEntry {
    /// Relative path for local files, full key for remote-only objects.
    pub path: String,
    pub status: VerifyStatus,
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyReport {
    pub passed: usize,
    pub mismatched: usize,
    /// Missing on either side.
    pub missing: usize,
    pub skipped: usize,
    pub entries: Vec<VerifyEntry>,
}

impl VerifyReport {
    fn add(&mut self, path: String, status: VerifyStatus, detail: Option<String>) {
        match status {
            VerifyStatus::Passed => self.passed += 1,
            VerifyStatus::Mismatched => self.mismatched += 1,
            VerifyStatus::MissingRemote | VerifyStatus::MissingLocal => self.missing += 1,
            VerifyStatus::Skipped => self.skipped += 1,
        }
        self.entries.push(VerifyEntry { path, status, detail });
    }

    /// True when every file passed.
    pub fn is_clean(&self) -> bool {
        self.mismatched == 0 && self.missing == 0 && self.skipped == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifyOptions {
    /// Concurrent checksum fetches.
    pub network_lanes: usize,
    /// Concurrent local file verifications.
    pub verify_lanes: usize,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            network_lanes: 16,
            verify_lanes: 512,
        }
    }
}

type ChecksumMap = HashMap<String, Result<ObjectChecksum, String>>;

/// Verify every file under `local_root` against the objects under `remote_root`.
pub async fn verify_tree(
    store: Arc<dyn RemoteStore>,
    retry: RetryPolicy,
    remote_root: &str,
    local_root: &Path,
    options: &VerifyOptions,
) -> Result<VerifyReport, VerifyError> {
    let remote_root = normalize_remote_path(remote_root, true);
    let listing = async {
        run_with_retry(&retry, "list objects", || store.list(&remote_root))
            .await
            .map_err(VerifyError::from)
    };
    let scan = async { local::scan_dir_async(local_root).await.map_err(VerifyError::from) };
    let (listing, files) = tokio::try_join!(listing, scan)?;

    let keys: Vec<String> = listing.into_keys().collect();
    let mut checksums = fetch_checksums(&store, retry, keys, options.network_lanes).await;
    tracing::debug!(objects = checksums.len(), files = files.len(), "checksums fetched");

    let mut report = VerifyReport::default();
    let permits = Arc::new(Semaphore::new(options.verify_lanes.max(1)));
    let mut set: JoinSet<(String, Result<bool, VerifyError>)> = JoinSet::new();
    let mut pending = HashSet::new();
    for path in files {
        let Some(relative) = local::relative_path(&path, local_root) else {
            continue;
        };
        let key = format!("{}{}", remote_root, relative);
        match checksums.remove(&key) {
            None => report.add(relative, VerifyStatus::MissingRemote, None),
            Some(Err(e)) => report.add(relative, VerifyStatus::Skipped, Some(e)),
            Some(Ok(checksum)) => {
                let permits = Arc::clone(&permits);
                pending.insert(relative.clone());
                set.spawn(verify_one(permits, checksum, path, relative));
            }
        }
    }

    collect_verified(&mut set, pending, &mut report).await;

    for key in checksums.into_keys() {
        report.add(key, VerifyStatus::MissingLocal, None);
    }
    report.entries.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(report)
}

/// Record every finished verification. Files whose task died are skipped.
async fn collect_verified(
    set: &mut JoinSet<(String, Result<bool, VerifyError>)>,
    mut pending: HashSet<String>,
    report: &mut VerifyReport,
) {
    while let Some(joined) = set.join_next().await {
        let (relative, result) = match joined {
            Ok(done) => done,
            Err(e) => {
                tracing::warn!("verify task failed: {}", e);
                continue;
            }
        };
        pending.remove(&relative);
        match result {
            Ok(true) => report.add(relative, VerifyStatus::Passed, None),
            Ok(false) => {
                tracing::warn!(path = %relative, "checksum mismatch");
                report.add(relative, VerifyStatus::Mismatched, None);
            }
            Err(e) => report.add(relative, VerifyStatus::Skipped, Some(e.to_string())),
        }
    }
    for relative in pending {
        report.add(
            relative,
            VerifyStatus::Skipped,
            Some("verification task failed".to_string()),
        );
    }
}

async fn verify_one(
    permits: Arc<Semaphore>,
    checksum: ObjectChecksum,
    path: PathBuf,
    relative: String,
) -> (String, Result<bool, VerifyError>) {
    let Ok(_permit) = permits.acquire_owned().await else {
        return (relative, Err(VerifyError::io(path, std::io::ErrorKind::Interrupted.into())));
    };
    let result = verify_file(&checksum, &path).await;
    (relative, result)
}

/// Fetch every key's checksum with `lanes` concurrent lanes. Every key gets
/// an entry; keys held by a lane that died map to an error.
async fn fetch_checksums(
    store: &Arc<dyn RemoteStore>,
    retry: RetryPolicy,
    keys: Vec<String>,
    lanes: usize,
) -> ChecksumMap {
    let lanes = lanes.max(1).min(keys.len());
    let all = keys.clone();
    let keys: Arc<WorkQueue<String>> = Arc::new(keys.into_iter().collect());
    let mut set = JoinSet::new();
    for _ in 0..lanes {
        let store = Arc::clone(store);
        let keys = Arc::clone(&keys);
        set.spawn(async move {
            let mut fetched: Vec<(String, Result<ObjectChecksum, StoreError>)> = Vec::new();
            while let Some(key) = keys.pop() {
                let result = run_with_retry(&retry, "get object checksum", || store.get_checksum(&key)).await;
                fetched.push((key, result));
            }
            fetched
        });
    }

    let mut map = ChecksumMap::new();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(fetched) => {
                for (key, result) in fetched {
                    map.insert(key, result.map_err(|e| e.to_string()));
                }
            }
            Err(e) => tracing::warn!("checksum fetch lane failed: {}", e),
        }
    }
    for key in all {
        map.entry(key)
            .or_insert_with(|| Err("checksum fetch failed".to_string()));
    }
    map
}
