//! Local filesystem primitives: recursive scan, stat, and relative keys.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::SyncError;

/// What `stat` reports about a local path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalFileInfo {
    pub is_file: bool,
    pub is_dir: bool,
    pub size: u64,
    pub modified: SystemTime,
}

/// Stat a path, following symlinks.
pub fn stat(path: &Path) -> Result<LocalFileInfo, SyncError> {
    let meta = std::fs::metadata(path).map_err(|e| SyncError::io(path, e))?;
    Ok(LocalFileInfo {
        is_file: meta.is_file(),
        is_dir: meta.is_dir(),
        size: meta.len(),
        modified: meta.modified().unwrap_or(UNIX_EPOCH),
    })
}

/// Every regular file under `root`, recursively, sorted by path.
pub fn scan_dir(root: &Path) -> Result<Vec<PathBuf>, SyncError> {
    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(root).follow_links(true).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            let source = e
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, "filesystem loop"));
            SyncError::io(path, source)
        })?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Async wrapper running [`scan_dir`] on the blocking pool.
pub async fn scan_dir_async(root: &Path) -> Result<Vec<PathBuf>, SyncError> {
    let root = root.to_path_buf();
    tokio::task::spawn_blocking(move || scan_dir(&root)).await?
}

/// `path` relative to `root`, with `/` separators on every platform.
/// Returns `None` when `path` is not under `root`.
pub fn relative_path(path: &Path, root: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<_> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_finds_nested_files_only() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("a/b")).unwrap();
        std::fs::create_dir_all(dir.path().join("empty")).unwrap();
        std::fs::write(dir.path().join("top.txt"), b"1").unwrap();
        std::fs::write(dir.path().join("a/b/deep.txt"), b"22").unwrap();

        let files = scan_dir(dir.path()).unwrap();
        let rel: Vec<_> = files
            .iter()
            .map(|p| relative_path(p, dir.path()).unwrap())
            .collect();
        assert_eq!(rel, vec!["a/b/deep.txt", "top.txt"]);
    }

    #[test]
    fn stat_reports_kind_and_size() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("f");
        std::fs::write(&file, b"12345").unwrap();
        let info = stat(&file).unwrap();
        assert!(info.is_file);
        assert!(!info.is_dir);
        assert_eq!(info.size, 5);
        assert!(stat(dir.path()).unwrap().is_dir);
        assert!(matches!(stat(&dir.path().join("missing")), Err(SyncError::Io { .. })));
    }

    #[test]
    fn relative_path_outside_root() {
        assert_eq!(relative_path(Path::new("/x/y"), Path::new("/a")), None);
        assert_eq!(
            relative_path(Path::new("/a/b/c.txt"), Path::new("/a")).as_deref(),
            Some("b/c.txt")
        );
    }
}
