use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

pub const MIB: u64 = 1024 * 1024;

/// Retry policy parameters (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per store call (including the first).
    pub max_attempts: u32,
    /// Linear backoff unit in milliseconds (attempt n waits n * base).
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 1000,
        }
    }
}

/// Content type assigned to keys whose relative path matches `pattern`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContentTypeRule {
    /// Regular expression matched against the relative path.
    pub pattern: String,
    pub content_type: String,
}

/// Global configuration loaded from `~/.config/objsync/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjsyncConfig {
    /// Root directory of the default object store (overridden by `--store`).
    #[serde(default)]
    pub store_dir: Option<PathBuf>,
    /// Number of upload lanes.
    pub threads: usize,
    /// Total in-flight part uploads shared by all concurrent multipart jobs.
    pub multipart_threads: usize,
    /// Files strictly larger than this use multipart upload.
    pub multipart_threshold_bytes: u64,
    /// Lower bound for the multipart part size.
    pub min_part_size_bytes: u64,
    /// Concurrent local verifications in `verify-dir`.
    pub verify_threads: usize,
    /// Concurrent checksum fetches in `verify-dir`.
    pub network_threads: usize,
    /// Compare sizes only when deciding whether a file is up to date.
    #[serde(default)]
    pub ignore_mtime: bool,
    /// Cache-Control value attached to every uploaded object.
    #[serde(default)]
    pub cache_control: Option<String>,
    /// Ordered content-type rules; first match wins.
    #[serde(default)]
    pub content_types: Vec<ContentTypeRule>,
    /// Optional retry policy; if missing, built-in defaults are used.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
}

impl Default for ObjsyncConfig {
    fn default() -> Self {
        Self {
            store_dir: None,
            threads: 8,
            multipart_threads: 16,
            multipart_threshold_bytes: 512 * MIB,
            min_part_size_bytes: 64 * MIB,
            verify_threads: 512,
            network_threads: 16,
            ignore_mtime: false,
            cache_control: None,
            content_types: Vec::new(),
            retry: None,
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("objsync")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<ObjsyncConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = ObjsyncConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: ObjsyncConfig = toml::from_str(&data)?;
    Ok(cfg)
}
