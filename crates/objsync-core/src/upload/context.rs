use std::sync::Arc;

use crate::config::{ObjsyncConfig, MIB};
use crate::filter::AttributeRules;
use crate::multipart::MultipartQuota;
use crate::retry::RetryPolicy;
use crate::store::RemoteStore;

/// Per-file transfer knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferOptions {
    /// Files larger than this go through the multipart engine.
    pub multipart_threshold: u64,
    pub min_part_size: u64,
    /// Size alone decides whether a remote object is current.
    pub ignore_mtime: bool,
    /// Replace remote objects that exist but are stale.
    pub overwrite: bool,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            multipart_threshold: 512 * MIB,
            min_part_size: 64 * MIB,
            ignore_mtime: false,
            overwrite: true,
        }
    }
}

impl TransferOptions {
    pub fn from_config(cfg: &ObjsyncConfig) -> Self {
        Self {
            multipart_threshold: cfg.multipart_threshold_bytes,
            min_part_size: cfg.min_part_size_bytes.max(1),
            ignore_mtime: cfg.ignore_mtime,
            overwrite: true,
        }
    }
}

/// Everything a file transfer needs; shared by all lanes.
pub struct TransferContext {
    pub store: Arc<dyn RemoteStore>,
    pub retry: RetryPolicy,
    pub quota: Arc<MultipartQuota>,
    pub options: TransferOptions,
    pub attributes: AttributeRules,
}

impl TransferContext {
    /// Context with default policy, a 16-part quota and no attribute rules.
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self {
            store,
            retry: RetryPolicy::default(),
            quota: Arc::new(MultipartQuota::new(16)),
            options: TransferOptions::default(),
            attributes: AttributeRules::default(),
        }
    }

    /// Context configured from `config.toml` values.
    pub fn from_config(store: Arc<dyn RemoteStore>, cfg: &ObjsyncConfig) -> Result<Self, regex::Error> {
        Ok(Self {
            store,
            retry: RetryPolicy::from_config(cfg.retry.as_ref()),
            quota: Arc::new(MultipartQuota::new(cfg.multipart_threads)),
            options: TransferOptions::from_config(cfg),
            attributes: AttributeRules::new(&cfg.content_types, cfg.cache_control.clone())?,
        })
    }
}
