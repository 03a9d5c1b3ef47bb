#![allow(dead_code)]

pub mod store;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use objsync_core::retry::RetryPolicy;
use objsync_core::upload::TransferContext;

use self::store::TestStore;

/// Retry policy with the production attempt count and a 1 ms step.
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 5,
        base_delay: Duration::from_millis(1),
    }
}

/// Context with small multipart sizes so tests stay fast.
pub fn context(store: &Arc<TestStore>, threshold: u64, min_part: u64) -> TransferContext {
    let mut ctx = TransferContext::new(store.clone());
    ctx.retry = fast_retry();
    ctx.options.multipart_threshold = threshold;
    ctx.options.min_part_size = min_part;
    ctx
}

pub fn write_tree(root: &Path, files: &[(&str, &[u8])]) {
    for (rel, data) in files {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, data).unwrap();
    }
}

/// Poll `cond` until it holds; panics after five seconds.
pub async fn wait_for(what: &str, cond: impl Fn() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !cond() {
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting for {}", what);
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
}

/// Deterministic, non-repeating-looking test content.
pub fn pattern(len: usize, seed: u8) -> Vec<u8> {
    (0..len)
        .map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed) ^ (i >> 8) as u8)
        .collect()
}
