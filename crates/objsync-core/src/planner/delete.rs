//! Batched deletion of remote-only keys.

use std::sync::Arc;
use tokio::task::JoinSet;

use crate::retry::{run_with_retry, RetryPolicy};
use crate::store::{RemoteStore, DELETE_BATCH_LIMIT};

/// Split keys into batches of at most [`DELETE_BATCH_LIMIT`].
pub fn delete_batches(keys: Vec<String>) -> Vec<Vec<String>> {
    keys.chunks(DELETE_BATCH_LIMIT).map(<[String]>::to_vec).collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteSummary {
    pub deleted: usize,
    pub failed: usize,
    pub failed_keys: Vec<String>,
}

/// Issue every batch concurrently. A batch whose request fails after retries
/// counts all of its keys as failed.
pub async fn run_deletes(
    store: Arc<dyn RemoteStore>,
    retry: RetryPolicy,
    batches: Vec<Vec<String>>,
) -> DeleteSummary {
    let total: usize = batches.iter().map(Vec::len).sum();
    let mut set = JoinSet::new();
    for batch in batches {
        let store = Arc::clone(&store);
        set.spawn(async move {
            let outcome = run_with_retry(&retry, "delete batch", || store.delete_batch(&batch)).await;
            (batch, outcome)
        });
    }

    let mut summary = DeleteSummary::default();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((_, Ok(outcome))) => {
                for key in &outcome.deleted {
                    tracing::info!(key = %key, "deleted");
                }
                for key in &outcome.failed {
                    tracing::warn!(key = %key, "failed to delete");
                }
                summary.deleted += outcome.deleted.len();
                summary.failed += outcome.failed.len();
                summary.failed_keys.extend(outcome.failed);
            }
            Ok((batch, Err(e))) => {
                tracing::warn!(keys = batch.len(), "delete batch failed: {}", e);
                summary.failed += batch.len();
                summary.failed_keys.extend(batch);
            }
            Err(e) => tracing::warn!("delete task failed: {}", e),
        }
    }
    // Keys of batches whose task died are unaccounted for; they did not succeed.
    summary.failed += total.saturating_sub(summary.deleted + summary.failed);
    summary.failed_keys.sort();
    summary
}
