use std::sync::Arc;
use tokio::task::JoinSet;

use super::tally::{LaneTally, TransferSummary};
use crate::planner::TransferTask;
use crate::queue::WorkQueue;
use crate::upload::{upload_file, TransferContext};

/// Split tasks around the mean size: strictly larger than the mean is large.
/// Returns `(large, small)`, each in plan order.
pub fn partition(tasks: Vec<TransferTask>) -> (WorkQueue<TransferTask>, WorkQueue<TransferTask>) {
    let large = WorkQueue::new();
    let small = WorkQueue::new();
    if tasks.is_empty() {
        return (large, small);
    }
    let total: u128 = tasks.iter().map(|t| u128::from(t.size)).sum();
    let count = tasks.len() as u128;
    for task in tasks {
        // size > total / count, without the division.
        if u128::from(task.size) * count > total {
            large.push(task);
        } else {
            small.push(task);
        }
    }
    (large, small)
}

/// Upload every task with up to `lanes` concurrent lanes.
pub async fn run_transfers(
    ctx: Arc<TransferContext>,
    tasks: Vec<TransferTask>,
    lanes: usize,
) -> TransferSummary {
    let total = tasks.len();
    let (large, small) = partition(tasks);
    tracing::debug!(large = large.len(), small = small.len(), lanes, "starting transfers");
    let large = Arc::new(large);
    let small = Arc::new(small);

    let mut set = JoinSet::new();
    for lane in 0..lanes.max(1).min(total) {
        let (primary, secondary) = if lane == 0 {
            (Arc::clone(&large), Arc::clone(&small))
        } else {
            (Arc::clone(&small), Arc::clone(&large))
        };
        let ctx = Arc::clone(&ctx);
        set.spawn(async move { run_lane(&ctx, &primary, &secondary).await });
    }

    let mut summary = TransferSummary::default();
    let mut processed = 0usize;
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(tally) => {
                processed += tally.processed();
                summary.merge(tally);
            }
            Err(e) => tracing::warn!("transfer lane failed: {}", e),
        }
    }
    // A lane that panicked lost the task it held.
    summary.failed += total.saturating_sub(processed);
    summary
}

async fn run_lane(
    ctx: &TransferContext,
    primary: &WorkQueue<TransferTask>,
    secondary: &WorkQueue<TransferTask>,
) -> LaneTally {
    let mut tally = LaneTally::default();
    while let Some(task) = primary.pop().or_else(|| secondary.pop()) {
        match upload_file(ctx, &task).await {
            Ok(outcome) => tally.record(&task.remote_key, outcome),
            Err(e) => {
                tracing::warn!(
                    key = %task.remote_key,
                    path = %task.local_path.display(),
                    "upload failed: {}",
                    e
                );
                tally.fail(&task.remote_key, e.to_string());
            }
        }
    }
    tally
}
