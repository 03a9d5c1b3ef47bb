//! Integration tests for the multipart engine: retries, aborts, short reads
//! and the shared part budget.

mod common;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use common::store::{Calls, PartFault, TestStore};
use objsync_core::multipart::{upload_multipart, MultipartQuota};
use objsync_core::planner::TransferTask;
use objsync_core::scheduler::run_transfers;
use objsync_core::store::{ObjectAttributes, RemoteStore};
use objsync_core::upload::TransferContext;
use objsync_core::SyncError;
use tempfile::tempdir;

#[tokio::test]
async fn transient_part_failures_are_retried() {
    let local = tempdir().unwrap();
    let remote = tempdir().unwrap();
    let data = common::pattern(1_000, 3);
    common::write_tree(local.path(), &[("f.bin", &data)]);
    let store = TestStore::open(remote.path()).await;
    store.fail_parts(PartFault::Transient(2));
    let ctx = common::context(&store, 100, 250);

    upload_multipart(&ctx, "f.bin", &local.path().join("f.bin"), 1_000, &ObjectAttributes::default())
        .await
        .unwrap();
    assert_eq!(Calls::get(&store.calls.upload_part), 4 + 2);
    assert_eq!(Calls::get(&store.calls.complete), 1);
    assert_eq!(Calls::get(&store.calls.abort), 0);
    assert_eq!(std::fs::read(remote.path().join("f.bin")).unwrap(), data);
}

#[tokio::test]
async fn permanent_part_failure_aborts_without_completing() {
    let local = tempdir().unwrap();
    let remote = tempdir().unwrap();
    common::write_tree(local.path(), &[("f.bin", &common::pattern(1_000, 4))]);
    let store = TestStore::open(remote.path()).await;
    store.fail_parts(PartFault::Permanent(2));
    let ctx = common::context(&store, 100, 250);

    let err = upload_multipart(&ctx, "f.bin", &local.path().join("f.bin"), 1_000, &ObjectAttributes::default())
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::Store(_)));
    assert_eq!(Calls::get(&store.calls.complete), 0);
    assert_eq!(Calls::get(&store.calls.abort), 1);
    assert!(store.head("f.bin").await.unwrap_err().is_not_found());
    assert_eq!(ctx.quota.active_jobs(), 0);
}

#[tokio::test]
async fn short_read_aborts_and_reports() {
    let local = tempdir().unwrap();
    let remote = tempdir().unwrap();
    common::write_tree(local.path(), &[("f.bin", &common::pattern(600, 5))]);
    let store = TestStore::open(remote.path()).await;
    let ctx = common::context(&store, 100, 250);

    // Stat said 1000 bytes; the file only holds 600.
    let err = upload_multipart(&ctx, "f.bin", &local.path().join("f.bin"), 1_000, &ObjectAttributes::default())
        .await
        .unwrap_err();
    match err {
        SyncError::ShortRead { expected, read, .. } => {
            assert_eq!(expected, 1_000);
            assert_eq!(read, 600);
        }
        other => panic!("expected ShortRead, got {other:?}"),
    }
    assert_eq!(Calls::get(&store.calls.abort), 1);
    assert_eq!(Calls::get(&store.calls.complete), 0);
}

#[tokio::test]
async fn grown_file_is_a_short_read() {
    let local = tempdir().unwrap();
    let remote = tempdir().unwrap();
    common::write_tree(local.path(), &[("f.bin", &common::pattern(1_200, 6))]);
    let store = TestStore::open(remote.path()).await;
    let ctx = common::context(&store, 100, 250);

    let err = upload_multipart(&ctx, "f.bin", &local.path().join("f.bin"), 1_000, &ObjectAttributes::default())
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::ShortRead { expected: 1_000, .. }));
    assert_eq!(Calls::get(&store.calls.complete), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_jobs_share_the_part_budget() {
    let local = tempdir().unwrap();
    let remote = tempdir().unwrap();
    common::write_tree(
        local.path(),
        &[
            ("a.bin", &common::pattern(4_000, 1)),
            ("b.bin", &common::pattern(4_000, 2)),
            ("c.bin", &common::pattern(4_000, 3)),
        ],
    );
    let store = TestStore::open(remote.path()).await;
    let mut ctx = common::context(&store, 100, 200);
    ctx.quota = Arc::new(MultipartQuota::new(4));
    let ctx = Arc::new(ctx);

    let tasks: Vec<TransferTask> = ["a.bin", "b.bin", "c.bin"]
        .iter()
        .map(|name| TransferTask {
            remote_key: name.to_string(),
            local_path: local.path().join(name),
            relative_path: name.to_string(),
            size: 4_000,
        })
        .collect();
    let summary = run_transfers(Arc::clone(&ctx), tasks, 3).await;
    assert_eq!(summary.uploaded, 3);
    assert_eq!(summary.failed, 0);
    assert_eq!(Calls::get(&store.calls.upload_part), 60);
    // No job ever has more parts inside the store than the whole budget.
    assert!(store
        .dispatches()
        .iter()
        .all(|(_, in_flight)| *in_flight <= 4));
    assert_eq!(ctx.quota.active_jobs(), 0);
}

fn spawn_upload(
    ctx: &Arc<TransferContext>,
    local: &Path,
    name: &'static str,
    size: u64,
) -> tokio::task::JoinHandle<Result<(), SyncError>> {
    let ctx = Arc::clone(ctx);
    let path = local.join(name);
    tokio::spawn(async move {
        upload_multipart(&ctx, name, &path, size, &ObjectAttributes::default()).await
    })
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn lone_job_fills_the_whole_budget() {
    let local = tempdir().unwrap();
    let remote = tempdir().unwrap();
    common::write_tree(local.path(), &[("a.bin", &common::pattern(1_000, 1))]);
    let store = TestStore::open(remote.path()).await;
    store.hold();
    let mut ctx = common::context(&store, 100, 100);
    ctx.quota = Arc::new(MultipartQuota::new(4));
    let ctx = Arc::new(ctx);

    let job = spawn_upload(&ctx, local.path(), "a.bin", 1_000);
    common::wait_for("four parts in flight", || store.parts_in_flight("a.bin") == 4).await;
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(store.parts_in_flight("a.bin"), 4);

    store.open_gate();
    job.await.unwrap().unwrap();
    assert_eq!(store.max_parts_in_flight(), 4);
    assert_eq!(Calls::get(&store.calls.upload_part), 10);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn second_job_halves_the_share_of_the_first() {
    let local = tempdir().unwrap();
    let remote = tempdir().unwrap();
    common::write_tree(
        local.path(),
        &[
            ("a.bin", &common::pattern(1_000, 1)),
            ("b.bin", &common::pattern(1_000, 2)),
        ],
    );
    let store = TestStore::open(remote.path()).await;
    store.hold();
    let mut ctx = common::context(&store, 100, 100);
    ctx.quota = Arc::new(MultipartQuota::new(4));
    let ctx = Arc::new(ctx);

    let first = spawn_upload(&ctx, local.path(), "a.bin", 1_000);
    common::wait_for("first job at full budget", || store.parts_in_flight("a.bin") == 4).await;

    let second = spawn_upload(&ctx, local.path(), "b.bin", 1_000);
    common::wait_for("second job at half budget", || store.parts_in_flight("b.bin") == 2).await;
    assert_eq!(ctx.quota.active_jobs(), 2);
    let mark = store.dispatches().len();

    // Three of the first job's parts finish; it may refill only to its new share.
    store.release(3);
    common::wait_for("first job refilled", || store.dispatches().len() == mark + 1).await;
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(store.parts_in_flight("a.bin"), 2);
    assert_eq!(store.parts_in_flight("b.bin"), 2);
    assert_eq!(store.dispatches().len(), mark + 1);
    assert!(store.dispatches()[mark..]
        .iter()
        .all(|(_, in_flight)| *in_flight <= 2));

    store.open_gate();
    first.await.unwrap().unwrap();
    second.await.unwrap().unwrap();
    assert_eq!(ctx.quota.active_jobs(), 0);
}
