//! Multipart upload engine.
//!
//! A file is read part by part while earlier parts are still uploading. The
//! number of parts in flight is capped by the job's live share of the
//! [`MultipartQuota`]. Any part failure (after retries) cancels the remaining
//! parts and aborts the session; a session is only completed when every byte
//! of the expected size was read and every part was acknowledged.

mod chunk;
mod job;
mod quota;

use std::path::Path;
use std::sync::Arc;
use tokio::task::JoinSet;

pub use chunk::{part_size_for, ChunkReader, PartChunk};
pub use job::{JobPhase, MultipartJob};
pub use quota::{MultipartQuota, QuotaLease};

use crate::checksum::{encode_digest, sha256_digest};
use crate::error::SyncError;
use crate::retry::{run_with_retry, StoreError};
use crate::store::{CompletedPart, MultipartSession, ObjectAttributes, MAX_OBJECT_SIZE};
use crate::upload::TransferContext;

/// Upload `path` to `key` in parts. `expected_size` is the size seen at stat time.
pub async fn upload_multipart(
    ctx: &TransferContext,
    key: &str,
    path: &Path,
    expected_size: u64,
    attributes: &ObjectAttributes,
) -> Result<(), SyncError> {
    if expected_size > MAX_OBJECT_SIZE {
        return Err(SyncError::SizeTooLarge {
            path: path.to_path_buf(),
            size: expected_size,
            max: MAX_OBJECT_SIZE,
        });
    }
    let part_size = part_size_for(expected_size, ctx.options.min_part_size);
    let mut reader = ChunkReader::open(path, part_size)?;
    let lease = ctx.quota.join();

    let session = run_with_retry(&ctx.retry, "create multipart upload", || {
        ctx.store.create_multipart(key, attributes)
    })
    .await?;
    tracing::debug!(key, upload_id = %session.upload_id, part_size, "multipart upload started");

    let mut job = MultipartJob::new(session);
    let mut in_flight: JoinSet<Result<CompletedPart, StoreError>> = JoinSet::new();

    let sent = send_parts(ctx, &lease, &mut reader, &mut job, &mut in_flight, expected_size).await;
    if let Err(e) = sent {
        in_flight.abort_all();
        abort(ctx, &mut job).await;
        return Err(e);
    }
    drop(lease);

    if reader.bytes_read() != expected_size {
        abort(ctx, &mut job).await;
        return Err(SyncError::ShortRead {
            path: path.to_path_buf(),
            expected: expected_size,
            read: reader.bytes_read(),
        });
    }

    job.set_phase(JobPhase::Completing);
    let parts = match job.finalize_parts(reader.parts_read()) {
        Ok(parts) => parts.to_vec(),
        Err(e) => {
            abort(ctx, &mut job).await;
            return Err(e);
        }
    };
    let aggregate = encode_digest(&sha256_digest(&job.concatenated_digests()));
    let session = job.session().clone();
    let completed = run_with_retry(&ctx.retry, "complete multipart upload", || {
        ctx.store.complete_multipart(&session, &aggregate, &parts)
    })
    .await;
    if let Err(e) = completed {
        abort(ctx, &mut job).await;
        return Err(e.into());
    }
    job.set_phase(JobPhase::Completed);
    tracing::debug!(key, parts = parts.len(), "multipart upload completed");
    Ok(())
}

/// Read, dispatch and collect parts until EOF and every part is acknowledged.
async fn send_parts(
    ctx: &TransferContext,
    lease: &QuotaLease,
    reader: &mut ChunkReader,
    job: &mut MultipartJob,
    in_flight: &mut JoinSet<Result<CompletedPart, StoreError>>,
    expected_size: u64,
) -> Result<(), SyncError> {
    job.set_phase(JobPhase::Uploading);
    let mut eof = false;
    loop {
        while !eof && in_flight.len() < lease.limit() {
            match reader.next_chunk().await? {
                Some(chunk) => {
                    job.add_digest(chunk.part_number, chunk.sha256.clone());
                    spawn_part(ctx, job.session(), chunk, in_flight);
                    // Grew since stat: stop reading, the size check fails the job.
                    if reader.bytes_read() > expected_size {
                        eof = true;
                    }
                }
                None => eof = true,
            }
        }
        match in_flight.join_next().await {
            Some(joined) => job.record_part(joined??),
            None => return Ok(()),
        }
    }
}

fn spawn_part(
    ctx: &TransferContext,
    session: &MultipartSession,
    chunk: PartChunk,
    in_flight: &mut JoinSet<Result<CompletedPart, StoreError>>,
) {
    let store = Arc::clone(&ctx.store);
    let policy = ctx.retry;
    let session = session.clone();
    in_flight.spawn(async move {
        let checksum = encode_digest(&chunk.sha256);
        let token = run_with_retry(&policy, "upload part", || {
            store.upload_part(&session, chunk.part_number, &chunk.bytes, &checksum, &chunk.md5)
        })
        .await?;
        Ok(CompletedPart {
            part_number: chunk.part_number,
            completion_token: token,
            checksum,
        })
    });
}

/// Best-effort abort; the caller's error is what gets reported.
async fn abort(ctx: &TransferContext, job: &mut MultipartJob) {
    job.set_phase(JobPhase::Aborting);
    let session = job.session().clone();
    let aborted = run_with_retry(&ctx.retry, "abort multipart upload", || {
        ctx.store.abort_multipart(&session)
    })
    .await;
    if let Err(e) = aborted {
        tracing::warn!(key = %session.key, upload_id = %session.upload_id, "abort failed: {}", e);
    }
    job.set_phase(JobPhase::Aborted);
}
