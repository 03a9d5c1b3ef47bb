//! Part-upload budget shared by every concurrent multipart job.
//!
//! Each job holds a [`QuotaLease`] for its lifetime. The lease's share is
//! `max(1, total / active_jobs)` and is read live, so shares shrink when a job
//! joins and grow back when one leaves.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug)]
pub struct MultipartQuota {
    total: usize,
    active: AtomicUsize,
}

impl MultipartQuota {
    /// Create a quota with `total` in-flight part uploads (at least 1).
    pub fn new(total: usize) -> Self {
        Self {
            total: total.max(1),
            active: AtomicUsize::new(0),
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Number of jobs currently holding a lease.
    pub fn active_jobs(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    /// Current per-job share. Never below 1.
    pub fn effective_limit(&self) -> usize {
        (self.total / self.active_jobs().max(1)).max(1)
    }

    /// Register a job. The returned lease unregisters it when dropped.
    pub fn join(self: &Arc<Self>) -> QuotaLease {
        self.active.fetch_add(1, Ordering::AcqRel);
        QuotaLease {
            quota: Arc::clone(self),
        }
    }
}

/// Membership of one job in a [`MultipartQuota`]; released on drop.
#[derive(Debug)]
pub struct QuotaLease {
    quota: Arc<MultipartQuota>,
}

impl QuotaLease {
    /// This job's share right now.
    pub fn limit(&self) -> usize {
        self.quota.effective_limit()
    }
}

impl Drop for QuotaLease {
    fn drop(&mut self) {
        self.quota.active.fetch_sub(1, Ordering::AcqRel);
    }
}
