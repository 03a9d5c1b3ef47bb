//! Store wrapper for integration tests: counts calls, tracks in-flight part
//! uploads, can hold uploads at a gate, and injects failures into part
//! uploads and deletes.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;

use objsync_core::checksum::ObjectChecksum;
use objsync_core::retry::StoreError;
use objsync_core::store::{
    CompletedPart, DeleteOutcome, DirStore, MultipartSession, ObjectAttributes, RemoteEntry,
    RemoteListing, RemoteStore,
};

#[derive(Debug, Default)]
pub struct Calls {
    pub list: AtomicUsize,
    pub head: AtomicUsize,
    pub get_checksum: AtomicUsize,
    pub put: AtomicUsize,
    pub create: AtomicUsize,
    pub upload_part: AtomicUsize,
    pub complete: AtomicUsize,
    pub abort: AtomicUsize,
    pub delete_batch: AtomicUsize,
}

impl Calls {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    /// Calls that change remote state.
    pub fn mutations(&self) -> usize {
        Self::get(&self.put)
            + Self::get(&self.create)
            + Self::get(&self.upload_part)
            + Self::get(&self.complete)
            + Self::get(&self.delete_batch)
    }
}

/// What the next part uploads should do instead of succeeding.
#[derive(Debug, Clone, Copy)]
pub enum PartFault {
    /// The next `n` part uploads fail with a transient error.
    Transient(usize),
    /// Every upload of this part number fails permanently.
    Permanent(u32),
}

/// What delete requests should do instead of succeeding.
#[derive(Debug, Clone)]
pub enum DeleteFault {
    /// Every delete request fails with a transient error.
    Request,
    /// These keys are reported in `failed` and left in place.
    Keys(Vec<String>),
}

pub struct TestStore {
    inner: DirStore,
    pub calls: Calls,
    part_fault: Mutex<Option<PartFault>>,
    part_delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    checksum_overrides: Mutex<HashMap<String, ObjectChecksum>>,
    delete_fault: Mutex<Option<DeleteFault>>,
    checksum_panic: Mutex<Option<String>>,
    puts: Mutex<Vec<String>>,
    parts_by_key: Mutex<HashMap<String, usize>>,
    dispatches: Mutex<Vec<(String, usize)>>,
    gated: AtomicBool,
    gate: Semaphore,
}

impl TestStore {
    pub async fn open(root: &std::path::Path) -> Arc<Self> {
        Arc::new(Self {
            inner: DirStore::open(root).await.unwrap(),
            calls: Calls::default(),
            part_fault: Mutex::new(None),
            part_delay: Duration::from_millis(5),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            checksum_overrides: Mutex::new(HashMap::new()),
            delete_fault: Mutex::new(None),
            checksum_panic: Mutex::new(None),
            puts: Mutex::new(Vec::new()),
            parts_by_key: Mutex::new(HashMap::new()),
            dispatches: Mutex::new(Vec::new()),
            gated: AtomicBool::new(false),
            gate: Semaphore::new(0),
        })
    }

    pub fn inner(&self) -> &DirStore {
        &self.inner
    }

    pub fn fail_parts(&self, fault: PartFault) {
        *self.part_fault.lock().unwrap() = Some(fault);
    }

    pub fn fail_deletes(&self, fault: DeleteFault) {
        *self.delete_fault.lock().unwrap() = Some(fault);
    }

    /// Fetching the checksum of `key` panics the calling task.
    pub fn panic_on_checksum(&self, key: &str) {
        *self.checksum_panic.lock().unwrap() = Some(key.to_string());
    }

    /// Keys in the order their `put` calls started.
    pub fn put_order(&self) -> Vec<String> {
        self.puts.lock().unwrap().clone()
    }

    /// Part uploads of `key` currently inside the store.
    pub fn parts_in_flight(&self, key: &str) -> usize {
        self.parts_by_key.lock().unwrap().get(key).copied().unwrap_or(0)
    }

    /// Every part upload started so far, with its key's in-flight count
    /// including itself.
    pub fn dispatches(&self) -> Vec<(String, usize)> {
        self.dispatches.lock().unwrap().clone()
    }

    /// Make puts and part uploads wait until released.
    pub fn hold(&self) {
        self.gated.store(true, Ordering::SeqCst);
    }

    /// Let `n` held uploads through, oldest first.
    pub fn release(&self, n: usize) {
        self.gate.add_permits(n);
    }

    /// Stop holding and let every waiting upload through.
    pub fn open_gate(&self) {
        self.gated.store(false, Ordering::SeqCst);
        self.gate.add_permits(1 << 20);
    }

    async fn pass_gate(&self) {
        if self.gated.load(Ordering::SeqCst) {
            self.gate.acquire().await.unwrap().forget();
        }
    }

    /// Largest number of part uploads observed running at once.
    pub fn max_parts_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Report `checksum` for `key` instead of the stored one.
    pub fn override_checksum(&self, key: &str, checksum: ObjectChecksum) {
        self.checksum_overrides
            .lock()
            .unwrap()
            .insert(key.to_string(), checksum);
    }

    fn injected_part_error(&self, part_number: u32) -> Option<StoreError> {
        let mut fault = self.part_fault.lock().unwrap();
        match *fault {
            Some(PartFault::Transient(n)) if n > 0 => {
                *fault = Some(PartFault::Transient(n - 1));
                Some(StoreError::transient("injected 503"))
            }
            Some(PartFault::Permanent(p)) if p == part_number => {
                Some(StoreError::permanent("injected 403"))
            }
            _ => None,
        }
    }
}

#[async_trait]
impl RemoteStore for TestStore {
    async fn list(&self, prefix: &str) -> Result<RemoteListing, StoreError> {
        self.calls.list.fetch_add(1, Ordering::SeqCst);
        self.inner.list(prefix).await
    }

    async fn head(&self, key: &str) -> Result<RemoteEntry, StoreError> {
        self.calls.head.fetch_add(1, Ordering::SeqCst);
        self.inner.head(key).await
    }

    async fn get_checksum(&self, key: &str) -> Result<ObjectChecksum, StoreError> {
        self.calls.get_checksum.fetch_add(1, Ordering::SeqCst);
        let panics = self.checksum_panic.lock().unwrap().as_deref() == Some(key);
        if panics {
            panic!("injected panic fetching {}", key);
        }
        if let Some(c) = self.checksum_overrides.lock().unwrap().get(key) {
            return Ok(c.clone());
        }
        self.inner.get_checksum(key).await
    }

    async fn put(
        &self,
        key: &str,
        body: &[u8],
        sha256: &str,
        md5: &str,
        attributes: &ObjectAttributes,
    ) -> Result<(), StoreError> {
        self.calls.put.fetch_add(1, Ordering::SeqCst);
        self.puts.lock().unwrap().push(key.to_string());
        self.pass_gate().await;
        self.inner.put(key, body, sha256, md5, attributes).await
    }

    async fn create_multipart(
        &self,
        key: &str,
        attributes: &ObjectAttributes,
    ) -> Result<MultipartSession, StoreError> {
        self.calls.create.fetch_add(1, Ordering::SeqCst);
        self.inner.create_multipart(key, attributes).await
    }

    async fn upload_part(
        &self,
        session: &MultipartSession,
        part_number: u32,
        body: &[u8],
        sha256: &str,
        md5: &str,
    ) -> Result<String, StoreError> {
        self.calls.upload_part.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        {
            let mut by_key = self.parts_by_key.lock().unwrap();
            let count = by_key.entry(session.key.clone()).or_insert(0);
            *count += 1;
            self.dispatches
                .lock()
                .unwrap()
                .push((session.key.clone(), *count));
        }
        tokio::time::sleep(self.part_delay).await;
        self.pass_gate().await;
        let result = match self.injected_part_error(part_number) {
            Some(e) => Err(e),
            None => self.inner.upload_part(session, part_number, body, sha256, md5).await,
        };
        if let Some(count) = self.parts_by_key.lock().unwrap().get_mut(&session.key) {
            *count -= 1;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn complete_multipart(
        &self,
        session: &MultipartSession,
        aggregate_sha256: &str,
        parts: &[CompletedPart],
    ) -> Result<(), StoreError> {
        self.calls.complete.fetch_add(1, Ordering::SeqCst);
        self.inner
            .complete_multipart(session, aggregate_sha256, parts)
            .await
    }

    async fn abort_multipart(&self, session: &MultipartSession) -> Result<(), StoreError> {
        self.calls.abort.fetch_add(1, Ordering::SeqCst);
        self.inner.abort_multipart(session).await
    }

    async fn delete_batch(&self, keys: &[String]) -> Result<DeleteOutcome, StoreError> {
        self.calls.delete_batch.fetch_add(1, Ordering::SeqCst);
        let fault = self.delete_fault.lock().unwrap().clone();
        match fault {
            Some(DeleteFault::Request) => Err(StoreError::transient("injected 503")),
            Some(DeleteFault::Keys(refused)) => {
                let (refused_here, rest): (Vec<String>, Vec<String>) =
                    keys.iter().cloned().partition(|k| refused.contains(k));
                let mut outcome = self.inner.delete_batch(&rest).await?;
                outcome.failed.extend(refused_here);
                Ok(outcome)
            }
            None => self.inner.delete_batch(keys).await,
        }
    }
}
