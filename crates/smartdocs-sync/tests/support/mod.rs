//! In-memory gateway with scripted failures, used by the engine tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::Semaphore;

use smartdocs_core::error::GatewayError;
use smartdocs_core::types::ObjectRecord;
use smartdocs_storage::gateway::{GatewayResult, StorageGateway};

pub struct ScriptedGateway {
    container: String,
    objects: Mutex<BTreeMap<String, (DateTime<Utc>, u64)>>,
    list_failures: Mutex<VecDeque<GatewayError>>,
    write_failures: Mutex<Vec<(String, GatewayError)>>,
    gate: Mutex<Option<Arc<Semaphore>>>,
    hang: AtomicBool,
    clock: AtomicUsize,
    pub list_calls: AtomicUsize,
    pub lists_finished: AtomicUsize,
    pub write_calls: AtomicUsize,
    active_lists: AtomicUsize,
    peak_lists: AtomicUsize,
}

/// Counts a listing as active until it returns or is dropped.
struct ActiveList<'a>(&'a AtomicUsize);

impl Drop for ActiveList<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ScriptedGateway {
    pub fn new(container: &str) -> Arc<Self> {
        Arc::new(Self {
            container: container.to_string(),
            objects: Mutex::new(BTreeMap::new()),
            list_failures: Mutex::new(VecDeque::new()),
            write_failures: Mutex::new(Vec::new()),
            gate: Mutex::new(None),
            hang: AtomicBool::new(false),
            clock: AtomicUsize::new(0),
            list_calls: AtomicUsize::new(0),
            lists_finished: AtomicUsize::new(0),
            write_calls: AtomicUsize::new(0),
            active_lists: AtomicUsize::new(0),
            peak_lists: AtomicUsize::new(0),
        })
    }

    /// Seconds since the epoch used for `at(0)`.
    const EPOCH: i64 = 1_767_225_600;

    pub fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(Self::EPOCH + secs, 0).unwrap()
    }

    pub fn insert(&self, key: &str, secs: i64, size: u64) {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), (Self::at(secs), size));
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    pub fn fail_next_list(&self, err: GatewayError) {
        self.list_failures.lock().unwrap().push_back(err);
    }

    /// Fail every write whose key ends with `suffix`.
    pub fn fail_writes_ending_with(&self, suffix: &str, err: GatewayError) {
        self.write_failures
            .lock()
            .unwrap()
            .push((suffix.to_string(), err));
    }

    /// Block listings until [`ScriptedGateway::release`] hands out permits.
    pub fn hold_lists(&self) {
        *self.gate.lock().unwrap() = Some(Arc::new(Semaphore::new(0)));
    }

    pub fn release(&self, listings: usize) {
        if let Some(gate) = self.gate.lock().unwrap().as_ref() {
            gate.add_permits(listings);
        }
    }

    /// Make listings never return.
    pub fn hang(&self) {
        self.hang.store(true, Ordering::SeqCst);
    }

    pub fn lists(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Most listings ever running at the same time.
    pub fn peak_concurrent_lists(&self) -> usize {
        self.peak_lists.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.write_calls.load(Ordering::SeqCst)
    }

    /// Yield until `n` listings have returned to the engine.
    pub async fn wait_lists_finished(&self, n: usize) {
        while self.lists_finished.load(Ordering::SeqCst) < n {
            tokio::task::yield_now().await;
        }
    }

    fn url(&self, key: &str) -> String {
        format!("mem://{}/{key}", self.container)
    }
}

#[async_trait]
impl StorageGateway for ScriptedGateway {
    async fn list(&self) -> GatewayResult<Vec<ObjectRecord>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let active = self.active_lists.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_lists.fetch_max(active, Ordering::SeqCst);
        let _active = ActiveList(&self.active_lists);

        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.acquire().await.unwrap().forget();
        }
        if self.hang.load(Ordering::SeqCst) {
            futures::future::pending::<()>().await;
        }

        let result = match self.list_failures.lock().unwrap().pop_front() {
            Some(err) => Err(err),
            None => Ok(self
                .objects
                .lock()
                .unwrap()
                .iter()
                .map(|(key, (modified, size))| ObjectRecord {
                    key: key.clone(),
                    last_modified: *modified,
                    size_bytes: *size,
                    access_url: self.url(key),
                })
                .collect()),
        };
        self.lists_finished.fetch_add(1, Ordering::SeqCst);
        result
    }

    async fn head(&self, key: &str) -> GatewayResult<ObjectRecord> {
        let objects = self.objects.lock().unwrap();
        let (modified, size) = objects
            .get(key)
            .ok_or_else(|| GatewayError::NotFound(key.to_string()))?;
        Ok(ObjectRecord {
            key: key.to_string(),
            last_modified: *modified,
            size_bytes: *size,
            access_url: self.url(key),
        })
    }

    async fn write(&self, key: &str, data: Bytes, _content_type: &str) -> GatewayResult<()> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        let failure = self
            .write_failures
            .lock()
            .unwrap()
            .iter()
            .find(|(suffix, _)| key.ends_with(suffix.as_str()))
            .map(|(_, err)| err.clone());
        if let Some(err) = failure {
            return Err(err);
        }

        let tick = 1_000 + self.clock.fetch_add(1, Ordering::SeqCst) as i64;
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), (Self::at(tick), data.len() as u64));
        Ok(())
    }

    fn resolve_access_url(&self, key: &str) -> String {
        self.url(key)
    }

    async fn test_connection(&self) -> GatewayResult<()> {
        Ok(())
    }

    fn container(&self) -> &str {
        &self.container
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
