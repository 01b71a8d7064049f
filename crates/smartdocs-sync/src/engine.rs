//! Reconciliation engine: owns the pending-object view of one container.
//!
//! The engine keeps exactly one mutable [`ViewSnapshot`] behind a
//! `tokio::sync::watch` channel. Every listing replaces the records wholesale;
//! subscribers see each published snapshot and never a half-applied one.
//!
//! At most one `list` call is in flight per engine. Refresh requests that
//! arrive while one is running join it through a shared future instead of
//! issuing another call.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use smartdocs_core::config::SmartdocsConfig;
use smartdocs_core::error::{GatewayError, ValidationError};
use smartdocs_core::keys::KeyGenerator;
use smartdocs_core::types::{ErrorDescriptor, ObjectRecord, Operation, ViewSnapshot};
use smartdocs_core::upload::{UploadFile, UploadPolicy};
use smartdocs_storage::factory::create_gateway;
use smartdocs_storage::gateway::{GatewayResult, StorageGateway};

use crate::error::EngineError;
use crate::reconcile::reconcile;

type RefreshOutcome = Result<(), GatewayError>;
type PendingRefresh = Shared<BoxFuture<'static, RefreshOutcome>>;

/// Smallest poll interval or call timeout the engine runs with.
pub const MIN_PERIOD: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Period between automatic refreshes.
    pub poll_interval: Duration,
    /// Upper bound for any single gateway call.
    pub call_timeout: Duration,
    pub policy: UploadPolicy,
}

impl EngineOptions {
    pub fn from_config(config: &SmartdocsConfig) -> Self {
        Self {
            poll_interval: config.sync.poll_interval(),
            call_timeout: config.sync.call_timeout(),
            policy: config.upload.policy(),
        }
    }
}

impl EngineOptions {
    /// Raise zero or sub-millisecond durations to a usable floor.
    fn clamped(mut self) -> Self {
        if self.poll_interval < MIN_PERIOD || self.call_timeout < MIN_PERIOD {
            tracing::warn!(
                poll_interval_ms = self.poll_interval.as_millis() as u64,
                call_timeout_ms = self.call_timeout.as_millis() as u64,
                "engine durations below {}ms raised",
                MIN_PERIOD.as_millis()
            );
        }
        self.poll_interval = self.poll_interval.max(MIN_PERIOD);
        self.call_timeout = self.call_timeout.max(MIN_PERIOD);
        self
    }
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            call_timeout: Duration::from_secs(20),
            policy: UploadPolicy::default(),
        }
    }
}

/// Result of a stored upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub key: String,
    pub access_url: String,
    pub size_bytes: u64,
}

pub struct Engine {
    inner: Arc<EngineInner>,
    poller: Mutex<Option<JoinHandle<()>>>,
}

struct EngineInner {
    gateway: Arc<dyn StorageGateway>,
    options: EngineOptions,
    keys: KeyGenerator,
    snapshot: watch::Sender<ViewSnapshot>,
    in_flight: Mutex<Option<PendingRefresh>>,
    /// Set when a write lands while a listing is in flight that may predate it.
    rerun: AtomicBool,
    stopped: AtomicBool,
}

impl Engine {
    /// Create an engine over `gateway`. Nothing is listed until [`Engine::start`]
    /// or [`Engine::refresh`] is called. Durations below [`MIN_PERIOD`] are raised to it.
    pub fn new(gateway: Arc<dyn StorageGateway>, options: EngineOptions) -> Self {
        let (snapshot, _) = watch::channel(ViewSnapshot::default());
        Self {
            inner: Arc::new(EngineInner {
                gateway,
                options: options.clamped(),
                keys: KeyGenerator::new(),
                snapshot,
                in_flight: Mutex::new(None),
                rerun: AtomicBool::new(false),
                stopped: AtomicBool::new(false),
            }),
            poller: Mutex::new(None),
        }
    }

    /// Build the configured gateway and an engine over it. Configuration
    /// problems are returned without touching the network.
    pub async fn connect(config: &SmartdocsConfig) -> Result<Self, EngineError> {
        let gateway = create_gateway(&config.storage).await?;
        Ok(Self::new(gateway, EngineOptions::from_config(config)))
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> ViewSnapshot {
        self.inner.snapshot.borrow().clone()
    }

    /// Receiver that observes every snapshot published from now on.
    pub fn subscribe(&self) -> watch::Receiver<ViewSnapshot> {
        self.inner.snapshot.subscribe()
    }

    pub fn container(&self) -> &str {
        self.inner.gateway.container()
    }

    pub fn gateway_name(&self) -> &str {
        self.inner.gateway.name()
    }

    pub fn access_url(&self, key: &str) -> String {
        self.inner.gateway.resolve_access_url(key)
    }

    pub fn is_running(&self) -> bool {
        !self.inner.is_stopped() && self.lock_poller().is_some()
    }

    /// Run the initial listing and arm the periodic refresh.
    ///
    /// Must be called from within a tokio runtime. Calling it again while
    /// running is a no-op; a stopped engine cannot be restarted.
    pub fn start(&self) {
        if self.inner.is_stopped() {
            tracing::warn!(container = self.container(), "start() on a stopped engine ignored");
            return;
        }
        let mut poller = self.lock_poller();
        if poller.is_some() {
            return;
        }

        self.inner.trigger_refresh();
        *poller = Some(tokio::spawn(poll_loop(Arc::clone(&self.inner))));
        tracing::info!(
            container = self.container(),
            interval_ms = self.inner.options.poll_interval.as_millis() as u64,
            "sync engine started"
        );
    }

    /// Cancel the periodic refresh. Calls still in flight run to completion
    /// but their results are discarded.
    pub fn stop(&self) {
        if self.inner.stopped.swap(true, Ordering::AcqRel) {
            return;
        }
        let poller = self.lock_poller().take();
        // wait out a listing that is being applied right now
        drop(self.inner.lock_in_flight());
        match poller {
            Some(handle) => {
                handle.abort();
                tracing::info!(container = self.container(), "sync engine stopped");
            }
            None => tracing::debug!(container = self.container(), "sync engine closed"),
        }
    }

    /// Re-list the container. Joins a listing that is already running.
    pub async fn refresh(&self) -> Result<(), EngineError> {
        if self.inner.is_stopped() {
            return Err(EngineError::Stopped);
        }
        self.inner
            .request_refresh()
            .await
            .map_err(EngineError::Refresh)
    }

    /// Validate, write and then refresh in the background.
    ///
    /// Returns once the write settles; the refresh it triggers is tracked by
    /// the snapshot's `is_refreshing` flag.
    pub async fn upload(&self, file: UploadFile) -> Result<UploadReceipt, EngineError> {
        let inner = &self.inner;
        if inner.is_stopped() {
            return Err(EngineError::Stopped);
        }

        inner.options.policy.validate(&file)?;
        let key = inner
            .keys
            .next_key(&file.name)
            .ok_or_else(|| ValidationError::InvalidName(file.name.clone()))?;
        let size_bytes = file.size_bytes();

        tracing::debug!(key = %key, size_bytes, "upload started");
        let result = inner
            .call("write", inner.gateway.write(&key, file.data, &file.content_type))
            .await;

        match result {
            Ok(()) => {
                tracing::info!(key = %key, size_bytes, "upload stored");
                inner.publish_if_live(|s| {
                    let upload_error = s
                        .last_error
                        .as_ref()
                        .is_some_and(|e| e.operation == Operation::Upload);
                    if upload_error {
                        s.last_error = None;
                    }
                    upload_error
                });
                inner.refresh_after_write();
                Ok(UploadReceipt {
                    access_url: inner.gateway.resolve_access_url(&key),
                    key,
                    size_bytes,
                })
            }
            Err(reason) => {
                tracing::warn!(key = %key, error = %reason, "upload failed");
                let descriptor = ErrorDescriptor::new(Operation::Upload, reason.clone());
                inner.publish_if_live(|s| {
                    s.last_error = Some(descriptor);
                    true
                });
                Err(EngineError::UploadFailed { key, reason })
            }
        }
    }

    /// Metadata of a single object, straight from the store.
    pub async fn inspect(&self, key: &str) -> Result<ObjectRecord, EngineError> {
        if self.inner.is_stopped() {
            return Err(EngineError::Stopped);
        }
        self.inner
            .call("head", self.inner.gateway.head(key))
            .await
            .map_err(EngineError::Gateway)
    }

    fn lock_poller(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.poller.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.stop();
    }
}

impl EngineInner {
    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    fn lock_in_flight(&self) -> MutexGuard<'_, Option<PendingRefresh>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, update: impl FnOnce(&mut ViewSnapshot)) {
        self.snapshot.send_modify(|s| {
            update(s);
            s.version += 1;
        });
    }

    /// Publish only while the engine is live. Holding the in-flight lock
    /// orders this against `stop`.
    fn publish_if_live(&self, update: impl FnOnce(&mut ViewSnapshot) -> bool) {
        let _in_flight = self.lock_in_flight();
        if self.is_stopped() {
            return;
        }
        self.snapshot.send_if_modified(|s| {
            let changed = update(s);
            if changed {
                s.version += 1;
            }
            changed
        });
    }

    /// Whether the last listing was refused for bad credentials.
    fn credentials_rejected(&self) -> bool {
        self.snapshot.borrow().last_error.as_ref().is_some_and(|e| {
            e.operation == Operation::Refresh && e.error.is_unauthorized()
        })
    }

    async fn call<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = GatewayResult<T>>,
    ) -> GatewayResult<T> {
        let limit = self.options.call_timeout;
        match tokio::time::timeout(limit, fut).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::NetworkFailure(format!(
                "{operation} timed out after {}ms",
                limit.as_millis()
            ))),
        }
    }

    /// Start a listing, or hand out the one already running.
    fn request_refresh(self: &Arc<Self>) -> PendingRefresh {
        let mut in_flight = self.lock_in_flight();
        if let Some(pending) = in_flight.as_ref() {
            tracing::debug!(container = self.gateway.container(), "refresh already in flight, joining it");
            return pending.clone();
        }
        self.begin_refresh(&mut in_flight)
    }

    /// Spawn a listing into the empty in-flight slot.
    fn begin_refresh(self: &Arc<Self>, in_flight: &mut Option<PendingRefresh>) -> PendingRefresh {
        tracing::debug!(container = self.gateway.container(), "refresh started");
        self.snapshot.send_if_modified(|s| {
            if s.is_refreshing {
                return false;
            }
            s.is_refreshing = true;
            s.version += 1;
            true
        });

        let task = tokio::spawn(Arc::clone(self).run_refresh());
        let pending = async move {
            task.await.unwrap_or_else(|e| {
                Err(GatewayError::NetworkFailure(format!("refresh task failed: {e}")))
            })
        }
        .boxed()
        .shared();
        *in_flight = Some(pending.clone());
        pending
    }

    fn trigger_refresh(self: &Arc<Self>) {
        drop(self.request_refresh());
    }

    /// A listing already in flight may have been answered before the write
    /// landed; queue exactly one more after it instead of joining it.
    fn refresh_after_write(self: &Arc<Self>) {
        {
            let in_flight = self.lock_in_flight();
            if self.is_stopped() {
                return;
            }
            if in_flight.is_some() {
                self.rerun.store(true, Ordering::Release);
                tracing::debug!(container = self.gateway.container(), "follow-up refresh queued");
                return;
            }
        }
        self.trigger_refresh();
    }

    async fn run_refresh(self: Arc<Self>) -> RefreshOutcome {
        let started = std::time::Instant::now();
        let result = self.call("list", self.gateway.list()).await;

        let mut in_flight = self.lock_in_flight();
        in_flight.take();

        if self.is_stopped() {
            tracing::debug!(container = self.gateway.container(), "engine stopped, discarding listing");
            return result.map(|_| ());
        }

        // the follow-up starts under the same lock, so `is_refreshing` never drops in between
        let rerun = self.rerun.swap(false, Ordering::AcqRel);
        let outcome = self.apply_listing(result, started, rerun);
        if rerun {
            drop(self.begin_refresh(&mut in_flight));
        }
        outcome
    }

    fn apply_listing(
        &self,
        result: GatewayResult<Vec<ObjectRecord>>,
        started: std::time::Instant,
        still_refreshing: bool,
    ) -> RefreshOutcome {
        match result {
            Ok(records) => {
                let records = reconcile(records);
                let count = records.len();
                self.publish(|s| {
                    s.records = records;
                    s.is_refreshing = still_refreshing;
                    s.refreshed_at = Some(Utc::now());
                    if s
                        .last_error
                        .as_ref()
                        .is_some_and(|e| e.operation == Operation::Refresh)
                    {
                        s.last_error = None;
                    }
                });
                tracing::debug!(
                    container = self.gateway.container(),
                    records = count,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "refresh completed"
                );
                Ok(())
            }
            Err(err) => {
                tracing::warn!(
                    container = self.gateway.container(),
                    error = %err,
                    "refresh failed, keeping last known records"
                );
                let descriptor = ErrorDescriptor::new(Operation::Refresh, err.clone());
                self.publish(|s| {
                    s.is_refreshing = still_refreshing;
                    s.last_error = Some(descriptor);
                });
                Err(err)
            }
        }
    }
}

async fn poll_loop(inner: Arc<EngineInner>) {
    let period = inner.options.poll_interval;
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        if inner.is_stopped() {
            break;
        }
        if inner.credentials_rejected() {
            tracing::debug!(
                container = inner.gateway.container(),
                "credentials rejected, skipping automatic refresh"
            );
            continue;
        }
        inner.trigger_refresh();
    }
}
