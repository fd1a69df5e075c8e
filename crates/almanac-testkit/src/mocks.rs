//! Service decorators for driving the coordination layer into specific
//! situations: failed writes, counted calls and writes held open until a
//! test releases them.

use almanac_core::{
    Activity, ActivityId, ActivityPatch, ActivityService, AlmanacError, DateRange, NewActivity,
    Result, ServiceOperation,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Fails selected operations with a configured error; everything else is
/// forwarded to the inner service.
pub struct FaultyService {
    inner: Arc<dyn ActivityService>,
    faults: Mutex<HashMap<ServiceOperation, AlmanacError>>,
    delay: Mutex<Duration>,
}

impl FaultyService {
    pub fn new(inner: Arc<dyn ActivityService>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            faults: Mutex::new(HashMap::new()),
            delay: Mutex::new(Duration::ZERO),
        })
    }

    /// Make every later call to `op` fail with `error`.
    pub fn fail(&self, op: ServiceOperation, error: AlmanacError) {
        self.faults.lock().insert(op, error);
    }

    /// Stop failing `op`.
    pub fn heal(&self, op: ServiceOperation) {
        self.faults.lock().remove(&op);
    }

    /// Sleep this long before answering any call, failed or not.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = delay;
    }

    async fn gate(&self, op: ServiceOperation) -> Result<()> {
        let delay = *self.delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        match self.faults.lock().get(&op) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ActivityService for FaultyService {
    async fn list_activities(&self) -> Result<Vec<Activity>> {
        self.gate(ServiceOperation::List).await?;
        self.inner.list_activities().await
    }

    async fn get_activity(&self, id: ActivityId) -> Result<Activity> {
        self.gate(ServiceOperation::Get).await?;
        self.inner.get_activity(id).await
    }

    async fn activities_by_date_range(&self, range: DateRange) -> Result<Vec<Activity>> {
        self.gate(ServiceOperation::Range).await?;
        self.inner.activities_by_date_range(range).await
    }

    async fn create_activity(&self, input: NewActivity) -> Result<Activity> {
        self.gate(ServiceOperation::Create).await?;
        self.inner.create_activity(input).await
    }

    async fn update_activity(&self, id: ActivityId, patch: ActivityPatch) -> Result<Activity> {
        self.gate(ServiceOperation::Update).await?;
        self.inner.update_activity(id, patch).await
    }

    async fn delete_activity(&self, id: ActivityId) -> Result<bool> {
        self.gate(ServiceOperation::Delete).await?;
        self.inner.delete_activity(id).await
    }
}

/// Counts calls per operation. A call is counted when its future first
/// runs, not when it is created.
pub struct CountingService {
    inner: Arc<dyn ActivityService>,
    counts: Mutex<HashMap<ServiceOperation, usize>>,
}

impl CountingService {
    pub fn new(inner: Arc<dyn ActivityService>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            counts: Mutex::new(HashMap::new()),
        })
    }

    pub fn calls(&self, op: ServiceOperation) -> usize {
        self.counts.lock().get(&op).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.counts.lock().values().sum()
    }

    pub fn reset(&self) {
        self.counts.lock().clear();
    }

    fn record(&self, op: ServiceOperation) {
        *self.counts.lock().entry(op).or_insert(0) += 1;
    }
}

#[async_trait]
impl ActivityService for CountingService {
    async fn list_activities(&self) -> Result<Vec<Activity>> {
        self.record(ServiceOperation::List);
        self.inner.list_activities().await
    }

    async fn get_activity(&self, id: ActivityId) -> Result<Activity> {
        self.record(ServiceOperation::Get);
        self.inner.get_activity(id).await
    }

    async fn activities_by_date_range(&self, range: DateRange) -> Result<Vec<Activity>> {
        self.record(ServiceOperation::Range);
        self.inner.activities_by_date_range(range).await
    }

    async fn create_activity(&self, input: NewActivity) -> Result<Activity> {
        self.record(ServiceOperation::Create);
        self.inner.create_activity(input).await
    }

    async fn update_activity(&self, id: ActivityId, patch: ActivityPatch) -> Result<Activity> {
        self.record(ServiceOperation::Update);
        self.inner.update_activity(id, patch).await
    }

    async fn delete_activity(&self, id: ActivityId) -> Result<bool> {
        self.record(ServiceOperation::Delete);
        self.inner.delete_activity(id).await
    }
}

/// Holds calls to the gated operations until [`GatedService::release`]
/// hands out a permit, one permit per call. Calls are admitted in arrival
/// order.
pub struct GatedService {
    inner: Arc<dyn ActivityService>,
    gated: HashSet<ServiceOperation>,
    permits: Semaphore,
    waiting: AtomicUsize,
}

impl GatedService {
    pub fn new(
        inner: Arc<dyn ActivityService>,
        gated: impl IntoIterator<Item = ServiceOperation>,
    ) -> Arc<Self> {
        Arc::new(Self {
            inner,
            gated: gated.into_iter().collect(),
            permits: Semaphore::new(0),
            waiting: AtomicUsize::new(0),
        })
    }

    /// Let `n` held calls through.
    pub fn release(&self, n: usize) {
        self.permits.add_permits(n);
    }

    /// Calls currently held at the gate.
    pub fn waiting(&self) -> usize {
        self.waiting.load(Ordering::SeqCst)
    }

    async fn pass(&self, op: ServiceOperation) {
        if !self.gated.contains(&op) {
            return;
        }
        self.waiting.fetch_add(1, Ordering::SeqCst);
        let permit = self.permits.acquire().await.unwrap();
        permit.forget();
        self.waiting.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ActivityService for GatedService {
    async fn list_activities(&self) -> Result<Vec<Activity>> {
        self.pass(ServiceOperation::List).await;
        self.inner.list_activities().await
    }

    async fn get_activity(&self, id: ActivityId) -> Result<Activity> {
        self.pass(ServiceOperation::Get).await;
        self.inner.get_activity(id).await
    }

    async fn activities_by_date_range(&self, range: DateRange) -> Result<Vec<Activity>> {
        self.pass(ServiceOperation::Range).await;
        self.inner.activities_by_date_range(range).await
    }

    async fn create_activity(&self, input: NewActivity) -> Result<Activity> {
        self.pass(ServiceOperation::Create).await;
        self.inner.create_activity(input).await
    }

    async fn update_activity(&self, id: ActivityId, patch: ActivityPatch) -> Result<Activity> {
        self.pass(ServiceOperation::Update).await;
        self.inner.update_activity(id, patch).await
    }

    async fn delete_activity(&self, id: ActivityId) -> Result<bool> {
        self.pass(ServiceOperation::Delete).await;
        self.inner.delete_activity(id).await
    }
}
