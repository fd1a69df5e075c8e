//! # Entity Store
//!
//! The authoritative collection of activities and the only id allocator.
//!
//! The store is an explicit value: construct one per process, per test, or
//! per boundary, and inject it where it is needed. Clones share the same
//! records.
//!
//! Every operation is asynchronous and sleeps for the delay configured in
//! its [`LatencyProfile`] before touching the records. Callers only ever
//! receive copies; the backing collection never leaves the lock.

use almanac_core::{
    Activity, ActivityId, ActivityPatch, AlmanacError, DateRange, LatencyProfile, NewActivity,
    Result, ServiceOperation,
};
use chrono::{Datelike, NaiveDate};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

use crate::seed;

#[derive(Debug, Default)]
struct StoreState {
    /// Sorted by id; ids only ever grow so appends keep the order.
    records: Vec<Activity>,
    /// High-water mark: never lowered, so deleted ids are never reissued.
    /// `None` once the id space is used up.
    next_id: Option<ActivityId>,
}

impl StoreState {
    fn position(&self, id: ActivityId) -> Option<usize> {
        self.records.binary_search_by_key(&id, |a| a.id).ok()
    }

    fn allocate(&mut self) -> Result<ActivityId> {
        let after_existing = self.records.last().map_or(Some(ActivityId(1)), |a| a.id.next());
        let id = self
            .next_id
            .zip(after_existing)
            .map(|(next, after)| next.max(after))
            .ok_or_else(|| AlmanacError::operation_failed("no activity ids left to allocate"))?;
        self.next_id = id.next();
        Ok(id)
    }
}

/// Shared, in-memory activity store.
#[derive(Debug, Clone)]
pub struct EntityStore {
    state: Arc<Mutex<StoreState>>,
    latency: LatencyProfile,
}

impl Default for EntityStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityStore {
    /// Empty store with no simulated latency. The first id allocated is 1.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(StoreState {
                records: Vec::new(),
                next_id: Some(ActivityId(1)),
            })),
            latency: LatencyProfile::instant(),
        }
    }

    /// Store holding `activities`. Duplicate ids keep the last occurrence.
    pub fn from_activities(activities: impl IntoIterator<Item = Activity>) -> Self {
        let mut records: Vec<Activity> = activities.into_iter().collect();
        records.sort_by_key(|a| a.id);
        records.dedup_by(|later, earlier| {
            if later.id == earlier.id {
                std::mem::swap(later, earlier);
                true
            } else {
                false
            }
        });
        let next_id = records.last().map_or(Some(ActivityId(1)), |a| a.id.next());
        Self {
            state: Arc::new(Mutex::new(StoreState { records, next_id })),
            latency: LatencyProfile::instant(),
        }
    }

    /// Store seeded with the reference activities for the month of `date`.
    pub fn seeded_for(date: NaiveDate) -> Result<Self> {
        Ok(Self::from_activities(seed::activities_for_month(
            date.year(),
            date.month(),
        )?))
    }

    /// Replace the simulated latency. The records stay shared with `self`.
    #[must_use]
    pub fn with_latency(mut self, latency: LatencyProfile) -> Self {
        self.latency = latency;
        self
    }

    /// Latency applied before each operation
    pub fn latency(&self) -> LatencyProfile {
        self.latency
    }

    /// Number of stored activities. Does not simulate latency.
    pub fn len(&self) -> usize {
        self.state.lock().records.len()
    }

    /// Whether the store holds no activities
    pub fn is_empty(&self) -> bool {
        self.state.lock().records.is_empty()
    }

    /// Every activity ordered by id.
    pub async fn list(&self) -> Result<Vec<Activity>> {
        self.simulate(ServiceOperation::List).await;
        Ok(self.state.lock().records.clone())
    }

    /// One activity, or `NotFound`.
    pub async fn get(&self, id: ActivityId) -> Result<Activity> {
        self.simulate(ServiceOperation::Get).await;
        let state = self.state.lock();
        state
            .position(id)
            .map(|index| state.records[index].clone())
            .ok_or_else(|| AlmanacError::activity_not_found(id))
    }

    /// Activities starting inside `range`, ordered by id.
    pub async fn in_range(&self, range: DateRange) -> Result<Vec<Activity>> {
        self.simulate(ServiceOperation::Range).await;
        Ok(self
            .state
            .lock()
            .records
            .iter()
            .filter(|a| range.includes(a))
            .cloned()
            .collect())
    }

    /// Allocate an id and store a new activity.
    ///
    /// Field validation belongs to the caller; the store accepts any payload.
    pub async fn create(&self, fields: NewActivity) -> Result<Activity> {
        self.simulate(ServiceOperation::Create).await;
        let mut state = self.state.lock();
        let id = state.allocate()?;
        let activity = Activity::from_new(id, fields);
        state.records.push(activity.clone());
        debug!(activity_id = %id, "activity created");
        Ok(activity)
    }

    /// Merge `patch` onto an existing activity. The patch's id is ignored.
    pub async fn update(&self, id: ActivityId, patch: ActivityPatch) -> Result<Activity> {
        self.simulate(ServiceOperation::Update).await;
        let mut state = self.state.lock();
        let index = state
            .position(id)
            .ok_or_else(|| AlmanacError::activity_not_found(id))?;
        let updated = state.records[index].merged(&patch);
        state.records[index] = updated.clone();
        debug!(activity_id = %id, "activity updated");
        Ok(updated)
    }

    /// Remove an activity. Missing ids return `false`.
    pub async fn delete(&self, id: ActivityId) -> Result<bool> {
        self.simulate(ServiceOperation::Delete).await;
        let mut state = self.state.lock();
        match state.position(id) {
            Some(index) => {
                state.records.remove(index);
                debug!(activity_id = %id, "activity deleted");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn simulate(&self, op: ServiceOperation) {
        let delay = self.latency.delay(op);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}
