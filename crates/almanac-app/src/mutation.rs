//! # Mutation Coordinator
//!
//! Runs writes against the service with an optimistic cache projection:
//!
//! ```text
//!            submit                 service Ok
//!   Idle ──────────────► Submitting ───────────► Committed
//!    ▲   (projection     │                       (server value written,
//!    │    written)       │ service Err            edit mode closed)
//!    │                   ▼
//!    └──── retry ─── RolledBack
//!                    (pre-submit value restored,
//!                     edit mode reopened)
//! ```
//!
//! A rollback restores the last confirmed value of the activity: the value
//! cached before the first of its outstanding submissions, replaced by each
//! commit as it lands. A projection is never a rollback target, so
//! overlapping failures cannot leave one behind.
//!
//! Two mutations of the same activity may race. Under
//! [`ConcurrencyPolicy::LastSettlementWins`] each settlement writes or
//! restores as it lands. Under [`ConcurrencyPolicy::LatestSubmissionWins`]
//! every submission takes a sequence number and settlements of superseded
//! submissions leave the cache and state untouched.

use almanac_core::{
    Activity, ActivityId, ActivityPatch, ActivityService, AlmanacConfig, AlmanacError,
    ConcurrencyPolicy, Dynamic, NewActivity, Result,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::cache::{EntityCache, EntityKey, QueryCache};
use crate::form::check_time_order;
use crate::queries;

/// Where the most recent mutation is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MutationStatus {
    #[default]
    Idle,
    Submitting,
    Committed,
    RolledBack,
}

/// State published to the rendering layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationState {
    pub status: MutationStatus,
    /// Error of the last rolled-back mutation
    pub last_error: Option<AlmanacError>,
    /// Whether the edit form should be open
    pub editing: bool,
    /// Activity the last mutation or edit targeted
    pub activity_id: Option<ActivityId>,
}

/// Unsettled submissions for one activity.
struct Pending {
    latest: u64,
    outstanding: usize,
    confirmed: Option<Activity>,
}

/// Per-activity submission bookkeeping. Entries exist only while a
/// submission for the activity is unsettled.
#[derive(Default)]
struct Ledger {
    next_seq: u64,
    pending: HashMap<ActivityId, Pending>,
}

impl Ledger {
    /// Register a submission. `current` becomes the rollback target only
    /// when nothing else is outstanding for `id`.
    fn submit(&mut self, id: ActivityId, current: Option<Activity>) -> u64 {
        self.next_seq += 1;
        let seq = self.next_seq;
        let pending = self.pending.entry(id).or_insert_with(|| Pending {
            latest: seq,
            outstanding: 0,
            confirmed: current,
        });
        pending.latest = seq;
        pending.outstanding += 1;
        seq
    }

    /// Record a settlement and return the latest submission for `id` along
    /// with the last confirmed value.
    fn settle(
        &mut self,
        id: ActivityId,
        seq: u64,
        confirmed: Option<&Activity>,
    ) -> (u64, Option<Activity>) {
        let Some(pending) = self.pending.get_mut(&id) else {
            return (seq, confirmed.cloned());
        };
        if let Some(value) = confirmed {
            pending.confirmed = Some(value.clone());
        }
        pending.outstanding = pending.outstanding.saturating_sub(1);
        let settled = (pending.latest, pending.confirmed.clone());
        if pending.outstanding == 0 {
            self.pending.remove(&id);
        }
        settled
    }
}

/// Coordinates optimistic writes between the cache and the service.
pub struct MutationCoordinator<C = QueryCache<Activity>> {
    service: Arc<dyn ActivityService>,
    cache: C,
    state: Dynamic<MutationState>,
    policy: ConcurrencyPolicy,
    revalidate_after_commit: bool,
    ledger: Arc<Mutex<Ledger>>,
}

impl<C: Clone> Clone for MutationCoordinator<C> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            cache: self.cache.clone(),
            state: self.state.clone(),
            policy: self.policy,
            revalidate_after_commit: self.revalidate_after_commit,
            ledger: self.ledger.clone(),
        }
    }
}

impl<C: EntityCache<Activity>> MutationCoordinator<C> {
    /// Coordinator with default settings: last settlement wins, revalidate
    /// after every commit.
    pub fn new(service: Arc<dyn ActivityService>, cache: C) -> Self {
        Self {
            service,
            cache,
            state: Dynamic::new(MutationState::default()),
            policy: ConcurrencyPolicy::default(),
            revalidate_after_commit: true,
            ledger: Arc::new(Mutex::new(Ledger::default())),
        }
    }

    /// Coordinator configured from the `mutation` and `cache` sections.
    pub fn from_config(service: Arc<dyn ActivityService>, cache: C, config: &AlmanacConfig) -> Self {
        Self::new(service, cache)
            .with_policy(config.mutation.concurrency)
            .with_revalidation(config.cache.revalidate_after_commit)
    }

    #[must_use]
    pub fn with_policy(mut self, policy: ConcurrencyPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// `false` skips invalidating list and detail queries after a commit;
    /// the committed value written to the cache is trusted instead.
    #[must_use]
    pub fn with_revalidation(mut self, revalidate: bool) -> Self {
        self.revalidate_after_commit = revalidate;
        self
    }

    pub fn policy(&self) -> ConcurrencyPolicy {
        self.policy
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// Snapshot of the published state
    pub fn state(&self) -> MutationState {
        self.state.get()
    }

    /// The published state cell, for subscriptions
    pub fn state_signal(&self) -> Dynamic<MutationState> {
        self.state.clone()
    }

    /// Open the edit form for `id`.
    pub fn begin_edit(&self, id: ActivityId) {
        self.state.update(|s| {
            s.editing = true;
            s.activity_id = Some(id);
            s.last_error = None;
            s.status = MutationStatus::Idle;
        });
    }

    /// Close the edit form without submitting.
    pub fn cancel_edit(&self) {
        self.state.update(|s| {
            s.editing = false;
            s.last_error = None;
        });
    }

    /// Number of activities with an unsettled update
    pub fn pending_updates(&self) -> usize {
        self.ledger.lock().pending.len()
    }

    fn submitting(&self, id: Option<ActivityId>) {
        self.state.update(|s| {
            s.status = MutationStatus::Submitting;
            s.last_error = None;
            s.activity_id = id;
        });
    }

    fn committed(&self) {
        self.state.update(|s| {
            s.status = MutationStatus::Committed;
            s.last_error = None;
            s.editing = false;
        });
    }

    fn rolled_back(&self, err: &AlmanacError) {
        self.state.update(|s| {
            s.status = MutationStatus::RolledBack;
            s.last_error = Some(err.clone());
            s.editing = true;
        });
    }

    /// Update an activity optimistically.
    ///
    /// The projection (cached value merged with `patch`) is written to the
    /// cache before the service is called. A patch that would leave the
    /// activity with `end_time <= start_time` is rejected with a
    /// `Validation` error and changes nothing. If the activity is not
    /// cached there is nothing to project and only the confirmed value is
    /// written.
    pub async fn update(&self, id: ActivityId, patch: ActivityPatch) -> Result<Activity> {
        let key = EntityKey::activity(id);
        let (seq, projection) = {
            let mut ledger = self.ledger.lock();
            let current = self.cache.entity(&key);
            let projection = current.as_ref().map(|c| c.merged(&patch));
            match &projection {
                Some(projected) => check_time_order(projected.start_time, projected.end_time)?,
                None => {
                    if let (Some(start), Some(end)) = (patch.start_time, patch.end_time) {
                        check_time_order(start, end)?;
                    }
                }
            }
            (ledger.submit(id, current), projection)
        };

        self.submitting(Some(id));
        if let Some(projected) = projection {
            debug!(activity_id = %id, seq, "writing optimistic projection");
            self.cache.write(projected);
        }

        let outcome = self.service.update_activity(id, patch).await;
        let (latest, last_confirmed) = self.ledger.lock().settle(id, seq, outcome.as_ref().ok());

        if self.policy == ConcurrencyPolicy::LatestSubmissionWins && latest != seq {
            debug!(activity_id = %id, seq, latest, "ignoring settlement of superseded update");
            return outcome;
        }

        match outcome {
            Ok(confirmed) => {
                self.cache.write(confirmed.clone());
                if self.revalidate_after_commit {
                    queries::revalidate_activity(&self.cache, id);
                }
                self.committed();
                info!(activity_id = %id, seq, "update committed");
                Ok(confirmed)
            }
            Err(err) => {
                if let Some(previous) = last_confirmed {
                    self.cache.write(previous);
                }
                self.rolled_back(&err);
                warn!(activity_id = %id, seq, error = %err, "update rolled back");
                Err(err)
            }
        }
    }

    /// Create an activity. The confirmed record is written to the cache and
    /// list queries are marked stale.
    pub async fn create(&self, fields: NewActivity) -> Result<Activity> {
        check_time_order(fields.start_time, fields.end_time)?;
        self.submitting(None);

        match self.service.create_activity(fields).await {
            Ok(created) => {
                self.cache.write(created.clone());
                queries::revalidate_lists(&self.cache);
                self.state.update(|s| s.activity_id = Some(created.id));
                self.committed();
                info!(activity_id = %created.id, "create committed");
                Ok(created)
            }
            Err(err) => {
                self.rolled_back(&err);
                warn!(error = %err, "create failed");
                Err(err)
            }
        }
    }

    /// Delete an activity. The entity is evicted only after the service
    /// confirms; `Ok(false)` means nothing existed to delete.
    pub async fn delete(&self, id: ActivityId) -> Result<bool> {
        self.submitting(Some(id));

        match self.service.delete_activity(id).await {
            Ok(removed) => {
                if removed {
                    self.cache.evict(&EntityKey::activity(id));
                    queries::revalidate_activity(&self.cache, id);
                }
                self.committed();
                info!(activity_id = %id, removed, "delete committed");
                Ok(removed)
            }
            Err(err) => {
                self.rolled_back(&err);
                warn!(activity_id = %id, error = %err, "delete failed");
                Err(err)
            }
        }
    }
}
