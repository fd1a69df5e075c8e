//! REST-shaped boundary: a plain set of async calls over the entity store.

use almanac_core::{
    Activity, ActivityId, ActivityPatch, ActivityService, DateRange, NewActivity, Result,
    ServiceOperation,
};
use async_trait::async_trait;
use tracing::debug;

use crate::store::EntityStore;

/// [`ActivityService`] that forwards straight to an [`EntityStore`].
#[derive(Debug, Clone)]
pub struct RestApi {
    store: EntityStore,
}

impl RestApi {
    pub fn new(store: EntityStore) -> Self {
        Self { store }
    }

    /// The store behind this boundary
    pub fn store(&self) -> &EntityStore {
        &self.store
    }
}

fn fired(op: ServiceOperation) {
    debug!(operation = %op, boundary = "rest", "operation fired");
}

#[async_trait]
impl ActivityService for RestApi {
    async fn list_activities(&self) -> Result<Vec<Activity>> {
        let activities = self.store.list().await?;
        fired(ServiceOperation::List);
        Ok(activities)
    }

    async fn get_activity(&self, id: ActivityId) -> Result<Activity> {
        let activity = self.store.get(id).await;
        fired(ServiceOperation::Get);
        activity
    }

    async fn activities_by_date_range(&self, range: DateRange) -> Result<Vec<Activity>> {
        let activities = self.store.in_range(range).await?;
        fired(ServiceOperation::Range);
        Ok(activities)
    }

    async fn create_activity(&self, input: NewActivity) -> Result<Activity> {
        let created = self.store.create(input).await?;
        fired(ServiceOperation::Create);
        Ok(created)
    }

    async fn update_activity(&self, id: ActivityId, patch: ActivityPatch) -> Result<Activity> {
        let updated = self.store.update(id, patch).await;
        fired(ServiceOperation::Update);
        updated
    }

    async fn delete_activity(&self, id: ActivityId) -> Result<bool> {
        let removed = self.store.delete(id).await?;
        fired(ServiceOperation::Delete);
        Ok(removed)
    }
}
