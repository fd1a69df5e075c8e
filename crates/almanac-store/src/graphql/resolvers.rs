//! Query and mutation resolvers executed in-process.
//!
//! Ids arrive as GraphQL `ID` strings. A string that is not a number names
//! no activity: `activity` resolves to null, `deleteActivity` to `false`,
//! and `updateActivity` fails with `NotFound`.

use almanac_core::{ActivityId, AlmanacError, DateRange, Result, ServiceOperation};
use tracing::debug;

use super::schema::{ActivityInput, ActivityNode, UpdateActivityInput};
use crate::store::EntityStore;

/// Resolver set backed by an [`EntityStore`].
#[derive(Debug, Clone)]
pub struct Resolvers {
    store: EntityStore,
}

fn fired(op: ServiceOperation) {
    debug!(operation = %op, boundary = "graphql", "operation fired");
}

fn parse_id(id: &str) -> Option<ActivityId> {
    id.trim().parse::<u64>().ok().map(ActivityId)
}

impl Resolvers {
    pub fn new(store: EntityStore) -> Self {
        Self { store }
    }

    /// The store behind these resolvers
    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    /// `Query.activities`
    pub async fn activities(&self) -> Result<Vec<ActivityNode>> {
        let activities = self.store.list().await?;
        fired(ServiceOperation::List);
        Ok(activities.into_iter().map(ActivityNode::from).collect())
    }

    /// `Query.activity(id)`; `None` when no activity has that id.
    pub async fn activity(&self, id: &str) -> Result<Option<ActivityNode>> {
        let result = match parse_id(id) {
            Some(id) => match self.store.get(id).await {
                Ok(activity) => Some(ActivityNode::from(activity)),
                Err(err) if err.is_not_found() => None,
                Err(err) => return Err(err),
            },
            None => None,
        };
        fired(ServiceOperation::Get);
        Ok(result)
    }

    /// `Query.activitiesByDateRange(startDate, endDate)`, both ends inclusive.
    pub async fn activities_by_date_range(&self, range: DateRange) -> Result<Vec<ActivityNode>> {
        let activities = self.store.in_range(range).await?;
        fired(ServiceOperation::Range);
        Ok(activities.into_iter().map(ActivityNode::from).collect())
    }

    /// `Mutation.createActivity(input)`
    pub async fn create_activity(&self, input: ActivityInput) -> Result<ActivityNode> {
        let created = self.store.create(input.into()).await?;
        fired(ServiceOperation::Create);
        Ok(created.into())
    }

    /// `Mutation.updateActivity(id, input)`; the id never changes.
    pub async fn update_activity(
        &self,
        id: &str,
        input: UpdateActivityInput,
    ) -> Result<ActivityNode> {
        let id = parse_id(id).ok_or_else(|| AlmanacError::activity_not_found(id))?;
        let updated = self.store.update(id, input.into()).await?;
        fired(ServiceOperation::Update);
        Ok(updated.into())
    }

    /// `Mutation.deleteActivity(id)`; `false` when nothing was removed.
    pub async fn delete_activity(&self, id: &str) -> Result<bool> {
        let removed = match parse_id(id) {
            Some(id) => self.store.delete(id).await?,
            None => false,
        };
        fired(ServiceOperation::Delete);
        Ok(removed)
    }
}
