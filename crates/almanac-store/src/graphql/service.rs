use almanac_core::{
    Activity, ActivityId, ActivityPatch, ActivityService, AlmanacError, DateRange, NewActivity,
    Result,
};
use async_trait::async_trait;

use super::resolvers::Resolvers;

/// [`ActivityService`] client for the GraphQL-shaped boundary.
///
/// A null `activity(id)` becomes `NotFound`, so consumers see the same
/// failures from either boundary.
#[derive(Debug, Clone)]
pub struct GraphqlService {
    resolvers: Resolvers,
}

impl GraphqlService {
    pub fn new(resolvers: Resolvers) -> Self {
        Self { resolvers }
    }

    pub fn resolvers(&self) -> &Resolvers {
        &self.resolvers
    }
}

#[async_trait]
impl ActivityService for GraphqlService {
    async fn list_activities(&self) -> Result<Vec<Activity>> {
        self.resolvers
            .activities()
            .await?
            .into_iter()
            .map(Activity::try_from)
            .collect()
    }

    async fn get_activity(&self, id: ActivityId) -> Result<Activity> {
        match self.resolvers.activity(&id.to_string()).await? {
            Some(node) => Activity::try_from(node),
            None => Err(AlmanacError::activity_not_found(id)),
        }
    }

    async fn activities_by_date_range(&self, range: DateRange) -> Result<Vec<Activity>> {
        self.resolvers
            .activities_by_date_range(range)
            .await?
            .into_iter()
            .map(Activity::try_from)
            .collect()
    }

    async fn create_activity(&self, input: NewActivity) -> Result<Activity> {
        Activity::try_from(self.resolvers.create_activity(input.into()).await?)
    }

    async fn update_activity(&self, id: ActivityId, patch: ActivityPatch) -> Result<Activity> {
        Activity::try_from(
            self.resolvers
                .update_activity(&id.to_string(), patch.into())
                .await?,
        )
    }

    async fn delete_activity(&self, id: ActivityId) -> Result<bool> {
        self.resolvers.delete_activity(&id.to_string()).await
    }
}
