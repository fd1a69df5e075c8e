//! Activity query keys and the fetchers that answer them.

use almanac_core::{Activity, ActivityId, ActivityService, DateRange};
use std::sync::Arc;

use crate::cache::{fetcher, EntityCache, Fetcher, QueryData, QueryKey};

/// Shape of the full activity list query
pub const ACTIVITIES: &str = "activities";
/// Shape of the single-activity query
pub const ACTIVITY: &str = "activity";
/// Shape of the date range query
pub const ACTIVITIES_BY_DATE_RANGE: &str = "activitiesByDateRange";

pub fn activities_key() -> QueryKey {
    QueryKey::new(ACTIVITIES)
}

pub fn activity_key(id: ActivityId) -> QueryKey {
    QueryKey::new(ACTIVITY).with_variable("id", id)
}

pub fn range_key(range: &DateRange) -> QueryKey {
    QueryKey::new(ACTIVITIES_BY_DATE_RANGE)
        .with_variable("startDate", range.start.to_rfc3339())
        .with_variable("endDate", range.end.to_rfc3339())
}

pub fn fetch_activities(service: Arc<dyn ActivityService>) -> Fetcher<Activity> {
    fetcher(move || async move { service.list_activities().await.map(QueryData::Many) })
}

/// Fails with `NotFound` when the activity does not exist.
pub fn fetch_activity(service: Arc<dyn ActivityService>, id: ActivityId) -> Fetcher<Activity> {
    fetcher(move || async move {
        service
            .get_activity(id)
            .await
            .map(|activity| QueryData::One(Some(activity)))
    })
}

pub fn fetch_range(service: Arc<dyn ActivityService>, range: DateRange) -> Fetcher<Activity> {
    fetcher(move || async move {
        service
            .activities_by_date_range(range)
            .await
            .map(QueryData::Many)
    })
}

/// Mark every query that may show activity `id` as stale.
///
/// The detail query and every list-shaped query go; the next read of any of
/// them refetches.
pub fn revalidate_activity<C: EntityCache<Activity>>(cache: &C, id: ActivityId) {
    cache.invalidate(&activity_key(id));
    revalidate_lists(cache);
}

/// Mark every list-shaped activity query as stale.
pub fn revalidate_lists<C: EntityCache<Activity>>(cache: &C) {
    cache.invalidate_shape(ACTIVITIES);
    cache.invalidate_shape(ACTIVITIES_BY_DATE_RANGE);
}
