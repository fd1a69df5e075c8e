//! # Loader Bridge
//!
//! Turns route parameters into resource handles. Every read a route needs is
//! issued before [`Loader::load`] returns, so they run concurrently; nothing
//! here waits. The rendering layer suspends when it reads the handles.

use almanac_core::{Activity, ActivityId, ActivityService, AlmanacConfig, DateRange, FetchPolicy};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::cache::{EntityCache, LiveQuery, QueryCache};
use crate::queries;
use crate::resource::Resource;

/// Parameters of the calendar routes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteParams {
    /// Raw `:id` segment of the detail route, if present
    pub activity_id: Option<String>,
}

impl RouteParams {
    /// The calendar index route
    pub fn index() -> Self {
        Self::default()
    }

    /// The detail route for `id`
    pub fn activity(id: impl Into<String>) -> Self {
        Self {
            activity_id: Some(id.into()),
        }
    }
}

/// Named handles returned for a route.
#[derive(Debug, Clone)]
pub struct LoaderData {
    pub activities: Resource<LiveQuery<Activity>>,
    pub selected_activity: Option<Resource<LiveQuery<Activity>>>,
}

/// Issues the reads a route needs against the cache.
pub struct Loader<C = QueryCache<Activity>> {
    service: Arc<dyn ActivityService>,
    cache: C,
    policy: FetchPolicy,
}

impl<C: Clone> Clone for Loader<C> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            cache: self.cache.clone(),
            policy: self.policy,
        }
    }
}

impl<C: EntityCache<Activity>> Loader<C> {
    pub fn new(service: Arc<dyn ActivityService>, cache: C) -> Self {
        Self {
            service,
            cache,
            policy: FetchPolicy::default(),
        }
    }

    pub fn from_config(service: Arc<dyn ActivityService>, cache: C, config: &AlmanacConfig) -> Self {
        Self::new(service, cache).with_policy(config.cache.fetch_policy)
    }

    #[must_use]
    pub fn with_policy(mut self, policy: FetchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> FetchPolicy {
        self.policy
    }

    /// Issue every read the route needs and return their handles.
    ///
    /// The list is always loaded; the detail read is added when the route
    /// names an activity. An id that cannot name an activity yields a
    /// detail handle that has already failed with `NotFound`.
    pub fn load(&self, params: &RouteParams) -> LoaderData {
        let activities = self.activities();
        let selected_activity = params.activity_id.as_deref().map(|raw| {
            match ActivityId::from_route(raw) {
                Ok(id) => self.activity(id),
                Err(err) => Resource::failed(format!("activity({raw})"), err),
            }
        });
        debug!(
            policy = %self.policy,
            selected = ?params.activity_id,
            "route reads issued"
        );
        LoaderData {
            activities,
            selected_activity,
        }
    }

    /// The full activity list
    pub fn activities(&self) -> Resource<LiveQuery<Activity>> {
        self.cache.read(
            queries::activities_key(),
            self.policy,
            queries::fetch_activities(self.service.clone()),
        )
    }

    /// One activity
    pub fn activity(&self, id: ActivityId) -> Resource<LiveQuery<Activity>> {
        self.cache.read(
            queries::activity_key(id),
            self.policy,
            queries::fetch_activity(self.service.clone(), id),
        )
    }

    /// Activities starting inside `range`
    pub fn range(&self, range: DateRange) -> Resource<LiveQuery<Activity>> {
        self.cache.read(
            queries::range_key(&range),
            self.policy,
            queries::fetch_range(self.service.clone(), range),
        )
    }
}
