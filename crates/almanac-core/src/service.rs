//! # Activity Service Boundary
//!
//! [`ActivityService`] is the seam between the coordination layer
//! (`almanac-app`) and whatever answers activity reads and writes. The
//! REST-shaped and GraphQL-shaped boundaries in `almanac-store` both
//! implement it, and so do the test decorators in `almanac-testkit`.
//!
//! ```text
//! almanac-app (pure)             almanac-store
//! ┌──────────────────┐           ┌──────────────────┐
//! │ QueryCache       │           │ RestApi          │
//! │ MutationCoord.   │──────────►│ GraphqlService   │
//! │ Loader           │  service  │   └► EntityStore │
//! └──────────────────┘           └──────────────────┘
//! ```
//!
//! Every method is asynchronous even though no real I/O happens behind the
//! in-process implementations: simulated latency is part of the contract.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use crate::activity::{Activity, ActivityId, ActivityPatch, NewActivity};
use crate::errors::Result;
use crate::time::DateRange;

/// Names of the operations an [`ActivityService`] offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ServiceOperation {
    /// `list_activities`
    List,
    /// `get_activity`
    Get,
    /// `activities_by_date_range`
    Range,
    /// `create_activity`
    Create,
    /// `update_activity`
    Update,
    /// `delete_activity`
    Delete,
}

impl fmt::Display for ServiceOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::List => "list_activities",
            Self::Get => "get_activity",
            Self::Range => "activities_by_date_range",
            Self::Create => "create_activity",
            Self::Update => "update_activity",
            Self::Delete => "delete_activity",
        };
        f.write_str(name)
    }
}

/// Asynchronous read/write access to activities.
///
/// Failures are `NotFound` for a missing id and `OperationFailed` for
/// anything else; validation happens before a call reaches this trait.
#[async_trait]
pub trait ActivityService: Send + Sync {
    /// Every activity, ordered by id.
    async fn list_activities(&self) -> Result<Vec<Activity>>;

    /// One activity, or `NotFound`.
    async fn get_activity(&self, id: ActivityId) -> Result<Activity>;

    /// Activities whose start time falls inside `range` (inclusive).
    async fn activities_by_date_range(&self, range: DateRange) -> Result<Vec<Activity>>;

    /// Store a new activity and return it with its allocated id.
    async fn create_activity(&self, input: NewActivity) -> Result<Activity>;

    /// Merge `patch` onto an existing activity and return the full record.
    async fn update_activity(&self, id: ActivityId, patch: ActivityPatch) -> Result<Activity>;

    /// Remove an activity; `false` when nothing was removed.
    async fn delete_activity(&self, id: ActivityId) -> Result<bool>;
}

#[async_trait]
impl<T: ActivityService + ?Sized> ActivityService for Arc<T> {
    async fn list_activities(&self) -> Result<Vec<Activity>> {
        (**self).list_activities().await
    }

    async fn get_activity(&self, id: ActivityId) -> Result<Activity> {
        (**self).get_activity(id).await
    }

    async fn activities_by_date_range(&self, range: DateRange) -> Result<Vec<Activity>> {
        (**self).activities_by_date_range(range).await
    }

    async fn create_activity(&self, input: NewActivity) -> Result<Activity> {
        (**self).create_activity(input).await
    }

    async fn update_activity(&self, id: ActivityId, patch: ActivityPatch) -> Result<Activity> {
        (**self).update_activity(id, patch).await
    }

    async fn delete_activity(&self, id: ActivityId) -> Result<bool> {
        (**self).delete_activity(id).await
    }
}
