//! Wire shapes of the GraphQL-shaped boundary.
//!
//! ```graphql
//! type Activity {
//!   id: ID!  title: String!  description: String!  location: String!
//!   startTime: String!  endTime: String!  category: Category!
//! }
//! input ActivityInput { ...every field but id }
//! input UpdateActivityInput { ...every field optional }
//! ```

use almanac_core::{
    Activity, ActivityCategory, ActivityId, ActivityPatch, AlmanacError, NewActivity, Result,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `__typename` of every activity node.
pub const ACTIVITY_TYPENAME: &str = "Activity";

/// An activity as the GraphQL boundary returns it: string id plus typename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityNode {
    #[serde(rename = "__typename")]
    pub typename: String,
    pub id: String,
    pub title: String,
    pub description: String,
    pub location: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub category: ActivityCategory,
}

impl From<Activity> for ActivityNode {
    fn from(activity: Activity) -> Self {
        Self {
            typename: ACTIVITY_TYPENAME.to_string(),
            id: activity.id.to_string(),
            title: activity.title,
            description: activity.description,
            location: activity.location,
            start_time: activity.start_time,
            end_time: activity.end_time,
            category: activity.category,
        }
    }
}

impl TryFrom<ActivityNode> for Activity {
    type Error = AlmanacError;

    fn try_from(node: ActivityNode) -> Result<Self> {
        if node.typename != ACTIVITY_TYPENAME {
            return Err(AlmanacError::operation_failed(format!(
                "Unexpected __typename: {}",
                node.typename
            )));
        }
        let id = node.id.parse::<u64>().map_err(|_| {
            AlmanacError::operation_failed(format!("Malformed activity id: {}", node.id))
        })?;
        Ok(Self {
            id: ActivityId(id),
            title: node.title,
            description: node.description,
            location: node.location,
            start_time: node.start_time,
            end_time: node.end_time,
            category: node.category,
        })
    }
}

/// `createActivity` input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityInput {
    pub title: String,
    pub description: String,
    pub location: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub category: ActivityCategory,
}

impl From<NewActivity> for ActivityInput {
    fn from(fields: NewActivity) -> Self {
        Self {
            title: fields.title,
            description: fields.description,
            location: fields.location,
            start_time: fields.start_time,
            end_time: fields.end_time,
            category: fields.category,
        }
    }
}

impl From<ActivityInput> for NewActivity {
    fn from(input: ActivityInput) -> Self {
        Self {
            title: input.title,
            description: input.description,
            location: input.location,
            start_time: input.start_time,
            end_time: input.end_time,
            category: input.category,
        }
    }
}

/// `updateActivity` input. There is no id field; the id travels separately.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateActivityInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<ActivityCategory>,
}

impl From<ActivityPatch> for UpdateActivityInput {
    fn from(patch: ActivityPatch) -> Self {
        Self {
            title: patch.title,
            description: patch.description,
            location: patch.location,
            start_time: patch.start_time,
            end_time: patch.end_time,
            category: patch.category,
        }
    }
}

impl From<UpdateActivityInput> for ActivityPatch {
    fn from(input: UpdateActivityInput) -> Self {
        Self {
            id: None,
            title: input.title,
            description: input.description,
            location: input.location,
            start_time: input.start_time,
            end_time: input.end_time,
            category: input.category,
        }
    }
}
