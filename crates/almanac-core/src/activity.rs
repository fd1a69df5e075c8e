//! # Activity Data Model
//!
//! An [`Activity`] is a titled, timed event record. Identity is an
//! [`ActivityId`] allocated by the entity store and stable for the lifetime
//! of the record. Writes use two payload shapes:
//!
//! - [`NewActivity`]: every field except the id (create)
//! - [`ActivityPatch`]: every field optional (update); a patch may carry an
//!   `id`, which is always ignored

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::{AlmanacError, Result};

/// Unique identifier for an activity.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct ActivityId(pub u64);

impl ActivityId {
    /// Create an id from its raw value
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Raw numeric value
    pub const fn value(self) -> u64 {
        self.0
    }

    /// The id allocated after this one; `None` once ids are exhausted
    pub const fn next(self) -> Option<Self> {
        match self.0.checked_add(1) {
            Some(value) => Some(Self(value)),
            None => None,
        }
    }

    /// Parse an id taken from a route segment.
    ///
    /// Anything that is not a number cannot name an existing activity, so
    /// the failure is reported as `NotFound` rather than as bad input.
    pub fn from_route(segment: &str) -> Result<Self> {
        segment
            .trim()
            .parse::<u64>()
            .map(Self)
            .map_err(|_| AlmanacError::activity_not_found(segment))
    }
}

impl fmt::Display for ActivityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ActivityId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl FromStr for ActivityId {
    type Err = AlmanacError;

    fn from_str(s: &str) -> Result<Self> {
        s.trim()
            .parse::<u64>()
            .map(Self)
            .map_err(|_| AlmanacError::validation(format!("Invalid activity id: {s}")))
    }
}

/// Fixed set of activity categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityCategory {
    /// Work-related activity
    Work,
    /// Personal activity
    Personal,
    /// Health and fitness activity
    Health,
}

impl ActivityCategory {
    /// All categories, in display order
    pub const ALL: [ActivityCategory; 3] = [Self::Work, Self::Personal, Self::Health];

    /// Wire name of the category
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Work => "work",
            Self::Personal => "personal",
            Self::Health => "health",
        }
    }
}

impl fmt::Display for ActivityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityCategory {
    type Err = AlmanacError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "work" => Ok(Self::Work),
            "personal" => Ok(Self::Personal),
            "health" => Ok(Self::Health),
            _ => Err(AlmanacError::validation(format!("Unknown category: {s}"))),
        }
    }
}

/// A titled, timed event record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    /// Stable identity
    pub id: ActivityId,
    /// Short title
    pub title: String,
    /// Free-form description
    pub description: String,
    /// Where the activity takes place
    pub location: String,
    /// Start of the activity
    pub start_time: DateTime<Utc>,
    /// End of the activity
    pub end_time: DateTime<Utc>,
    /// Category
    pub category: ActivityCategory,
}

impl Activity {
    /// Assemble a record from a create payload and an allocated id.
    pub fn from_new(id: ActivityId, fields: NewActivity) -> Self {
        Self {
            id,
            title: fields.title,
            description: fields.description,
            location: fields.location,
            start_time: fields.start_time,
            end_time: fields.end_time,
            category: fields.category,
        }
    }

    /// Merge the provided fields of `patch` onto this record.
    ///
    /// The id never changes, whatever the patch carries.
    #[must_use]
    pub fn merged(&self, patch: &ActivityPatch) -> Self {
        let mut next = self.clone();
        if let Some(title) = &patch.title {
            next.title.clone_from(title);
        }
        if let Some(description) = &patch.description {
            next.description.clone_from(description);
        }
        if let Some(location) = &patch.location {
            next.location.clone_from(location);
        }
        if let Some(start_time) = patch.start_time {
            next.start_time = start_time;
        }
        if let Some(end_time) = patch.end_time {
            next.end_time = end_time;
        }
        if let Some(category) = patch.category {
            next.category = category;
        }
        next
    }

    /// Length of the activity
    pub fn duration(&self) -> Duration {
        self.end_time - self.start_time
    }

    /// Whether the activity starts on `date` (UTC)
    pub fn occurs_on(&self, date: NaiveDate) -> bool {
        self.start_time.date_naive() == date
    }

    /// Whether the time range is well formed (`end_time > start_time`)
    pub fn has_valid_time_range(&self) -> bool {
        self.end_time > self.start_time
    }
}

/// Create payload: every activity field except the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewActivity {
    /// Short title
    pub title: String,
    /// Free-form description
    pub description: String,
    /// Location
    pub location: String,
    /// Start of the activity
    pub start_time: DateTime<Utc>,
    /// End of the activity
    pub end_time: DateTime<Utc>,
    /// Category
    pub category: ActivityCategory,
}

/// Update payload: any subset of activity fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActivityPatch {
    /// Ignored by every update path; ids are immutable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<ActivityId>,
    /// Replacement title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Replacement description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Replacement location
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Replacement start time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    /// Replacement end time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    /// Replacement category
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<ActivityCategory>,
}

impl ActivityPatch {
    /// Empty patch
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the title
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the location
    #[must_use]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Set both ends of the time range
    #[must_use]
    pub fn with_times(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.start_time = Some(start);
        self.end_time = Some(end);
        self
    }

    /// Set the category
    #[must_use]
    pub fn with_category(mut self, category: ActivityCategory) -> Self {
        self.category = Some(category);
        self
    }

    /// True when the patch would change nothing
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.location.is_none()
            && self.start_time.is_none()
            && self.end_time.is_none()
            && self.category.is_none()
    }
}

impl From<NewActivity> for ActivityPatch {
    fn from(fields: NewActivity) -> Self {
        Self {
            id: None,
            title: Some(fields.title),
            description: Some(fields.description),
            location: Some(fields.location),
            start_time: Some(fields.start_time),
            end_time: Some(fields.end_time),
            category: Some(fields.category),
        }
    }
}
