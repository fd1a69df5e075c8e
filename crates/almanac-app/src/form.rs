//! Edit-form input and its validation.
//!
//! Validation runs before anything reaches the coordinator or the store and
//! is never retried. Failures are `Validation` errors whose message is shown
//! to the user verbatim.

use almanac_core::{
    ActivityCategory, ActivityPatch, AlmanacError, NewActivity, Result,
};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Raw field values as an edit form submits them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActivityForm {
    pub title: String,
    pub description: String,
    pub location: String,
    /// `YYYY-MM-DDTHH:MM` or RFC 3339
    pub start_time: String,
    /// `YYYY-MM-DDTHH:MM` or RFC 3339
    pub end_time: String,
    pub category: String,
}

struct Checked {
    title: String,
    description: String,
    location: String,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    category: ActivityCategory,
}

impl ActivityForm {
    fn check(&self) -> Result<Checked> {
        let title = required("Title", &self.title)?;
        let start_time = parse_form_datetime(required("Start time", &self.start_time)?.as_str())?;
        let end_time = parse_form_datetime(required("End time", &self.end_time)?.as_str())?;
        check_time_order(start_time, end_time)?;
        let category = required("Category", &self.category)?.parse()?;
        Ok(Checked {
            title,
            description: self.description.trim().to_string(),
            location: self.location.trim().to_string(),
            start_time,
            end_time,
            category,
        })
    }

    /// Validate and convert to an update payload carrying every field.
    pub fn to_patch(&self) -> Result<ActivityPatch> {
        let c = self.check()?;
        Ok(ActivityPatch {
            id: None,
            title: Some(c.title),
            description: Some(c.description),
            location: Some(c.location),
            start_time: Some(c.start_time),
            end_time: Some(c.end_time),
            category: Some(c.category),
        })
    }

    /// Validate and convert to a create payload.
    pub fn to_new_activity(&self) -> Result<NewActivity> {
        let c = self.check()?;
        Ok(NewActivity {
            title: c.title,
            description: c.description,
            location: c.location,
            start_time: c.start_time,
            end_time: c.end_time,
            category: c.category,
        })
    }
}

fn required(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AlmanacError::validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

/// Parse a form timestamp. Values without an offset are taken as UTC.
pub fn parse_form_datetime(value: &str) -> Result<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
        .ok_or_else(|| AlmanacError::validation("Invalid date format"))
}

/// Reject ranges where the end is not strictly after the start.
pub fn check_time_order(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<()> {
    if end <= start {
        return Err(AlmanacError::validation(
            "End time must be after start time",
        ));
    }
    Ok(())
}
