//! Date range selection for range queries.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::activity::Activity;
use crate::errors::{AlmanacError, Result};

/// Inclusive time window `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    /// First instant in the window
    pub start: DateTime<Utc>,
    /// Last instant in the window
    pub end: DateTime<Utc>,
}

impl DateRange {
    /// Create a window from two instants. `start` must not be after `end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if start > end {
            return Err(AlmanacError::validation(
                "Range start must not be after range end",
            ));
        }
        Ok(Self { start, end })
    }

    /// Whole-day window from the start of `first` to the last instant of `last`.
    pub fn days(first: NaiveDate, last: NaiveDate) -> Result<Self> {
        let start = first
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| AlmanacError::internal("start of day out of range"))?;
        let end = last
            .and_hms_nano_opt(23, 59, 59, 999_999_999)
            .ok_or_else(|| AlmanacError::internal("end of day out of range"))?;
        Self::new(utc(start), utc(end))
    }

    /// Whether `instant` falls inside the window (both ends inclusive)
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant <= self.end
    }

    /// Whether the activity starts inside the window
    pub fn includes(&self, activity: &Activity) -> bool {
        self.contains(activity.start_time)
    }
}

fn utc(naive: NaiveDateTime) -> DateTime<Utc> {
    Utc.from_utc_datetime(&naive)
}
