//! Reference activities used to populate a fresh store.
//!
//! Seven activities spread over one month, ids 1 through 7:
//!
//! | id | day | category |
//! |----|-----|----------|
//! | 1  | 10  | work     |
//! | 2  | 12  | personal |
//! | 3  | 14  | work     |
//! | 4  | 15  | health   |
//! | 5  | 17  | health   |
//! | 6  | 20  | work     |
//! | 7  | 25  | personal |

use almanac_core::{Activity, ActivityCategory, ActivityId, AlmanacError, Result};
use chrono::{DateTime, TimeZone, Utc};

/// Days of the month the reference activities start on, by id order.
pub const SEED_DAYS: [u32; 7] = [10, 12, 14, 15, 17, 20, 25];

struct SeedRow {
    title: &'static str,
    description: &'static str,
    location: &'static str,
    day: u32,
    start: (u32, u32),
    end: (u32, u32),
    category: ActivityCategory,
}

const ROWS: [SeedRow; 7] = [
    SeedRow {
        title: "Team Meeting",
        description: "Weekly team sync to discuss project progress and blockers.",
        location: "Conference Room A",
        day: 10,
        start: (10, 0),
        end: (11, 30),
        category: ActivityCategory::Work,
    },
    SeedRow {
        title: "Lunch with Sarah",
        description: "Catch up over lunch to discuss collaboration opportunities.",
        location: "Cafe Bistro",
        day: 12,
        start: (12, 0),
        end: (13, 0),
        category: ActivityCategory::Personal,
    },
    SeedRow {
        title: "Product Demo",
        description: "Present the new features to the client.",
        location: "Online - Zoom",
        day: 14,
        start: (15, 0),
        end: (16, 0),
        category: ActivityCategory::Work,
    },
    SeedRow {
        title: "Gym Session",
        description: "Weekly fitness training with personal trainer.",
        location: "Fitness Center",
        day: 15,
        start: (7, 0),
        end: (8, 30),
        category: ActivityCategory::Health,
    },
    SeedRow {
        title: "Doctor Appointment",
        description: "Annual check-up with Dr. Johnson.",
        location: "City Health Clinic",
        day: 17,
        start: (9, 0),
        end: (10, 0),
        category: ActivityCategory::Health,
    },
    SeedRow {
        title: "Project Deadline",
        description: "Submit final project deliverables for client review.",
        location: "Office",
        day: 20,
        start: (17, 0),
        end: (17, 30),
        category: ActivityCategory::Work,
    },
    SeedRow {
        title: "Birthday Party",
        description: "Mike's surprise birthday celebration.",
        location: "Rooftop Bar",
        day: 25,
        start: (19, 0),
        end: (22, 0),
        category: ActivityCategory::Personal,
    },
];

/// The seven reference activities placed in `month` of `year` (UTC).
pub fn activities_for_month(year: i32, month: u32) -> Result<Vec<Activity>> {
    ROWS.iter()
        .zip(1u64..)
        .map(|(row, id)| {
            Ok(Activity {
                id: ActivityId(id),
                title: row.title.to_string(),
                description: row.description.to_string(),
                location: row.location.to_string(),
                start_time: at(year, month, row.day, row.start)?,
                end_time: at(year, month, row.day, row.end)?,
                category: row.category,
            })
        })
        .collect()
}

fn at(year: i32, month: u32, day: u32, (hour, minute): (u32, u32)) -> Result<DateTime<Utc>> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0)
        .single()
        .ok_or_else(|| AlmanacError::validation(format!("Invalid month: {year}-{month:02}")))
}
