//! Proptest strategies for activity payloads.
//!
//! Every generated time pair has `end > start`, so payloads pass the time
//! order check unless a test breaks it on purpose.

use almanac_core::{ActivityCategory, ActivityPatch, NewActivity};
use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;

pub fn arb_category() -> impl Strategy<Value = ActivityCategory> {
    prop::sample::select(ActivityCategory::ALL.to_vec())
}

pub fn arb_title() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9 ]{0,23}"
}

/// Start somewhere in the fixture month, end 15 minutes to 8 hours later.
pub fn arb_time_pair() -> impl Strategy<Value = (DateTime<Utc>, DateTime<Utc>)> {
    (1u32..=28, 0u32..16, 0u32..4, 1i64..=32).prop_map(|(day, hour, quarter, len)| {
        let start = Utc
            .with_ymd_and_hms(2026, 10, day, hour, quarter * 15, 0)
            .unwrap();
        (start, start + Duration::minutes(len * 15))
    })
}

pub fn arb_new_activity() -> impl Strategy<Value = NewActivity> {
    (
        arb_title(),
        "[a-z ]{0,40}",
        "[A-Za-z ]{0,20}",
        arb_time_pair(),
        arb_category(),
    )
        .prop_map(
            |(title, description, location, (start_time, end_time), category)| NewActivity {
                title,
                description,
                location,
                start_time,
                end_time,
                category,
            },
        )
}

/// A patch setting any subset of fields; times are set together or not at all.
pub fn arb_patch() -> impl Strategy<Value = ActivityPatch> {
    (
        proptest::option::of(arb_title()),
        proptest::option::of("[A-Za-z ]{0,20}"),
        proptest::option::of(arb_time_pair()),
        proptest::option::of(arb_category()),
    )
        .prop_map(|(title, location, times, category)| {
            let mut patch = ActivityPatch::new();
            if let Some(title) = title {
                patch = patch.with_title(title);
            }
            if let Some(location) = location {
                patch = patch.with_location(location);
            }
            if let Some((start, end)) = times {
                patch = patch.with_times(start, end);
            }
            if let Some(category) = category {
                patch = patch.with_category(category);
            }
            patch
        })
}
