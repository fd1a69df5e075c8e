//! Seeded stores and sample values.

use almanac_core::{Activity, ActivityCategory, ActivityId, ActivityService, NewActivity};
use almanac_store::{EntityStore, GraphqlService, Resolvers, RestApi};
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use std::sync::Arc;

/// Fixed month every fixture is seeded for, so assertions on dates are stable.
pub fn fixture_month() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 1).unwrap()
}

/// A day of the fixture month.
pub fn fixture_day(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, day).unwrap()
}

/// Store holding the seven reference activities, no latency.
pub fn seeded_store() -> EntityStore {
    EntityStore::seeded_for(fixture_month()).unwrap()
}

/// Seeded store behind the REST-shaped boundary.
pub fn seeded_rest() -> (EntityStore, Arc<dyn ActivityService>) {
    let store = seeded_store();
    (store.clone(), Arc::new(RestApi::new(store)))
}

/// Seeded store behind the GraphQL-shaped boundary.
pub fn seeded_graphql() -> (EntityStore, Arc<dyn ActivityService>) {
    let store = seeded_store();
    (
        store.clone(),
        Arc::new(GraphqlService::new(Resolvers::new(store))),
    )
}

/// `2026-10-<day>T<hour>:00Z`
pub fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, day, hour, 0, 0).unwrap()
}

/// The record a seeded store holds under id 1.
pub fn team_meeting() -> Activity {
    Activity {
        id: ActivityId(1),
        title: "Team Meeting".into(),
        description: "Weekly team sync to discuss project progress and blockers.".into(),
        location: "Conference Room A".into(),
        start_time: at(10, 10),
        end_time: at(10, 10) + Duration::minutes(90),
        category: ActivityCategory::Work,
    }
}

/// A one-hour create payload.
pub fn new_activity(title: &str, day: u32, hour: u32) -> NewActivity {
    NewActivity {
        title: title.into(),
        description: String::new(),
        location: String::new(),
        start_time: at(day, hour),
        end_time: at(day, hour) + Duration::hours(1),
        category: ActivityCategory::Personal,
    }
}

/// Route `tracing` output to the test harness. Safe to call repeatedly.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}
