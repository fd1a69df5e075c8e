//! Both service boundaries must behave identically to their consumers.

#![allow(clippy::unwrap_used)]

use almanac_core::{
    ActivityCategory, ActivityId, ActivityPatch, ActivityService, AlmanacConfig, AlmanacError,
    DateRange, LatencyProfile, NewActivity,
};
use almanac_store::{seeded_service, Backend, EntityStore, GraphqlService, Resolvers, RestApi};
use assert_matches::assert_matches;
use chrono::{Datelike, Duration, NaiveDate, TimeZone, Utc};
use std::sync::Arc;

fn month_day(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, day).unwrap()
}

fn both_boundaries() -> Vec<(&'static str, Arc<dyn ActivityService>)> {
    let rest = EntityStore::seeded_for(month_day(1)).unwrap();
    let graphql = EntityStore::seeded_for(month_day(1)).unwrap();
    vec![
        ("rest", Arc::new(RestApi::new(rest))),
        ("graphql", Arc::new(GraphqlService::new(Resolvers::new(graphql)))),
    ]
}

#[tokio::test]
async fn test_date_range_is_inclusive_by_day() {
    for (name, service) in both_boundaries() {
        let range = DateRange::days(month_day(14), month_day(17)).unwrap();
        let days: Vec<u32> = service
            .activities_by_date_range(range)
            .await
            .unwrap()
            .iter()
            .map(|a| a.start_time.day())
            .collect();
        assert_eq!(days, vec![14, 15, 17], "boundary {name}");
    }
}

#[tokio::test]
async fn test_missing_id_is_not_found() {
    for (name, service) in both_boundaries() {
        let err = service.get_activity(ActivityId(999)).await.unwrap_err();
        assert_matches!(err, AlmanacError::NotFound { .. }, "boundary {name}");

        let err = service
            .update_activity(ActivityId(999), ActivityPatch::new().with_title("x"))
            .await
            .unwrap_err();
        assert!(err.is_not_found(), "boundary {name}");

        assert!(!service.delete_activity(ActivityId(999)).await.unwrap());
    }
}

#[tokio::test]
async fn test_update_merges_only_given_fields() {
    for (name, service) in both_boundaries() {
        let before = service.get_activity(ActivityId(1)).await.unwrap();
        let after = service
            .update_activity(ActivityId(1), ActivityPatch::new().with_title("New Title"))
            .await
            .unwrap();

        assert_eq!(after.id, ActivityId(1), "boundary {name}");
        assert_eq!(after.title, "New Title");
        assert_eq!(after.start_time, before.start_time);
        assert_eq!(after.end_time, before.end_time);
        assert_eq!(after.category, ActivityCategory::Work);
        assert_eq!(service.get_activity(ActivityId(1)).await.unwrap(), after);
    }
}

#[tokio::test]
async fn test_create_allocates_max_plus_one() {
    for (name, service) in both_boundaries() {
        let start = Utc.with_ymd_and_hms(2026, 10, 28, 18, 0, 0).unwrap();
        let created = service
            .create_activity(NewActivity {
                title: "Book Club".into(),
                description: String::new(),
                location: "Library".into(),
                start_time: start,
                end_time: start + Duration::hours(2),
                category: ActivityCategory::Personal,
            })
            .await
            .unwrap();
        assert_eq!(created.id, ActivityId(8), "boundary {name}");
        assert_eq!(service.list_activities().await.unwrap().len(), 8);
    }
}

#[tokio::test(start_paused = true)]
async fn test_configured_latency_is_simulated() {
    let config = AlmanacConfig::default();
    let service = seeded_service(Backend::Graphql, &config, month_day(1)).unwrap();

    let started = tokio::time::Instant::now();
    service
        .update_activity(ActivityId(2), ActivityPatch::new().with_location("Patio"))
        .await
        .unwrap();
    assert!(started.elapsed() >= std::time::Duration::from_millis(3000));
}

#[tokio::test(start_paused = true)]
async fn test_instant_profile_does_not_sleep() {
    let store = EntityStore::seeded_for(month_day(1))
        .unwrap()
        .with_latency(LatencyProfile::instant());
    let started = tokio::time::Instant::now();
    store.list().await.unwrap();
    assert_eq!(started.elapsed(), std::time::Duration::ZERO);
}
