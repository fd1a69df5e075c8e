//! Optimistic projection, commit, rollback and racing submissions.

use almanac_app::queries;
use almanac_app::{
    create_activity_action, update_activity_action, ActivityForm, AlmanacApp, EntityKey,
    MutationCoordinator, MutationStatus, QueryCache,
};
use almanac_core::{
    Activity, ActivityId, ActivityPatch, ActivityService, AlmanacConfig, AlmanacError,
    ConcurrencyPolicy, DateRange, NewActivity, Result, ServiceOperation,
};
use almanac_store::EntityStore;
use almanac_testkit::{
    at, init_test_tracing, seeded_rest, seeded_store, team_meeting, CountingService, FaultyService,
    GatedService,
};
use assert_matches::assert_matches;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

fn title_of(app: &AlmanacApp, id: u64) -> String {
    app.cache()
        .entity(&EntityKey::activity(ActivityId(id)))
        .unwrap()
        .title
}

fn edit_form(title: &str, start: &str, end: &str) -> ActivityForm {
    ActivityForm {
        title: title.into(),
        description: "Weekly team sync to discuss project progress and blockers.".into(),
        location: "Conference Room A".into(),
        start_time: start.into(),
        end_time: end.into(),
        category: "work".into(),
    }
}

#[tokio::test]
async fn projection_is_visible_before_the_service_settles() {
    init_test_tracing();
    let (store, service) = seeded_rest();
    let gated = GatedService::new(service, [ServiceOperation::Update]);
    let app = AlmanacApp::new(gated.clone(), &AlmanacConfig::default());
    let detail = app.loader().activity(ActivityId(1)).settled().await.unwrap();
    assert_eq!(detail.one().unwrap().title, "Team Meeting");

    let pending = tokio::spawn({
        let coordinator = app.coordinator().clone();
        async move {
            coordinator
                .update(ActivityId(1), ActivityPatch::new().with_title("New Title"))
                .await
        }
    });
    tokio::task::yield_now().await;

    assert_eq!(gated.waiting(), 1);
    assert_eq!(detail.one().unwrap().title, "New Title");
    assert_eq!(app.coordinator().state().status, MutationStatus::Submitting);
    assert_eq!(store.get(ActivityId(1)).await.unwrap().title, "Team Meeting");

    gated.release(1);
    let confirmed = pending.await.unwrap().unwrap();

    assert_eq!(
        confirmed,
        Activity {
            title: "New Title".into(),
            ..team_meeting()
        }
    );
    assert_eq!(store.get(ActivityId(1)).await.unwrap().title, "New Title");
    assert_eq!(title_of(&app, 1), "New Title");
    let state = app.coordinator().state();
    assert_eq!(state.status, MutationStatus::Committed);
    assert!(!state.editing);
    assert_eq!(state.last_error, None);
}

#[tokio::test(start_paused = true)]
async fn failed_update_restores_the_snapshot() {
    let (store, service) = seeded_rest();
    let faulty = FaultyService::new(service);
    faulty.fail(
        ServiceOperation::Update,
        AlmanacError::operation_failed("connection reset"),
    );
    faulty.set_delay(Duration::from_millis(100));
    let app = AlmanacApp::new(faulty.clone(), &AlmanacConfig::default());
    let list = app.loader().activities().settled().await.unwrap();
    app.coordinator().begin_edit(ActivityId(2));

    let pending = tokio::spawn({
        let coordinator = app.coordinator().clone();
        async move {
            coordinator
                .update(
                    ActivityId(2),
                    ActivityPatch::new()
                        .with_title("Lunch with Sam")
                        .with_location("Diner"),
                )
                .await
        }
    });
    tokio::task::yield_now().await;
    assert_eq!(title_of(&app, 2), "Lunch with Sam");

    let err = pending.await.unwrap().unwrap_err();
    assert_eq!(err, AlmanacError::operation_failed("connection reset"));

    let restored = list
        .many()
        .into_iter()
        .find(|a| a.id == ActivityId(2))
        .unwrap();
    assert_eq!(restored, store.get(ActivityId(2)).await.unwrap());
    assert_eq!(restored.title, "Lunch with Sarah");
    assert_eq!(restored.location, "Cafe Bistro");

    let state = app.coordinator().state();
    assert_eq!(state.status, MutationStatus::RolledBack);
    assert!(state.editing);
    assert_eq!(state.activity_id, Some(ActivityId(2)));
    assert_eq!(state.last_error, Some(err));
}

#[tokio::test]
async fn invalid_form_is_rejected_without_side_effects() {
    let (store, service) = seeded_rest();
    let counting = CountingService::new(service);
    let app = AlmanacApp::new(counting.clone(), &AlmanacConfig::default());
    app.loader().activity(ActivityId(1)).settled().await.unwrap();
    app.coordinator().begin_edit(ActivityId(1));
    let before = app.coordinator().state();
    let version = app.coordinator().state_signal().version();

    let result = update_activity_action(
        app.coordinator(),
        "1",
        &edit_form("New Title", "2026-10-10T12:00", "2026-10-10T12:00"),
    )
    .await;

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(
        json,
        serde_json::json!({ "success": false, "error": "End time must be after start time" })
    );
    assert_eq!(counting.calls(ServiceOperation::Update), 0);
    assert_eq!(title_of(&app, 1), "Team Meeting");
    assert_eq!(store.get(ActivityId(1)).await.unwrap().title, "Team Meeting");
    assert_eq!(app.coordinator().state(), before);
    assert_eq!(app.coordinator().state_signal().version(), version);
}

#[tokio::test]
async fn equal_start_and_end_is_rejected() {
    let (_store, service) = seeded_rest();
    let app = AlmanacApp::new(service, &AlmanacConfig::default());
    app.loader().activity(ActivityId(1)).settled().await.unwrap();

    let err = app
        .coordinator()
        .update(
            ActivityId(1),
            ActivityPatch::new().with_times(at(10, 12), at(10, 12)),
        )
        .await
        .unwrap_err();
    assert_matches!(err, AlmanacError::Validation { .. });
    assert_eq!(app.coordinator().state().status, MutationStatus::Idle);
}

#[tokio::test]
async fn patch_that_inverts_cached_times_is_rejected() {
    let (_store, service) = seeded_rest();
    let app = AlmanacApp::new(service, &AlmanacConfig::default());
    app.loader().activity(ActivityId(1)).settled().await.unwrap();

    // Cached start is 10:00, so moving only the end to 09:00 inverts the range.
    let err = app
        .coordinator()
        .update(ActivityId(1), ActivityPatch {
            end_time: Some(at(10, 9)),
            ..ActivityPatch::new()
        })
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "End time must be after start time");
}

#[tokio::test]
async fn action_for_unknown_route_id_fails_with_not_found() {
    let (_store, service) = seeded_rest();
    let app = AlmanacApp::new(service, &AlmanacConfig::default());
    let form = edit_form("x", "2026-10-10T10:00", "2026-10-10T11:00");

    let result = update_activity_action(app.coordinator(), "999", &form).await;
    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("Activity not found: 999"));
    assert_eq!(app.coordinator().state().status, MutationStatus::RolledBack);

    let result = update_activity_action(app.coordinator(), "abc", &form).await;
    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("Activity not found: abc"));
}

#[tokio::test]
async fn commit_marks_related_queries_stale() {
    let (_store, service) = seeded_rest();
    let counting = CountingService::new(service);
    let app = AlmanacApp::new(counting.clone(), &AlmanacConfig::default());
    app.loader().activities().settled().await.unwrap();
    app.loader().activity(ActivityId(4)).settled().await.unwrap();

    app.coordinator()
        .update(ActivityId(4), ActivityPatch::new().with_title("Gym"))
        .await
        .unwrap();

    assert!(!app.cache().is_fresh(&queries::activities_key()));
    assert!(!app.cache().is_fresh(&queries::activity_key(ActivityId(4))));

    let list = app.loader().activities().settled().await.unwrap();
    assert_eq!(counting.calls(ServiceOperation::List), 2);
    assert!(list.many().iter().any(|a| a.title == "Gym"));
}

#[tokio::test]
async fn commit_without_revalidation_trusts_the_confirmed_value() {
    let (_store, service) = seeded_rest();
    let counting = CountingService::new(service);
    let mut config = AlmanacConfig::default();
    config.cache.revalidate_after_commit = false;
    let app = AlmanacApp::new(counting.clone(), &config);
    app.loader().activities().settled().await.unwrap();

    app.coordinator()
        .update(ActivityId(4), ActivityPatch::new().with_title("Gym"))
        .await
        .unwrap();

    assert!(app.cache().is_fresh(&queries::activities_key()));
    let list = app.loader().activities().settled().await.unwrap();
    assert_eq!(counting.calls(ServiceOperation::List), 1);
    assert!(list.many().iter().any(|a| a.title == "Gym"));
}

#[tokio::test]
async fn update_of_uncached_activity_writes_only_the_confirmed_value() {
    let (_store, service) = seeded_rest();
    let app = AlmanacApp::new(service, &AlmanacConfig::default());
    let key = EntityKey::activity(ActivityId(6));
    assert!(app.cache().entity(&key).is_none());

    let confirmed = app
        .coordinator()
        .update(ActivityId(6), ActivityPatch::new().with_location("Home office"))
        .await
        .unwrap();

    assert_eq!(app.cache().entity(&key), Some(confirmed));
    assert_eq!(app.coordinator().state().status, MutationStatus::Committed);
}

#[tokio::test]
async fn create_and_delete_keep_lists_in_step() {
    let (store, service) = seeded_rest();
    let app = AlmanacApp::new(service, &AlmanacConfig::default());
    assert_eq!(app.loader().activities().settled().await.unwrap().many().len(), 7);

    let form = ActivityForm {
        title: "Dentist".into(),
        start_time: "2026-10-21T08:00".into(),
        end_time: "2026-10-21T08:45".into(),
        category: "health".into(),
        ..ActivityForm::default()
    };
    let created = create_activity_action(app.coordinator(), &form).await;
    assert!(created.success);
    let created = created.activity.unwrap();
    assert_eq!(created.id, ActivityId(8));
    assert_eq!(app.coordinator().state().activity_id, Some(ActivityId(8)));

    let list = app.loader().activities().settled().await.unwrap();
    assert_eq!(list.many().len(), 8);

    assert!(app.coordinator().delete(ActivityId(3)).await.unwrap());
    assert!(app.cache().entity(&EntityKey::activity(ActivityId(3))).is_none());
    let list = app.loader().activities().settled().await.unwrap();
    assert!(list.many().iter().all(|a| a.id != ActivityId(3)));
    assert_eq!(store.len(), 7);

    assert!(!app.coordinator().delete(ActivityId(3)).await.unwrap());
}

#[tokio::test]
async fn create_rejects_inverted_times_before_the_service() {
    let (_store, service) = seeded_rest();
    let counting = CountingService::new(service);
    let app = AlmanacApp::new(counting.clone(), &AlmanacConfig::default());

    let err = app
        .coordinator()
        .create(NewActivity {
            end_time: at(21, 7),
            ..almanac_testkit::new_activity("Backwards", 21, 8)
        })
        .await
        .unwrap_err();
    assert_matches!(err, AlmanacError::Validation { .. });
    assert_eq!(counting.calls(ServiceOperation::Create), 0);
}

#[tokio::test]
async fn cancel_edit_closes_the_form_and_clears_the_error() {
    let (_store, service) = seeded_rest();
    let app = AlmanacApp::new(service, &AlmanacConfig::default());
    let coordinator = app.coordinator();

    let form = edit_form("x", "2026-10-10T10:00", "2026-10-10T11:00");

    coordinator.begin_edit(ActivityId(1));
    let result = update_activity_action(coordinator, "999", &form).await;
    assert!(!result.success);
    let state = coordinator.state();
    assert!(state.editing);
    assert!(state.last_error.is_some());

    coordinator.cancel_edit();
    let state = coordinator.state();
    assert!(!state.editing);
    assert_eq!(state.last_error, None);
    assert_eq!(state.status, MutationStatus::RolledBack);
}

/// Update calls take the next scripted step: sleep for its delay, then
/// either reach the store or fail. Tests choose the order in which racing
/// submissions settle and which of them are rejected. List calls read the
/// store first and then sleep, so their data is already old when they land.
struct ScriptedUpdates {
    store: EntityStore,
    steps: Mutex<VecDeque<(Duration, bool)>>,
    list_delay: Duration,
}

impl ScriptedUpdates {
    /// Every update is accepted after its delay in milliseconds.
    fn new(store: EntityStore, delays: impl IntoIterator<Item = u64>) -> Self {
        Self::scripted(store, delays.into_iter().map(|ms| (ms, true)))
    }

    /// `(delay_ms, accepted)` per update call, in call order.
    fn scripted(store: EntityStore, steps: impl IntoIterator<Item = (u64, bool)>) -> Self {
        Self {
            store,
            steps: Mutex::new(
                steps
                    .into_iter()
                    .map(|(ms, accepted)| (Duration::from_millis(ms), accepted))
                    .collect(),
            ),
            list_delay: Duration::ZERO,
        }
    }

    fn with_list_delay(mut self, delay: Duration) -> Self {
        self.list_delay = delay;
        self
    }
}

#[async_trait]
impl ActivityService for ScriptedUpdates {
    async fn list_activities(&self) -> Result<Vec<Activity>> {
        let activities = self.store.list().await?;
        tokio::time::sleep(self.list_delay).await;
        Ok(activities)
    }

    async fn get_activity(&self, id: ActivityId) -> Result<Activity> {
        self.store.get(id).await
    }

    async fn activities_by_date_range(&self, range: DateRange) -> Result<Vec<Activity>> {
        self.store.in_range(range).await
    }

    async fn create_activity(&self, input: NewActivity) -> Result<Activity> {
        self.store.create(input).await
    }

    async fn update_activity(&self, id: ActivityId, patch: ActivityPatch) -> Result<Activity> {
        let (delay, accepted) = self.steps.lock().pop_front().unwrap_or((Duration::ZERO, true));
        tokio::time::sleep(delay).await;
        if !accepted {
            return Err(AlmanacError::operation_failed("update rejected"));
        }
        self.store.update(id, patch).await
    }

    async fn delete_activity(&self, id: ActivityId) -> Result<bool> {
        self.store.delete(id).await
    }
}

/// First submission settles at 300ms, second at 100ms.
async fn race(policy: ConcurrencyPolicy) -> (QueryCache<Activity>, EntityStore) {
    let store = seeded_store();
    let service = Arc::new(ScriptedUpdates::new(store.clone(), [300, 100]));
    let cache = QueryCache::new();
    let loader = almanac_app::Loader::new(service.clone(), cache.clone());
    loader.activity(ActivityId(1)).settled().await.unwrap();
    let coordinator = MutationCoordinator::new(service, cache.clone())
        .with_policy(policy)
        .with_revalidation(false);

    let first = coordinator.update(ActivityId(1), ActivityPatch::new().with_title("First"));
    let second = coordinator.update(ActivityId(1), ActivityPatch::new().with_title("Second"));
    let (first, second) = tokio::join!(first, second);
    assert_eq!(first.unwrap().title, "First");
    assert_eq!(second.unwrap().title, "Second");
    assert_eq!(coordinator.state().status, MutationStatus::Committed);
    (cache, store)
}

#[tokio::test(start_paused = true)]
async fn last_settlement_wins_follows_settlement_order() {
    let (cache, store) = race(ConcurrencyPolicy::LastSettlementWins).await;
    let cached = cache.entity(&EntityKey::activity(ActivityId(1))).unwrap();
    assert_eq!(cached.title, "First");
    assert_eq!(store.get(ActivityId(1)).await.unwrap().title, "First");
}

#[tokio::test(start_paused = true)]
async fn latest_submission_wins_ignores_superseded_settlement() {
    let (cache, _store) = race(ConcurrencyPolicy::LatestSubmissionWins).await;
    let cached = cache.entity(&EntityKey::activity(ActivityId(1))).unwrap();
    assert_eq!(cached.title, "Second");
}

/// First submission fails at 100ms, second at 300ms.
async fn failing_race(policy: ConcurrencyPolicy) -> (QueryCache<Activity>, EntityStore) {
    let store = seeded_store();
    let service = Arc::new(ScriptedUpdates::scripted(store.clone(), [(100, false), (300, false)]));
    let cache = QueryCache::new();
    let loader = almanac_app::Loader::new(service.clone(), cache.clone());
    loader.activity(ActivityId(1)).settled().await.unwrap();
    let coordinator = MutationCoordinator::new(service, cache.clone()).with_policy(policy);

    let first = coordinator.update(ActivityId(1), ActivityPatch::new().with_title("A"));
    let second = coordinator.update(ActivityId(1), ActivityPatch::new().with_title("B"));
    let (first, second) = tokio::join!(first, second);
    assert!(first.is_err());
    assert!(second.is_err());
    assert_eq!(coordinator.state().status, MutationStatus::RolledBack);
    assert_eq!(coordinator.pending_updates(), 0);
    (cache, store)
}

#[tokio::test(start_paused = true)]
async fn overlapping_failures_restore_the_confirmed_value() {
    for policy in [
        ConcurrencyPolicy::LastSettlementWins,
        ConcurrencyPolicy::LatestSubmissionWins,
    ] {
        let (cache, store) = failing_race(policy).await;
        let cached = cache.entity(&EntityKey::activity(ActivityId(1))).unwrap();
        assert_eq!(cached, team_meeting(), "{policy}");
        assert_eq!(store.get(ActivityId(1)).await.unwrap(), team_meeting());
    }
}

#[tokio::test(start_paused = true)]
async fn failure_settling_after_a_commit_restores_the_committed_value() {
    for policy in [
        ConcurrencyPolicy::LastSettlementWins,
        ConcurrencyPolicy::LatestSubmissionWins,
    ] {
        // "A" is rejected at 300ms, after "B" has committed at 100ms.
        let store = seeded_store();
        let service = Arc::new(ScriptedUpdates::scripted(store.clone(), [(300, false), (100, true)]));
        let cache = QueryCache::new();
        almanac_app::Loader::new(service.clone(), cache.clone())
            .activity(ActivityId(1))
            .settled()
            .await
            .unwrap();
        let coordinator = MutationCoordinator::new(service, cache.clone())
            .with_policy(policy)
            .with_revalidation(false);

        let first = coordinator.update(ActivityId(1), ActivityPatch::new().with_title("A"));
        let second = coordinator.update(ActivityId(1), ActivityPatch::new().with_title("B"));
        let (first, second) = tokio::join!(first, second);
        assert!(first.is_err());
        assert_eq!(second.unwrap().title, "B");

        let cached = cache.entity(&EntityKey::activity(ActivityId(1))).unwrap();
        assert_eq!(cached.title, "B", "{policy}");
        assert_eq!(store.get(ActivityId(1)).await.unwrap(), cached);
        assert_eq!(coordinator.pending_updates(), 0);
    }
}

#[tokio::test(start_paused = true)]
async fn late_list_fetch_does_not_undo_a_trusted_commit() {
    let store = seeded_store();
    let service = Arc::new(
        ScriptedUpdates::new(store.clone(), [100]).with_list_delay(Duration::from_millis(500)),
    );
    let cache = QueryCache::new();
    let loader = almanac_app::Loader::new(service.clone(), cache.clone());
    let coordinator = MutationCoordinator::new(service, cache.clone()).with_revalidation(false);

    let list = loader.activities();
    let confirmed = coordinator
        .update(ActivityId(1), ActivityPatch::new().with_title("Committed"))
        .await
        .unwrap();
    let live = list.settled().await.unwrap();

    let listed = live.many().into_iter().find(|a| a.id == ActivityId(1)).unwrap();
    assert_eq!(listed, confirmed);
    assert_eq!(store.get(ActivityId(1)).await.unwrap(), confirmed);

    let again = loader.activities();
    assert!(!again.is_pending());
    let cached = again.read().unwrap().many();
    assert_eq!(cached.iter().find(|a| a.id == ActivityId(1)), Some(&confirmed));
}
