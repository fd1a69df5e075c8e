//! # Normalised Query Cache
//!
//! [`QueryCache<E>`] keeps exactly one canonical copy of every entity,
//! keyed by [`EntityKey`] (`Activity:3`), and stores query results only as
//! references into that table:
//!
//! ```text
//!  queries                         entities
//! ┌──────────────────────────┐    ┌──────────────────────┐
//! │ activities      → [1,2,3]│──┬►│ Activity:1 {..}      │
//! │ activity(id: 3) → 3      │──┤ │ Activity:2 {..}      │
//! └──────────────────────────┘  └►│ Activity:3 {..}      │
//!                                 └──────────────────────┘
//! ```
//!
//! A [`write`](QueryCache::write) to `Activity:3` is therefore seen by both
//! queries without either being refetched.
//!
//! ## Notification
//!
//! Subscribers run synchronously, before the triggering call returns, and
//! always outside the state lock. A subscriber may itself write to the
//! cache: the nested call queues its notifications and the outermost call
//! delivers them, so there is no recursion and nothing is dropped.
//! Duplicate pending notifications coalesce; delivery always reads the
//! latest state.
//!
//! ## Stale results
//!
//! Every fetch carries a request token. Invalidating a key, or issuing a
//! newer request for it, moves the entry's token on; a fetch that settles
//! with an old token is not applied.

mod entry;
mod key;
mod live;

pub use entry::QueryData;
pub use key::{Entity, EntityKey, QueryKey};
pub use live::{CacheSubscription, LiveQuery};

use almanac_core::{FetchPolicy, Result};
use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Weak};
use tracing::{debug, warn};

use crate::resource::Resource;
use entry::{CacheState, EntityCallback, QueryCallback};

/// Deferred fetch handed to [`EntityCache::read`].
pub type Fetcher<E> = Box<dyn FnOnce() -> BoxFuture<'static, Result<QueryData<E>>> + Send>;

/// Box a closure as a [`Fetcher`].
pub fn fetcher<E, F, Fut>(fetch: F) -> Fetcher<E>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<QueryData<E>>> + Send + 'static,
{
    Box::new(move || Box::pin(fetch()) as BoxFuture<'static, Result<QueryData<E>>>)
}

/// The capability the loader and the mutation coordinator need from a cache.
pub trait EntityCache<E: Entity>: Clone + Send + Sync + 'static {
    /// Resource for `key`, fetching according to `policy`.
    fn read(&self, key: QueryKey, policy: FetchPolicy, fetch: Fetcher<E>) -> Resource<LiveQuery<E>>;

    /// Replace the canonical copy of an entity and notify its referrers.
    fn write(&self, entity: E);

    /// Canonical copy of an entity, if cached.
    fn entity(&self, key: &EntityKey) -> Option<E>;

    /// Mark a query stale; the next read refetches.
    fn invalidate(&self, key: &QueryKey) -> bool;

    /// Mark every query of a shape stale.
    fn invalidate_shape(&self, shape: &str) -> usize;

    /// Remove an entity and detach it from every query result.
    fn evict(&self, key: &EntityKey) -> Option<E>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Notification {
    Query(QueryKey),
    Entity(EntityKey),
}

#[derive(Default)]
struct NotifyQueue {
    pending: VecDeque<Notification>,
    draining: bool,
}

struct Shared<E> {
    state: Mutex<CacheState<E>>,
    queue: Mutex<NotifyQueue>,
}

/// Resets the draining flag if a subscriber panics mid-delivery.
struct DrainGuard<'a>(&'a Mutex<NotifyQueue>);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.lock().draining = false;
    }
}

enum Decision<E> {
    Hit,
    HitAndRefresh(u64),
    Join(Resource<LiveQuery<E>>),
    Fetch(u64),
}

/// Shared normalised cache. Clones refer to the same cache.
pub struct QueryCache<E> {
    shared: Arc<Shared<E>>,
}

impl<E> Clone for QueryCache<E> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<E> fmt::Debug for QueryCache<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("QueryCache")
            .field("entities", &state.entities.len())
            .field("queries", &state.queries.len())
            .finish()
    }
}

impl<E: Entity> Default for QueryCache<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> QueryCache<E> {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(CacheState::default()),
                queue: Mutex::new(NotifyQueue::default()),
            }),
        }
    }

    /// Return a resource for `key`, fetching with `fetcher` only when
    /// `policy` (or a stale entry) requires it.
    ///
    /// | entry                 | cache-first | cache-and-network   | network-only |
    /// |-----------------------|-------------|---------------------|--------------|
    /// | fresh                 | cached      | cached + background | fetch        |
    /// | missing / invalidated | fetch       | fetch               | fetch        |
    ///
    /// A fetch already in flight for `key` is joined instead of repeated.
    pub fn read<F, Fut>(&self, key: QueryKey, policy: FetchPolicy, fetcher: F) -> Resource<LiveQuery<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<QueryData<E>>> + Send + 'static,
    {
        let decision = {
            let mut state = self.shared.state.lock();
            let entry = state.queries.entry(key.clone()).or_default();
            let fresh = entry.is_fresh();
            let in_flight = entry.in_flight.as_ref().and_then(|f| f.resource.clone());
            match (policy, fresh, in_flight) {
                (FetchPolicy::CacheFirst, true, _) => Decision::Hit,
                (FetchPolicy::CacheAndNetwork, true, Some(_)) => Decision::Hit,
                (FetchPolicy::CacheAndNetwork, true, None) => {
                    Decision::HitAndRefresh(state.issue(&key))
                }
                (_, _, Some(resource)) => Decision::Join(resource),
                (_, _, None) => Decision::Fetch(state.issue(&key)),
            }
        };

        match decision {
            Decision::Hit => {
                debug!(key = %key, policy = %policy, "cache hit");
                Resource::ready(key.to_string(), LiveQuery::attached(self.clone(), key))
            }
            Decision::HitAndRefresh(token) => {
                debug!(key = %key, policy = %policy, token, "cache hit, refreshing in background");
                self.spawn_fetch(key.clone(), token, fetcher());
                Resource::ready(key.to_string(), LiveQuery::attached(self.clone(), key))
            }
            Decision::Join(resource) => {
                debug!(key = %key, policy = %policy, "joining in-flight request");
                resource
            }
            Decision::Fetch(token) => {
                debug!(key = %key, policy = %policy, token, "cache miss, fetching");
                self.spawn_fetch(key, token, fetcher())
            }
        }
    }

    fn spawn_fetch<Fut>(&self, key: QueryKey, token: u64, fetch: Fut) -> Resource<LiveQuery<E>>
    where
        Fut: Future<Output = Result<QueryData<E>>> + Send + 'static,
    {
        let cache = self.clone();
        let settle_key = key.clone();
        let resource = Resource::new(key.to_string(), async move {
            let outcome = fetch.await;
            cache.settle_fetch(settle_key, token, outcome)
        });

        let mut state = self.shared.state.lock();
        if let Some(in_flight) = state
            .queries
            .get_mut(&key)
            .and_then(|entry| entry.in_flight.as_mut())
        {
            if in_flight.token == token {
                in_flight.resource = Some(resource.clone());
            }
        }
        resource
    }

    fn settle_fetch(
        &self,
        key: QueryKey,
        token: u64,
        outcome: Result<QueryData<E>>,
    ) -> Result<LiveQuery<E>> {
        let mut notes = Vec::new();
        let result = {
            let mut state = self.shared.state.lock();
            let issued_at = state.complete(&key, token);

            match (outcome, issued_at) {
                (Err(err), _) => {
                    debug!(key = %key, token, error = %err, "query fetch failed");
                    state.prune(&key);
                    Err(err)
                }
                (Ok(data), None) => {
                    warn!(key = %key, token, "discarding superseded query result");
                    state.prune(&key);
                    Ok(LiveQuery::detached(self.clone(), key, data))
                }
                (Ok(data), Some(issued_at)) => {
                    let (refs, written) = state.normalize(data, issued_at);
                    if let Some(entry) = state.queries.get_mut(&key) {
                        entry.refs = Some(refs);
                        entry.invalidated = false;
                    }
                    notes.push(Notification::Query(key.clone()));
                    for entity in written {
                        for query in state.queries_referencing(&entity) {
                            notes.push(Notification::Query(query));
                        }
                        notes.push(Notification::Entity(entity));
                    }
                    debug!(key = %key, token, "query result applied");
                    Ok(LiveQuery::attached(self.clone(), key))
                }
            }
        };
        self.flush(notes);
        result
    }

    /// Replace the canonical copy of `entity` and synchronously notify every
    /// query that references it.
    pub fn write(&self, entity: E) {
        let key = entity.entity_key();
        let notes = {
            let mut state = self.shared.state.lock();
            state.touch(&key);
            state.entities.insert(key.clone(), entity);
            let mut notes: Vec<Notification> = state
                .queries_referencing(&key)
                .into_iter()
                .map(Notification::Query)
                .collect();
            notes.push(Notification::Entity(key.clone()));
            notes
        };
        debug!(key = %key, "cache write");
        self.flush(notes);
    }

    /// Canonical copy of an entity.
    pub fn entity(&self, key: &EntityKey) -> Option<E> {
        self.shared.state.lock().entities.get(key).cloned()
    }

    /// Current result of a query without fetching. `None` if never fetched.
    pub fn query(&self, key: &QueryKey) -> Option<QueryData<E>> {
        let state = self.shared.state.lock();
        let refs = state.queries.get(key)?.refs.as_ref()?;
        Some(state.denormalize(refs))
    }

    /// Whether `key` holds data a read may serve without fetching.
    pub fn is_fresh(&self, key: &QueryKey) -> bool {
        self.shared
            .state
            .lock()
            .queries
            .get(key)
            .is_some_and(|entry| entry.is_fresh())
    }

    /// Mark a query stale. Any request in flight for it is superseded.
    pub fn invalidate(&self, key: &QueryKey) -> bool {
        let mut state = self.shared.state.lock();
        let existed = state.supersede(key);
        if let Some(entry) = state.queries.get_mut(key) {
            entry.invalidated = true;
        }
        state.prune(key);
        if existed {
            debug!(key = %key, "query invalidated");
        }
        existed
    }

    /// Invalidate every query of `shape`; returns how many were marked.
    pub fn invalidate_shape(&self, shape: &str) -> usize {
        let keys: Vec<QueryKey> = self
            .shared
            .state
            .lock()
            .queries
            .keys()
            .filter(|k| k.shape() == shape)
            .cloned()
            .collect();
        keys.iter().filter(|k| self.invalidate(k)).count()
    }

    /// Remove an entity from the table and from every query result.
    pub fn evict(&self, key: &EntityKey) -> Option<E> {
        let (removed, notes) = {
            let mut state = self.shared.state.lock();
            state.touch(key);
            let removed = state.entities.remove(key);
            let mut notes: Vec<Notification> = state
                .queries
                .iter_mut()
                .filter_map(|(query, entry)| {
                    let detached = entry.refs.as_mut().is_some_and(|r| r.detach(key));
                    detached.then(|| Notification::Query(query.clone()))
                })
                .collect();
            notes.push(Notification::Entity(key.clone()));
            (removed, notes)
        };
        debug!(key = %key, "cache evict");
        self.flush(notes);
        removed
    }

    /// Call `callback` with the new result whenever query `key` changes.
    pub fn subscribe_query(
        &self,
        key: QueryKey,
        callback: impl Fn(&QueryData<E>) + Send + Sync + 'static,
    ) -> CacheSubscription {
        let callback: QueryCallback<E> = Arc::new(callback);
        let id = {
            let mut state = self.shared.state.lock();
            let id = state.next_subscriber_id();
            state
                .queries
                .entry(key.clone())
                .or_default()
                .subscribers
                .push((id, callback));
            id
        };
        let weak: Weak<Shared<E>> = Arc::downgrade(&self.shared);
        CacheSubscription::new(move || {
            if let Some(shared) = weak.upgrade() {
                let mut state = shared.state.lock();
                if let Some(entry) = state.queries.get_mut(&key) {
                    entry.subscribers.retain(|(sid, _)| *sid != id);
                }
                state.prune(&key);
            }
        })
    }

    /// Call `callback` whenever the canonical copy of `key` changes;
    /// `None` after eviction.
    pub fn subscribe_entity(
        &self,
        key: EntityKey,
        callback: impl Fn(Option<&E>) + Send + Sync + 'static,
    ) -> CacheSubscription {
        let callback: EntityCallback<E> = Arc::new(callback);
        let id = {
            let mut state = self.shared.state.lock();
            let id = state.next_subscriber_id();
            state
                .entity_subscribers
                .entry(key.clone())
                .or_default()
                .push((id, callback));
            id
        };
        let weak: Weak<Shared<E>> = Arc::downgrade(&self.shared);
        CacheSubscription::new(move || {
            if let Some(shared) = weak.upgrade() {
                let mut state = shared.state.lock();
                if let Some(subscribers) = state.entity_subscribers.get_mut(&key) {
                    subscribers.retain(|(sid, _)| *sid != id);
                    if subscribers.is_empty() {
                        state.entity_subscribers.remove(&key);
                    }
                }
            }
        })
    }

    /// Number of canonical entities held
    pub fn entity_count(&self) -> usize {
        self.shared.state.lock().entities.len()
    }

    /// Number of query entries held, fetched or pending
    pub fn query_count(&self) -> usize {
        self.shared.state.lock().queries.len()
    }

    fn flush(&self, notes: Vec<Notification>) {
        {
            let mut queue = self.shared.queue.lock();
            for note in notes {
                if !queue.pending.contains(&note) {
                    queue.pending.push_back(note);
                }
            }
            if queue.draining {
                return;
            }
            queue.draining = true;
        }

        let guard = DrainGuard(&self.shared.queue);
        loop {
            let next = {
                let mut queue = self.shared.queue.lock();
                let next = queue.pending.pop_front();
                if next.is_none() {
                    queue.draining = false;
                }
                next
            };
            match next {
                Some(note) => self.deliver(note),
                None => break,
            }
        }
        std::mem::forget(guard);
    }

    fn deliver(&self, note: Notification) {
        match note {
            Notification::Query(key) => {
                let (data, callbacks) = {
                    let state = self.shared.state.lock();
                    let Some(entry) = state.queries.get(&key) else {
                        return;
                    };
                    let Some(refs) = entry.refs.as_ref() else {
                        return;
                    };
                    if entry.subscribers.is_empty() {
                        return;
                    }
                    let callbacks: Vec<QueryCallback<E>> =
                        entry.subscribers.iter().map(|(_, cb)| cb.clone()).collect();
                    (state.denormalize(refs), callbacks)
                };
                for callback in callbacks {
                    callback(&data);
                }
            }
            Notification::Entity(key) => {
                let (value, callbacks) = {
                    let state = self.shared.state.lock();
                    let Some(subscribers) = state.entity_subscribers.get(&key) else {
                        return;
                    };
                    let callbacks: Vec<EntityCallback<E>> =
                        subscribers.iter().map(|(_, cb)| cb.clone()).collect();
                    (state.entities.get(&key).cloned(), callbacks)
                };
                for callback in callbacks {
                    callback(value.as_ref());
                }
            }
        }
    }
}

impl<E: Entity> EntityCache<E> for QueryCache<E> {
    fn read(&self, key: QueryKey, policy: FetchPolicy, fetch: Fetcher<E>) -> Resource<LiveQuery<E>> {
        QueryCache::read(self, key, policy, fetch)
    }

    fn write(&self, entity: E) {
        QueryCache::write(self, entity);
    }

    fn entity(&self, key: &EntityKey) -> Option<E> {
        QueryCache::entity(self, key)
    }

    fn invalidate(&self, key: &QueryKey) -> bool {
        QueryCache::invalidate(self, key)
    }

    fn invalidate_shape(&self, shape: &str) -> usize {
        QueryCache::invalidate_shape(self, shape)
    }

    fn evict(&self, key: &EntityKey) -> Option<E> {
        QueryCache::evict(self, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use almanac_core::AlmanacError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, PartialEq)]
    struct Note {
        id: u32,
        text: String,
    }

    impl Entity for Note {
        const TYPENAME: &'static str = "Note";

        fn entity_id(&self) -> String {
            self.id.to_string()
        }
    }

    fn note(id: u32, text: &str) -> Note {
        Note {
            id,
            text: text.into(),
        }
    }

    fn counted(
        calls: &Arc<AtomicUsize>,
        data: QueryData<Note>,
    ) -> impl FnOnce() -> BoxFuture<'static, Result<QueryData<Note>>> {
        let calls = calls.clone();
        move || {
            Box::pin(async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(data)
            }) as BoxFuture<'static, Result<QueryData<Note>>>
        }
    }

    #[tokio::test]
    async fn test_cache_first_serves_existing_entry() {
        let cache = QueryCache::<Note>::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = QueryKey::new("notes");

        let first = cache.read(
            key.clone(),
            FetchPolicy::CacheFirst,
            counted(&calls, QueryData::Many(vec![note(1, "a")])),
        );
        first.settled().await.unwrap();

        let second = cache.read(
            key,
            FetchPolicy::CacheFirst,
            counted(&calls, QueryData::Many(vec![])),
        );
        assert_eq!(second.read().unwrap().many(), vec![note(1, "a")]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_reads_share_one_fetch() {
        let cache = QueryCache::<Note>::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = QueryKey::new("notes");

        let a = cache.read(
            key.clone(),
            FetchPolicy::NetworkOnly,
            counted(&calls, QueryData::Many(vec![note(1, "a")])),
        );
        let b = cache.read(
            key,
            FetchPolicy::NetworkOnly,
            counted(&calls, QueryData::Many(vec![note(1, "a")])),
        );
        assert_eq!(a.id(), b.id());
        b.settled().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalidated_entry_refetches_even_cache_first() {
        let cache = QueryCache::<Note>::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = QueryKey::new("notes");

        cache
            .read(key.clone(), FetchPolicy::CacheFirst, counted(&calls, QueryData::Many(vec![note(1, "a")])))
            .settled()
            .await
            .unwrap();
        assert!(cache.invalidate(&key));
        assert!(!cache.is_fresh(&key));

        let live = cache
            .read(key.clone(), FetchPolicy::CacheFirst, counted(&calls, QueryData::Many(vec![note(1, "b")])))
            .settled()
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(live.many(), vec![note(1, "b")]);
        assert!(cache.is_fresh(&key));
    }

    #[tokio::test]
    async fn test_result_superseded_by_invalidation_is_discarded() {
        let cache = QueryCache::<Note>::new();
        let key = QueryKey::new("notes");

        cache.write(note(1, "canonical"));
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let late = cache.read(key.clone(), FetchPolicy::CacheFirst, move || async move {
            let _ = rx.await;
            Ok(QueryData::Many(vec![note(1, "late")]))
        });
        cache.invalidate(&key);
        let _ = tx.send(());
        late.settled().await.unwrap();

        assert_eq!(cache.entity(&EntityKey::of::<Note>(1)).unwrap().text, "canonical");
        assert!(cache.query(&key).is_none());
    }

    #[tokio::test]
    async fn test_late_fetch_keeps_entity_written_after_issue() {
        let cache = QueryCache::<Note>::new();
        let key = QueryKey::new("notes");

        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let late = cache.read(key.clone(), FetchPolicy::CacheFirst, move || async move {
            let _ = rx.await;
            Ok(QueryData::Many(vec![note(1, "before"), note(2, "b")]))
        });
        cache.write(note(1, "committed"));
        let _ = tx.send(());

        let live = late.settled().await.unwrap();
        assert_eq!(live.many(), vec![note(1, "committed"), note(2, "b")]);
        assert!(cache.is_fresh(&key));

        // A fetch issued after the write applies normally.
        cache
            .read(key, FetchPolicy::NetworkOnly, || async {
                Ok(QueryData::Many(vec![note(1, "refetched"), note(2, "b")]))
            })
            .settled()
            .await
            .unwrap();
        assert_eq!(cache.entity(&EntityKey::of::<Note>(1)).unwrap().text, "refetched");
    }

    #[tokio::test]
    async fn test_late_fetch_does_not_restore_evicted_entity() {
        let cache = QueryCache::<Note>::new();
        let key = QueryKey::new("notes");
        cache.write(note(1, "a"));

        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let late = cache.read(key.clone(), FetchPolicy::CacheFirst, move || async move {
            let _ = rx.await;
            Ok(QueryData::Many(vec![note(1, "a"), note(2, "b")]))
        });
        cache.evict(&EntityKey::of::<Note>(1));
        let _ = tx.send(());
        late.settled().await.unwrap();

        assert!(cache.entity(&EntityKey::of::<Note>(1)).is_none());
        assert_eq!(cache.query(&key).unwrap().many(), vec![note(2, "b")]);
    }

    #[tokio::test]
    async fn test_empty_entries_are_pruned() {
        let cache = QueryCache::<Note>::new();
        let key = QueryKey::new("notes");

        let failed = cache
            .read(key.clone(), FetchPolicy::CacheFirst, || async {
                Err(AlmanacError::operation_failed("down"))
            })
            .settled()
            .await;
        assert!(failed.is_err());
        assert_eq!(cache.query_count(), 0);

        let sub = cache.subscribe_query(key.clone(), |_| {});
        assert_eq!(cache.query_count(), 1);
        drop(sub);
        assert_eq!(cache.query_count(), 0);

        // Entries holding a result survive losing their subscribers.
        cache
            .read(key.clone(), FetchPolicy::CacheFirst, || async {
                Ok(QueryData::Many(vec![note(1, "a")]))
            })
            .settled()
            .await
            .unwrap();
        drop(cache.subscribe_query(key, |_| {}));
        assert_eq!(cache.query_count(), 1);
    }

    #[tokio::test]
    async fn test_write_notifies_subscriber_synchronously() {
        let cache = QueryCache::<Note>::new();
        let key = QueryKey::new("notes");
        let live = cache
            .read(key, FetchPolicy::CacheFirst, || async {
                Ok(QueryData::Many(vec![note(1, "a"), note(2, "b")]))
            })
            .settled()
            .await
            .unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let _sub = live.subscribe(move |data| {
            sink.lock().push(data.clone().many()[1].text.clone());
        });

        cache.write(note(2, "edited"));
        assert_eq!(*seen.lock(), vec!["edited".to_string()]);
    }

    #[tokio::test]
    async fn test_reentrant_write_from_subscriber() {
        let cache = QueryCache::<Note>::new();
        let key = EntityKey::of::<Note>(1);
        cache.write(note(1, "start"));

        let deliveries = Arc::new(AtomicUsize::new(0));
        let count = deliveries.clone();
        let inner = cache.clone();
        let _sub = cache.subscribe_entity(key.clone(), move |value| {
            count.fetch_add(1, Ordering::SeqCst);
            if value.is_some_and(|n| n.text == "first") {
                inner.write(note(1, "second"));
            }
        });

        cache.write(note(1, "first"));
        assert_eq!(cache.entity(&key).unwrap().text, "second");
        assert_eq!(deliveries.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_dropping_subscription_unsubscribes() {
        let cache = QueryCache::<Note>::new();
        let key = EntityKey::of::<Note>(1);
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        let sub = cache.subscribe_entity(key, move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });

        cache.write(note(1, "a"));
        drop(sub);
        cache.write(note(1, "b"));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_evict_detaches_from_queries() {
        let cache = QueryCache::<Note>::new();
        let list = QueryKey::new("notes");
        let one = QueryKey::new("note").with_variable("id", 2);
        cache
            .read(list.clone(), FetchPolicy::CacheFirst, || async {
                Ok(QueryData::Many(vec![note(1, "a"), note(2, "b")]))
            })
            .settled()
            .await
            .unwrap();
        cache
            .read(one.clone(), FetchPolicy::CacheFirst, || async {
                Ok(QueryData::One(Some(note(2, "b"))))
            })
            .settled()
            .await
            .unwrap();

        assert!(cache.evict(&EntityKey::of::<Note>(2)).is_some());
        assert_eq!(cache.query(&list).unwrap().len(), 1);
        assert_eq!(cache.query(&one).unwrap(), QueryData::One(None));
    }
}
