//! Normalised cache state: one entity table plus reference-only query entries.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use super::key::{Entity, EntityKey, QueryKey};
use super::live::LiveQuery;
use crate::resource::Resource;

/// A query result, either as fetched or as denormalised from the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryData<E> {
    /// Single-entity query; `None` when the entity does not exist (or was evicted)
    One(Option<E>),
    /// List query
    Many(Vec<E>),
}

impl<E> QueryData<E> {
    /// The single entity, or the first element of a list
    pub fn one(self) -> Option<E> {
        match self {
            Self::One(entity) => entity,
            Self::Many(entities) => entities.into_iter().next(),
        }
    }

    /// Every entity in the result
    pub fn many(self) -> Vec<E> {
        match self {
            Self::One(entity) => entity.into_iter().collect(),
            Self::Many(entities) => entities,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::One(entity) => usize::from(entity.is_some()),
            Self::Many(entities) => entities.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// What a query entry stores: keys into the entity table, never values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum QueryRefs {
    One(Option<EntityKey>),
    Many(Vec<EntityKey>),
}

impl QueryRefs {
    pub(crate) fn references(&self, key: &EntityKey) -> bool {
        match self {
            Self::One(one) => one.as_ref() == Some(key),
            Self::Many(many) => many.contains(key),
        }
    }

    /// Drop `key` from the result; true if it was referenced.
    pub(crate) fn detach(&mut self, key: &EntityKey) -> bool {
        match self {
            Self::One(one) if one.as_ref() == Some(key) => {
                *one = None;
                true
            }
            Self::One(_) => false,
            Self::Many(many) => {
                let before = many.len();
                many.retain(|k| k != key);
                many.len() != before
            }
        }
    }
}

pub(crate) type QueryCallback<E> = Arc<dyn Fn(&QueryData<E>) + Send + Sync>;
pub(crate) type EntityCallback<E> = Arc<dyn Fn(Option<&E>) + Send + Sync>;

/// A fetch issued for a query key. `resource` is filled in right after the
/// fetch is spawned.
pub(crate) struct InFlight<E> {
    pub(crate) token: u64,
    /// Write clock when the fetch was issued
    pub(crate) issued_at: u64,
    pub(crate) resource: Option<Resource<LiveQuery<E>>>,
}

pub(crate) struct QueryEntry<E> {
    /// Last applied result; `None` until a fetch lands
    pub(crate) refs: Option<QueryRefs>,
    pub(crate) invalidated: bool,
    /// Token of the newest request; older results are discarded
    pub(crate) token: u64,
    pub(crate) in_flight: Option<InFlight<E>>,
    pub(crate) subscribers: Vec<(u64, QueryCallback<E>)>,
}

impl<E> Default for QueryEntry<E> {
    fn default() -> Self {
        Self {
            refs: None,
            invalidated: false,
            token: 0,
            in_flight: None,
            subscribers: Vec::new(),
        }
    }
}

impl<E> QueryEntry<E> {
    /// Holds data that reads may serve without fetching
    pub(crate) fn is_fresh(&self) -> bool {
        self.refs.is_some() && !self.invalidated
    }

    /// Holds nothing worth keeping: no result, no fetch, nobody listening
    pub(crate) fn is_vacant(&self) -> bool {
        self.refs.is_none() && self.in_flight.is_none() && self.subscribers.is_empty()
    }
}

pub(crate) struct CacheState<E> {
    pub(crate) entities: HashMap<EntityKey, E>,
    pub(crate) queries: HashMap<QueryKey, QueryEntry<E>>,
    pub(crate) entity_subscribers: HashMap<EntityKey, Vec<(u64, EntityCallback<E>)>>,
    /// Clock value of the last direct write or eviction of each entity,
    /// kept only while some fetch is in flight
    written_at: HashMap<EntityKey, u64>,
    write_clock: u64,
    next_token: u64,
    next_subscriber: u64,
}

impl<E> Default for CacheState<E> {
    fn default() -> Self {
        Self {
            entities: HashMap::new(),
            queries: HashMap::new(),
            entity_subscribers: HashMap::new(),
            written_at: HashMap::new(),
            write_clock: 0,
            next_token: 1,
            next_subscriber: 1,
        }
    }
}

impl<E: Entity> CacheState<E> {
    /// Register a new request for `key`, superseding any earlier one.
    pub(crate) fn issue(&mut self, key: &QueryKey) -> u64 {
        let token = self.next_token;
        self.next_token += 1;
        let entry = self.queries.entry(key.clone()).or_default();
        entry.token = token;
        entry.in_flight = Some(InFlight {
            token,
            issued_at: self.write_clock,
            resource: None,
        });
        token
    }

    /// Close the fetch for `key` if `token` is still its newest request.
    /// Returns the write clock at which it was issued.
    pub(crate) fn complete(&mut self, key: &QueryKey, token: u64) -> Option<u64> {
        let entry = self.queries.get_mut(key)?;
        if entry.token != token {
            return None;
        }
        let issued_at = entry.in_flight.take().map(|f| f.issued_at)?;
        self.forget_writes_if_idle();
        Some(issued_at)
    }

    fn forget_writes_if_idle(&mut self) {
        if self.queries.values().all(|e| e.in_flight.is_none()) {
            self.written_at.clear();
        }
    }

    /// Record a direct write or eviction so that fetches issued before it
    /// do not overwrite the entity when they land.
    pub(crate) fn touch(&mut self, key: &EntityKey) {
        self.write_clock += 1;
        if self.queries.values().any(|e| e.in_flight.is_some()) {
            self.written_at.insert(key.clone(), self.write_clock);
        }
    }

    /// Drop the entry for `key` if it holds nothing.
    pub(crate) fn prune(&mut self, key: &QueryKey) {
        if self.queries.get(key).is_some_and(QueryEntry::is_vacant) {
            self.queries.remove(key);
        }
    }

    /// Move the token forward without issuing a request.
    pub(crate) fn supersede(&mut self, key: &QueryKey) -> bool {
        let token = self.next_token;
        match self.queries.get_mut(key) {
            Some(entry) => {
                self.next_token += 1;
                entry.token = token;
                entry.in_flight = None;
                self.forget_writes_if_idle();
                true
            }
            None => false,
        }
    }

    pub(crate) fn next_subscriber_id(&mut self) -> u64 {
        let id = self.next_subscriber;
        self.next_subscriber += 1;
        id
    }

    /// Store every entity of `data` in the table and return the references
    /// together with the keys actually written. Entities written or evicted
    /// after `issued_at` keep their current state.
    pub(crate) fn normalize(
        &mut self,
        data: QueryData<E>,
        issued_at: u64,
    ) -> (QueryRefs, Vec<EntityKey>) {
        let mut written = Vec::new();
        let mut store = |state: &mut Self, entity: E| {
            let key = entity.entity_key();
            if state.written_at.get(&key).is_some_and(|at| *at > issued_at) {
                debug!(key = %key, "keeping entity written after the fetch was issued");
            } else {
                state.entities.insert(key.clone(), entity);
                written.push(key.clone());
            }
            key
        };
        let refs = match data {
            QueryData::One(entity) => QueryRefs::One(entity.map(|e| store(self, e))),
            QueryData::Many(entities) => {
                QueryRefs::Many(entities.into_iter().map(|e| store(self, e)).collect())
            }
        };
        (refs, written)
    }

    /// Build a result from the canonical copies. Missing entities are skipped.
    pub(crate) fn denormalize(&self, refs: &QueryRefs) -> QueryData<E> {
        match refs {
            QueryRefs::One(key) => {
                QueryData::One(key.as_ref().and_then(|k| self.entities.get(k).cloned()))
            }
            QueryRefs::Many(keys) => QueryData::Many(
                keys.iter()
                    .filter_map(|k| self.entities.get(k).cloned())
                    .collect(),
            ),
        }
    }

    pub(crate) fn queries_referencing(&self, key: &EntityKey) -> Vec<QueryKey> {
        self.queries
            .iter()
            .filter(|(_, entry)| entry.refs.as_ref().is_some_and(|r| r.references(key)))
            .map(|(query, _)| query.clone())
            .collect()
    }
}
