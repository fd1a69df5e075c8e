use std::fmt;
use std::sync::Arc;

use super::entry::QueryData;
use super::key::{Entity, QueryKey};
use super::QueryCache;

/// Success value of a cache read: a live view of one query entry.
///
/// Every call to [`data`](Self::data) denormalises from the canonical
/// entity table, so writes made after the read are visible without a
/// refetch.
pub struct LiveQuery<E> {
    cache: QueryCache<E>,
    key: QueryKey,
    /// Result of a fetch that was superseded before it could be applied;
    /// used only while the entry itself holds nothing.
    detached: Option<Arc<QueryData<E>>>,
}

impl<E> Clone for LiveQuery<E> {
    fn clone(&self) -> Self {
        Self {
            cache: self.cache.clone(),
            key: self.key.clone(),
            detached: self.detached.clone(),
        }
    }
}

impl<E> fmt::Debug for LiveQuery<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveQuery").field("key", &self.key).finish()
    }
}

impl<E: Entity> LiveQuery<E> {
    pub(crate) fn attached(cache: QueryCache<E>, key: QueryKey) -> Self {
        Self {
            cache,
            key,
            detached: None,
        }
    }

    pub(crate) fn detached(cache: QueryCache<E>, key: QueryKey, data: QueryData<E>) -> Self {
        Self {
            cache,
            key,
            detached: Some(Arc::new(data)),
        }
    }

    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    /// Current result, built from the canonical entity copies.
    pub fn data(&self) -> QueryData<E> {
        match self.cache.query(&self.key) {
            Some(data) => data,
            None => match &self.detached {
                Some(data) => (**data).clone(),
                None => QueryData::Many(Vec::new()),
            },
        }
    }

    /// The single entity of a detail query
    pub fn one(&self) -> Option<E> {
        self.data().one()
    }

    /// Every entity of a list query
    pub fn many(&self) -> Vec<E> {
        self.data().many()
    }

    /// Whether the entry can be served without a refetch
    pub fn is_fresh(&self) -> bool {
        self.cache.is_fresh(&self.key)
    }

    /// Be told whenever this query's result changes.
    pub fn subscribe(
        &self,
        callback: impl Fn(&QueryData<E>) + Send + Sync + 'static,
    ) -> CacheSubscription {
        self.cache.subscribe_query(self.key.clone(), callback)
    }
}

/// Keeps a cache subscription alive; dropping it unsubscribes.
#[must_use = "dropping the subscription unsubscribes immediately"]
pub struct CacheSubscription {
    unsubscribe: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl CacheSubscription {
    pub(crate) fn new(unsubscribe: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }
}

impl Drop for CacheSubscription {
    fn drop(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl fmt::Debug for CacheSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheSubscription")
            .field("active", &self.unsubscribe.is_some())
            .finish()
    }
}
