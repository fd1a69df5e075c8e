//! [`AlmanacApp`] wires one cache, one loader and one coordinator around a
//! single service so they share state.

use almanac_core::{Activity, ActivityService, AlmanacConfig};
use std::sync::Arc;

use crate::cache::QueryCache;
use crate::loader::Loader;
use crate::mutation::MutationCoordinator;

/// Headless application core.
#[derive(Clone)]
pub struct AlmanacApp {
    cache: QueryCache<Activity>,
    loader: Loader,
    coordinator: MutationCoordinator,
}

impl AlmanacApp {
    pub fn new(service: Arc<dyn ActivityService>, config: &AlmanacConfig) -> Self {
        let cache = QueryCache::new();
        Self {
            loader: Loader::from_config(service.clone(), cache.clone(), config),
            coordinator: MutationCoordinator::from_config(service, cache.clone(), config),
            cache,
        }
    }

    pub fn cache(&self) -> &QueryCache<Activity> {
        &self.cache
    }

    pub fn loader(&self) -> &Loader {
        &self.loader
    }

    pub fn coordinator(&self) -> &MutationCoordinator {
        &self.coordinator
    }
}
