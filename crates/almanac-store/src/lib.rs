//! # Almanac Store
//!
//! The authoritative side of Almanac: an in-memory [`EntityStore`] and the two
//! service boundaries that expose it.
//!
//! - [`RestApi`]: a flat set of async calls
//! - [`GraphqlService`]: typed resolvers behind a GraphQL-shaped client
//!
//! Both implement [`almanac_core::ActivityService`], so the coordination
//! layer in `almanac-app` can run against either one.

pub mod graphql;
pub mod rest;
pub mod seed;
pub mod store;

pub use graphql::{GraphqlService, Resolvers};
pub use rest::RestApi;
pub use store::EntityStore;

use almanac_core::{ActivityService, AlmanacConfig, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Which service boundary to put in front of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Rest,
    Graphql,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Rest => "rest",
            Self::Graphql => "graphql",
        })
    }
}

impl FromStr for Backend {
    type Err = almanac_core::AlmanacError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rest" => Ok(Self::Rest),
            "graphql" => Ok(Self::Graphql),
            other => Err(almanac_core::AlmanacError::config(format!(
                "Unknown backend: {other}"
            ))),
        }
    }
}

/// Seed a store for the month of `today` and wrap it in `backend`, using the
/// latency `config` assigns to that boundary.
pub fn seeded_service(
    backend: Backend,
    config: &AlmanacConfig,
    today: NaiveDate,
) -> Result<Arc<dyn ActivityService>> {
    let store = EntityStore::seeded_for(today)?;
    let service: Arc<dyn ActivityService> = match backend {
        Backend::Rest => Arc::new(RestApi::new(store.with_latency(config.rest_latency()))),
        Backend::Graphql => Arc::new(GraphqlService::new(Resolvers::new(
            store.with_latency(config.graphql_latency()),
        ))),
    };
    Ok(service)
}
