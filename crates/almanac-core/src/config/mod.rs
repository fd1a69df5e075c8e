//! # Configuration
//!
//! [`AlmanacConfig`] is assembled in layers:
//!
//! 1. compiled defaults (the latencies observed on the mock boundaries)
//! 2. an optional TOML file
//! 3. `ALMANAC_*` environment overrides, one per dotted key
//!    (`latency.rest.update_ms` ↔ `ALMANAC_LATENCY_REST_UPDATE_MS`)
//! 4. validation
//!
//! ```toml
//! [latency.graphql]
//! update_ms = 0
//!
//! [cache]
//! fetch_policy = "cache-and-network"
//! revalidate_after_commit = false
//! ```

mod validation;

pub use validation::{ConfigValidator, ValidationError, ValidationResult};

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::errors::{AlmanacError, Result};
use crate::policy::{ConcurrencyPolicy, FetchPolicy};
use crate::service::ServiceOperation;

/// Largest simulated delay accepted for any operation.
pub const MAX_LATENCY_MS: u32 = 60_000;

/// Prefix of every environment override.
pub const ENV_PREFIX: &str = "ALMANAC_";

/// Dotted keys that can be overridden from strings (environment, CLI).
pub const OVERRIDABLE_KEYS: &[&str] = &[
    "latency.rest.list_ms",
    "latency.rest.get_ms",
    "latency.rest.range_ms",
    "latency.rest.create_ms",
    "latency.rest.update_ms",
    "latency.rest.delete_ms",
    "latency.graphql.query_ms",
    "latency.graphql.range_query_ms",
    "latency.graphql.create_ms",
    "latency.graphql.update_ms",
    "latency.graphql.delete_ms",
    "cache.fetch_policy",
    "cache.revalidate_after_commit",
    "mutation.concurrency",
    "logging.filter",
];

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlmanacConfig {
    /// Simulated service latency
    pub latency: LatencyConfig,
    /// Query cache behaviour
    pub cache: CacheConfig,
    /// Mutation coordinator behaviour
    pub mutation: MutationConfig,
    /// Log filtering
    pub logging: LoggingConfig,
}

/// Simulated latency for both service boundaries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LatencyConfig {
    /// REST-shaped boundary
    pub rest: RestLatency,
    /// GraphQL-shaped boundary
    pub graphql: GraphqlLatency,
}

/// Delays of the REST-shaped boundary, in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RestLatency {
    pub list_ms: u32,
    pub get_ms: u32,
    pub range_ms: u32,
    pub create_ms: u32,
    pub update_ms: u32,
    pub delete_ms: u32,
}

impl Default for RestLatency {
    fn default() -> Self {
        Self {
            list_ms: 200,
            get_ms: 200,
            range_ms: 300,
            create_ms: 300,
            update_ms: 300,
            delete_ms: 300,
        }
    }
}

/// Delays of the GraphQL-shaped boundary, in milliseconds.
///
/// Updates take seconds, long enough to watch the optimistic projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphqlLatency {
    pub query_ms: u32,
    pub range_query_ms: u32,
    pub create_ms: u32,
    pub update_ms: u32,
    pub delete_ms: u32,
}

impl Default for GraphqlLatency {
    fn default() -> Self {
        Self {
            query_ms: 200,
            range_query_ms: 300,
            create_ms: 300,
            update_ms: 3000,
            delete_ms: 300,
        }
    }
}

/// Per-operation delays as seen by a service implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LatencyProfile {
    pub list: Duration,
    pub get: Duration,
    pub range: Duration,
    pub create: Duration,
    pub update: Duration,
    pub delete: Duration,
}

impl LatencyProfile {
    /// No delay at all.
    pub fn instant() -> Self {
        Self::default()
    }

    /// The same delay for every operation.
    pub fn uniform(delay: Duration) -> Self {
        Self {
            list: delay,
            get: delay,
            range: delay,
            create: delay,
            update: delay,
            delete: delay,
        }
    }

    /// Delay applied before `op` runs.
    pub fn delay(&self, op: ServiceOperation) -> Duration {
        match op {
            ServiceOperation::List => self.list,
            ServiceOperation::Get => self.get,
            ServiceOperation::Range => self.range,
            ServiceOperation::Create => self.create,
            ServiceOperation::Update => self.update,
            ServiceOperation::Delete => self.delete,
        }
    }
}

fn ms(value: u32) -> Duration {
    Duration::from_millis(u64::from(value))
}

impl From<&RestLatency> for LatencyProfile {
    fn from(rest: &RestLatency) -> Self {
        Self {
            list: ms(rest.list_ms),
            get: ms(rest.get_ms),
            range: ms(rest.range_ms),
            create: ms(rest.create_ms),
            update: ms(rest.update_ms),
            delete: ms(rest.delete_ms),
        }
    }
}

impl From<&GraphqlLatency> for LatencyProfile {
    fn from(graphql: &GraphqlLatency) -> Self {
        Self {
            list: ms(graphql.query_ms),
            get: ms(graphql.query_ms),
            range: ms(graphql.range_query_ms),
            create: ms(graphql.create_ms),
            update: ms(graphql.update_ms),
            delete: ms(graphql.delete_ms),
        }
    }
}

/// Query cache settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Policy loaders use for their reads
    pub fetch_policy: FetchPolicy,
    /// Invalidate the list and detail queries after a committed mutation.
    /// `false` is the bypass: the coordinator's cache write is trusted.
    pub revalidate_after_commit: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            fetch_policy: FetchPolicy::CacheFirst,
            revalidate_after_commit: true,
        }
    }
}

/// Mutation coordinator settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MutationConfig {
    /// Race resolution between mutations of the same activity
    pub concurrency: ConcurrencyPolicy,
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing-subscriber` env-filter directive
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl AlmanacConfig {
    /// Defaults, then `path` if given, then the process environment, then validation.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.merge_env(std::env::vars())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AlmanacError::config(format!(
                "Failed to read config file {}: {e}",
                path.display()
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse TOML text. Missing keys keep their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply `ALMANAC_*` overrides from `vars`; other variables are ignored.
    pub fn merge_env<I>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (name, value) in vars {
            let Some(suffix) = name.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            match OVERRIDABLE_KEYS
                .iter()
                .find(|key| env_suffix(key) == suffix)
            {
                Some(key) => self.set_from_string(key, &value)?,
                None => tracing::debug!(variable = %name, "ignoring unknown config override"),
            }
        }
        Ok(())
    }

    /// Set one dotted key from its string form.
    pub fn set_from_string(&mut self, key: &str, value: &str) -> Result<()> {
        let rest = &mut self.latency.rest;
        let graphql = &mut self.latency.graphql;
        match key {
            "latency.rest.list_ms" => rest.list_ms = parse_ms(key, value)?,
            "latency.rest.get_ms" => rest.get_ms = parse_ms(key, value)?,
            "latency.rest.range_ms" => rest.range_ms = parse_ms(key, value)?,
            "latency.rest.create_ms" => rest.create_ms = parse_ms(key, value)?,
            "latency.rest.update_ms" => rest.update_ms = parse_ms(key, value)?,
            "latency.rest.delete_ms" => rest.delete_ms = parse_ms(key, value)?,
            "latency.graphql.query_ms" => graphql.query_ms = parse_ms(key, value)?,
            "latency.graphql.range_query_ms" => graphql.range_query_ms = parse_ms(key, value)?,
            "latency.graphql.create_ms" => graphql.create_ms = parse_ms(key, value)?,
            "latency.graphql.update_ms" => graphql.update_ms = parse_ms(key, value)?,
            "latency.graphql.delete_ms" => graphql.delete_ms = parse_ms(key, value)?,
            "cache.fetch_policy" => self.cache.fetch_policy = value.parse()?,
            "cache.revalidate_after_commit" => {
                self.cache.revalidate_after_commit = value.trim().parse().map_err(|_| {
                    AlmanacError::config(format!("{key} expects true or false, got {value}"))
                })?;
            }
            "mutation.concurrency" => self.mutation.concurrency = value.parse()?,
            "logging.filter" => self.logging.filter = value.to_string(),
            other => return Err(AlmanacError::config(format!("Unknown config key: {other}"))),
        }
        Ok(())
    }

    /// Check every section; reports the first failure.
    pub fn validate(&self) -> Result<()> {
        let mut validator = ConfigValidator::new();

        let mut rest = validator.for_field("latency").for_field("rest");
        let r = &self.latency.rest;
        for (name, value) in [
            ("list_ms", r.list_ms),
            ("get_ms", r.get_ms),
            ("range_ms", r.range_ms),
            ("create_ms", r.create_ms),
            ("update_ms", r.update_ms),
            ("delete_ms", r.delete_ms),
        ] {
            rest.range(name, value, None, Some(MAX_LATENCY_MS));
        }
        validator.merge(rest);

        let mut graphql = validator.for_field("latency").for_field("graphql");
        let g = &self.latency.graphql;
        for (name, value) in [
            ("query_ms", g.query_ms),
            ("range_query_ms", g.range_query_ms),
            ("create_ms", g.create_ms),
            ("update_ms", g.update_ms),
            ("delete_ms", g.delete_ms),
        ] {
            graphql.range(name, value, None, Some(MAX_LATENCY_MS));
        }
        validator.merge(graphql);

        validator.non_empty("logging.filter", &self.logging.filter);

        validator.result().map_err(AlmanacError::from)
    }

    /// Latency of the REST-shaped boundary
    pub fn rest_latency(&self) -> LatencyProfile {
        LatencyProfile::from(&self.latency.rest)
    }

    /// Latency of the GraphQL-shaped boundary
    pub fn graphql_latency(&self) -> LatencyProfile {
        LatencyProfile::from(&self.latency.graphql)
    }
}

fn env_suffix(key: &str) -> String {
    key.replace('.', "_").to_ascii_uppercase()
}

fn parse_ms(key: &str, value: &str) -> Result<u32> {
    value
        .trim()
        .parse::<u32>()
        .map_err(|_| AlmanacError::config(format!("{key} expects milliseconds, got {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_boundary_latencies() {
        let config = AlmanacConfig::default();
        assert_eq!(config.rest_latency().update, Duration::from_millis(300));
        assert_eq!(config.graphql_latency().update, Duration::from_millis(3000));
        assert_eq!(config.graphql_latency().range, Duration::from_millis(300));
        assert_eq!(config.cache.fetch_policy, FetchPolicy::CacheFirst);
        assert!(config.cache.revalidate_after_commit);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_section_defaults() {
        let config = AlmanacConfig::from_toml_str(
            r#"
            [latency.graphql]
            query_ms = 10

            [cache]
            fetch_policy = "cache-and-network"
            "#,
        )
        .unwrap();

        assert_eq!(config.latency.graphql.query_ms, 10);
        assert_eq!(config.latency.graphql.update_ms, 3000);
        assert_eq!(config.cache.fetch_policy, FetchPolicy::CacheAndNetwork);
        assert!(config.cache.revalidate_after_commit);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AlmanacConfig::default();
        config
            .merge_env(vec![
                ("ALMANAC_LATENCY_REST_UPDATE_MS".to_string(), "0".to_string()),
                ("ALMANAC_MUTATION_CONCURRENCY".to_string(), "latest-submission-wins".to_string()),
                ("ALMANAC_UNKNOWN".to_string(), "x".to_string()),
                ("HOME".to_string(), "/root".to_string()),
            ])
            .unwrap();

        assert_eq!(config.latency.rest.update_ms, 0);
        assert_eq!(config.mutation.concurrency, ConcurrencyPolicy::LatestSubmissionWins);
    }

    #[test]
    fn test_bad_override_value_rejected() {
        let mut config = AlmanacConfig::default();
        let err = config
            .set_from_string("cache.fetch_policy", "sometimes")
            .unwrap_err();
        assert!(err.to_string().contains("Unknown fetch policy"));
    }

    #[test]
    fn test_latency_ceiling_enforced() {
        let mut config = AlmanacConfig::default();
        config.latency.graphql.update_ms = MAX_LATENCY_MS + 1;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("latency.graphql.update_ms"));
    }
}
