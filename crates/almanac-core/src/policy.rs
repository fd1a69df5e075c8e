//! Cache and mutation policies shared by configuration and the app core.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::AlmanacError;

/// How a cache read treats an existing entry.
///
/// An entry that has been invalidated is always refetched, whatever the
/// policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FetchPolicy {
    /// Serve any existing entry; fetch only on a miss.
    #[default]
    CacheFirst,
    /// Serve an existing entry immediately and refresh it in the background.
    CacheAndNetwork,
    /// Always fetch; the result is still normalised into the cache.
    NetworkOnly,
}

impl FetchPolicy {
    /// Wire name of the policy
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CacheFirst => "cache-first",
            Self::CacheAndNetwork => "cache-and-network",
            Self::NetworkOnly => "network-only",
        }
    }
}

impl fmt::Display for FetchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FetchPolicy {
    type Err = AlmanacError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "cache-first" => Ok(Self::CacheFirst),
            "cache-and-network" => Ok(Self::CacheAndNetwork),
            "network-only" => Ok(Self::NetworkOnly),
            other => Err(AlmanacError::config(format!("Unknown fetch policy: {other}"))),
        }
    }
}

/// Which settlement owns the cache when two mutations of one activity race.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConcurrencyPolicy {
    /// Every settlement writes (commit) or restores (rollback); the last one
    /// to settle wins.
    #[default]
    LastSettlementWins,
    /// Settlements of a superseded submission are ignored; only the most
    /// recently submitted mutation of an activity touches the cache.
    LatestSubmissionWins,
}

impl ConcurrencyPolicy {
    /// Wire name of the policy
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LastSettlementWins => "last-settlement-wins",
            Self::LatestSubmissionWins => "latest-submission-wins",
        }
    }
}

impl fmt::Display for ConcurrencyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConcurrencyPolicy {
    type Err = AlmanacError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "last-settlement-wins" => Ok(Self::LastSettlementWins),
            "latest-submission-wins" => Ok(Self::LatestSubmissionWins),
            other => Err(AlmanacError::config(format!(
                "Unknown concurrency policy: {other}"
            ))),
        }
    }
}
