//! # Almanac Core
//!
//! Foundation types shared by every Almanac crate:
//!
//! - [`Activity`] and its create/update payloads
//! - [`AlmanacError`]: the single error type used across layers
//! - [`ActivityService`]: the asynchronous service boundary
//! - [`AlmanacConfig`]: layered configuration
//! - [`Dynamic`]: a reactive value cell for UI-facing state
//!
//! This crate performs no I/O and does not depend on an async runtime.

pub mod activity;
pub mod config;
pub mod errors;
pub mod policy;
pub mod reactive;
pub mod service;
pub mod time;

pub use activity::{Activity, ActivityCategory, ActivityId, ActivityPatch, NewActivity};
pub use config::{AlmanacConfig, LatencyProfile};
pub use errors::{AlmanacError, ErrorCategory, Result};
pub use policy::{ConcurrencyPolicy, FetchPolicy};
pub use reactive::{Dynamic, Subscription};
pub use service::{ActivityService, ServiceOperation};
pub use time::DateRange;
