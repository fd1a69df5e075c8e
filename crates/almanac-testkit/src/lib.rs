//! Almanac Testing Infrastructure
//!
//! Fixtures and service decorators shared by the integration tests of every
//! Almanac crate.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! almanac-testkit = { path = "../almanac-testkit" }
//! ```
//!
//! ```rust,ignore
//! use almanac_testkit::*;
//!
//! #[tokio::test]
//! async fn my_test() {
//!     let (store, service) = seeded_rest();
//!     let faulty = FaultyService::new(service);
//!     faulty.fail(ServiceOperation::Update, AlmanacError::operation_failed("offline"));
//!     // ... test logic
//! }
//! ```

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(missing_docs)]

pub mod fixtures;
pub mod mocks;
pub mod strategies;

pub use fixtures::*;
pub use mocks::*;

pub use almanac_core::{AlmanacError, ServiceOperation};
