//! # GraphQL-shaped Boundary
//!
//! An in-process stand-in for a GraphQL backend: typed resolvers over the
//! entity store ([`Resolvers`]), the node and input shapes they exchange
//! ([`schema`]), and a client adapter ([`GraphqlService`]) that exposes the
//! resolvers as an [`ActivityService`](almanac_core::ActivityService).
//!
//! Nodes carry `__typename` and a string id so a normalising cache can key
//! them as `Activity:<id>`.

mod resolvers;
pub mod schema;
mod service;

pub use resolvers::Resolvers;
pub use schema::{ActivityInput, ActivityNode, UpdateActivityInput, ACTIVITY_TYPENAME};
pub use service::GraphqlService;
