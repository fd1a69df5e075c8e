//! # Almanac App
//!
//! The data-loading and optimistic-update core. No rendering, no routing
//! table: this crate hands resource handles and mutation state to whatever
//! draws them.
//!
//! ```text
//! RouteParams ─► Loader ─► QueryCache ─► ActivityService
//!                  │           ▲   │
//!                  ▼           │   └─► LiveQuery subscribers
//!          Resource handles    │
//!                  │           │ optimistic write / commit / rollback
//!                  ▼           │
//!          SuspenseBoundary    MutationCoordinator ◄─ ActivityForm
//! ```
//!
//! - [`resource`]: single-execution async handles with pending/success/error state
//! - [`suspense`]: cooperative re-render scheduling over pending reads
//! - [`cache`]: normalised entity cache with synchronous subscriptions
//! - [`mutation`]: optimistic updates with commit and rollback
//! - [`loader`]: route parameters to parallel reads
//! - [`action`]: form submission entry points returning structured results

pub mod action;
pub mod app;
pub mod cache;
pub mod form;
pub mod loader;
pub mod mutation;
pub mod queries;
pub mod resource;
pub mod suspense;

pub use action::{create_activity_action, update_activity_action, ActionResult};
pub use app::AlmanacApp;
pub use cache::{
    CacheSubscription, Entity, EntityCache, EntityKey, LiveQuery, QueryCache, QueryData, QueryKey,
};
pub use form::ActivityForm;
pub use loader::{Loader, LoaderData, RouteParams};
pub use mutation::{MutationCoordinator, MutationState, MutationStatus};
pub use resource::{Resource, ResourceId, ResourceState};
pub use suspense::{RenderContext, RenderError, Rendered, SuspenseBoundary, Suspended};
