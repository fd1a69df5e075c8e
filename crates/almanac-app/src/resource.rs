//! # Async Resources
//!
//! A [`Resource<T>`] is the handle to one asynchronous operation. The
//! operation is spawned exactly once, when the resource is created; every
//! clone and every read shares that single execution.
//!
//! ```text
//!            ┌──────────┐   Ok(value)   ┌───────────┐
//! new() ───► │ Pending  │ ────────────► │ Success   │
//!            └──────────┘               └───────────┘
//!                  │        Err(error)  ┌───────────┐
//!                  └──────────────────► │ Error     │
//!                                       └───────────┘
//! ```
//!
//! Both settled states are terminal. Re-running an operation means creating
//! a new resource.
//!
//! [`Resource::read`] never blocks: it returns the value, the stored error,
//! or [`RenderError::Suspended`] carrying a [`Suspended`] handle the caller
//! uses to be notified of settlement (see [`crate::suspense`]).

use almanac_core::{AlmanacError, Result};
use futures::FutureExt;
use parking_lot::Mutex;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::trace;

use crate::suspense::{RenderError, Suspended};

static NEXT_RESOURCE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique id of a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(u64);

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "resource#{}", self.0)
    }
}

/// Current state of a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceState<T> {
    Pending,
    Success(T),
    Error(AlmanacError),
}

impl<T> ResourceState<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Short name used in logs
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Success(_) => "success",
            Self::Error(_) => "error",
        }
    }
}

type SettleCallback = Box<dyn FnOnce() + Send>;

struct Slot<T> {
    state: ResourceState<T>,
    callbacks: Vec<SettleCallback>,
}

struct ResourceInner<T> {
    id: ResourceId,
    label: String,
    slot: Mutex<Slot<T>>,
    settled: Notify,
}

impl<T> ResourceInner<T> {
    fn settle(&self, outcome: Result<T>) {
        let callbacks = {
            let mut slot = self.slot.lock();
            if !slot.state.is_pending() {
                return;
            }
            slot.state = match outcome {
                Ok(value) => ResourceState::Success(value),
                Err(err) => ResourceState::Error(err),
            };
            trace!(resource = %self.id, label = %self.label, state = slot.state.label(), "resource settled");
            std::mem::take(&mut slot.callbacks)
        };
        self.settled.notify_waiters();
        for callback in callbacks {
            callback();
        }
    }
}

/// Shared handle to one asynchronous operation.
pub struct Resource<T> {
    inner: Arc<ResourceInner<T>>,
}

impl<T> Clone for Resource<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> fmt::Debug for Resource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("id", &self.inner.id)
            .field("label", &self.inner.label)
            .field("state", &self.inner.slot.lock().state.label())
            .finish()
    }
}

impl<T: Clone + Send + Sync + 'static> Resource<T> {
    fn with_state(label: impl Into<String>, state: ResourceState<T>) -> Self {
        Self {
            inner: Arc::new(ResourceInner {
                id: ResourceId(NEXT_RESOURCE_ID.fetch_add(1, Ordering::Relaxed)),
                label: label.into(),
                slot: Mutex::new(Slot {
                    state,
                    callbacks: Vec::new(),
                }),
                settled: Notify::new(),
            }),
        }
    }

    /// Start `operation` now and return its handle.
    ///
    /// Must be called from inside a tokio runtime; outside one the resource
    /// settles immediately with an internal error.
    pub fn new<F>(label: impl Into<String>, operation: F) -> Self
    where
        F: Future<Output = Result<T>> + Send + 'static,
    {
        let resource = Self::with_state(label, ResourceState::Pending);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let inner = resource.inner.clone();
                handle.spawn(async move {
                    let outcome = operation.await;
                    inner.settle(outcome);
                });
            }
            Err(_) => resource
                .inner
                .settle(Err(AlmanacError::internal("no async runtime to run resource"))),
        }
        resource
    }

    /// An already successful resource.
    pub fn ready(label: impl Into<String>, value: T) -> Self {
        Self::with_state(label, ResourceState::Success(value))
    }

    /// An already failed resource.
    pub fn failed(label: impl Into<String>, error: AlmanacError) -> Self {
        Self::with_state(label, ResourceState::Error(error))
    }

    pub fn id(&self) -> ResourceId {
        self.inner.id
    }

    pub fn label(&self) -> &str {
        &self.inner.label
    }

    /// Snapshot of the current state
    pub fn state(&self) -> ResourceState<T> {
        self.inner.slot.lock().state.clone()
    }

    pub fn is_pending(&self) -> bool {
        self.inner.slot.lock().state.is_pending()
    }

    /// Settled outcome, or `None` while pending.
    pub fn peek(&self) -> Option<Result<T>> {
        match &self.inner.slot.lock().state {
            ResourceState::Pending => None,
            ResourceState::Success(value) => Some(Ok(value.clone())),
            ResourceState::Error(err) => Some(Err(err.clone())),
        }
    }

    /// Non-blocking read for render code.
    pub fn read(&self) -> std::result::Result<T, RenderError> {
        match self.peek() {
            Some(Ok(value)) => Ok(value),
            Some(Err(err)) => Err(RenderError::Failed(err)),
            None => Err(RenderError::Suspended(self.suspended())),
        }
    }

    /// Run `callback` once the resource settles; immediately if it already has.
    pub fn on_settle(&self, callback: impl FnOnce() + Send + 'static) {
        {
            let mut slot = self.inner.slot.lock();
            if slot.state.is_pending() {
                slot.callbacks.push(Box::new(callback));
                return;
            }
        }
        callback();
    }

    /// Wait for settlement and return the outcome.
    pub async fn settled(&self) -> Result<T> {
        loop {
            let notified = self.inner.settled.notified();
            if let Some(outcome) = self.peek() {
                return outcome;
            }
            notified.await;
        }
    }

    fn suspended(&self) -> Suspended {
        let waiter = self.clone();
        let registrar = self.clone();
        Suspended::new(
            self.id(),
            self.label().to_string(),
            move || {
                let waiter = waiter.clone();
                async move {
                    let _ = waiter.settled().await;
                }
                .boxed()
            },
            move |callback| registrar.on_settle(callback),
        )
    }
}
