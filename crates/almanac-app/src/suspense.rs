//! # Cooperative Suspense
//!
//! Render code reads resources synchronously. A read of a pending resource
//! does not block and does not unwind; it returns
//! [`RenderError::Suspended`], which the render closure propagates with `?`.
//! A [`SuspenseBoundary`] catches the signal, waits for that one resource to
//! settle, and runs the closure again.
//!
//! ```text
//! pass 1: read(list) ─► Suspended(list) ─► wait(list)
//! pass 2: read(list) ─► Ok, read(detail) ─► Suspended(detail) ─► wait(detail)
//! pass 3: read(list) ─► Ok, read(detail) ─► Ok ─► Rendered
//! ```
//!
//! Resources created before the first pass load concurrently, so a render
//! that reads them in sequence pays for the slowest one rather than the sum
//! (fan-out, then fan-in). Resources created inside the closure load one
//! after another (a waterfall). [`Rendered::passes`] makes the difference
//! observable.
//!
//! A failed read is [`RenderError::Failed`]; the boundary stops and returns
//! the error, acting as the nearest error boundary.

use almanac_core::{AlmanacError, Result};
use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::resource::{Resource, ResourceId};

type WaitFn = dyn Fn() -> BoxFuture<'static, ()> + Send + Sync;
type RegisterFn = dyn Fn(Box<dyn FnOnce() + Send>) + Send + Sync;

/// Not-ready signal for one pending resource, with the means to learn when
/// it settles.
#[derive(Clone)]
pub struct Suspended {
    resource: ResourceId,
    label: String,
    wait: Arc<WaitFn>,
    register: Arc<RegisterFn>,
}

impl Suspended {
    pub(crate) fn new(
        resource: ResourceId,
        label: String,
        wait: impl Fn() -> BoxFuture<'static, ()> + Send + Sync + 'static,
        register: impl Fn(Box<dyn FnOnce() + Send>) + Send + Sync + 'static,
    ) -> Self {
        Self {
            resource,
            label,
            wait: Arc::new(wait),
            register: Arc::new(register),
        }
    }

    /// The resource that is not ready
    pub fn resource(&self) -> ResourceId {
        self.resource
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Completes once the resource has settled, successfully or not.
    pub fn wait(&self) -> BoxFuture<'static, ()> {
        (self.wait)()
    }

    /// Register a callback for settlement, for schedulers that re-invoke
    /// renders themselves instead of awaiting.
    pub fn on_settle(&self, callback: impl FnOnce() + Send + 'static) {
        (self.register)(Box::new(callback));
    }
}

impl fmt::Debug for Suspended {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Suspended")
            .field("resource", &self.resource)
            .field("label", &self.label)
            .finish()
    }
}

/// Why a render pass did not produce a value.
#[derive(Debug, Clone)]
pub enum RenderError {
    /// A resource is still pending; retry after it settles
    Suspended(Suspended),
    /// A resource (or the render itself) failed
    Failed(AlmanacError),
}

impl From<AlmanacError> for RenderError {
    fn from(err: AlmanacError) -> Self {
        Self::Failed(err)
    }
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Suspended(s) => write!(f, "suspended on {} ({})", s.resource, s.label),
            Self::Failed(err) => write!(f, "{err}"),
        }
    }
}

/// Per-pass context handed to a render closure.
#[derive(Debug, Default)]
pub struct RenderContext {
    pass: usize,
}

impl RenderContext {
    /// 1-based number of the current pass
    pub fn pass(&self) -> usize {
        self.pass
    }

    /// Read a resource, suspending the pass if it is pending.
    pub fn read<T: Clone + Send + Sync + 'static>(
        &mut self,
        resource: &Resource<T>,
    ) -> std::result::Result<T, RenderError> {
        resource.read()
    }
}

/// Output of a completed render.
#[derive(Debug, Clone)]
pub struct Rendered<V> {
    pub value: V,
    /// Passes run, including the successful one
    pub passes: usize,
    /// Resources waited on, in order
    pub suspensions: Vec<ResourceId>,
}

/// Re-runs a render closure until it completes or fails.
#[derive(Debug, Clone)]
pub struct SuspenseBoundary {
    max_passes: usize,
}

impl Default for SuspenseBoundary {
    fn default() -> Self {
        Self { max_passes: 64 }
    }
}

impl SuspenseBoundary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upper bound on passes before the render is abandoned.
    #[must_use]
    pub fn with_max_passes(mut self, max_passes: usize) -> Self {
        self.max_passes = max_passes.max(1);
        self
    }

    /// Drive `render` to completion.
    pub async fn render<V, F>(&self, mut render: F) -> Result<Rendered<V>>
    where
        F: FnMut(&mut RenderContext) -> std::result::Result<V, RenderError>,
    {
        let mut suspensions = Vec::new();
        for pass in 1..=self.max_passes {
            let mut ctx = RenderContext { pass };
            match render(&mut ctx) {
                Ok(value) => {
                    return Ok(Rendered {
                        value,
                        passes: pass,
                        suspensions,
                    })
                }
                Err(RenderError::Failed(err)) => {
                    debug!(pass, error = %err, "render failed");
                    return Err(err);
                }
                Err(RenderError::Suspended(suspended)) => {
                    debug!(pass, resource = %suspended.resource(), label = suspended.label(), "render suspended");
                    suspensions.push(suspended.resource());
                    suspended.wait().await;
                }
            }
        }
        Err(AlmanacError::internal(format!(
            "render did not complete within {} passes",
            self.max_passes
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn delayed(label: &str, ms: u64, value: u32) -> Resource<u32> {
        Resource::new(label, async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            Ok(value)
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_fan_out_then_fan_in() {
        let a = delayed("a", 200, 1);
        let b = delayed("b", 300, 2);
        let started = tokio::time::Instant::now();

        let rendered = SuspenseBoundary::new()
            .render(|ctx| Ok(ctx.read(&a)? + ctx.read(&b)?))
            .await
            .unwrap();

        assert_eq!(rendered.value, 3);
        assert_eq!(rendered.passes, 3);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(300));
        assert!(elapsed < Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_stops_at_boundary() {
        let ok = delayed("ok", 10, 1);
        let bad = Resource::<u32>::failed("bad", AlmanacError::operation_failed("offline"));

        let err = SuspenseBoundary::new()
            .render(|ctx| Ok(ctx.read(&ok)? + ctx.read(&bad)?))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Operation failed: offline");
    }

    #[tokio::test(start_paused = true)]
    async fn test_pass_limit() {
        let err = SuspenseBoundary::new()
            .with_max_passes(3)
            .render(|ctx| {
                let fresh = delayed("waterfall", 1, 0);
                ctx.read(&fresh)
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("3 passes"));
    }
}
