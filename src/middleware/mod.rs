//! Middleware layer.
//!
//! Middleware intercepts requests and responses and is the right place for
//! cross-cutting concerns: tracing, request-id injection, authentication
//! header inspection. Each middleware receives the request and a [`Next`]
//! that continues down the pipeline; not calling it short-circuits.
//!
//! Pipelines are not built from middleware values alone. They are built
//! from *references*, usually service ids, that the [`MiddlewareResolver`]
//! turns into a [`MiddlewareUnit`] on first use:
//!
//! ```text
//! "auth"  ──resolve──▶ container.get("auth") ──▶ Service::Middleware ──▶ Native
//! "home"  ──resolve──▶ container.get("home") ──▶ Service::Handler    ──▶ Decorated
//! "Trace" ──resolve──▶ types.construct("Trace")  (not in the container)
//! ```
//!
//! A plain request handler is decorated so it fits the middleware shape; it
//! simply never calls `next`.

mod decorator;
mod next;
mod pipeline;
mod resolver;

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::handler::BoxFuture;
use crate::request::Request;
use crate::response::Response;

pub use decorator::{HandlerMiddleware, decorate};
pub use next::Next;
pub use pipeline::{Pipeline, PipelineEntry, ResolutionPolicy};
pub use resolver::MiddlewareResolver;

/// The middleware capability.
///
/// # Example
///
/// ```rust
/// use sluice::{BoxFuture, Middleware, Next, Request};
///
/// struct Powered;
///
/// impl Middleware for Powered {
///     fn process<'a>(&'a self, req: Request, next: Next) -> BoxFuture<'a> {
///         Box::pin(async move {
///             let mut res = next.run(req).await;
///             res.insert_header("x-powered-by", "sluice");
///             res
///         })
///     }
/// }
/// ```
pub trait Middleware: Send + Sync + 'static {
    fn process<'a>(&'a self, req: Request, next: Next) -> BoxFuture<'a>;

    /// Name used in logs. Defaults to the implementing type's name.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Middleware built from an async closure. See [`from_fn`].
pub struct FnMiddleware<F>(F);

/// Wraps an async closure `|req, next| async move { … }` as middleware.
pub fn from_fn<F, Fut>(f: F) -> FnMiddleware<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    FnMiddleware(f)
}

impl<F, Fut> Middleware for FnMiddleware<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    fn process<'a>(&'a self, req: Request, next: Next) -> BoxFuture<'a> {
        Box::pin((self.0)(req, next))
    }
}

// ── MiddlewareUnit ────────────────────────────────────────────────────────────

/// A resolved pipeline entry. Always usable as middleware.
///
/// Equality is identity of the underlying value: two `Native` units are
/// equal when they share one allocation, two `Decorated` units when they
/// wrap the same handler.
#[derive(Clone)]
pub enum MiddlewareUnit {
    /// A value that was middleware already, passed through untouched.
    Native(Arc<dyn Middleware>),
    /// A handler-only value adapted to the middleware shape.
    Decorated(HandlerMiddleware),
}

impl MiddlewareUnit {
    pub fn new(middleware: impl Middleware) -> Self {
        Self::Native(Arc::new(middleware))
    }

    pub fn as_native(&self) -> Option<&Arc<dyn Middleware>> {
        match self {
            Self::Native(m) => Some(m),
            Self::Decorated(_) => None,
        }
    }

    pub fn is_decorated(&self) -> bool {
        matches!(self, Self::Decorated(_))
    }
}

impl Middleware for MiddlewareUnit {
    fn process<'a>(&'a self, req: Request, next: Next) -> BoxFuture<'a> {
        match self {
            Self::Native(m) => m.process(req, next),
            Self::Decorated(d) => d.process(req, next),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Native(m) => m.name(),
            Self::Decorated(d) => d.name(),
        }
    }
}

impl From<Arc<dyn Middleware>> for MiddlewareUnit {
    fn from(m: Arc<dyn Middleware>) -> Self {
        Self::Native(m)
    }
}

impl PartialEq for MiddlewareUnit {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Native(a), Self::Native(b)) => Arc::ptr_eq(a, b),
            (Self::Decorated(a), Self::Decorated(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for MiddlewareUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native(m) => f.debug_tuple("Native").field(&m.name()).finish(),
            Self::Decorated(d) => f.debug_tuple("Decorated").field(d).finish(),
        }
    }
}
