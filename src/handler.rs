//! Request handlers and type erasure.
//!
//! # Two ways to write a handler
//!
//! A terminal handler receives a request and returns a response. It never
//! sees the rest of the pipeline. sluice accepts handlers in two forms:
//!
//! - an `async fn(Request) -> impl IntoResponse`, accepted anywhere a
//!   [`Handler`] is expected and boxed for you;
//! - a type implementing [`RequestHandler`] directly, which is what the
//!   container stores and what the middleware resolver detects.
//!
//! The chain from user code to vtable call is:
//!
//! ```text
//! async fn hello(req: Request) -> Response { … }   ← user writes this
//!        ↓ router.on(Method::Get, "/", hello)
//! hello.into_boxed_handler()                       ← Handler blanket impl
//!        ↓
//! Arc::new(FnHandler(hello))                       ← heap-allocated wrapper
//!        ↓  stored as BoxedHandler = Arc<dyn RequestHandler>
//! handler.handle(req)  at request time             ← one vtable dispatch
//! ```

use std::any::Any;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::request::Request;
use crate::response::{IntoResponse, Response};

// ── Shared types ──────────────────────────────────────────────────────────────

/// A heap-allocated, type-erased future.
///
/// `Pin<Box<…>>` is required because the runtime polls the future in place.
/// `Send` lets tokio move it across worker threads.
pub type BoxFuture<'a, T = Response> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A type-erased request handler shared across concurrent requests.
pub type BoxedHandler = Arc<dyn RequestHandler>;

// ── RequestHandler capability ────────────────────────────────────────────────

/// The terminal-handler capability: a request goes in, a response comes out.
///
/// Implement this on types that need state or that must be registered in a
/// [`Container`](crate::Container). A type implementing both this trait and
/// [`Middleware`](crate::Middleware) is used as middleware as-is.
///
/// # Value equality
///
/// Handlers are compared by identity unless they opt in to value equality
/// by overriding [`as_any`](RequestHandler::as_any) and
/// [`eq_handler`](RequestHandler::eq_handler). Decorations of equal handlers
/// then compare equal even when each was built separately:
///
/// ```rust
/// use std::any::Any;
/// use sluice::{BoxFuture, Request, RequestHandler, Response};
///
/// #[derive(PartialEq)]
/// struct Greeting(&'static str);
///
/// impl RequestHandler for Greeting {
///     fn handle<'a>(&'a self, _req: Request) -> BoxFuture<'a> {
///         Box::pin(async move { Response::text(self.0) })
///     }
///
///     fn as_any(&self) -> Option<&dyn Any> {
///         Some(self)
///     }
///
///     fn eq_handler(&self, other: &dyn RequestHandler) -> bool {
///         other.as_any().and_then(|o| o.downcast_ref::<Self>()) == Some(self)
///     }
/// }
/// ```
pub trait RequestHandler: Send + Sync + 'static {
    fn handle<'a>(&'a self, req: Request) -> BoxFuture<'a>;

    /// Name used in logs. Defaults to the implementing type's name.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// The concrete value, for handlers that support value equality.
    fn as_any(&self) -> Option<&dyn Any> {
        None
    }

    /// Whether `other` is equal to `self` by value. Never equal by default.
    fn eq_handler(&self, _other: &dyn RequestHandler) -> bool {
        false
    }
}

// ── Handler conversion trait ─────────────────────────────────────────────────

/// Implemented for every async function usable as a route handler.
///
/// You never implement this yourself. It is satisfied for any function or
/// closure with the signature:
///
/// ```text
/// async fn name(req: Request) -> impl IntoResponse
/// ```
///
/// The trait is **sealed**: only the blanket impl below can satisfy it.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

/// Bridges a plain async function to the [`RequestHandler`] trait object.
struct FnHandler<F>(F);

impl<F, Fut, R> RequestHandler for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn handle<'a>(&'a self, req: Request) -> BoxFuture<'a> {
        let fut = (self.0)(req);
        Box::pin(async move { fut.await.into_response() })
    }
}

/// Answers every request with `404 Not Found`.
///
/// The terminal stage of a [`Pipeline`](crate::Pipeline) used as a handler.
#[derive(Debug, Default, Clone, Copy)]
pub struct NotFound;

impl RequestHandler for NotFound {
    fn handle<'a>(&'a self, _req: Request) -> BoxFuture<'a> {
        Box::pin(async { Response::status(crate::Status::NotFound) })
    }
}
