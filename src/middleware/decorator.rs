//! Adapting request handlers to the middleware shape.

use std::fmt;
use std::sync::Arc;

use super::{Middleware, MiddlewareUnit, Next};
use crate::handler::{BoxFuture, RequestHandler};
use crate::request::Request;

/// Middleware that answers with a wrapped [`RequestHandler`] and never
/// continues down the pipeline.
///
/// Two decorators are equal when they wrap the same handler, or handlers
/// that are equal by value through [`RequestHandler::eq_handler`]. The
/// wrapper's own identity never matters.
#[derive(Clone)]
pub struct HandlerMiddleware {
    handler: Arc<dyn RequestHandler>,
}

impl HandlerMiddleware {
    pub fn new(handler: Arc<dyn RequestHandler>) -> Self {
        Self { handler }
    }

    pub fn handler(&self) -> &Arc<dyn RequestHandler> {
        &self.handler
    }
}

/// Wraps a handler-only value so it can sit in a pipeline.
pub fn decorate(handler: Arc<dyn RequestHandler>) -> MiddlewareUnit {
    MiddlewareUnit::Decorated(HandlerMiddleware::new(handler))
}

impl Middleware for HandlerMiddleware {
    fn process<'a>(&'a self, req: Request, _next: Next) -> BoxFuture<'a> {
        self.handler.handle(req)
    }

    fn name(&self) -> &'static str {
        self.handler.name()
    }
}

impl PartialEq for HandlerMiddleware {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.handler, &other.handler) || self.handler.eq_handler(&*other.handler)
    }
}

impl Eq for HandlerMiddleware {}

impl fmt::Debug for HandlerMiddleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerMiddleware")
            .field("handler", &self.handler.name())
            .finish()
    }
}
