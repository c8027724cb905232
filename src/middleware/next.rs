//! The continuation handed to each middleware.

use std::fmt;
use std::sync::Arc;

use super::{Middleware, MiddlewareUnit};
use crate::handler::{BoxFuture, BoxedHandler};
use crate::request::Request;

/// What runs once every unit in the chain has been passed.
enum Tail {
    /// A terminal handler, typically the router.
    Handler(BoxedHandler),
    /// The continuation of an enclosing pipeline.
    Outer(Box<Next>),
}

/// Continues processing with the rest of the pipeline.
///
/// `run` consumes the `Next`, so a middleware can continue at most once.
/// Dropping it without calling `run` short-circuits: the middleware's own
/// response goes back up the chain.
///
/// A `Next` owns everything it needs (one `Arc` to the shared chain plus a
/// position), so it can be moved into `'static` futures freely.
pub struct Next {
    chain: Arc<[MiddlewareUnit]>,
    position: usize,
    tail: Tail,
}

impl Next {
    /// Starts a dispatch through `chain` that ends in `handler`.
    pub fn new(chain: Arc<[MiddlewareUnit]>, handler: BoxedHandler) -> Self {
        Self { chain, position: 0, tail: Tail::Handler(handler) }
    }

    /// Starts a dispatch through `chain` that continues with `outer`.
    pub(crate) fn nested(chain: Arc<[MiddlewareUnit]>, outer: Next) -> Self {
        Self { chain, position: 0, tail: Tail::Outer(Box::new(outer)) }
    }

    /// Units left before the tail is reached.
    pub fn remaining(&self) -> usize {
        self.chain.len().saturating_sub(self.position)
    }

    /// Runs the next unit, or the tail when the chain is exhausted.
    pub fn run(self, req: Request) -> BoxFuture<'static> {
        Box::pin(async move {
            let unit = self.chain.get(self.position).cloned();
            match unit {
                Some(unit) => {
                    let next = Next {
                        chain: self.chain,
                        position: self.position + 1,
                        tail: self.tail,
                    };
                    unit.process(req, next).await
                }
                None => match self.tail {
                    Tail::Handler(handler) => handler.handle(req).await,
                    Tail::Outer(outer) => outer.run(req).await,
                },
            }
        })
    }
}

impl fmt::Debug for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("remaining", &self.remaining())
            .finish_non_exhaustive()
    }
}
