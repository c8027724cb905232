//! Ordered middleware pipelines.
//!
//! A [`Pipeline`] records entries in the order they are piped and resolves
//! identifiers only when first needed. The resolved sequence is built in one
//! go and shared by every request afterwards: a failed resolution leaves
//! nothing behind, so the next attempt starts clean.

use std::fmt;
use std::sync::{Arc, OnceLock};

use tracing::{debug, error};

use super::{Middleware, MiddlewareResolver, MiddlewareUnit, Next};
use crate::error::ResolutionError;
use crate::handler::{BoxFuture, BoxedHandler, NotFound, RequestHandler};
use crate::request::Request;
use crate::response::Response;
use crate::status::Status;

/// One piped reference: an identifier to resolve, or a ready unit.
#[derive(Clone, Debug)]
pub enum PipelineEntry {
    Identifier(String),
    Unit(MiddlewareUnit),
}

impl From<&str> for PipelineEntry {
    fn from(id: &str) -> Self {
        Self::Identifier(id.to_owned())
    }
}

impl From<String> for PipelineEntry {
    fn from(id: String) -> Self {
        Self::Identifier(id)
    }
}

impl From<MiddlewareUnit> for PipelineEntry {
    fn from(unit: MiddlewareUnit) -> Self {
        Self::Unit(unit)
    }
}

/// When identifiers are resolved.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ResolutionPolicy {
    /// On the first request (or first explicit [`Pipeline::resolve`]).
    #[default]
    Lazy,
    /// At startup, through [`Pipeline::warm`]. A bad identifier aborts startup.
    Eager,
}

/// An ordered middleware pipeline.
///
/// Entries run in insertion order. Duplicates are kept. A pipeline is both
/// [`Middleware`] (it continues with the enclosing `Next` once its own units
/// are done) and a [`RequestHandler`] (it answers `404` once they are done),
/// so whole pipelines can be registered in a container with
/// [`Service::both`](crate::Service::both) and piped by id.
pub struct Pipeline {
    entries: Vec<PipelineEntry>,
    resolver: MiddlewareResolver,
    policy: ResolutionPolicy,
    resolved: OnceLock<Arc<[MiddlewareUnit]>>,
}

impl Pipeline {
    pub fn new(resolver: MiddlewareResolver) -> Self {
        Self {
            entries: Vec::new(),
            resolver,
            policy: ResolutionPolicy::default(),
            resolved: OnceLock::new(),
        }
    }

    pub fn with_policy(mut self, policy: ResolutionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Appends an entry. Returns `self` for chaining.
    pub fn pipe(mut self, entry: impl Into<PipelineEntry>) -> Self {
        self.push(entry.into());
        self
    }

    pub(crate) fn push(&mut self, entry: PipelineEntry) {
        self.entries.push(entry);
        self.resolved = OnceLock::new();
    }

    pub fn policy(&self) -> ResolutionPolicy {
        self.policy
    }

    pub fn entries(&self) -> impl Iterator<Item = &PipelineEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether the resolved sequence has been built.
    pub fn is_resolved(&self) -> bool {
        self.resolved.get().is_some()
    }

    /// Resolves every entry, in order, and returns the shared sequence.
    ///
    /// The first successful call memoizes the result. Concurrent first calls
    /// may both resolve; one result is kept.
    pub fn resolve(&self) -> Result<Arc<[MiddlewareUnit]>, ResolutionError> {
        if let Some(units) = self.resolved.get() {
            return Ok(Arc::clone(units));
        }

        let units = self.entries.iter()
            .map(|entry| match entry {
                PipelineEntry::Identifier(id) => self.resolver.resolve(id),
                PipelineEntry::Unit(unit) => Ok(unit.clone()),
            })
            .collect::<Result<Vec<_>, _>>()?;
        debug!(units = units.len(), "resolved middleware pipeline");

        Ok(Arc::clone(self.resolved.get_or_init(|| units.into())))
    }

    /// Resolves now if the policy is [`ResolutionPolicy::Eager`].
    pub fn warm(&self) -> Result<(), ResolutionError> {
        match self.policy {
            ResolutionPolicy::Eager => self.resolve().map(drop),
            ResolutionPolicy::Lazy => Ok(()),
        }
    }

    /// Runs `req` through the pipeline, then into `handler`.
    ///
    /// A pipeline that fails to resolve answers `500` and logs why.
    pub fn handle_with(&self, req: Request, handler: BoxedHandler) -> BoxFuture<'_> {
        self.dispatch(req, |units| Next::new(units, handler))
    }

    fn dispatch(
        &self,
        req: Request,
        start: impl FnOnce(Arc<[MiddlewareUnit]>) -> Next,
    ) -> BoxFuture<'_> {
        match self.resolve() {
            Ok(units) => start(units).run(req),
            Err(e) => {
                error!(error = %e, id = e.id(), "middleware pipeline failed to resolve");
                Box::pin(async { Response::status(Status::InternalServerError) })
            }
        }
    }
}

impl Middleware for Pipeline {
    fn process<'a>(&'a self, req: Request, next: Next) -> BoxFuture<'a> {
        self.dispatch(req, |units| Next::nested(units, next))
    }
}

impl RequestHandler for Pipeline {
    fn handle<'a>(&'a self, req: Request) -> BoxFuture<'a> {
        self.handle_with(req, Arc::new(NotFound))
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("entries", &self.entries)
            .field("policy", &self.policy)
            .field("resolved", &self.is_resolved())
            .finish()
    }
}
