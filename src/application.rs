//! The application: middleware pipeline, router, emitter stack.
//!
//! ```text
//! request ─▶ pipeline unit 1 ─▶ … ─▶ pipeline unit n ─▶ router ─▶ handler
//!                                                                    │
//! emitter stack ◀──────────────── response ◀─────────────────────────┘
//! ```

use std::fmt;
use std::sync::Arc;

use crate::container::{Container, InMemoryContainer};
use crate::emitter::{Emitter, EmitterStack, Http1Emitter, Output};
use crate::error::Error;
use crate::handler::BoxedHandler;
use crate::middleware::{MiddlewareResolver, Pipeline, PipelineEntry, ResolutionPolicy};
use crate::registry::TypeRegistry;
use crate::request::Request;
use crate::response::Response;
use crate::router::Router;

/// A runnable application.
///
/// Pipe middleware references at startup, then serve with
/// [`Server::serve`](crate::Server::serve) or drive it directly with
/// [`handle`](Application::handle) / [`run`](Application::run).
pub struct Application {
    pipeline: Pipeline,
    router: Arc<Router>,
    emitter: EmitterStack,
}

impl Application {
    pub fn new(resolver: MiddlewareResolver, router: Router, emitter: EmitterStack) -> Self {
        Self {
            pipeline: Pipeline::new(resolver),
            router: Arc::new(router),
            emitter,
        }
    }

    /// Appends a middleware reference to the pipeline. Returns `self` for
    /// chaining.
    pub fn pipe(mut self, entry: impl Into<PipelineEntry>) -> Self {
        self.pipeline.push(entry.into());
        self
    }

    pub fn with_policy(mut self, policy: ResolutionPolicy) -> Self {
        self.pipeline = self.pipeline.with_policy(policy);
        self
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Startup hook: resolves the pipeline now under the eager policy.
    pub fn prepare(&self) -> Result<(), Error> {
        self.pipeline.warm()?;
        Ok(())
    }

    /// Runs `req` through the pipeline and the router.
    pub async fn handle(&self, req: Request) -> Response {
        let router: BoxedHandler = Arc::clone(&self.router) as BoxedHandler;
        self.pipeline.handle_with(req, router).await
    }

    /// Handles `req` and emits the response to `out` through the emitter stack.
    pub async fn run(&self, req: Request, out: &mut Output<'_>) -> Result<(), Error> {
        let response = self.handle(req).await;
        if self.emitter.emit(&response, out).await? {
            Ok(())
        } else {
            Err(Error::NotEmitted)
        }
    }
}

impl fmt::Debug for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Application")
            .field("pipeline", &self.pipeline)
            .field("emitter", &self.emitter)
            .finish_non_exhaustive()
    }
}

/// Builds an [`Application`] with defaults for whatever is not supplied.
///
/// Defaults: an empty [`InMemoryContainer`], an empty [`Router`], an empty
/// [`TypeRegistry`], and an [`EmitterStack`] with [`Http1Emitter`] at the
/// bottom.
pub struct AppFactory;

impl AppFactory {
    pub fn create(container: Option<Arc<dyn Container>>, router: Option<Router>) -> Application {
        Self::with_types(container, router, TypeRegistry::new())
    }

    /// Like [`create`](AppFactory::create), with types the resolver may
    /// construct by name.
    pub fn with_types(
        container: Option<Arc<dyn Container>>,
        router: Option<Router>,
        types: TypeRegistry,
    ) -> Application {
        let container = container.unwrap_or_else(|| Arc::new(InMemoryContainer::new()) as Arc<dyn Container>);
        let router = router.unwrap_or_default();
        let mut emitter = EmitterStack::new();
        emitter.push(Http1Emitter);

        Application::new(MiddlewareResolver::new(container, Arc::new(types)), router, emitter)
    }
}
