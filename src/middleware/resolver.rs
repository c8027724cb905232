//! Turning middleware identifiers into middleware.
//!
//! # Resolution order
//!
//! 1. Ask the container whether it has the id.
//! 2. If it does not and no type is registered under the id either, fail
//!    with [`ResolutionError::MissingDependency`].
//! 3. Take the candidate from the container, or build a fresh one from the
//!    registered type. A failure in either is wrapped as `MissingDependency`.
//! 4. Branch on the candidate's [`Capability`](crate::Capability):
//!
//! | Capability       | Result                                  |
//! |------------------|-----------------------------------------|
//! | `MiddlewareOnly` | the candidate itself                    |
//! | `Both`           | the candidate itself, never re-wrapped  |
//! | `HandlerOnly`    | [`decorate`]`(candidate)`               |
//! | `Neither`        | [`ResolutionError::InvalidMiddleware`]  |
//!
//! The resolver keeps no state of its own. Whether resolving the same id
//! twice yields the same instance is up to the container.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use super::{MiddlewareUnit, decorate};
use crate::container::{Container, Service};
use crate::error::ResolutionError;
use crate::registry::TypeRegistry;

/// Resolves middleware identifiers against a container, falling back to
/// registered types.
///
/// Cloning is cheap: both collaborators are behind `Arc`.
#[derive(Clone)]
pub struct MiddlewareResolver {
    container: Arc<dyn Container>,
    types: Arc<TypeRegistry>,
}

impl MiddlewareResolver {
    pub fn new(container: Arc<dyn Container>, types: Arc<TypeRegistry>) -> Self {
        Self { container, types }
    }

    /// Whether `id` could be looked up: it is in the container or names a
    /// registered type. Constructs nothing and never inspects capabilities.
    pub fn has(&self, id: &str) -> bool {
        self.container.has(id) || self.types.contains(id)
    }

    /// Resolves `id` into a unit that is guaranteed to be middleware.
    pub fn resolve(&self, id: &str) -> Result<MiddlewareUnit, ResolutionError> {
        let candidate = self.candidate(id)?;
        let capability = candidate.capability();
        debug!(id, ?capability, "resolved middleware candidate");

        match candidate {
            Service::Middleware(middleware) => Ok(MiddlewareUnit::Native(middleware)),
            Service::Both(dual) => Ok(MiddlewareUnit::Native(Arc::clone(dual.middleware()))),
            Service::Handler(handler) => Ok(decorate(handler)),
            Service::Other(_) => Err(ResolutionError::invalid(id)),
        }
    }

    fn candidate(&self, id: &str) -> Result<Service, ResolutionError> {
        if self.container.has(id) {
            return self.container
                .get(id)
                .map_err(|e| ResolutionError::lookup_failed(id, e));
        }

        match self.types.construct(id) {
            Some(Ok(service)) => {
                debug!(id, "constructed middleware from registered type");
                Ok(service)
            }
            Some(Err(e)) => Err(ResolutionError::construction_failed(id, e)),
            None => Err(ResolutionError::not_found(id)),
        }
    }
}

impl fmt::Debug for MiddlewareResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareResolver")
            .field("types", &self.types)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::container::InMemoryContainer;
    use crate::handler::{BoxFuture, Handler, RequestHandler};
    use crate::middleware::{Middleware, Next, Pipeline};
    use crate::request::Request;
    use crate::response::Response;

    #[derive(Default)]
    struct Passthrough;

    impl Middleware for Passthrough {
        fn process<'a>(&'a self, req: Request, next: Next) -> BoxFuture<'a> {
            next.run(req)
        }
    }

    #[derive(Default)]
    struct Greeter;

    impl RequestHandler for Greeter {
        fn handle<'a>(&'a self, _req: Request) -> BoxFuture<'a> {
            Box::pin(async { Response::text("hi") })
        }
    }

    /// Implements both capabilities, like a nested pipeline or an adapter.
    struct Adapter;

    impl Middleware for Adapter {
        fn process<'a>(&'a self, req: Request, next: Next) -> BoxFuture<'a> {
            next.run(req)
        }
    }

    impl RequestHandler for Adapter {
        fn handle<'a>(&'a self, _req: Request) -> BoxFuture<'a> {
            Box::pin(async { Response::text("adapter") })
        }
    }

    struct NotMiddleware;

    fn resolver(container: InMemoryContainer, types: TypeRegistry) -> MiddlewareResolver {
        MiddlewareResolver::new(Arc::new(container), Arc::new(types))
    }

    #[test]
    fn has_is_true_for_container_entries() {
        let mut container = InMemoryContainer::new();
        container.set("foo", Service::other(NotMiddleware));
        assert!(resolver(container, TypeRegistry::new()).has("foo"));
    }

    #[test]
    fn has_is_true_for_registered_types_without_constructing() {
        let built = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&built);
        let mut types = TypeRegistry::new();
        types.register("Passthrough", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Service::middleware(Arc::new(Passthrough)))
        });

        assert!(resolver(InMemoryContainer::new(), types).has("Passthrough"));
        assert_eq!(built.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unknown_id_is_a_missing_dependency() {
        let r = resolver(InMemoryContainer::new(), TypeRegistry::new());

        assert!(!r.has("not-a-class"));
        let err = r.resolve("not-a-class").unwrap_err();
        assert!(matches!(err, ResolutionError::MissingDependency { ref id, .. } if id == "not-a-class"));
        assert!(err.to_string().contains("not-a-class"));
        assert!(err.to_string().contains("no container entry and no registered type"));
    }

    #[test]
    fn container_value_without_capabilities_is_invalid() {
        let mut container = InMemoryContainer::new();
        container.set("plain", Service::other(NotMiddleware));

        let err = resolver(container, TypeRegistry::new()).resolve("plain").unwrap_err();
        assert!(matches!(err, ResolutionError::InvalidMiddleware { ref id } if id == "plain"));
        assert_eq!(err.to_string(), "middleware `plain` implements neither Middleware nor RequestHandler");
    }

    #[test]
    fn registered_type_without_capabilities_is_invalid() {
        let mut types = TypeRegistry::new();
        types.register("NotMiddleware", || Ok(Service::other(NotMiddleware)));

        let err = resolver(InMemoryContainer::new(), types).resolve("NotMiddleware").unwrap_err();
        assert!(matches!(err, ResolutionError::InvalidMiddleware { .. }));
    }

    #[test]
    fn container_middleware_is_returned_unchanged() {
        let middleware: Arc<dyn Middleware> = Arc::new(Passthrough);
        let mut container = InMemoryContainer::new();
        container.set("middleware-service", Service::middleware(Arc::clone(&middleware)));

        let unit = resolver(container, TypeRegistry::new()).resolve("middleware-service").unwrap();
        assert!(unit.as_native().is_some_and(|m| Arc::ptr_eq(m, &middleware)));
    }

    #[test]
    fn registered_type_is_constructed_fresh() {
        let mut types = TypeRegistry::new();
        types.register_middleware::<Passthrough>("Passthrough");
        let r = resolver(InMemoryContainer::new(), types);

        let first = r.resolve("Passthrough").unwrap();
        let second = r.resolve("Passthrough").unwrap();
        assert_eq!(first.name(), std::any::type_name::<Passthrough>());
        assert!(!first.is_decorated());
        assert_ne!(first, second);
    }

    #[test]
    fn handler_only_value_is_decorated() {
        let handler: Arc<dyn RequestHandler> = Arc::new(Greeter);
        let mut container = InMemoryContainer::new();
        container.set("AHandlerNotMiddleware", Service::handler(Arc::clone(&handler)));

        let unit = resolver(container, TypeRegistry::new()).resolve("AHandlerNotMiddleware").unwrap();
        assert_eq!(unit, decorate(handler));
        assert!(unit.as_native().is_none());
    }

    #[test]
    fn registered_handler_type_is_decorated() {
        let mut types = TypeRegistry::new();
        types.register_handler::<Greeter>("Greeter");

        let unit = resolver(InMemoryContainer::new(), types).resolve("Greeter").unwrap();
        assert!(unit.is_decorated());
    }

    #[test]
    fn value_with_both_capabilities_is_never_decorated() {
        let adapter = Arc::new(Adapter);
        let mut container = InMemoryContainer::new();
        container.set("pipeline", Service::both(Arc::clone(&adapter)));

        let unit = resolver(container, TypeRegistry::new()).resolve("pipeline").unwrap();
        let expected: Arc<dyn Middleware> = adapter;
        assert!(!unit.is_decorated());
        assert!(unit.as_native().is_some_and(|m| Arc::ptr_eq(m, &expected)));
    }

    #[test]
    fn nested_pipeline_resolves_to_itself() {
        let inner = Arc::new(Pipeline::new(resolver(InMemoryContainer::new(), TypeRegistry::new())));
        let mut container = InMemoryContainer::new();
        container.set("api", Service::both(Arc::clone(&inner)));

        let unit = resolver(container, TypeRegistry::new()).resolve("api").unwrap();
        let expected: Arc<dyn Middleware> = inner;
        assert_eq!(unit, MiddlewareUnit::Native(expected));
    }

    #[test]
    fn container_wins_over_registered_type() {
        let handler = hello_handler();
        let mut container = InMemoryContainer::new();
        container.set("Passthrough", Service::handler(Arc::clone(&handler)));
        let mut types = TypeRegistry::new();
        types.register_middleware::<Passthrough>("Passthrough");

        let unit = resolver(container, types).resolve("Passthrough").unwrap();
        assert_eq!(unit, decorate(handler));
    }

    #[test]
    fn container_failure_is_wrapped_as_missing_dependency() {
        let mut container = InMemoryContainer::new();
        container.set_factory("db-backed", || Err("connection refused".into()));

        let err = resolver(container, TypeRegistry::new()).resolve("db-backed").unwrap_err();
        assert!(matches!(err, ResolutionError::MissingDependency { .. }));
        let source = std::error::Error::source(&err).map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("factory for `db-backed` failed"));
    }

    #[test]
    fn constructor_failure_is_wrapped_as_missing_dependency() {
        let mut types = TypeRegistry::new();
        types.register("Flaky", || Err("needs arguments".into()));

        let err = resolver(InMemoryContainer::new(), types).resolve("Flaky").unwrap_err();
        assert_eq!(err.id(), "Flaky");
        let source = std::error::Error::source(&err).map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("needs arguments"));
    }

    fn hello_handler() -> Arc<dyn RequestHandler> {
        async fn hello(_req: Request) -> Response {
            Response::text("hello")
        }
        hello.into_boxed_handler()
    }
}
