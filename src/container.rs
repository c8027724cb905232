//! Service container: the lookup service middleware is resolved from.
//!
//! sluice does not care how services are stored or created, only that the
//! container can answer `has` and `get`. [`InMemoryContainer`] is the default
//! used by [`AppFactory`](crate::AppFactory); plug in your own by implementing
//! [`Container`].
//!
//! Values come out of a container as a [`Service`], which records which of
//! the two request-processing capabilities the value has. The middleware
//! resolver branches on that, never on the concrete type.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::BoxError;
use crate::handler::RequestHandler;
use crate::middleware::Middleware;

// ── Service ───────────────────────────────────────────────────────────────────

/// A value held by a container, tagged with its capabilities.
#[derive(Clone)]
pub enum Service {
    /// Middleware only.
    Middleware(Arc<dyn Middleware>),
    /// Terminal handler only.
    Handler(Arc<dyn RequestHandler>),
    /// One value seen through both capabilities, e.g. a nested pipeline.
    Both(Dual),
    /// Anything else a container may hold.
    Other(Arc<dyn Any + Send + Sync>),
}

/// The capability set of a [`Service`], computed once per candidate.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Capability {
    MiddlewareOnly,
    HandlerOnly,
    Both,
    Neither,
}

/// A single value viewed as both [`Middleware`] and [`RequestHandler`].
///
/// Only [`Service::both`] builds one, so both views always share one
/// allocation.
#[derive(Clone)]
pub struct Dual {
    middleware: Arc<dyn Middleware>,
    handler: Arc<dyn RequestHandler>,
}

impl Dual {
    pub fn middleware(&self) -> &Arc<dyn Middleware> {
        &self.middleware
    }

    pub fn handler(&self) -> &Arc<dyn RequestHandler> {
        &self.handler
    }
}

impl Service {
    pub fn middleware(middleware: Arc<dyn Middleware>) -> Self {
        Self::Middleware(middleware)
    }

    pub fn handler(handler: Arc<dyn RequestHandler>) -> Self {
        Self::Handler(handler)
    }

    /// Registers one value under both capabilities.
    pub fn both<T>(value: Arc<T>) -> Self
    where
        T: Middleware + RequestHandler,
    {
        Self::Both(Dual {
            middleware: Arc::clone(&value) as Arc<dyn Middleware>,
            handler: value,
        })
    }

    pub fn other<T: Any + Send + Sync>(value: T) -> Self {
        Self::Other(Arc::new(value))
    }

    pub fn capability(&self) -> Capability {
        match self {
            Self::Middleware(_) => Capability::MiddlewareOnly,
            Self::Handler(_) => Capability::HandlerOnly,
            Self::Both(_) => Capability::Both,
            Self::Other(_) => Capability::Neither,
        }
    }
}

impl fmt::Debug for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Middleware(m) => f.debug_tuple("Middleware").field(&m.name()).finish(),
            Self::Handler(h) => f.debug_tuple("Handler").field(&h.name()).finish(),
            Self::Both(dual) => f.debug_tuple("Both").field(&dual.middleware.name()).finish(),
            Self::Other(_) => f.write_str("Other(..)"),
        }
    }
}

// ── Container ─────────────────────────────────────────────────────────────────

/// Failure reported by a container's `get`.
#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    #[error("no service registered as `{0}`")]
    NotFound(String),

    #[error("factory for `{id}` failed")]
    Factory {
        id: String,
        #[source]
        source: BoxError,
    },
}

/// The lookup service consulted before falling back to registered types.
///
/// Implementations are shared across concurrent requests and must provide
/// their own synchronisation. Callers only read through `&self`.
pub trait Container: Send + Sync + 'static {
    fn has(&self, id: &str) -> bool;
    fn get(&self, id: &str) -> Result<Service, ContainerError>;
}

type Factory = Arc<dyn Fn() -> Result<Service, BoxError> + Send + Sync>;

#[derive(Clone)]
enum Entry {
    Instance(Service),
    Factory(Factory),
}

/// A `HashMap`-backed [`Container`], filled at startup and read-only after.
///
/// Instances are shared: every `get` hands out a clone of the same `Arc`.
/// Factories run on every `get`, producing a fresh value each time.
#[derive(Clone, Default)]
pub struct InMemoryContainer {
    entries: HashMap<String, Entry>,
}

impl InMemoryContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a shared instance, replacing any previous entry for `id`.
    pub fn set(&mut self, id: impl Into<String>, service: Service) -> &mut Self {
        self.entries.insert(id.into(), Entry::Instance(service));
        self
    }

    /// Registers a factory, replacing any previous entry for `id`.
    pub fn set_factory<F>(&mut self, id: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> Result<Service, BoxError> + Send + Sync + 'static,
    {
        self.entries.insert(id.into(), Entry::Factory(Arc::new(factory)));
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Container for InMemoryContainer {
    fn has(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    fn get(&self, id: &str) -> Result<Service, ContainerError> {
        match self.entries.get(id) {
            Some(Entry::Instance(service)) => Ok(service.clone()),
            Some(Entry::Factory(factory)) => factory().map_err(|source| ContainerError::Factory {
                id: id.to_owned(),
                source,
            }),
            None => Err(ContainerError::NotFound(id.to_owned())),
        }
    }
}

impl fmt::Debug for InMemoryContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryContainer")
            .field("service_count", &self.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::handler::BoxFuture;
    use crate::middleware::Next;
    use crate::request::Request;
    use crate::response::Response;

    #[test]
    fn instances_are_shared() {
        let mut container = InMemoryContainer::new();
        container.set("config", Service::other(42_u32));

        let (Ok(Service::Other(a)), Ok(Service::Other(b))) = (container.get("config"), container.get("config")) else {
            panic!("expected two `Other` services");
        };
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.downcast_ref::<u32>(), Some(&42));
    }

    #[test]
    fn factories_run_on_every_get() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let mut container = InMemoryContainer::new();
        container.set_factory("fresh", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Service::other(()))
        });

        assert!(container.has("fresh"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        container.get("fresh").unwrap();
        container.get("fresh").unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn missing_and_failing_entries_are_errors() {
        let mut container = InMemoryContainer::new();
        container.set_factory("broken", || Err("database offline".into()));

        assert!(matches!(container.get("absent"), Err(ContainerError::NotFound(id)) if id == "absent"));
        let err = container.get("broken").unwrap_err();
        assert!(matches!(err, ContainerError::Factory { ref id, .. } if id == "broken"));
        assert_eq!(std::error::Error::source(&err).map(ToString::to_string).as_deref(), Some("database offline"));
    }

    #[test]
    fn capability_follows_the_variant() {
        assert_eq!(Service::other("x").capability(), Capability::Neither);
    }

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

    #[test]
    fn both_views_share_one_allocation() {
        let Service::Both(dual) = Service::both(Arc::new(Adapter)) else {
            panic!("expected a dual service");
        };
        let middleware = Arc::as_ptr(dual.middleware()).cast::<()>();
        let handler = Arc::as_ptr(dual.handler()).cast::<()>();
        assert_eq!(middleware, handler);
    }
}
