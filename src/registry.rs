//! Registered middleware types.
//!
//! When an identifier is not in the container, the resolver falls back to a
//! type registered here under that name and builds a fresh value with its
//! zero-argument constructor. Types that need constructor arguments belong in
//! the container instead.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::container::Service;
use crate::error::BoxError;
use crate::handler::RequestHandler;
use crate::middleware::Middleware;

type Constructor = Arc<dyn Fn() -> Result<Service, BoxError> + Send + Sync>;

/// Name → zero-argument constructor.
///
/// ```rust
/// use sluice::{Middleware, TypeRegistry};
/// # use sluice::{BoxFuture, Next, Request};
/// #[derive(Default)]
/// struct RequestId;
/// # impl Middleware for RequestId {
/// #     fn process<'a>(&'a self, req: Request, next: Next) -> BoxFuture<'a> { next.run(req) }
/// # }
///
/// let mut types = TypeRegistry::new();
/// types.register_middleware::<RequestId>("request-id");
/// assert!(types.contains("request-id"));
/// ```
#[derive(Clone, Default)]
pub struct TypeRegistry {
    constructors: HashMap<String, Constructor>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a constructor under `name`, replacing any previous one.
    pub fn register<F>(&mut self, name: impl Into<String>, constructor: F) -> &mut Self
    where
        F: Fn() -> Result<Service, BoxError> + Send + Sync + 'static,
    {
        self.constructors.insert(name.into(), Arc::new(constructor));
        self
    }

    /// Registers a middleware type built with `Default`.
    pub fn register_middleware<T>(&mut self, name: impl Into<String>) -> &mut Self
    where
        T: Middleware + Default,
    {
        self.register(name, || Ok(Service::middleware(Arc::new(T::default()))))
    }

    /// Registers a handler type built with `Default`.
    pub fn register_handler<T>(&mut self, name: impl Into<String>) -> &mut Self
    where
        T: RequestHandler + Default,
    {
        self.register(name, || Ok(Service::handler(Arc::new(T::default()))))
    }

    /// Whether a type is registered under `name`. Never constructs.
    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Builds a fresh value of the type registered under `name`.
    ///
    /// `None` when nothing is registered under that name.
    pub fn construct(&self, name: &str) -> Option<Result<Service, BoxError>> {
        self.constructors.get(name).map(|constructor| constructor())
    }

    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("TypeRegistry").field("types", &names).finish()
    }
}
