//! Radix-tree request router.
//!
//! One tree per HTTP method. O(path-length) lookup. The router is the
//! terminal handler of an application: the middleware pipeline runs first,
//! and whatever reaches the end of it is routed here.

use std::collections::HashMap;
use std::sync::Arc;

use matchit::Router as MatchitRouter;
use tracing::trace;

use crate::handler::{BoxFuture, BoxedHandler, Handler, RequestHandler};
use crate::method::Method;
use crate::request::Request;
use crate::response::Response;
use crate::status::Status;

/// The application router.
///
/// Build it once at startup and hand it to
/// [`AppFactory::create`](crate::AppFactory::create). Each registration
/// returns `self` so calls chain naturally.
#[derive(Default)]
pub struct Router {
    routes: HashMap<Method, MatchitRouter<BoxedHandler>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an async function for a method + path pair.
    ///
    /// Path parameters use `{name}` syntax; `req.param("name")` retrieves them:
    ///
    /// ```rust,no_run
    /// # use sluice::{Method, Request, Response, Router};
    /// # async fn get_user(_: Request) -> Response { Response::text("") }
    /// # async fn create_user(_: Request) -> Response { Response::text("") }
    /// Router::new()
    ///     .on(Method::Get,  "/users/{id}", get_user)
    ///     .on(Method::Post, "/users",      create_user);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if `path` is not a valid route pattern or conflicts with one
    /// already registered for `method`.
    pub fn on(self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.route(method, path, handler.into_boxed_handler())
    }

    /// Registers a handler object for a method + path pair.
    ///
    /// # Panics
    ///
    /// Same as [`Router::on`].
    pub fn route(mut self, method: Method, path: &str, handler: BoxedHandler) -> Self {
        self.routes
            .entry(method)
            .or_default()
            .insert(path, handler)
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    pub(crate) fn lookup(
        &self,
        method: Method,
        path: &str,
    ) -> Option<(BoxedHandler, HashMap<String, String>)> {
        let tree = self.routes.get(&method)?;
        let matched = tree.at(path).ok()?;
        let handler = Arc::clone(matched.value);
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((handler, params))
    }

    /// Methods with a route matching `path`, in wire-name order.
    pub(crate) fn allowed(&self, path: &str) -> Vec<Method> {
        let mut methods: Vec<Method> = self.routes.iter()
            .filter(|(_, tree)| tree.at(path).is_ok())
            .map(|(method, _)| *method)
            .collect();
        methods.sort_by_key(|m| m.as_str());
        methods
    }
}

impl RequestHandler for Router {
    fn handle<'a>(&'a self, mut req: Request) -> BoxFuture<'a> {
        Box::pin(async move {
            if let Some((handler, params)) = self.lookup(req.method(), req.path()) {
                req.params = params;
                return handler.handle(req).await;
            }

            let allowed = self.allowed(req.path());
            trace!(method = %req.method(), path = req.path(), ?allowed, "no route matched");
            if allowed.is_empty() {
                return Response::status(Status::NotFound);
            }
            let allow = allowed.iter().map(|m| m.as_str()).collect::<Vec<_>>().join(", ");
            Response::builder()
                .status(Status::MethodNotAllowed)
                .header("allow", &allow)
                .no_body()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn user(req: Request) -> String {
        format!("user {}", req.param("id").unwrap_or("?"))
    }

    async fn create(_req: Request) -> Status {
        Status::Created
    }

    fn router() -> Router {
        Router::new()
            .on(Method::Get, "/users/{id}", user)
            .on(Method::Delete, "/users/{id}", user)
            .on(Method::Post, "/users", create)
    }

    #[tokio::test]
    async fn routes_with_path_params() {
        let res = router().handle(Request::new(Method::Get, "/users/42")).await;
        assert_eq!(res.body(), b"user 42");
    }

    #[tokio::test]
    async fn unknown_path_is_404() {
        let res = router().handle(Request::new(Method::Get, "/nowhere")).await;
        assert_eq!(res.status_code(), 404);
    }

    #[tokio::test]
    async fn known_path_with_other_method_is_405() {
        let res = router().handle(Request::new(Method::Put, "/users/42")).await;
        assert_eq!(res.status_code(), 405);
        assert_eq!(res.header("allow"), Some("DELETE, GET"));
    }

    #[test]
    #[should_panic(expected = "invalid route")]
    fn conflicting_routes_panic() {
        let _ = Router::new()
            .on(Method::Get, "/a/{x}", user)
            .on(Method::Get, "/a/{y}", user);
    }
}
