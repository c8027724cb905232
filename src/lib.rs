//! # sluice
//!
//! A small HTTP framework whose request path is a middleware pipeline built
//! from references.
//!
//! ## The idea
//!
//! Applications do not pipe middleware values. They pipe *names*: service
//! ids looked up in a [`Container`], or type names registered in a
//! [`TypeRegistry`]. The [`MiddlewareResolver`] turns each name into
//! something that is guaranteed to be middleware:
//!
//! - a value that is already [`Middleware`] is used as-is;
//! - a value that is only a [`RequestHandler`] is decorated so that it
//!   answers the request and never continues down the pipeline;
//! - anything else is a startup error naming the offending id.
//!
//! Resolution is lazy by default: nothing is built until the first request.
//! Switch to [`ResolutionPolicy::Eager`] to fail fast at startup instead.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sluice::{AppFactory, InMemoryContainer, Method, Request, Response, Router, Server, Service};
//! use sluice::middleware::{Next, from_fn};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut container = InMemoryContainer::new();
//!     container.set("powered-by", Service::middleware(Arc::new(from_fn(
//!         |req: Request, next: Next| async move {
//!             let mut res = next.run(req).await;
//!             res.insert_header("x-powered-by", "sluice");
//!             res
//!         },
//!     ))));
//!
//!     let router = Router::new().on(Method::Get, "/users/{id}", get_user);
//!
//!     let app = AppFactory::create(Some(Arc::new(container)), Some(router))
//!         .pipe("powered-by");
//!
//!     Server::bind("0.0.0.0:3000").serve(app).await.unwrap();
//! }
//!
//! async fn get_user(req: Request) -> Response {
//!     let id = req.param("id").unwrap_or("unknown");
//!     Response::json(format!(r#"{{"id":"{id}"}}"#).into_bytes())
//! }
//! ```

mod application;
mod container;
mod emitter;
mod error;
mod handler;
mod method;
mod registry;
mod request;
mod response;
mod router;
mod server;
mod status;

pub mod middleware;

pub use application::{AppFactory, Application};
pub use container::{Capability, Container, ContainerError, Dual, InMemoryContainer, Service};
pub use emitter::{Emitter, EmitterStack, Http1Emitter, Output};
pub use error::{BoxError, Error, ResolutionError};
pub use handler::{BoxFuture, BoxedHandler, Handler, NotFound, RequestHandler};
pub use method::{Method, UnknownMethod};
pub use middleware::{
    Middleware, MiddlewareResolver, MiddlewareUnit, Next, Pipeline, PipelineEntry,
    ResolutionPolicy, decorate,
};
pub use registry::TypeRegistry;
pub use request::Request;
pub use response::{ContentType, IntoResponse, Response, ResponseBuilder};
pub use router::Router;
pub use server::Server;
pub use status::Status;
