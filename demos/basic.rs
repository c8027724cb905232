//! Minimal sluice example: a container-backed middleware pipeline in front
//! of a router.
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example basic
//!
//! Try:
//!   curl -i http://localhost:3000/users/42
//!   curl -i -H 'authorization: Bearer t' http://localhost:3000/users/42
//!   curl -i -X POST -H 'authorization: Bearer t' -d '{"name":"alice"}' http://localhost:3000/users

use std::sync::Arc;
use std::time::Instant;

use sluice::middleware::from_fn;
use sluice::{
    AppFactory, BoxFuture, InMemoryContainer, Method, Middleware, Next, Request, ResolutionPolicy,
    Response, Router, Server, Service, Status, TypeRegistry,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut container = InMemoryContainer::new();
    container.set("timing", Service::middleware(Arc::new(from_fn(timing))));

    // Not in the container: built by name on first use.
    let mut types = TypeRegistry::new();
    types.register_middleware::<RequireAuth>("RequireAuth");

    let router = Router::new()
        .on(Method::Get,    "/users/{id}", get_user)
        .on(Method::Post,   "/users",      create_user)
        .on(Method::Delete, "/users/{id}", delete_user);

    let app = AppFactory::with_types(Some(Arc::new(container)), Some(router), types)
        .with_policy(ResolutionPolicy::Eager)
        .pipe("timing")
        .pipe("RequireAuth");

    Server::bind("0.0.0.0:3000")
        .serve(app)
        .await
        .expect("server error");
}

async fn timing(req: Request, next: Next) -> Response {
    let started = Instant::now();
    let method = req.method();
    let path = req.path().to_owned();
    let res = next.run(req).await;
    tracing::info!(%method, path = %path, status = res.status_code(), elapsed = ?started.elapsed(), "request");
    res
}

#[derive(Default)]
struct RequireAuth;

impl Middleware for RequireAuth {
    fn process<'a>(&'a self, req: Request, next: Next) -> BoxFuture<'a> {
        Box::pin(async move {
            match req.header("authorization") {
                Some(_) => next.run(req).await,
                None => Response::status(Status::Unauthorized),
            }
        })
    }
}

// GET /users/{id}
async fn get_user(req: Request) -> Response {
    let id = req.param("id").unwrap_or("unknown");
    Response::json(format!(r#"{{"id":"{id}","name":"alice"}}"#).into_bytes())
}

// POST /users
async fn create_user(req: Request) -> Response {
    if req.body().is_empty() {
        return Response::status(Status::BadRequest);
    }

    Response::builder()
        .status(Status::Created)
        .header("location", "/users/99")
        .json(r#"{"id":"99","name":"new_user"}"#.to_owned().into_bytes())
}

// DELETE /users/{id}
async fn delete_user(_req: Request) -> Status {
    Status::NoContent
}
