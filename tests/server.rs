use std::net::SocketAddr;
use std::time::Duration;

use sluice::{AppFactory, Error, Method, Request, ResolutionError, ResolutionPolicy, Router, Server};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

async fn ok(_req: Request) -> &'static str {
    "ok"
}

/// Reserves a loopback port and releases it for the server to bind.
fn free_port() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

async fn connect(addr: SocketAddr) -> TcpStream {
    for _ in 0..100 {
        if let Ok(stream) = TcpStream::connect(addr).await {
            return stream;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("server never came up on {addr}");
}

async fn send(addr: SocketAddr, method: &str, path: &str) -> String {
    let mut stream = connect(addr).await;
    let request = format!("{method} {path} HTTP/1.1\r\nhost: localhost\r\nconnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.unwrap();
    String::from_utf8(raw).unwrap()
}

#[tokio::test]
async fn serves_requests_over_tcp() {
    let addr = free_port();
    let app = AppFactory::create(None, Some(Router::new().on(Method::Get, "/", ok)));
    let server = tokio::spawn(Server::bind_addr(addr).serve(app));

    let res = send(addr, "GET", "/").await;
    assert!(res.starts_with("HTTP/1.1 200 OK\r\n"), "{res}");
    assert!(res.ends_with("\r\n\r\nok"), "{res}");

    let res = send(addr, "PURGE", "/").await;
    assert!(res.starts_with("HTTP/1.1 405 Method Not Allowed\r\n"), "{res}");

    let res = send(addr, "GET", "/missing").await;
    assert!(res.starts_with("HTTP/1.1 404 Not Found\r\n"), "{res}");

    server.abort();
}

#[tokio::test]
async fn eager_resolution_failure_stops_serve_before_binding() {
    // Holding the port makes a bind attempt fail with an io error instead.
    let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = taken.local_addr().unwrap();

    let app = AppFactory::create(None, None)
        .with_policy(ResolutionPolicy::Eager)
        .pipe("not-a-class");

    let err = Server::bind_addr(addr).serve(app).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Resolution(ResolutionError::MissingDependency { ref id, .. }) if id == "not-a-class"
    ));
}
