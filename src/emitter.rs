//! Response emission.
//!
//! The server hands responses to hyper directly. Emitters cover the other
//! case: writing a response produced by [`Application::run`](crate::Application::run)
//! to an arbitrary async writer (a raw socket, a pipe, a test buffer).

use std::fmt;
use std::io;
use std::sync::Arc;

use tokio::io::AsyncWrite;

use crate::handler::BoxFuture;
use crate::response::Response;

/// The writer type emitters receive.
pub type Output<'a> = dyn AsyncWrite + Unpin + Send + 'a;

/// Writes a response somewhere.
///
/// Returns `Ok(true)` when the response was emitted, `Ok(false)` when this
/// emitter declines it and the next one in an [`EmitterStack`] should try.
pub trait Emitter: Send + Sync + 'static {
    fn emit<'a>(&'a self, response: &'a Response, out: &'a mut Output<'_>) -> BoxFuture<'a, io::Result<bool>>;
}

/// Writes responses as HTTP/1.1. Accepts every response.
#[derive(Debug, Default, Clone, Copy)]
pub struct Http1Emitter;

impl Emitter for Http1Emitter {
    fn emit<'a>(&'a self, response: &'a Response, out: &'a mut Output<'_>) -> BoxFuture<'a, io::Result<bool>> {
        Box::pin(async move {
            response.write_to(out).await?;
            Ok(true)
        })
    }
}

/// A stack of emitters, tried last-pushed first.
///
/// Push a catch-all emitter first so it sits at the bottom, then push more
/// specific ones above it.
#[derive(Clone, Default)]
pub struct EmitterStack {
    emitters: Vec<Arc<dyn Emitter>>,
}

impl EmitterStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, emitter: impl Emitter) -> &mut Self {
        self.emitters.push(Arc::new(emitter));
        self
    }

    pub fn len(&self) -> usize {
        self.emitters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emitters.is_empty()
    }
}

impl Emitter for EmitterStack {
    fn emit<'a>(&'a self, response: &'a Response, out: &'a mut Output<'_>) -> BoxFuture<'a, io::Result<bool>> {
        Box::pin(async move {
            for emitter in self.emitters.iter().rev() {
                if emitter.emit(response, &mut *out).await? {
                    return Ok(true);
                }
            }
            Ok(false)
        })
    }
}

impl fmt::Debug for EmitterStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmitterStack").field("len", &self.emitters.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::Status;

    /// Counts calls and accepts only responses with the configured status.
    struct Only {
        status: u16,
        calls: Arc<AtomicUsize>,
    }

    impl Emitter for Only {
        fn emit<'a>(&'a self, response: &'a Response, _out: &'a mut Output<'_>) -> BoxFuture<'a, io::Result<bool>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let accepted = response.status_code() == self.status;
            Box::pin(async move { Ok(accepted) })
        }
    }

    #[tokio::test]
    async fn top_of_stack_wins() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut stack = EmitterStack::new();
        stack.push(Http1Emitter);
        stack.push(Only { status: 204, calls: Arc::clone(&calls) });

        let mut out: Vec<u8> = Vec::new();
        let emitted = stack.emit(&Response::status(Status::NoContent), &mut out).await.unwrap();

        assert!(emitted);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn declined_responses_fall_through() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut stack = EmitterStack::new();
        stack.push(Http1Emitter);
        stack.push(Only { status: 204, calls: Arc::clone(&calls) });

        let mut out: Vec<u8> = Vec::new();
        let emitted = stack.emit(&Response::text("hi"), &mut out).await.unwrap();

        assert!(emitted);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(out.starts_with(b"HTTP/1.1 200 OK\r\n"));
    }

    #[tokio::test]
    async fn empty_stack_emits_nothing() {
        let mut out: Vec<u8> = Vec::new();
        let emitted = EmitterStack::new().emit(&Response::text("hi"), &mut out).await.unwrap();
        assert!(!emitted);
    }
}
