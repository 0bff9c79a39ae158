//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use platform_gateway::{
    ClientIdentity, Endpoints, HttpRequest, RawResponse, Service, Transport, TransportError,
};
use tokio::sync::Notify;

pub const REST_BASE: &str = "https://api.example.com/v1";
pub const GRAPHQL: &str = "https://api.example.com/graphql";

/// What the mock does with one request.
pub enum Reply {
    /// Resolve with a response.
    Respond(RawResponse),
    /// Resolve with a transport failure.
    Fail(TransportError),
    /// Never resolve.
    Hang,
}

impl Reply {
    pub fn json(status: u16, body: impl Into<String>) -> Self {
        let mut response = RawResponse::new(status, body.into());
        response.headers.insert(
            http::header::CONTENT_TYPE,
            http::HeaderValue::from_static("application/json"),
        );
        Self::Respond(response)
    }
}

type Responder = Box<dyn Fn(&HttpRequest) -> Reply + Send + Sync>;

struct MockState {
    calls: AtomicUsize,
    completions: AtomicUsize,
    cancellations: AtomicUsize,
    requests: Mutex<Vec<HttpRequest>>,
    replies: Mutex<VecDeque<Reply>>,
    fallback: Mutex<Option<Responder>>,
    started: Notify,
}

/// A scripted transport that records what it is asked to send.
///
/// Scripted replies are used in order; once they run out the fallback
/// responder (by default `200 {}`) answers.
#[derive(Clone)]
pub struct MockTransport {
    state: Arc<MockState>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            state: Arc::new(MockState {
                calls: AtomicUsize::new(0),
                completions: AtomicUsize::new(0),
                cancellations: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
                replies: Mutex::new(VecDeque::new()),
                fallback: Mutex::new(None),
                started: Notify::new(),
            }),
        }
    }

    /// Queue a reply.
    pub fn reply(&self, reply: Reply) -> &Self {
        self.state.replies.lock().push_back(reply);
        self
    }

    /// Queue a JSON response.
    pub fn respond(&self, status: u16, body: impl Into<String>) -> &Self {
        self.reply(Reply::json(status, body))
    }

    /// Answer unscripted requests with `responder`.
    pub fn fallback(&self, responder: impl Fn(&HttpRequest) -> Reply + Send + Sync + 'static) {
        *self.state.fallback.lock() = Some(Box::new(responder));
    }

    /// Number of network operations started.
    pub fn call_count(&self) -> usize {
        self.state.calls.load(Ordering::SeqCst)
    }

    /// Number of network operations that resolved.
    pub fn completion_count(&self) -> usize {
        self.state.completions.load(Ordering::SeqCst)
    }

    /// Number of network operations dropped before resolving.
    pub fn cancellation_count(&self) -> usize {
        self.state.cancellations.load(Ordering::SeqCst)
    }

    /// Every request sent so far.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.state.requests.lock().clone()
    }

    /// The most recent request.
    pub fn last_request(&self) -> HttpRequest {
        self.state
            .requests
            .lock()
            .last()
            .cloned()
            .expect("no request was sent")
    }

    /// Wait until a network operation has started.
    pub async fn started(&self) {
        self.state.started.notified().await;
    }

    fn next_reply(&self, request: &HttpRequest) -> Reply {
        if let Some(reply) = self.state.replies.lock().pop_front() {
            return reply;
        }
        match self.state.fallback.lock().as_ref() {
            Some(responder) => responder(request),
            None => Reply::json(200, "{}"),
        }
    }
}

/// Counts a cancellation when an operation is dropped before resolving.
struct InFlightGuard {
    state: Arc<MockState>,
    resolved: bool,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.resolved {
            self.state.completions.fetch_add(1, Ordering::SeqCst);
        } else {
            self.state.cancellations.fetch_add(1, Ordering::SeqCst);
        }
    }
}

impl Transport for MockTransport {
    fn send(&self, request: HttpRequest) -> BoxFuture<'static, Result<RawResponse, TransportError>> {
        let mock = self.clone();
        Box::pin(async move {
            mock.state.calls.fetch_add(1, Ordering::SeqCst);
            let reply = mock.next_reply(&request);
            mock.state.requests.lock().push(request);

            let mut guard = InFlightGuard {
                state: Arc::clone(&mock.state),
                resolved: false,
            };
            mock.state.started.notify_one();

            let result = match reply {
                Reply::Respond(response) => Ok(response),
                Reply::Fail(error) => Err(error),
                Reply::Hang => std::future::pending().await,
            };
            guard.resolved = true;
            result
        })
    }
}

pub fn identity() -> ClientIdentity {
    ClientIdentity::builder("shop-desktop", Endpoints::new(REST_BASE, GRAPHQL))
        .language("fr")
        .currency("EUR")
        .build_version("4.2.0")
        .build()
}

pub fn service(mock: &MockTransport) -> Service {
    Service::new(Arc::new(mock.clone()), identity())
}
