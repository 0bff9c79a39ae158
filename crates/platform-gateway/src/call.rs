//! The asynchronous result carrier returned by every service operation.
//!
//! A [`Call`] is a cold future: constructing one does nothing, and the
//! request is built, sent and decoded only once it is polled. It resolves to
//! exactly one `Result<T, ClientError>`.
//!
//! Cancellation is caller-driven. Dropping a pending `Call` drops the
//! in-flight transport future with it. [`Call::spawn`] runs the call in the
//! background and returns a [`CallHandle`] whose [`cancel`](CallHandle::cancel)
//! guarantees that no value or error is delivered afterwards.
//!
//! # Example
//!
//! ```ignore
//! // Awaited directly
//! let me: Profile = service.request(Route::get("/me")).await?;
//!
//! // Spawned, then cancelled when the screen goes away
//! let handle = service.request::<Profile>(Route::get("/me")).spawn();
//! handle.cancel();
//! assert!(handle.wait().await.is_none());
//! ```

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::task::{Context, Poll};

use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::error::Result;
use crate::logging::{span_names, targets};

static NEXT_CALL_ID: AtomicU64 = AtomicU64::new(1);

/// A unique identifier for a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallId(u64);

impl CallId {
    fn next() -> Self {
        Self(NEXT_CALL_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw id value.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "call-{}", self.0)
    }
}

/// The lifecycle of one call.
///
/// `Idle → Built → InFlight → {Completed | Failed | Cancelled}`. `Failed` is
/// reachable from every non-terminal state, `Cancelled` only from
/// `InFlight`. Terminal states are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallState {
    /// Created, nothing done yet.
    Idle,
    /// The request was constructed.
    Built,
    /// The request was handed to the transport.
    InFlight,
    /// A decoded value was produced.
    Completed,
    /// The call ended with an error.
    Failed,
    /// The call was cancelled while in flight.
    Cancelled,
}

impl CallState {
    /// Whether no further transitions are possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Whether the state machine allows moving from `self` to `next`.
    pub fn can_transition_to(self, next: CallState) -> bool {
        use CallState::*;
        matches!(
            (self, next),
            (Idle, Built)
                | (Idle, Failed)
                | (Built, InFlight)
                | (Built, Failed)
                | (InFlight, Completed)
                | (InFlight, Failed)
                | (InFlight, Cancelled)
        )
    }
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Built => "built",
            Self::InFlight => "in-flight",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Shared view of one call's state.
///
/// Transitions are checked against [`CallState::can_transition_to`]; an
/// illegal transition is ignored and reported as `false`.
#[derive(Debug, Clone)]
pub struct CallTracker {
    id: CallId,
    state: Arc<Mutex<CallState>>,
}

impl CallTracker {
    fn new(id: CallId) -> Self {
        Self {
            id,
            state: Arc::new(Mutex::new(CallState::Idle)),
        }
    }

    /// The call this tracker belongs to.
    pub fn id(&self) -> CallId {
        self.id
    }

    /// The current state.
    pub fn state(&self) -> CallState {
        *self.state.lock()
    }

    /// Move to `next` if the state machine allows it.
    pub fn advance(&self, next: CallState) -> bool {
        let mut state = self.state.lock();
        let from = *state;
        if !from.can_transition_to(next) {
            tracing::trace!(
                target: targets::CALL,
                call = %self.id,
                %from,
                to = %next,
                "Ignoring state transition"
            );
            return false;
        }
        *state = next;
        tracing::debug!(target: targets::CALL, call = %self.id, %from, to = %next, "Call state changed");
        true
    }
}

/// A cancellation token shared between a [`CallHandle`] and its task.
///
/// Supports both polling and async waiting.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    inner: Arc<CancellationState>,
}

#[derive(Debug)]
struct CancellationState {
    cancelled: AtomicBool,
    notify: tokio::sync::Notify,
}

impl CancellationToken {
    /// Create a new cancellation token.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(CancellationState {
                cancelled: AtomicBool::new(false),
                notify: tokio::sync::Notify::new(),
            }),
        }
    }

    /// Check if cancellation has been requested.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Request cancellation.
    ///
    /// Returns `true` for the first request only; waiters are notified once.
    pub fn cancel(&self) -> bool {
        let first = !self.inner.cancelled.swap(true, Ordering::AcqRel);
        if first {
            self.inner.notify.notify_waiters();
        }
        first
    }

    /// Wait asynchronously until cancellation is requested.
    ///
    /// Returns immediately if already cancelled.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// A cold, single-consumer future yielding one `Result<T, ClientError>`.
#[must_use = "calls do nothing unless awaited or spawned"]
pub struct Call<T> {
    tracker: CallTracker,
    operation: &'static str,
    span: tracing::Span,
    future: Option<BoxFuture<'static, Result<T>>>,
}

impl<T> Call<T> {
    /// Wrap the work of one operation.
    ///
    /// `work` receives the call's tracker and must advance it to `Built` and
    /// `InFlight` as it goes; the terminal state is recorded by the call.
    /// The future it returns is not polled until the call is.
    pub fn new<F, Fut>(operation: &'static str, work: F) -> Self
    where
        F: FnOnce(CallTracker) -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let id = CallId::next();
        let tracker = CallTracker::new(id);
        let span = tracing::debug_span!(target: targets::CALL, span_names::CALL, call = %id, operation);
        let future = Box::pin(work(tracker.clone()));
        Self {
            tracker,
            operation,
            span,
            future: Some(future),
        }
    }

    /// The call's id.
    pub fn id(&self) -> CallId {
        self.tracker.id()
    }

    /// The operation this call performs.
    pub fn operation(&self) -> &'static str {
        self.operation
    }

    /// The current state.
    pub fn state(&self) -> CallState {
        self.tracker.state()
    }

    /// A shared view of the call's state.
    pub fn tracker(&self) -> CallTracker {
        self.tracker.clone()
    }
}

impl<T: Send + 'static> Call<T> {
    /// Run the call on the ambient tokio runtime.
    ///
    /// Must be called from within a runtime.
    pub fn spawn(self) -> CallHandle<T> {
        let tracker = self.tracker.clone();
        let token = CancellationToken::new();
        let task_token = token.clone();
        let (sender, receiver) = oneshot::channel();

        tokio::spawn(async move {
            let tracker = self.tracker.clone();
            tokio::select! {
                biased;
                _ = task_token.cancelled() => {
                    tracing::debug!(target: targets::CALL, call = %tracker.id(), "Call task cancelled");
                }
                result = self => {
                    if tracker.state() != CallState::Cancelled && !task_token.is_cancelled() {
                        let _ = sender.send(result);
                    }
                }
            }
        });

        CallHandle {
            tracker,
            token,
            receiver: Some(receiver),
        }
    }
}

impl<T> Future for Call<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let _entered = this.span.enter();
        let Some(future) = this.future.as_mut() else {
            panic!("`Call` polled after completion");
        };
        match future.as_mut().poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(result) => {
                this.future = None;
                let next = match &result {
                    Ok(_) => CallState::Completed,
                    Err(err) => {
                        tracing::debug!(target: targets::CALL, kind = ?err.kind(), "Call failed: {}", err);
                        CallState::Failed
                    }
                };
                this.tracker.advance(next);
                Poll::Ready(result)
            }
        }
    }
}

impl<T> Drop for Call<T> {
    fn drop(&mut self) {
        if self.future.take().is_some() && self.tracker.advance(CallState::Cancelled) {
            let _entered = self.span.enter();
            tracing::debug!(target: targets::CALL, "In-flight call dropped");
        }
    }
}

impl<T> fmt::Debug for Call<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Call")
            .field("id", &self.tracker.id())
            .field("operation", &self.operation)
            .field("state", &self.tracker.state())
            .finish()
    }
}

/// A handle to a spawned [`Call`].
///
/// Dropping the handle cancels the call.
#[derive(Debug)]
pub struct CallHandle<T> {
    tracker: CallTracker,
    token: CancellationToken,
    receiver: Option<oneshot::Receiver<Result<T>>>,
}

impl<T> CallHandle<T> {
    /// The call's id.
    pub fn id(&self) -> CallId {
        self.tracker.id()
    }

    /// The current state.
    pub fn state(&self) -> CallState {
        self.tracker.state()
    }

    /// Whether the call has neither finished nor been cancelled.
    pub fn is_pending(&self) -> bool {
        !self.token.is_cancelled() && !self.tracker.state().is_terminal()
    }

    /// Cancel the call.
    ///
    /// An in-flight call moves to [`CallState::Cancelled`] and its transport
    /// future is dropped. A call that has not reached the network yet never
    /// will. A call that already finished is unaffected. Calling this more
    /// than once has no further effect.
    pub fn cancel(&self) {
        if self.token.cancel() {
            self.tracker.advance(CallState::Cancelled);
        }
    }

    /// Wait for the outcome.
    ///
    /// Returns `None` if the call was cancelled before it finished.
    pub async fn wait(mut self) -> Option<Result<T>> {
        let receiver = self.receiver.take()?;
        let result = receiver.await.ok()?;
        if self.tracker.state() == CallState::Cancelled {
            return None;
        }
        Some(result)
    }
}

impl<T> Drop for CallHandle<T> {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;

    #[test]
    fn test_state_machine() {
        use CallState::*;
        assert!(Idle.can_transition_to(Built));
        assert!(Idle.can_transition_to(Failed));
        assert!(!Idle.can_transition_to(InFlight));
        assert!(!Idle.can_transition_to(Cancelled));
        assert!(!Built.can_transition_to(Cancelled));
        assert!(InFlight.can_transition_to(Cancelled));
        for terminal in [Completed, Failed, Cancelled] {
            assert!(terminal.is_terminal());
            for next in [Idle, Built, InFlight, Completed, Failed, Cancelled] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn test_tracker_rejects_illegal_transitions() {
        let tracker = CallTracker::new(CallId::next());
        assert!(!tracker.advance(CallState::Cancelled));
        assert!(tracker.advance(CallState::Built));
        assert!(tracker.advance(CallState::InFlight));
        assert!(tracker.advance(CallState::Completed));
        assert!(!tracker.advance(CallState::Failed));
        assert_eq!(tracker.state(), CallState::Completed);
    }

    #[test]
    fn test_call_ids_are_unique() {
        let a = CallId::next();
        let b = CallId::next();
        assert_ne!(a, b);
        assert!(a.to_string().starts_with("call-"));
    }

    #[test]
    fn test_cancellation_token() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
        assert!(token.cancel());
        assert!(!token.cancel());
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancelled_returns_after_cancel() {
        let token = CancellationToken::new();
        let waiter = token.clone();
        let task = tokio::spawn(async move { waiter.cancelled().await });
        tokio::task::yield_now().await;
        token.cancel();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_call_is_cold() {
        let started = Arc::new(AtomicBool::new(false));
        let flag = started.clone();
        let call: Call<u32> = Call::new("test", move |tracker| async move {
            flag.store(true, Ordering::SeqCst);
            tracker.advance(CallState::Built);
            tracker.advance(CallState::InFlight);
            Ok(7)
        });

        assert_eq!(call.state(), CallState::Idle);
        assert!(!started.load(Ordering::SeqCst));

        let tracker = call.tracker();
        assert_eq!(call.await.unwrap(), 7);
        assert!(started.load(Ordering::SeqCst));
        assert_eq!(tracker.state(), CallState::Completed);
    }

    #[tokio::test]
    async fn test_pre_flight_failure_is_failed() {
        let call: Call<u32> = Call::new("test", |_| async { Err(ClientError::EmptyResponse) });
        let tracker = call.tracker();
        assert!(call.await.is_err());
        assert_eq!(tracker.state(), CallState::Failed);
    }

    #[tokio::test]
    async fn test_dropping_in_flight_call_cancels() {
        let call: Call<u32> = Call::new("test", |tracker| async move {
            tracker.advance(CallState::Built);
            tracker.advance(CallState::InFlight);
            std::future::pending::<()>().await;
            Ok(1)
        });
        let tracker = call.tracker();

        let mut call = Box::pin(call);
        assert!(futures_util::poll!(call.as_mut()).is_pending());
        assert_eq!(tracker.state(), CallState::InFlight);

        drop(call);
        assert_eq!(tracker.state(), CallState::Cancelled);
    }

    #[tokio::test]
    async fn test_handle_wait_delivers_result() {
        let call: Call<&'static str> = Call::new("test", |tracker| async move {
            tracker.advance(CallState::Built);
            tracker.advance(CallState::InFlight);
            Ok("done")
        });
        let handle = call.spawn();
        assert_eq!(handle.wait().await.unwrap().unwrap(), "done");
    }

    #[tokio::test]
    async fn test_cancel_before_start_keeps_pre_flight_state() {
        let call: Call<u32> = Call::new("test", |tracker| async move {
            tracker.advance(CallState::Built);
            tracker.advance(CallState::InFlight);
            Ok(1)
        });
        let handle = call.spawn();
        handle.cancel();

        assert!(!handle.is_pending());
        let tracker = handle.tracker.clone();
        assert!(handle.wait().await.is_none());
        assert_eq!(tracker.state(), CallState::Idle);
    }
}
