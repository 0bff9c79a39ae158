//! Execution of built requests.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use super::{RawResponse, Transport, TransportError};
use crate::logging::targets;
use crate::request::HttpRequest;

/// Runs built requests against a shared [`Transport`].
///
/// The returned futures are cold: the transport is not touched until the
/// future is first polled.
#[derive(Clone)]
pub struct TransportExecutor {
    transport: Arc<dyn Transport>,
}

impl TransportExecutor {
    /// Create an executor over a transport.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Execute a request, yielding the raw response or the transport failure.
    ///
    /// Non-2xx statuses are returned as responses; classifying them is the
    /// caller's concern.
    pub fn execute(
        &self,
        request: HttpRequest,
    ) -> impl Future<Output = Result<RawResponse, TransportError>> + Send + 'static {
        let transport = Arc::clone(&self.transport);
        async move {
            let method = request.method;
            let url = request.url.clone();
            tracing::debug!(target: targets::TRANSPORT, %method, %url, "Sending request");

            let started = Instant::now();
            let result = transport.send(request).await;
            let elapsed_ms = started.elapsed().as_millis() as u64;

            match &result {
                Ok(response) => tracing::debug!(
                    target: targets::TRANSPORT,
                    %method,
                    %url,
                    status = response.status,
                    bytes = response.body.len(),
                    elapsed_ms,
                    "Received response"
                ),
                Err(err) => tracing::warn!(
                    target: targets::TRANSPORT,
                    %method,
                    %url,
                    kind = %err.kind(),
                    elapsed_ms,
                    "Transport failed: {}",
                    err.message()
                ),
            }
            result
        }
    }
}

impl std::fmt::Debug for TransportExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportExecutor").finish_non_exhaustive()
    }
}
