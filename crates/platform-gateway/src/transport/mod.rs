//! Network transport.
//!
//! A [`Transport`] turns an [`HttpRequest`] into exactly one terminal
//! outcome: a [`RawResponse`] or a [`TransportError`]. The returned future is
//! cold; nothing is sent until it is polled, and dropping it before it
//! resolves cancels the in-flight network operation.
//!
//! [`ReqwestTransport`] is the production implementation. It owns a single
//! pooled `reqwest::Client` that is safe to share across concurrent calls.

mod executor;
mod reqwest_transport;

use std::fmt;

use bytes::Bytes;
use futures_util::future::BoxFuture;

use crate::request::HttpRequest;

pub use executor::TransportExecutor;
pub use reqwest_transport::{ReqwestTransport, ReqwestTransportBuilder, TransportConfig};

/// Sends built requests over the network.
///
/// Implementations must return a future that does no work until polled and
/// that resolves exactly once.
pub trait Transport: Send + Sync {
    /// Send a request.
    fn send(&self, request: HttpRequest) -> BoxFuture<'static, Result<RawResponse, TransportError>>;
}

/// A complete response as received from the network.
#[derive(Clone)]
pub struct RawResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: http::HeaderMap,
    /// Raw body bytes.
    pub body: Bytes,
}

impl RawResponse {
    /// Create a response with no headers.
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: http::HeaderMap::new(),
            body: body.into(),
        }
    }

    /// Check if the response indicates success (2xx status).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Get a specific header value.
    pub fn header(&self, name: impl AsRef<str>) -> Option<&str> {
        self.headers
            .get(name.as_ref())
            .and_then(|v| v.to_str().ok())
    }

    /// The body as text, replacing invalid UTF-8.
    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

impl fmt::Debug for RawResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawResponse")
            .field("status", &self.status)
            .field("body_len", &self.body.len())
            .finish()
    }
}

/// Classification of a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportErrorKind {
    /// The request timed out.
    Timeout,
    /// Connection refused or failed.
    Connect,
    /// Redirect limit exceeded or redirect loop.
    Redirect,
    /// Reading the response body failed.
    Body,
    /// The server answered with a non-success status.
    Status,
    /// The request could not be constructed by the transport.
    Builder,
    /// Any other protocol-level failure.
    Request,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "timeout"),
            Self::Connect => write!(f, "connection error"),
            Self::Redirect => write!(f, "redirect error"),
            Self::Body => write!(f, "body error"),
            Self::Status => write!(f, "HTTP status"),
            Self::Builder => write!(f, "request builder error"),
            Self::Request => write!(f, "request error"),
        }
    }
}

/// A failure produced by the transport.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct TransportError {
    kind: TransportErrorKind,
    message: String,
    status: Option<u16>,
}

impl TransportError {
    /// Create a transport error.
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
        }
    }

    /// Create an error for a non-success HTTP status.
    pub fn status(status: u16) -> Self {
        let reason = http::StatusCode::from_u16(status)
            .ok()
            .and_then(|code| code.canonical_reason())
            .unwrap_or("unknown status");
        Self {
            kind: TransportErrorKind::Status,
            message: format!("{status} {reason}"),
            status: Some(status),
        }
    }

    /// The failure classification.
    pub fn kind(&self) -> TransportErrorKind {
        self.kind
    }

    /// The failure message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The HTTP status, if one was received.
    pub fn status_code(&self) -> Option<u16> {
        self.status
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            TransportErrorKind::Timeout
        } else if err.is_connect() {
            TransportErrorKind::Connect
        } else if err.is_redirect() {
            TransportErrorKind::Redirect
        } else if err.is_body() || err.is_decode() {
            TransportErrorKind::Body
        } else if err.is_builder() {
            TransportErrorKind::Builder
        } else {
            TransportErrorKind::Request
        };
        Self {
            kind,
            message: err.to_string(),
            status: err.status().map(|s| s.as_u16()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error() {
        let err = TransportError::status(503);
        assert_eq!(err.kind(), TransportErrorKind::Status);
        assert_eq!(err.status_code(), Some(503));
        assert_eq!(err.to_string(), "HTTP status: 503 Service Unavailable");
    }

    #[test]
    fn test_raw_response_helpers() {
        let mut response = RawResponse::new(204, "");
        response
            .headers
            .insert("x-request-id", http::HeaderValue::from_static("abc"));

        assert!(response.is_success());
        assert_eq!(response.header("x-request-id"), Some("abc"));
        assert!(!RawResponse::new(404, "").is_success());
    }
}
