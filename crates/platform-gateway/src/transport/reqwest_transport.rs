//! The production transport, backed by `reqwest`.

use std::time::Duration;

use futures_util::future::BoxFuture;
use reqwest::redirect::Policy;

use super::{RawResponse, Transport, TransportError, TransportErrorKind};
use crate::logging::targets;
use crate::request::{HttpRequest, RequestBody};

/// Configuration for the HTTP transport.
#[derive(Clone, Debug)]
pub struct TransportConfig {
    /// Request timeout.
    pub timeout: Option<Duration>,
    /// Connect timeout.
    pub connect_timeout: Option<Duration>,
    /// Whether to follow redirects.
    pub follow_redirects: bool,
    /// Maximum number of redirects to follow.
    pub max_redirects: usize,
    /// Proxy URL.
    pub proxy: Option<String>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_secs(30)),
            connect_timeout: Some(Duration::from_secs(10)),
            follow_redirects: true,
            max_redirects: 10,
            proxy: None,
        }
    }
}

/// Builder for a [`ReqwestTransport`] with custom configuration.
#[derive(Debug, Default)]
pub struct ReqwestTransportBuilder {
    config: TransportConfig,
}

impl ReqwestTransportBuilder {
    /// Create a new builder with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    /// Disable request timeout.
    pub fn no_timeout(mut self) -> Self {
        self.config.timeout = None;
        self
    }

    /// Set the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = Some(timeout);
        self
    }

    /// Disable redirect following.
    pub fn no_redirects(mut self) -> Self {
        self.config.follow_redirects = false;
        self
    }

    /// Set the maximum number of redirects to follow.
    pub fn max_redirects(mut self, max: usize) -> Self {
        self.config.max_redirects = max;
        self
    }

    /// Set a proxy URL.
    pub fn proxy(mut self, proxy_url: impl Into<String>) -> Self {
        self.config.proxy = Some(proxy_url.into());
        self
    }

    /// Build the transport.
    pub fn build(self) -> Result<ReqwestTransport, TransportError> {
        let mut builder = reqwest::Client::builder();

        if let Some(timeout) = self.config.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(connect_timeout) = self.config.connect_timeout {
            builder = builder.connect_timeout(connect_timeout);
        }

        if self.config.follow_redirects {
            builder = builder.redirect(Policy::limited(self.config.max_redirects));
        } else {
            builder = builder.redirect(Policy::none());
        }

        if let Some(ref proxy_url) = self.config.proxy {
            let proxy = reqwest::Proxy::all(proxy_url).map_err(|e| {
                TransportError::new(TransportErrorKind::Builder, format!("invalid proxy: {e}"))
            })?;
            builder = builder.proxy(proxy);
        }

        let client = builder.build()?;
        Ok(ReqwestTransport {
            client,
            config: self.config,
        })
    }
}

/// A [`Transport`] over a pooled `reqwest::Client`.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    config: TransportConfig,
}

impl ReqwestTransport {
    /// Create a transport with default configuration.
    pub fn new() -> Result<Self, TransportError> {
        ReqwestTransportBuilder::new().build()
    }

    /// Create a builder for configuring a new transport.
    pub fn builder() -> ReqwestTransportBuilder {
        ReqwestTransportBuilder::new()
    }

    /// Get the transport's configuration.
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, request: HttpRequest) -> BoxFuture<'static, Result<RawResponse, TransportError>> {
        let client = self.client.clone();
        Box::pin(async move {
            let HttpRequest {
                method,
                url,
                headers,
                body,
            } = request;

            let mut builder = client.request(method.to_reqwest(), url).headers(headers);
            builder = match body {
                RequestBody::None => builder,
                RequestBody::Json(ref value) => builder.json(value),
                RequestBody::Multipart(ref multipart) => builder.multipart(multipart.to_reqwest()),
            };

            let response = builder.send().await?;
            let status = response.status().as_u16();
            let headers = response.headers().clone();
            let body = response.bytes().await.map_err(|e| {
                tracing::debug!(target: targets::TRANSPORT, error = %e, "Failed to read response body");
                TransportError::from(e)
            })?;

            Ok(RawResponse {
                status,
                headers,
                body,
            })
        })
    }
}

impl std::fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestTransport")
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TransportConfig::default();
        assert_eq!(config.timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.connect_timeout, Some(Duration::from_secs(10)));
        assert!(config.follow_redirects);
        assert_eq!(config.max_redirects, 10);
        assert!(config.proxy.is_none());
    }

    #[test]
    fn test_builder() {
        let transport = ReqwestTransport::builder()
            .timeout(Duration::from_secs(5))
            .no_redirects()
            .build()
            .unwrap();

        assert_eq!(transport.config().timeout, Some(Duration::from_secs(5)));
        assert!(!transport.config().follow_redirects);
    }

    #[test]
    fn test_builder_no_timeout() {
        let transport = ReqwestTransport::builder().no_timeout().build().unwrap();
        assert!(transport.config().timeout.is_none());
    }

    #[test]
    fn test_invalid_proxy() {
        let err = ReqwestTransport::builder()
            .proxy("not a proxy url")
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), TransportErrorKind::Builder);
    }
}
