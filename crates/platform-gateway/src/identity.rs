//! Client identity and endpoint configuration.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Server endpoints the client talks to.
///
/// Endpoints are kept as strings and validated when a request is built, so a
/// bad value surfaces as [`ClientError::InvalidUrl`](crate::ClientError::InvalidUrl)
/// on the call that uses it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoints {
    /// Base URL that REST route paths are appended to.
    pub rest_base: String,
    /// The single GraphQL endpoint URL.
    pub graphql: String,
}

impl Endpoints {
    /// Create an endpoint configuration.
    pub fn new(rest_base: impl Into<String>, graphql: impl Into<String>) -> Self {
        Self {
            rest_base: rest_base.into(),
            graphql: graphql.into(),
        }
    }
}

/// Who the client is, sent with every request.
///
/// Identities are immutable. Changing the auth token produces a new value via
/// [`with_token`](Self::with_token); existing values, and calls built from
/// them, are unaffected.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    app_id: String,
    endpoints: Endpoints,
    token: Option<String>,
    language: String,
    currency: String,
    build_version: String,
}

impl ClientIdentity {
    /// Create a builder for an identity.
    pub fn builder(app_id: impl Into<String>, endpoints: Endpoints) -> ClientIdentityBuilder {
        ClientIdentityBuilder::new(app_id, endpoints)
    }

    /// The application identifier.
    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    /// The configured endpoints.
    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// The auth token, if signed in.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Preferred response language.
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Preferred currency code.
    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Client build version.
    pub fn build_version(&self) -> &str {
        &self.build_version
    }

    /// The user agent string, `<app id>/<build version> (Rust)`.
    pub fn user_agent(&self) -> String {
        format!("{}/{} (Rust)", self.app_id, self.build_version)
    }

    /// A copy of this identity carrying `token`.
    pub fn with_token(&self, token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            ..self.clone()
        }
    }

    /// A copy of this identity without a token.
    pub fn without_token(&self) -> Self {
        Self {
            token: None,
            ..self.clone()
        }
    }
}

impl fmt::Debug for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientIdentity")
            .field("app_id", &self.app_id)
            .field("endpoints", &self.endpoints)
            .field("has_token", &self.token.is_some())
            .field("language", &self.language)
            .field("currency", &self.currency)
            .field("build_version", &self.build_version)
            .finish()
    }
}

/// Builder for [`ClientIdentity`].
pub struct ClientIdentityBuilder {
    app_id: String,
    endpoints: Endpoints,
    token: Option<String>,
    language: String,
    currency: String,
    build_version: String,
}

impl ClientIdentityBuilder {
    /// Create a builder with English/USD defaults.
    pub fn new(app_id: impl Into<String>, endpoints: Endpoints) -> Self {
        Self {
            app_id: app_id.into(),
            endpoints,
            token: None,
            language: "en".into(),
            currency: "USD".into(),
            build_version: env!("CARGO_PKG_VERSION").into(),
        }
    }

    /// Set the auth token.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set the preferred language.
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Set the preferred currency.
    pub fn currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    /// Set the client build version.
    pub fn build_version(mut self, version: impl Into<String>) -> Self {
        self.build_version = version.into();
        self
    }

    /// Build the identity.
    pub fn build(self) -> ClientIdentity {
        ClientIdentity {
            app_id: self.app_id,
            endpoints: self.endpoints,
            token: self.token,
            language: self.language,
            currency: self.currency,
            build_version: self.build_version,
        }
    }
}
