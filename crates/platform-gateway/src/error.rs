//! Error types for the gateway client.
//!
//! Every failure a call can produce is classified into exactly one
//! [`ClientError`] variant. Each variant keeps the original cause (parser
//! error, transport error, raw body text) so callers can log full detail
//! while presenting their own messages.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::transport::{RawResponse, TransportError};

/// A structured error reported by the server.
///
/// Used for both GraphQL `errors` entries and REST error envelopes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerError {
    /// The error message.
    pub message: String,

    /// Locations in the document where the error occurred.
    #[serde(
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub locations: Vec<ErrorLocation>,

    /// Path to the field that caused the error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<PathSegment>>,

    /// Additional error metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Value>,
}

impl ServerError {
    /// Create a server error with only a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            locations: Vec::new(),
            path: None,
            extensions: None,
        }
    }

    /// Attach a machine-readable code under `extensions.code`.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        let extensions = self
            .extensions
            .get_or_insert_with(|| Value::Object(Default::default()));
        if let Value::Object(map) = extensions {
            map.insert("code".into(), Value::String(code.into()));
        }
        self
    }

    /// The machine-readable error code, if the server supplied one.
    pub fn code(&self) -> Option<&str> {
        self.extensions
            .as_ref()
            .and_then(|ext| ext.get("code"))
            .and_then(Value::as_str)
    }
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref path) = self.path {
            write!(f, " (at ")?;
            for (i, segment) in path.iter().enumerate() {
                if i > 0 {
                    write!(f, ".")?;
                }
                match segment {
                    PathSegment::Field(name) => write!(f, "{name}")?,
                    PathSegment::Index(idx) => write!(f, "[{idx}]")?,
                }
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

/// Some servers send `"locations": null` instead of omitting the key.
fn null_as_empty<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// A location in a GraphQL document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorLocation {
    /// Line number (1-indexed).
    pub line: u32,
    /// Column number (1-indexed).
    pub column: u32,
}

/// A segment in an error path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    /// A field name.
    Field(String),
    /// An array index.
    Index(usize),
}

/// The closed set of failures a call can end with.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The route path and base endpoint did not compose into a valid URL.
    #[error("Invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// The supplied pagination URL is malformed.
    #[error("Invalid pagination URL '{url}': {source}")]
    InvalidPaginationUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// Request input could not be encoded for the wire: mutation input,
    /// route parameters, field arguments, query variables or header values.
    #[error("Invalid request input: {reason}")]
    InvalidInput {
        reason: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    /// The transport failed, or the server answered with an unusable status.
    #[error("Request failed: {source}")]
    Request {
        #[source]
        source: TransportError,
        /// Whatever response was received before the failure was decided.
        response: Option<RawResponse>,
    },

    /// The transport succeeded but returned no usable body or data.
    #[error("Empty response")]
    EmptyResponse,

    /// The server reported a structured error.
    #[error("Server error: {error}")]
    Decode {
        error: ServerError,
        /// Raw response body the error was read from.
        body: String,
    },

    /// The body did not parse into the expected shape.
    #[error("Failed to decode response body: {source}")]
    JsonDecoding {
        /// Raw response body text.
        body: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Fieldless mirror of [`ClientError`] for matching and log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidUrl,
    InvalidPaginationUrl,
    InvalidInput,
    Request,
    EmptyResponse,
    Decode,
    JsonDecoding,
}

impl ClientError {
    /// Create an invalid-URL error.
    pub fn invalid_url(url: impl Into<String>, source: url::ParseError) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            source,
        }
    }

    /// Create an invalid-pagination-URL error.
    pub fn invalid_pagination_url(url: impl Into<String>, source: url::ParseError) -> Self {
        Self::InvalidPaginationUrl {
            url: url.into(),
            source,
        }
    }

    /// Create an invalid-input error from a serializer failure.
    pub fn invalid_input(source: serde_json::Error) -> Self {
        Self::InvalidInput {
            reason: source.to_string(),
            source: Some(source),
        }
    }

    /// Create an invalid-input error that carries only a description.
    pub fn invalid_input_reason(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
            source: None,
        }
    }

    /// Create a transport-level error.
    pub fn request(source: TransportError, response: Option<RawResponse>) -> Self {
        Self::Request { source, response }
    }

    /// Create a server-reported error.
    pub fn server(error: ServerError, body: &[u8]) -> Self {
        Self::Decode {
            error,
            body: String::from_utf8_lossy(body).into_owned(),
        }
    }

    /// Create a JSON decoding error, keeping the raw body text.
    pub fn json_decoding(body: &[u8], source: serde_json::Error) -> Self {
        Self::JsonDecoding {
            body: String::from_utf8_lossy(body).into_owned(),
            source,
        }
    }

    /// The kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidUrl { .. } => ErrorKind::InvalidUrl,
            Self::InvalidPaginationUrl { .. } => ErrorKind::InvalidPaginationUrl,
            Self::InvalidInput { .. } => ErrorKind::InvalidInput,
            Self::Request { .. } => ErrorKind::Request,
            Self::EmptyResponse => ErrorKind::EmptyResponse,
            Self::Decode { .. } => ErrorKind::Decode,
            Self::JsonDecoding { .. } => ErrorKind::JsonDecoding,
        }
    }

    /// The server-reported error, for [`ClientError::Decode`].
    pub fn server_error(&self) -> Option<&ServerError> {
        match self {
            Self::Decode { error, .. } => Some(error),
            _ => None,
        }
    }

    /// The raw response body text, when the failure happened after a response arrived.
    pub fn raw_body(&self) -> Option<String> {
        match self {
            Self::Decode { body, .. } | Self::JsonDecoding { body, .. } => Some(body.clone()),
            Self::Request {
                response: Some(response),
                ..
            } => Some(response.text_lossy()),
            _ => None,
        }
    }

    /// Whether the failure happened before any network call was issued.
    pub fn is_pre_flight(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::InvalidUrl | ErrorKind::InvalidPaginationUrl | ErrorKind::InvalidInput
        )
    }
}

/// A specialized Result type for gateway operations.
pub type Result<T> = std::result::Result<T, ClientError>;
