//! Response decoding.
//!
//! Decoding policies for REST bodies:
//!
//! - [`decode_model`]: strict; any shape mismatch is a
//!   [`ClientError::JsonDecoding`] carrying the raw body and parser error.
//! - [`decode_models`]: strict list; one bad element fails the whole list.
//! - [`decode_optional_model`]: lenient; an absent *or* malformed body is
//!   `None`. [`decode_optional_model_checked`] keeps the two apart.
//!
//! GraphQL bodies go through [`decode_graph_envelope`], where server-reported
//! errors take priority over any data that came with them.
//!
//! The status checks ([`check_rest_status`], [`check_graph_status`]) run
//! before decoding and turn non-2xx responses into classified failures.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{ClientError, Result, ServerError};
use crate::logging::targets;
use crate::transport::{RawResponse, TransportError};

/// The outcome of decoding a body into `M`.
pub type Decoded<M> = Result<M>;

/// The outer GraphQL response structure.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GraphEnvelope<A = Value> {
    /// The data returned by the operation.
    pub data: Option<A>,

    /// Errors that occurred during execution.
    #[serde(default)]
    pub errors: Option<Vec<ServerError>>,

    /// Additional response metadata.
    #[serde(default)]
    pub extensions: Option<Value>,
}

impl<A> GraphEnvelope<A> {
    /// Check if the envelope carries at least one error.
    pub fn has_errors(&self) -> bool {
        self.first_error().is_some()
    }

    /// Get the first error, if any.
    pub fn first_error(&self) -> Option<&ServerError> {
        self.errors.as_ref().and_then(|errors| errors.first())
    }

    /// Get all errors as a combined message.
    pub fn error_message(&self) -> Option<String> {
        let errors = self.errors.as_ref().filter(|errors| !errors.is_empty())?;
        Some(
            errors
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

fn is_blank(body: &[u8]) -> bool {
    body.iter().all(u8::is_ascii_whitespace)
}

/// Strictly decode a body into `M`.
///
/// An empty body is [`ClientError::EmptyResponse`].
pub fn decode_model<M: DeserializeOwned>(body: &[u8]) -> Decoded<M> {
    if is_blank(body) {
        return Err(ClientError::EmptyResponse);
    }
    serde_json::from_slice(body).map_err(|e| {
        tracing::debug!(target: targets::DECODE, error = %e, "Strict decode failed");
        ClientError::json_decoding(body, e)
    })
}

/// Strictly decode a JSON array into a list of `M`.
///
/// Any element that fails to decode fails the whole list; there is no
/// partial result.
pub fn decode_models<M: DeserializeOwned>(body: &[u8]) -> Decoded<Vec<M>> {
    decode_model::<Vec<M>>(body)
}

/// Leniently decode a body into `M`.
///
/// Both an absent body (empty or `null`) and a malformed one resolve to
/// `None`; the malformed case is logged at `warn` level and otherwise
/// dropped. Use [`decode_optional_model_checked`] to tell them apart.
pub fn decode_optional_model<M: DeserializeOwned>(body: &[u8]) -> Option<M> {
    match decode_optional_model_checked(body) {
        Ok(model) => model,
        Err(err) => {
            tracing::warn!(
                target: targets::DECODE,
                error = %err,
                "Discarding malformed body in lenient decode"
            );
            None
        }
    }
}

/// Decode a body into `M`, treating only an absent body as `None`.
///
/// An empty body or JSON `null` is `Ok(None)`; a body that does not match
/// `M` is [`ClientError::JsonDecoding`].
pub fn decode_optional_model_checked<M: DeserializeOwned>(body: &[u8]) -> Decoded<Option<M>> {
    if is_blank(body) {
        return Ok(None);
    }
    serde_json::from_slice::<Option<M>>(body).map_err(|e| ClientError::json_decoding(body, e))
}

/// Decode a GraphQL response body into its data payload.
///
/// Policy, in order:
///
/// 1. a non-empty `errors` list fails with the first error, even when `data`
///    is also present
/// 2. otherwise a non-null `data` is decoded into `A`
/// 3. otherwise the response is [`ClientError::EmptyResponse`]
pub fn decode_graph_envelope<A: DeserializeOwned>(body: &[u8]) -> Decoded<A> {
    if is_blank(body) {
        return Err(ClientError::EmptyResponse);
    }
    let envelope: GraphEnvelope = serde_json::from_slice(body)
        .map_err(|e| ClientError::json_decoding(body, e))?;

    if let Some(first) = envelope.first_error() {
        tracing::debug!(
            target: targets::DECODE,
            errors = envelope.errors.as_ref().map_or(0, Vec::len),
            "GraphQL response carries errors: {}",
            envelope.error_message().unwrap_or_default()
        );
        return Err(ClientError::server(first.clone(), body));
    }

    match envelope.data {
        Some(data) => serde_json::from_value(data).map_err(|e| ClientError::json_decoding(body, e)),
        None => Err(ClientError::EmptyResponse),
    }
}

/// REST error bodies the platform is known to send.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RestErrorEnvelope {
    /// `{"error": {"message": "...", "code": "..."}}`
    Nested { error: RestErrorBody },
    /// `{"error": "invalid_grant", "error_description": "..."}`
    Flat {
        error: String,
        #[serde(default)]
        error_description: Option<String>,
    },
    /// `{"errors": [{"message": "..."}]}`
    List { errors: Vec<ServerError> },
    /// `{"message": "...", "code": 42}`
    Message {
        message: String,
        #[serde(default)]
        code: Option<Value>,
    },
}

#[derive(Debug, Deserialize)]
struct RestErrorBody {
    message: String,
    #[serde(default)]
    code: Option<Value>,
}

impl RestErrorEnvelope {
    fn into_server_error(self) -> Option<ServerError> {
        match self {
            Self::Nested { error } => Some(with_code(ServerError::new(error.message), error.code)),
            Self::Flat {
                error,
                error_description,
            } => Some(ServerError::new(error_description.unwrap_or_else(|| error.clone())).with_code(error)),
            Self::List { errors } => errors.into_iter().next(),
            Self::Message { message, code } => Some(with_code(ServerError::new(message), code)),
        }
    }
}

fn with_code(error: ServerError, code: Option<Value>) -> ServerError {
    match code {
        Some(Value::String(code)) => error.with_code(code),
        Some(Value::Null) | None => error,
        Some(other) => error.with_code(other.to_string()),
    }
}

/// Parse a REST error envelope from a body, if it is one.
pub fn rest_error(body: &[u8]) -> Option<ServerError> {
    serde_json::from_slice::<RestErrorEnvelope>(body)
        .ok()
        .and_then(RestErrorEnvelope::into_server_error)
}

/// Pass 2xx REST responses through; classify everything else.
///
/// A non-2xx body that is a REST error envelope becomes
/// [`ClientError::Decode`]; any other non-2xx response becomes
/// [`ClientError::Request`] carrying the response.
pub fn check_rest_status(response: RawResponse) -> Result<RawResponse> {
    if response.is_success() {
        return Ok(response);
    }
    if let Some(error) = rest_error(&response.body) {
        return Err(ClientError::server(error, &response.body));
    }
    Err(ClientError::request(
        TransportError::status(response.status),
        Some(response),
    ))
}

/// Pass 2xx GraphQL responses through; classify everything else.
///
/// Server-reported errors in a non-2xx body take priority over the status.
pub fn check_graph_status(response: RawResponse) -> Result<RawResponse> {
    if response.is_success() {
        return Ok(response);
    }
    if let Ok(envelope) = serde_json::from_slice::<GraphEnvelope>(&response.body)
        && let Some(first) = envelope.first_error()
    {
        return Err(ClientError::server(first.clone(), &response.body));
    }
    Err(ClientError::request(
        TransportError::status(response.status),
        Some(response),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Product {
        id: u32,
        title: String,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Counter {
        x: u32,
    }

    #[test]
    fn test_decode_model() {
        let product: Product = decode_model(br#"{"id": 1, "title": "Lamp"}"#).unwrap();
        assert_eq!(product, Product { id: 1, title: "Lamp".into() });
    }

    #[test]
    fn test_decode_model_mismatch_keeps_body_and_cause() {
        let err = decode_model::<Product>(br#"{"id": "one"}"#).unwrap_err();
        match err {
            ClientError::JsonDecoding { body, source } => {
                assert_eq!(body, r#"{"id": "one"}"#);
                assert!(source.is_data());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_decode_model_empty_body() {
        assert_eq!(
            decode_model::<Product>(b"  \n").unwrap_err().kind(),
            ErrorKind::EmptyResponse
        );
    }

    #[test]
    fn test_decode_models() {
        let products: Vec<Product> =
            decode_models(br#"[{"id": 1, "title": "a"}, {"id": 2, "title": "b"}]"#).unwrap();
        assert_eq!(products.len(), 2);
        assert_eq!(products[1].id, 2);
    }

    #[test]
    fn test_decode_models_is_all_or_nothing() {
        let err = decode_models::<Product>(
            br#"[{"id": 1, "title": "a"}, {"id": 2}, {"id": 3, "title": "c"}]"#,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::JsonDecoding);
    }

    #[test]
    fn test_decode_optional_model_is_lenient() {
        assert_eq!(decode_optional_model::<Product>(b"{not json"), None);
        assert_eq!(decode_optional_model::<Product>(br#"{"id": 1}"#), None);
        assert_eq!(decode_optional_model::<Product>(b""), None);
        assert_eq!(decode_optional_model::<Product>(b"null"), None);
        assert_eq!(
            decode_optional_model::<Product>(br#"{"id": 5, "title": "x"}"#),
            Some(Product { id: 5, title: "x".into() })
        );
    }

    #[test]
    fn test_decode_optional_model_checked_splits_outcomes() {
        assert!(matches!(decode_optional_model_checked::<Product>(b""), Ok(None)));
        assert!(matches!(decode_optional_model_checked::<Product>(b"null"), Ok(None)));
        assert_eq!(
            decode_optional_model_checked::<Product>(b"{not json")
                .unwrap_err()
                .kind(),
            ErrorKind::JsonDecoding
        );
    }

    #[test]
    fn test_envelope_errors_take_priority_over_data() {
        let err = decode_graph_envelope::<Counter>(br#"{"data":{"x":1},"errors":[{"message":"e"}]}"#)
            .unwrap_err();
        match err {
            ClientError::Decode { error, .. } => assert_eq!(error.message, "e"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_envelope_error_with_null_members() {
        let err = decode_graph_envelope::<Counter>(
            br#"{"data":{"x":1},"errors":[{"message":"e","locations":null,"path":null,"extensions":null}]}"#,
        )
        .unwrap_err();
        match err {
            ClientError::Decode { error, .. } => {
                assert_eq!(error.message, "e");
                assert!(error.locations.is_empty());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_envelope_first_error_is_reported() {
        let err = decode_graph_envelope::<Counter>(
            br#"{"errors":[{"message":"first","path":["x"]},{"message":"second"}]}"#,
        )
        .unwrap_err();
        assert_eq!(err.server_error().unwrap().message, "first");
    }

    #[test]
    fn test_envelope_null_data_and_errors_is_empty() {
        let err = decode_graph_envelope::<Counter>(br#"{"data":null,"errors":null}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyResponse);

        let err = decode_graph_envelope::<Counter>(br#"{}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyResponse);
    }

    #[test]
    fn test_envelope_empty_error_list_is_not_a_failure() {
        let counter: Counter = decode_graph_envelope(br#"{"data":{"x":7},"errors":[]}"#).unwrap();
        assert_eq!(counter, Counter { x: 7 });
    }

    #[test]
    fn test_envelope_data_mismatch() {
        let err = decode_graph_envelope::<Counter>(br#"{"data":{"x":"seven"}}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::JsonDecoding);
        assert!(err.raw_body().unwrap().contains("seven"));
    }

    #[test]
    fn test_envelope_not_json() {
        let err = decode_graph_envelope::<Counter>(b"<html>").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::JsonDecoding);
    }

    #[test]
    fn test_envelope_helpers() {
        let envelope: GraphEnvelope = serde_json::from_str(
            r#"{"data": null, "errors": [{"message": "a"}, {"message": "b"}]}"#,
        )
        .unwrap();
        assert!(envelope.has_errors());
        assert_eq!(envelope.error_message().as_deref(), Some("a; b"));
    }

    #[test]
    fn test_rest_error_shapes() {
        let nested = rest_error(br#"{"error": {"message": "Out of stock", "code": "OOS"}}"#).unwrap();
        assert_eq!(nested.message, "Out of stock");
        assert_eq!(nested.code(), Some("OOS"));

        let flat = rest_error(br#"{"error": "invalid_grant", "error_description": "Expired"}"#).unwrap();
        assert_eq!(flat.message, "Expired");
        assert_eq!(flat.code(), Some("invalid_grant"));

        let list = rest_error(br#"{"errors": [{"message": "Bad sku"}]}"#).unwrap();
        assert_eq!(list.message, "Bad sku");

        let message = rest_error(br#"{"message": "Nope", "code": 403}"#).unwrap();
        assert_eq!(message.code(), Some("403"));

        assert!(rest_error(b"Internal Server Error").is_none());
        assert!(rest_error(br#"{"errors": []}"#).is_none());
    }

    #[test]
    fn test_check_rest_status() {
        assert!(check_rest_status(RawResponse::new(201, "{}")).is_ok());

        let err = check_rest_status(RawResponse::new(422, r#"{"message": "Invalid email"}"#))
            .unwrap_err();
        assert_eq!(err.server_error().unwrap().message, "Invalid email");

        let err = check_rest_status(RawResponse::new(502, "upstream down")).unwrap_err();
        match err {
            ClientError::Request { source, response } => {
                assert_eq!(source.status_code(), Some(502));
                assert_eq!(response.unwrap().text_lossy(), "upstream down");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_check_graph_status() {
        let err = check_graph_status(RawResponse::new(
            400,
            r#"{"errors": [{"message": "Syntax Error"}]}"#,
        ))
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);

        let err = check_graph_status(RawResponse::new(500, "")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Request);
    }
}
