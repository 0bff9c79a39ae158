//! Request construction from routes and client identity.

use http::header::{ACCEPT, ACCEPT_LANGUAGE, AUTHORIZATION, HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use serde_json::{Map, Value};
use url::Url;

use super::route::Route;
use crate::error::{ClientError, Result};
use crate::identity::ClientIdentity;
use crate::logging::targets;
use crate::request::{HttpMethod, HttpRequest, MultipartBody, RequestBody, headers};

/// Turns routes into fully-formed requests for one identity.
///
/// Header policy, applied to every request:
///
/// - `Authorization: Bearer <token>` when the identity has a token and the
///   request requires authentication
/// - `X-App-Id`, `Accept-Language`, `X-Currency`, `X-Build-Version`
/// - `User-Agent: <app id>/<build version> (Rust)` and `Accept: application/json`
///
/// # Example
///
/// ```ignore
/// let request = RequestBuilder::new(&identity).build(&Route::get("/me"))?;
/// assert_eq!(request.url.as_str(), "https://api.example.com/v1/me");
/// ```
#[derive(Clone, Copy, Debug)]
pub struct RequestBuilder<'a> {
    identity: &'a ClientIdentity,
}

impl<'a> RequestBuilder<'a> {
    /// Create a builder for `identity`.
    pub fn new(identity: &'a ClientIdentity) -> Self {
        Self { identity }
    }

    /// Build the request for a route.
    ///
    /// Fails with [`ClientError::InvalidUrl`] when the REST base endpoint and
    /// the route path do not compose into a valid URL, and with
    /// [`ClientError::InvalidInput`] when a route parameter failed to
    /// serialize or an identity header value is not a valid header.
    pub fn build(&self, route: &Route) -> Result<HttpRequest> {
        if let Some(reason) = route.rejection() {
            return Err(ClientError::invalid_input_reason(reason));
        }

        let url_text = compose_url(&self.identity.endpoints().rest_base, route.path());
        let mut url = parse_http_url(&url_text)?;

        let parameters = route.parameter_map();
        let body = if let Some(upload) = route.file_upload() {
            RequestBody::Multipart(MultipartBody {
                fields: flatten_parameters(parameters),
                file: upload.clone(),
            })
        } else if route.method().encodes_query() {
            if !parameters.is_empty() {
                url.query_pairs_mut()
                    .extend_pairs(flatten_parameters(parameters));
            }
            RequestBody::None
        } else if parameters.is_empty() {
            RequestBody::None
        } else {
            RequestBody::Json(Value::Object(parameters.clone()))
        };

        tracing::debug!(
            target: targets::REST,
            method = %route.method(),
            url = %url,
            authenticated = route.is_authenticated(),
            "Built REST request"
        );

        Ok(HttpRequest {
            method: route.method(),
            url,
            headers: self.identity_headers(route.is_authenticated())?,
            body,
        })
    }

    /// Build a GET request for an already-absolute URL, used verbatim.
    pub fn build_absolute(&self, url: Url) -> Result<HttpRequest> {
        Ok(HttpRequest {
            method: HttpMethod::Get,
            url,
            headers: self.identity_headers(true)?,
            body: RequestBody::None,
        })
    }

    /// Build a GET request for a continuation URL taken from a prior response.
    ///
    /// The text is validated but otherwise used verbatim; no path composition
    /// takes place. Fails with [`ClientError::InvalidPaginationUrl`].
    pub fn build_pagination(&self, url: &str) -> Result<HttpRequest> {
        let url = parse_http_url(url).map_err(|err| match err {
            ClientError::InvalidUrl { url, source } => ClientError::invalid_pagination_url(url, source),
            other => other,
        })?;
        tracing::debug!(target: targets::REST, url = %url, "Built pagination request");
        self.build_absolute(url)
    }

    /// Build a JSON POST to an absolute endpoint given as text.
    pub fn build_json_post(&self, endpoint: &str, body: Value) -> Result<HttpRequest> {
        let url = parse_http_url(endpoint)?;
        Ok(HttpRequest {
            method: HttpMethod::Post,
            url,
            headers: self.identity_headers(true)?,
            body: RequestBody::Json(body),
        })
    }

    /// The identity headers, with the auth header when `authenticated` and a
    /// token is present.
    ///
    /// A value that is not a valid header (a token with a line break, say)
    /// fails with [`ClientError::InvalidInput`] rather than being left out,
    /// so an authenticated request is never sent anonymously.
    pub fn identity_headers(&self, authenticated: bool) -> Result<HeaderMap> {
        let identity = self.identity;
        let mut map = HeaderMap::new();

        if authenticated && let Some(token) = identity.token() {
            insert_header(&mut map, AUTHORIZATION, &format!("Bearer {token}"), true)?;
        }
        insert_header(&mut map, HeaderName::from_static(headers::APP_ID), identity.app_id(), false)?;
        insert_header(&mut map, ACCEPT_LANGUAGE, identity.language(), false)?;
        insert_header(&mut map, HeaderName::from_static(headers::CURRENCY), identity.currency(), false)?;
        insert_header(
            &mut map,
            HeaderName::from_static(headers::BUILD_VERSION),
            identity.build_version(),
            false,
        )?;
        insert_header(&mut map, USER_AGENT, &identity.user_agent(), false)?;
        map.insert(ACCEPT, HeaderValue::from_static("application/json"));
        Ok(map)
    }
}

/// Join a base endpoint and a relative path.
///
/// A trailing `/` on the base is dropped and a leading `/` on the path is
/// added when missing, so `("https://a.io/v1/", "users")` and
/// `("https://a.io/v1", "/users")` both give `https://a.io/v1/users`.
pub fn compose_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    }
}

fn parse_http_url(text: &str) -> Result<Url> {
    let url = Url::parse(text).map_err(|e| ClientError::invalid_url(text, e))?;
    if url.cannot_be_a_base() {
        return Err(ClientError::invalid_url(
            text,
            url::ParseError::RelativeUrlWithCannotBeABaseBase,
        ));
    }
    Ok(url)
}

fn insert_header(map: &mut HeaderMap, name: HeaderName, value: &str, sensitive: bool) -> Result<()> {
    match HeaderValue::from_str(value) {
        Ok(mut value) => {
            value.set_sensitive(sensitive);
            map.insert(name, value);
            Ok(())
        }
        Err(e) => {
            // The value itself stays out of the log; it may be a credential.
            tracing::warn!(target: targets::REST, "Rejecting invalid '{}' header value: {}", name, e);
            Err(ClientError::invalid_input_reason(format!(
                "invalid value for header '{name}': {e}"
            )))
        }
    }
}

/// Flatten parameters into name/value text pairs, one per parameter.
///
/// Strings are sent verbatim, other scalars as their JSON text, and arrays
/// and objects as compact JSON. `null` is skipped. Query strings and
/// multipart text parts share this encoding.
fn flatten_parameters(parameters: &Map<String, Value>) -> Vec<(String, String)> {
    parameters
        .iter()
        .filter_map(|(name, value)| parameter_text(value).map(|text| (name.clone(), text)))
        .collect()
}

fn parameter_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
