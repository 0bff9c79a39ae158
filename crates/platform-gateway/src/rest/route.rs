//! REST route descriptors.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::request::{FileUpload, HttpMethod};

/// A logical REST endpoint: method, path, parameters, auth requirement and
/// an optional file upload.
///
/// Routes are cheap, constructed per call, and relative to the REST base
/// endpoint of the [`ClientIdentity`](crate::ClientIdentity) they are built
/// with.
///
/// # Example
///
/// ```ignore
/// let route = Route::get("/products")
///     .parameter("category", "shoes")
///     .parameter("page", 2)
///     .public();
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Route {
    method: HttpMethod,
    path: String,
    parameters: Map<String, Value>,
    requires_auth: bool,
    upload: Option<FileUpload>,
    // First parameter that failed to serialize; building the request fails on it.
    rejected: Option<String>,
}

impl Route {
    /// Create a route. Authentication is required by default.
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            parameters: Map::new(),
            requires_auth: true,
            upload: None,
            rejected: None,
        }
    }

    /// Create a GET route.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    /// Create a POST route.
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    /// Create a PUT route.
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, path)
    }

    /// Create a PATCH route.
    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Patch, path)
    }

    /// Create a DELETE route.
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    /// Set a parameter value.
    ///
    /// A value that cannot be serialized is not sent with a gap in its place:
    /// the route is marked invalid and
    /// [`RequestBuilder::build`](super::RequestBuilder::build) fails with
    /// [`ClientError::InvalidInput`](crate::ClientError::InvalidInput).
    pub fn parameter(mut self, name: impl Into<String>, value: impl Serialize) -> Self {
        let name = name.into();
        match serde_json::to_value(value) {
            Ok(value) => {
                self.parameters.insert(name, value);
            }
            Err(e) => {
                tracing::error!(
                    target: crate::logging::targets::REST,
                    "Failed to serialize route parameter '{}': {}",
                    name,
                    e
                );
                self.rejected
                    .get_or_insert_with(|| format!("route parameter '{name}': {e}"));
            }
        }
        self
    }

    /// Set multiple parameters from a JSON object.
    pub fn parameters(mut self, parameters: Map<String, Value>) -> Self {
        self.parameters.extend(parameters);
        self
    }

    /// Mark the route as not requiring authentication.
    pub fn public(mut self) -> Self {
        self.requires_auth = false;
        self
    }

    /// Set whether the route requires authentication.
    pub fn requires_auth(mut self, requires_auth: bool) -> Self {
        self.requires_auth = requires_auth;
        self
    }

    /// Attach a file upload; the request is sent as multipart form data.
    pub fn upload(mut self, upload: FileUpload) -> Self {
        self.upload = Some(upload);
        self
    }

    /// The HTTP method.
    pub fn method(&self) -> HttpMethod {
        self.method
    }

    /// The path relative to the base endpoint.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The route parameters.
    pub fn parameter_map(&self) -> &Map<String, Value> {
        &self.parameters
    }

    /// Whether the auth header should be sent.
    pub fn is_authenticated(&self) -> bool {
        self.requires_auth
    }

    /// The file upload, if any.
    pub fn file_upload(&self) -> Option<&FileUpload> {
        self.upload.as_ref()
    }

    /// Why the route cannot be sent, when a parameter failed to serialize.
    pub fn rejection(&self) -> Option<&str> {
        self.rejected.as_deref()
    }
}
