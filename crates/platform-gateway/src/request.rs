//! HTTP request types.
//!
//! [`HttpRequest`] is the fully-formed request handed to a transport. It is
//! produced by the REST [`RequestBuilder`](crate::rest::RequestBuilder) and by
//! the GraphQL request path; transports never compose URLs or headers
//! themselves.

use bytes::Bytes;
use serde_json::Value;

/// Header names set on every outbound request.
pub mod headers {
    /// Application identifier header.
    pub const APP_ID: &str = "x-app-id";
    /// Preferred currency header.
    pub const CURRENCY: &str = "x-currency";
    /// Client build version header.
    pub const BUILD_VERSION: &str = "x-build-version";
}

/// HTTP request methods.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// HTTP GET method.
    Get,
    /// HTTP POST method.
    Post,
    /// HTTP PUT method.
    Put,
    /// HTTP DELETE method.
    Delete,
    /// HTTP PATCH method.
    Patch,
    /// HTTP HEAD method.
    Head,
}

impl HttpMethod {
    /// Convert to reqwest method.
    pub(crate) fn to_reqwest(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Post => reqwest::Method::POST,
            Self::Put => reqwest::Method::PUT,
            Self::Delete => reqwest::Method::DELETE,
            Self::Patch => reqwest::Method::PATCH,
            Self::Head => reqwest::Method::HEAD,
        }
    }

    /// Whether parameters for this method travel in the query string.
    pub fn encodes_query(self) -> bool {
        matches!(self, Self::Get | Self::Head | Self::Delete)
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
            Self::Put => write!(f, "PUT"),
            Self::Delete => write!(f, "DELETE"),
            Self::Patch => write!(f, "PATCH"),
            Self::Head => write!(f, "HEAD"),
        }
    }
}

/// A file attached to a request as a multipart part.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileUpload {
    /// Form field name of the file part.
    pub field_name: String,
    /// File name reported to the server.
    pub file_name: String,
    /// MIME type of the file.
    pub mime_type: String,
    /// File contents.
    pub bytes: Bytes,
}

impl FileUpload {
    /// Create an upload with the `application/octet-stream` MIME type.
    pub fn new(
        field_name: impl Into<String>,
        file_name: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        Self {
            field_name: field_name.into(),
            file_name: file_name.into(),
            mime_type: "application/octet-stream".into(),
            bytes: bytes.into(),
        }
    }

    /// Set the MIME type.
    pub fn mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }
}

/// Multipart form contents: text fields followed by a single file part.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MultipartBody {
    /// Text fields, in insertion order.
    pub fields: Vec<(String, String)>,
    /// The file part.
    pub file: FileUpload,
}

impl MultipartBody {
    /// Convert to a reqwest form.
    pub(crate) fn to_reqwest(&self) -> reqwest::multipart::Form {
        let mut form = reqwest::multipart::Form::new();
        for (name, value) in &self.fields {
            form = form.text(name.clone(), value.clone());
        }

        let file = &self.file;
        let part = reqwest::multipart::Part::bytes(file.bytes.to_vec())
            .file_name(file.file_name.clone());
        let part = part.mime_str(&file.mime_type).unwrap_or_else(|e| {
            tracing::warn!(
                target: crate::logging::targets::TRANSPORT,
                "Invalid MIME type '{}': {}",
                file.mime_type,
                e
            );
            // mime_str consumed the part; rebuild it without the type
            reqwest::multipart::Part::bytes(file.bytes.to_vec()).file_name(file.file_name.clone())
        });
        form.part(file.field_name.clone(), part)
    }
}

/// The body of an HTTP request.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum RequestBody {
    /// No body.
    #[default]
    None,
    /// JSON body.
    Json(Value),
    /// Multipart form body (file upload).
    Multipart(MultipartBody),
}

/// A built HTTP request ready to be sent.
#[derive(Clone, Debug)]
pub struct HttpRequest {
    /// The HTTP method.
    pub method: HttpMethod,
    /// The request URL, query string included.
    pub url: url::Url,
    /// Request headers.
    pub headers: http::HeaderMap,
    /// Request body.
    pub body: RequestBody,
}

impl HttpRequest {
    /// Get a specific header value.
    pub fn header(&self, name: impl AsRef<str>) -> Option<&str> {
        self.headers
            .get(name.as_ref())
            .and_then(|v| v.to_str().ok())
    }

    /// The query string pairs, decoded.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    /// The JSON body, if any.
    pub fn json_body(&self) -> Option<&Value> {
        match &self.body {
            RequestBody::Json(value) => Some(value),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_query_encoding() {
        assert!(HttpMethod::Get.encodes_query());
        assert!(HttpMethod::Delete.encodes_query());
        assert!(!HttpMethod::Post.encodes_query());
        assert!(!HttpMethod::Patch.encodes_query());
    }

    #[test]
    fn test_method_display() {
        assert_eq!(HttpMethod::Put.to_string(), "PUT");
        assert_eq!(HttpMethod::Get.to_reqwest(), reqwest::Method::GET);
    }

    #[test]
    fn test_file_upload_defaults() {
        let upload = FileUpload::new("avatar", "me.png", vec![1u8, 2, 3]).mime_type("image/png");
        assert_eq!(upload.mime_type, "image/png");
        assert_eq!(upload.bytes.len(), 3);
    }
}
