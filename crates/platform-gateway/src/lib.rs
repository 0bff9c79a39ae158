//! Gateway client for a platform exposing a REST JSON API and a GraphQL API.
//!
//! This crate is the single path for outbound requests:
//!
//! - **Request construction**: REST routes plus client identity become fully
//!   formed requests (URL, headers, query string, JSON or multipart body)
//! - **GraphQL composition**: independently authored fragments merge into one
//!   document; mutation input serializes into variables
//! - **Execution**: one network attempt per call over a shared, pooled
//!   transport, cancellable while in flight
//! - **Decoding**: strict, list and lenient REST policies, and envelope-aware
//!   GraphQL decoding where server errors take priority over data
//! - **Errors**: every failure is classified into one [`ClientError`] variant
//!
//! # Service
//!
//! ```ignore
//! use platform_gateway::{ClientIdentity, Endpoints, Route, Service};
//!
//! let identity = ClientIdentity::builder(
//!     "shop-desktop",
//!     Endpoints::new("https://api.example.com/v1", "https://api.example.com/graphql"),
//! )
//! .build();
//! let service = Service::with_default_transport(identity)?;
//!
//! // REST
//! let product: Product = service
//!     .request(Route::get("/products/42").parameter("expand", "variants"))
//!     .await?;
//!
//! // Next page, from a URL embedded in a prior response
//! let page: Page<Order> = service.request_pagination(next_url).await?;
//! ```
//!
//! ## GraphQL
//!
//! ```ignore
//! use platform_gateway::graphql::{Field, QuerySet};
//!
//! let set = QuerySet::new(Field::new("viewer").select("id"))
//!     .with(Field::new("viewer").select("email"));
//!
//! // Sends `query { viewer { id email } }`
//! let me: Me = service.fetch(set).await?;
//! ```
//!
//! # Cancellation
//!
//! Every operation returns a [`Call`]. Dropping it, or cancelling the
//! [`CallHandle`] returned by [`Call::spawn`], cancels the network operation
//! and guarantees nothing is delivered afterwards:
//!
//! ```ignore
//! let handle = service.request::<Product>(Route::get("/products/42")).spawn();
//! handle.cancel();
//! assert!(handle.wait().await.is_none());
//! ```
//!
//! # Logging
//!
//! The crate logs through `tracing`; see [`logging`] for the targets.

pub mod call;
pub mod decode;
mod error;
pub mod graphql;
mod identity;
pub mod logging;
pub mod request;
pub mod rest;
mod service;
pub mod transport;

pub use error::{ClientError, ErrorKind, ErrorLocation, PathSegment, Result, ServerError};

// Re-export commonly used types at the crate root
pub use call::{Call, CallHandle, CallId, CallState};
pub use decode::GraphEnvelope;
pub use graphql::{Field, Mutation, QuerySet};
pub use identity::{ClientIdentity, ClientIdentityBuilder, Endpoints};
pub use request::{FileUpload, HttpMethod, HttpRequest, RequestBody};
pub use rest::{RequestBuilder, Route};
pub use service::Service;
pub use transport::{
    RawResponse, ReqwestTransport, ReqwestTransportBuilder, Transport, TransportConfig,
    TransportError, TransportErrorKind,
};
