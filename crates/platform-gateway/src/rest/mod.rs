//! REST request construction.
//!
//! A [`Route`] describes one REST endpoint call; a [`RequestBuilder`] turns it
//! into an [`HttpRequest`](crate::HttpRequest) for a given
//! [`ClientIdentity`](crate::ClientIdentity).
//!
//! # Example
//!
//! ```ignore
//! use platform_gateway::rest::{RequestBuilder, Route};
//!
//! let route = Route::get("/orders").parameter("status", "open");
//! let request = RequestBuilder::new(&identity).build(&route)?;
//! ```

mod builder;
mod route;

pub use builder::{RequestBuilder, compose_url};
pub use route::Route;
