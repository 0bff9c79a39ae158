//! Logging facilities for the gateway client.
//!
//! The client is instrumented with the `tracing` crate and never installs a
//! subscriber itself. To see logs, install one in your application:
//!
//! ```ignore
//! fn main() {
//!     tracing_subscriber::fmt::init();
//!
//!     // Your application code...
//! }
//! ```
//!
//! Events carry the targets below, so a filter such as
//! `platform_gateway::transport=debug` isolates one stage of the pipeline.

/// Span names used for per-call tracing.
pub mod span_names {
    /// Span wrapping one call from construction to its terminal event.
    pub const CALL: &str = "platform_gateway::call";
}

/// Target names for log filtering.
pub mod targets {
    /// REST request construction.
    pub const REST: &str = "platform_gateway::rest";
    /// GraphQL document and mutation construction.
    pub const GRAPHQL: &str = "platform_gateway::graphql";
    /// Network transport.
    pub const TRANSPORT: &str = "platform_gateway::transport";
    /// Response decoding.
    pub const DECODE: &str = "platform_gateway::decode";
    /// Call lifecycle and cancellation.
    pub const CALL: &str = "platform_gateway::call";
}
