//! The service facade.
//!
//! [`Service`] is the single entry point for outbound requests. Each operation
//! returns a cold [`Call`] that builds the request, executes it once, and
//! decodes the response with the matching policy:
//!
//! | Operation                  | Request              | Decode                          |
//! |----------------------------|----------------------|---------------------------------|
//! | [`fetch`]                  | GraphQL query        | envelope, errors take priority  |
//! | [`apply_mutation`]         | GraphQL mutation     | envelope, errors take priority  |
//! | [`request`]                | REST route           | strict model                    |
//! | [`request_list`]           | REST route           | strict list                     |
//! | [`request_optional`]       | REST route           | lenient optional                |
//! | [`request_pagination`]     | continuation URL     | strict model                    |
//!
//! [`fetch`]: Service::fetch
//! [`apply_mutation`]: Service::apply_mutation
//! [`request`]: Service::request
//! [`request_list`]: Service::request_list
//! [`request_optional`]: Service::request_optional
//! [`request_pagination`]: Service::request_pagination

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::call::{Call, CallState, CallTracker};
use crate::decode;
use crate::error::{ClientError, Result};
use crate::graphql::{GraphQLRequest, Mutation, QuerySet};
use crate::identity::ClientIdentity;
use crate::logging::targets;
use crate::request::HttpRequest;
use crate::rest::{RequestBuilder, Route};
use crate::transport::{RawResponse, ReqwestTransport, Transport, TransportError, TransportExecutor};

/// Internal state shared by clones of a [`Service`].
struct ServiceInner {
    identity: ClientIdentity,
    executor: TransportExecutor,
}

impl ServiceInner {
    fn builder(&self) -> RequestBuilder<'_> {
        RequestBuilder::new(&self.identity)
    }

    /// Hand a built request to the transport and classify the status.
    async fn send(
        &self,
        request: HttpRequest,
        tracker: &CallTracker,
        check_status: fn(RawResponse) -> Result<RawResponse>,
    ) -> Result<RawResponse> {
        tracker.advance(CallState::Built);
        tracker.advance(CallState::InFlight);
        let response = self
            .executor
            .execute(request)
            .await
            .map_err(|e| ClientError::request(e, None))?;
        check_status(response)
    }

    async fn send_rest(&self, request: HttpRequest, tracker: &CallTracker) -> Result<RawResponse> {
        self.send(request, tracker, decode::check_rest_status).await
    }

    async fn send_graph<A: DeserializeOwned>(
        &self,
        request: GraphQLRequest,
        tracker: &CallTracker,
    ) -> Result<A> {
        tracing::debug!(
            target: targets::GRAPHQL,
            operation_type = ?request.operation_type(),
            operation_name = request.operation_name.as_deref().unwrap_or(""),
            variables = request.variables.len(),
            "Built GraphQL request"
        );
        let http = self
            .builder()
            .build_json_post(&self.identity.endpoints().graphql, request.to_body())?;
        let response = self.send(http, tracker, decode::check_graph_status).await?;
        decode::decode_graph_envelope(&response.body)
    }
}

/// The gateway client.
///
/// Cheap to clone; clones share the transport and identity. There is no
/// global instance: construct one per session and pass it where needed.
///
/// # Example
///
/// ```ignore
/// use platform_gateway::{ClientIdentity, Endpoints, Route, Service};
///
/// let identity = ClientIdentity::builder(
///     "shop-desktop",
///     Endpoints::new("https://api.example.com/v1", "https://api.example.com/graphql"),
/// )
/// .token(token)
/// .build();
///
/// let service = Service::with_default_transport(identity)?;
/// let orders: Vec<Order> = service.request_list(Route::get("/orders")).await?;
/// ```
#[derive(Clone)]
pub struct Service {
    inner: Arc<ServiceInner>,
}

impl Service {
    /// Create a service over an explicit transport.
    pub fn new(transport: Arc<dyn Transport>, identity: ClientIdentity) -> Self {
        Self {
            inner: Arc::new(ServiceInner {
                identity,
                executor: TransportExecutor::new(transport),
            }),
        }
    }

    /// Create a service over a [`ReqwestTransport`] with default configuration.
    pub fn with_default_transport(identity: ClientIdentity) -> std::result::Result<Self, TransportError> {
        let transport = ReqwestTransport::new()?;
        Ok(Self::new(Arc::new(transport), identity))
    }

    /// The identity sent with every request.
    pub fn identity(&self) -> &ClientIdentity {
        &self.inner.identity
    }

    /// A service with a different identity, sharing this one's transport.
    ///
    /// Calls already created from `self` keep the identity they were created
    /// with.
    pub fn with_identity(&self, identity: ClientIdentity) -> Self {
        Self {
            inner: Arc::new(ServiceInner {
                identity,
                executor: self.inner.executor.clone(),
            }),
        }
    }

    /// Run a GraphQL query composed from a set of fragments.
    ///
    /// A set that cannot be rendered (an argument or variable that failed to
    /// serialize, or two selections under one response key) ends the call with
    /// [`ClientError::InvalidInput`] and no network access.
    pub fn fetch<A>(&self, query: QuerySet) -> Call<A>
    where
        A: DeserializeOwned + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        Call::new("fetch", move |tracker| async move {
            let request = GraphQLRequest::from_query_set(&query)?;
            inner.send_graph(request, &tracker).await
        })
    }

    /// Run a GraphQL mutation.
    ///
    /// The input is serialized before anything is sent; a failure there ends
    /// the call with [`ClientError::InvalidInput`] and no network access.
    pub fn apply_mutation<A, I>(&self, mutation: Mutation<I>) -> Call<A>
    where
        A: DeserializeOwned + Send + 'static,
        I: Serialize + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        Call::new("apply_mutation", move |tracker| async move {
            let request = GraphQLRequest::from_mutation(&mutation)?;
            inner.send_graph(request, &tracker).await
        })
    }

    /// Request a REST route and strictly decode one model.
    pub fn request<M>(&self, route: Route) -> Call<M>
    where
        M: DeserializeOwned + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        Call::new("request", move |tracker| async move {
            let request = inner.builder().build(&route)?;
            let response = inner.send_rest(request, &tracker).await?;
            decode::decode_model(&response.body)
        })
    }

    /// Request a REST route and strictly decode a list of models.
    ///
    /// One bad element fails the whole call.
    pub fn request_list<M>(&self, route: Route) -> Call<Vec<M>>
    where
        M: DeserializeOwned + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        Call::new("request_list", move |tracker| async move {
            let request = inner.builder().build(&route)?;
            let response = inner.send_rest(request, &tracker).await?;
            decode::decode_models(&response.body)
        })
    }

    /// Request a REST route and leniently decode an optional model.
    ///
    /// A missing or malformed body yields `Ok(None)`. URL, transport and
    /// status failures are still reported.
    pub fn request_optional<M>(&self, route: Route) -> Call<Option<M>>
    where
        M: DeserializeOwned + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        Call::new("request_optional", move |tracker| async move {
            let request = inner.builder().build(&route)?;
            let response = inner.send_rest(request, &tracker).await?;
            Ok(decode::decode_optional_model(&response.body))
        })
    }

    /// Request the next page from a continuation URL and strictly decode it.
    ///
    /// The URL is validated before any network access and otherwise used
    /// verbatim; a malformed one ends the call with
    /// [`ClientError::InvalidPaginationUrl`].
    pub fn request_pagination<M>(&self, url: impl Into<String>) -> Call<M>
    where
        M: DeserializeOwned + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        let url = url.into();
        Call::new("request_pagination", move |tracker| async move {
            let request = inner.builder().build_pagination(&url)?;
            let response = inner.send_rest(request, &tracker).await?;
            decode::decode_model(&response.body)
        })
    }
}

impl std::fmt::Debug for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Service")
            .field("identity", &self.inner.identity)
            .finish_non_exhaustive()
    }
}
