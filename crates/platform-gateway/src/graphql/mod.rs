//! GraphQL document composition and request bodies.
//!
//! Queries are assembled from independently authored fragments:
//!
//! ```ignore
//! use platform_gateway::graphql::{Field, QuerySet};
//!
//! let header = Field::new("viewer").select("id").select("avatarUrl");
//! let cart = Field::new("cart").select("count");
//! let profile = Field::new("viewer").select("id").select("email");
//!
//! let set = QuerySet::new(header).with(cart).with(profile);
//! let me: Me = service.fetch(set).await?;
//! ```
//!
//! Mutations carry typed input that is serialized into variables before any
//! network access:
//!
//! ```ignore
//! use platform_gateway::graphql::Mutation;
//!
//! let mutation = Mutation::new(
//!     "mutation Update($input: ProfileInput!) { updateProfile(input: $input) { id } }",
//!     ProfileInput { name: "Ana".into() },
//! )
//! .input_variable("input");
//!
//! let updated: Updated = service.apply_mutation(mutation).await?;
//! ```

mod document;
mod mutation;
mod request;

pub use document::{Argument, Field, QueryBuilder, QueryFragment, QuerySet};
pub use mutation::Mutation;
pub use request::{GraphQLRequest, OperationType};
