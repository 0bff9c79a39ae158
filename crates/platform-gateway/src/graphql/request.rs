//! GraphQL request bodies.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::document::{QueryBuilder, QuerySet};
use super::mutation::Mutation;
use crate::error::Result;

/// A GraphQL operation type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    /// A query operation (read-only).
    #[default]
    Query,
    /// A mutation operation (modifies data).
    Mutation,
}

/// The JSON body POSTed to the GraphQL endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphQLRequest {
    /// The GraphQL document.
    pub query: String,

    /// Variables for the document.
    pub variables: Map<String, Value>,

    /// Optional operation name.
    #[serde(skip_serializing_if = "Option::is_none", rename = "operationName")]
    pub operation_name: Option<String>,

    /// The operation type (not serialized, used internally).
    #[serde(skip)]
    pub(crate) operation_type: OperationType,
}

impl GraphQLRequest {
    /// Build the request for a query set.
    ///
    /// Fails with [`ClientError::InvalidInput`](crate::ClientError::InvalidInput)
    /// when the set cannot be rendered into a valid document.
    pub fn from_query_set(set: &QuerySet) -> Result<Self> {
        Ok(Self {
            query: QueryBuilder::build(set)?,
            variables: set.variables().clone(),
            operation_name: set.name().map(str::to_owned),
            operation_type: OperationType::Query,
        })
    }

    /// Build the request for a mutation, serializing its input.
    pub fn from_mutation<I: Serialize>(mutation: &Mutation<I>) -> Result<Self> {
        let (query, variables) = QueryBuilder::build_mutation(mutation)?;
        Ok(Self {
            query,
            variables,
            operation_name: mutation.name().map(str::to_owned),
            operation_type: OperationType::Mutation,
        })
    }

    /// Get the operation type.
    pub fn operation_type(&self) -> OperationType {
        self.operation_type
    }

    /// The request as a JSON body.
    pub fn to_body(&self) -> Value {
        let mut body = Map::new();
        body.insert("query".into(), Value::String(self.query.clone()));
        body.insert("variables".into(), Value::Object(self.variables.clone()));
        if let Some(ref name) = self.operation_name {
            body.insert("operationName".into(), Value::String(name.clone()));
        }
        Value::Object(body)
    }
}
