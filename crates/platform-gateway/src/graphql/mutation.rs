//! GraphQL mutations with typed input.

use serde::Serialize;
use serde_json::{Map, Value};

use super::document::QueryBuilder;
use crate::error::{ClientError, Result};

/// A mutation document plus the typed input it is executed with.
///
/// By default the input itself must serialize to a JSON object, whose keys
/// become the operation variables. With [`input_variable`](Self::input_variable)
/// the whole input is nested under one variable instead, matching documents
/// written as `mutation Checkout($input: CheckoutInput!) { ... }`.
///
/// # Example
///
/// ```ignore
/// #[derive(Serialize)]
/// struct AddToCart { sku: String, quantity: u32 }
///
/// let mutation = Mutation::new(
///     "mutation Add($input: AddToCartInput!) { addToCart(input: $input) { count } }",
///     AddToCart { sku: "A-1".into(), quantity: 2 },
/// )
/// .input_variable("input");
/// ```
#[derive(Clone, Debug)]
pub struct Mutation<I> {
    document: String,
    input: I,
    variable: Option<String>,
    operation_name: Option<String>,
}

impl<I: Serialize> Mutation<I> {
    /// Create a mutation whose input serializes to the variables object.
    pub fn new(document: impl Into<String>, input: I) -> Self {
        Self {
            document: document.into(),
            input,
            variable: None,
            operation_name: None,
        }
    }

    /// Nest the whole input under the variable `name`.
    pub fn input_variable(mut self, name: impl Into<String>) -> Self {
        self.variable = Some(name.into());
        self
    }

    /// Set the operation name.
    pub fn operation_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }

    /// The mutation document.
    pub fn document(&self) -> &str {
        &self.document
    }

    /// The typed input.
    pub fn input(&self) -> &I {
        &self.input
    }

    /// The operation name, if set.
    pub fn name(&self) -> Option<&str> {
        self.operation_name.as_deref()
    }

    /// Serialize the input into the wire variable set.
    ///
    /// Fails with [`ClientError::InvalidInput`] when the input cannot be
    /// represented as JSON, or when it is not an object and no input variable
    /// name is configured. A `null` input yields no variables.
    pub fn variables(&self) -> Result<Map<String, Value>> {
        let value = serde_json::to_value(&self.input).map_err(ClientError::invalid_input)?;
        match (&self.variable, value) {
            (Some(name), value) => {
                let mut map = Map::new();
                map.insert(name.clone(), value);
                Ok(map)
            }
            (None, Value::Object(map)) => Ok(map),
            (None, Value::Null) => Ok(Map::new()),
            (None, other) => Err(ClientError::InvalidInput {
                reason: format!(
                    "input must serialize to a JSON object, got {}",
                    json_type_name(&other)
                ),
                source: None,
            }),
        }
    }
}

impl QueryBuilder {
    /// Build the document and variable set for a mutation.
    pub fn build_mutation<I: Serialize>(
        mutation: &Mutation<I>,
    ) -> Result<(String, Map<String, Value>)> {
        let variables = mutation.variables()?;
        Ok((mutation.document.clone(), variables))
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
