//! GraphQL query documents composed from independent fragments.
//!
//! Screens and features author their own [`QueryFragment`]s. A [`QuerySet`]
//! groups them, and [`QueryBuilder::build`] merges the set into one `query`
//! document: fields requested by several fragments appear once, their nested
//! selections are merged, and the output order is the order in which fields
//! were first declared. The same set therefore always renders to the same
//! bytes.
//!
//! Building fails with [`ClientError::InvalidInput`] when an argument or
//! variable could not be serialized, or when two different selections claim
//! the same response key.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{ClientError, Result};
use crate::logging::targets;

/// A field argument value.
#[derive(Clone, Debug, PartialEq)]
pub enum Argument {
    /// A literal value.
    Value(Value),
    /// A reference to an operation variable, rendered as `$name`.
    Variable(String),
    /// An enum value, rendered bare.
    Enum(String),
}

impl Argument {
    fn render(&self, out: &mut String) {
        match self {
            Self::Value(value) => render_literal(value, out),
            Self::Variable(name) => {
                out.push('$');
                out.push_str(name);
            }
            Self::Enum(name) => out.push_str(name),
        }
    }
}

/// A field selection, possibly with an alias, arguments and sub-selections.
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    name: String,
    alias: Option<String>,
    arguments: Vec<(String, Argument)>,
    selections: Vec<Field>,
    rejected: Option<String>,
}

impl Field {
    /// Create a leaf field.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
            arguments: Vec::new(),
            selections: Vec::new(),
            rejected: None,
        }
    }

    /// Set the response alias.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Add a literal argument.
    ///
    /// A value that fails to serialize marks the field invalid; any set
    /// containing it fails to build.
    pub fn argument(mut self, name: impl Into<String>, value: impl Serialize) -> Self {
        let name = name.into();
        match serde_json::to_value(value) {
            Ok(value) => self.arguments.push((name, Argument::Value(value))),
            Err(e) => {
                tracing::error!(
                    target: targets::GRAPHQL,
                    "Failed to serialize argument '{}' of '{}': {}",
                    name,
                    self.name,
                    e
                );
                self.rejected
                    .get_or_insert_with(|| format!("argument '{name}' of field '{}': {e}", self.name));
            }
        }
        self
    }

    /// Add an argument bound to an operation variable.
    pub fn variable(mut self, name: impl Into<String>, variable: impl Into<String>) -> Self {
        self.arguments
            .push((name.into(), Argument::Variable(variable.into())));
        self
    }

    /// Add an enum-valued argument.
    pub fn enum_argument(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.arguments.push((name.into(), Argument::Enum(value.into())));
        self
    }

    /// Add a nested selection.
    pub fn select(mut self, field: impl Into<Field>) -> Self {
        self.selections.push(field.into());
        self
    }

    /// Add several nested selections.
    pub fn select_all<F: Into<Field>>(mut self, fields: impl IntoIterator<Item = F>) -> Self {
        self.selections.extend(fields.into_iter().map(Into::into));
        self
    }

    /// The field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The key this field appears under in the response.
    pub fn response_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    /// The nested selections.
    pub fn selections(&self) -> &[Field] {
        &self.selections
    }

    fn rendered_arguments(&self) -> String {
        let mut out = String::new();
        if self.arguments.is_empty() {
            return out;
        }
        out.push('(');
        for (i, (name, argument)) in self.arguments.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            out.push_str(name);
            out.push_str(": ");
            argument.render(&mut out);
        }
        out.push(')');
        out
    }

    /// Two fields are the same selection when they share a response key,
    /// field name and arguments.
    fn same_selection(&self, other: &Field) -> bool {
        self.response_key() == other.response_key()
            && self.name == other.name
            && self.arguments == other.arguments
    }

    /// The first serialization failure in this field or below it.
    fn rejection(&self) -> Option<&str> {
        self.rejected
            .as_deref()
            .or_else(|| self.selections.iter().find_map(Field::rejection))
    }

    fn render(&self, out: &mut String) {
        if let Some(ref alias) = self.alias {
            out.push_str(alias);
            out.push_str(": ");
        }
        out.push_str(&self.name);
        out.push_str(&self.rendered_arguments());
        if !self.selections.is_empty() {
            render_selection_set(&self.selections, out);
        }
    }
}

impl From<&str> for Field {
    fn from(name: &str) -> Self {
        Field::new(name)
    }
}

impl From<String> for Field {
    fn from(name: String) -> Self {
        Field::new(name)
    }
}

/// An independently authored, non-empty list of top-level selections.
#[derive(Clone, Debug, PartialEq)]
pub struct QueryFragment {
    fields: Vec<Field>,
}

impl QueryFragment {
    /// Create a fragment with its first field.
    pub fn new(first: impl Into<Field>) -> Self {
        Self {
            fields: vec![first.into()],
        }
    }

    /// Add another top-level field.
    pub fn field(mut self, field: impl Into<Field>) -> Self {
        self.fields.push(field.into());
        self
    }

    /// The top-level fields.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }
}

impl From<Field> for QueryFragment {
    fn from(field: Field) -> Self {
        QueryFragment::new(field)
    }
}

impl From<&str> for QueryFragment {
    fn from(name: &str) -> Self {
        QueryFragment::new(name)
    }
}

/// A non-empty, ordered set of fragments sent as one GraphQL query.
#[derive(Clone, Debug, PartialEq)]
pub struct QuerySet {
    operation_name: Option<String>,
    variable_definitions: Vec<(String, String)>,
    variables: Map<String, Value>,
    fragments: Vec<QueryFragment>,
    rejected: Option<String>,
}

impl QuerySet {
    /// Create a set with its first fragment.
    pub fn new(first: impl Into<QueryFragment>) -> Self {
        Self {
            operation_name: None,
            variable_definitions: Vec::new(),
            variables: Map::new(),
            fragments: vec![first.into()],
            rejected: None,
        }
    }

    /// Add another fragment.
    pub fn with(mut self, fragment: impl Into<QueryFragment>) -> Self {
        self.fragments.push(fragment.into());
        self
    }

    /// Set the operation name.
    pub fn operation_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }

    /// Declare a variable with its GraphQL type (e.g. `ID!`) and value.
    ///
    /// Redeclaring a variable replaces its type and value. A value that fails
    /// to serialize is not declared, and the set then fails to build.
    pub fn variable(
        mut self,
        name: impl Into<String>,
        graphql_type: impl Into<String>,
        value: impl Serialize,
    ) -> Self {
        let name = name.into();
        let value = match serde_json::to_value(value) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!(
                    target: targets::GRAPHQL,
                    "Failed to serialize variable '{}': {}",
                    name,
                    e
                );
                self.rejected
                    .get_or_insert_with(|| format!("variable '{name}': {e}"));
                return self;
            }
        };
        let graphql_type = graphql_type.into();
        match self
            .variable_definitions
            .iter_mut()
            .find(|(existing, _)| *existing == name)
        {
            Some(definition) => definition.1 = graphql_type,
            None => self
                .variable_definitions
                .push((name.clone(), graphql_type)),
        }
        self.variables.insert(name, value);
        self
    }

    /// The fragments, in set order.
    pub fn fragments(&self) -> &[QueryFragment] {
        &self.fragments
    }

    /// The variable values.
    pub fn variables(&self) -> &Map<String, Value> {
        &self.variables
    }

    /// The operation name, if set.
    pub fn name(&self) -> Option<&str> {
        self.operation_name.as_deref()
    }

    /// Why the set cannot be sent, when a variable or argument failed to
    /// serialize.
    pub fn rejection(&self) -> Option<&str> {
        self.rejected.as_deref().or_else(|| {
            self.fragments
                .iter()
                .flat_map(|fragment| &fragment.fields)
                .find_map(Field::rejection)
        })
    }
}

/// Builds GraphQL documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryBuilder;

impl QueryBuilder {
    /// Merge all fragments of `set` into one selection list.
    ///
    /// Fails with [`ClientError::InvalidInput`] when two fields share a
    /// response key but differ in name or arguments; GraphQL cannot return
    /// both under one key, so one of them needs an alias.
    pub fn merge(set: &QuerySet) -> Result<Vec<Field>> {
        let mut merged = Vec::new();
        for fragment in &set.fragments {
            for field in &fragment.fields {
                merge_field(&mut merged, field)?;
            }
        }
        Ok(merged)
    }

    /// Build the `query` document for `set`.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let set = QuerySet::new(Field::new("viewer").select("id"))
    ///     .with(Field::new("viewer").select("name"))
    ///     .with("cartCount");
    ///
    /// assert_eq!(
    ///     QueryBuilder::build(&set)?,
    ///     "query { viewer { id name } cartCount }"
    /// );
    /// ```
    pub fn build(set: &QuerySet) -> Result<String> {
        if let Some(reason) = set.rejection() {
            return Err(ClientError::invalid_input_reason(reason));
        }
        let fields = Self::merge(set)?;
        let mut out = String::from("query");
        if let Some(ref name) = set.operation_name {
            out.push(' ');
            out.push_str(name);
        }
        if !set.variable_definitions.is_empty() {
            out.push('(');
            for (i, (name, graphql_type)) in set.variable_definitions.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push('$');
                out.push_str(name);
                out.push_str(": ");
                out.push_str(graphql_type);
            }
            out.push(')');
        }
        render_selection_set(&fields, &mut out);
        Ok(out)
    }
}

fn merge_field(target: &mut Vec<Field>, field: &Field) -> Result<()> {
    let key = field.response_key();
    let index = match target.iter().position(|existing| existing.response_key() == key) {
        Some(index) if target[index].same_selection(field) => index,
        Some(_) => {
            tracing::warn!(target: targets::GRAPHQL, "Conflicting selections for '{}'", key);
            return Err(ClientError::invalid_input_reason(format!(
                "conflicting selections for response key '{key}'; alias one of them"
            )));
        }
        None => {
            target.push(Field {
                selections: Vec::new(),
                ..field.clone()
            });
            target.len() - 1
        }
    };
    for child in &field.selections {
        merge_field(&mut target[index].selections, child)?;
    }
    Ok(())
}

fn render_selection_set(fields: &[Field], out: &mut String) {
    out.push_str(" {");
    for field in fields {
        out.push(' ');
        field.render(out);
    }
    out.push_str(" }");
}

/// Render a JSON value as a GraphQL input literal.
fn render_literal(value: &Value, out: &mut String) {
    match value {
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {
            // JSON scalars, strings included, are valid GraphQL literals.
            out.push_str(&value.to_string());
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                render_literal(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            out.push('{');
            for (i, (key, item)) in map.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(key);
                out.push_str(": ");
                render_literal(item, out);
            }
            out.push('}');
        }
    }
}
