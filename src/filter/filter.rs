use serde_json::Value;
use uuid::Uuid;

use crate::types::{Document, ID_FIELD};

use super::error::FilterError;
use super::filter_match::FilterMatch;
use super::filter_where::FilterWhere;
use super::types::{FilterNode, FilterOp, FilterWhereInfo, SqlResult};

/// A document filter: a list of conditions that must all hold.
///
/// An empty filter matches every document in a collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    nodes: Vec<FilterNode>,
}

impl Filter {
    pub fn all() -> Self {
        Self::default()
    }

    /// Parse a Mongo-style JSON filter such as
    /// `{"client_name": "Acme", "attached_to_client.client_id": {"$in": [..]}}`.
    pub fn parse(where_data: &Value) -> Result<Self, FilterError> {
        Ok(Self { nodes: FilterWhere::parse(where_data)? })
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::condition(field.into(), FilterOp::Eq, value.into())
    }

    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::condition(field.into(), FilterOp::Ne, value.into())
    }

    pub fn id(id: Uuid) -> Self {
        Self::eq(ID_FIELD, id.to_string())
    }

    pub fn any_of(field: impl Into<String>, values: Vec<Value>) -> Self {
        Self::condition(field.into(), FilterOp::In, Value::Array(values))
    }

    fn condition(column: String, operator: FilterOp, data: Value) -> Self {
        Self {
            nodes: vec![FilterNode::Condition(FilterWhereInfo { column, operator, data })],
        }
    }

    pub fn and(mut self, other: Filter) -> Self {
        self.nodes.extend(other.nodes);
        self
    }

    /// Split into the nodes that touch no field selected by `predicate` and
    /// the nodes that touch at least one.
    pub fn partition(self, predicate: impl Fn(&str) -> bool) -> (Filter, Filter) {
        let (touching, rest): (Vec<_>, Vec<_>) = self
            .nodes
            .into_iter()
            .partition(|node| node.columns().into_iter().any(&predicate));
        (Self { nodes: rest }, Self { nodes: touching })
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[FilterNode] {
        &self.nodes
    }

    /// Evaluate the filter against an in-memory document
    pub fn matches(&self, document: &Document) -> bool {
        FilterMatch::matches_all(&self.nodes, document)
    }

    /// Render the filter as a SQL predicate over the JSONB `column`.
    /// Placeholders are numbered after `starting_param_index`.
    pub fn to_where_sql(&self, column: &str, starting_param_index: usize) -> Result<SqlResult, FilterError> {
        FilterWhere::generate(&self.nodes, column, starting_param_index)
    }

    /// Field names are dotted paths of `[A-Za-z_][A-Za-z0-9_]*` segments
    pub fn validate_field(name: &str) -> Result<(), FilterError> {
        let valid = !name.is_empty()
            && name.split('.').all(|segment| {
                let mut chars = segment.chars();
                match chars.next() {
                    Some(first) if first.is_ascii_alphabetic() || first == '_' => {
                        chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
                    }
                    _ => false,
                }
            });

        if valid {
            Ok(())
        } else {
            Err(FilterError::InvalidField(name.to_string()))
        }
    }
}
