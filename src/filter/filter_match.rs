use serde_json::Value;

use crate::types::{values_at, Document};

use super::types::{FilterNode, FilterOp, FilterWhereInfo};

/// In-process evaluation of a filter tree, with the same lax array
/// semantics as the SQL rendering in `FilterWhere`.
pub struct FilterMatch;

impl FilterMatch {
    pub fn matches_all(nodes: &[FilterNode], document: &Document) -> bool {
        nodes.iter().all(|node| Self::matches(node, document))
    }

    pub fn matches(node: &FilterNode, document: &Document) -> bool {
        match node {
            FilterNode::Condition(condition) => Self::matches_condition(condition, document),
            FilterNode::And(children) => children.iter().all(|c| Self::matches(c, document)),
            FilterNode::Or(children) => children.iter().any(|c| Self::matches(c, document)),
            FilterNode::Not(inner) => !Self::matches(inner, document),
        }
    }

    fn matches_condition(condition: &FilterWhereInfo, document: &Document) -> bool {
        let values = values_at(document, &condition.column);
        match condition.operator {
            FilterOp::Eq => Self::equals(&values, &condition.data),
            FilterOp::Ne => !Self::equals(&values, &condition.data),
            FilterOp::In => Self::any_of(&values, &condition.data),
            FilterOp::NIn => !Self::any_of(&values, &condition.data),
            FilterOp::Exists => condition
                .data
                .as_bool()
                .map(|expected| values.is_empty() != expected)
                .unwrap_or(false),
        }
    }

    fn equals(values: &[&Value], data: &Value) -> bool {
        if data.is_null() {
            // null matches a missing field as well as an explicit null
            values.iter().all(|v| v.is_null())
        } else {
            values.iter().any(|v| *v == data)
        }
    }

    fn any_of(values: &[&Value], data: &Value) -> bool {
        match data.as_array() {
            Some(candidates) => values.iter().any(|v| candidates.contains(v)),
            None => false,
        }
    }
}
