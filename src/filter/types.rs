use serde_json::Value;

/// Comparison operators understood by the filter language
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    In,
    NIn,
    Exists,
}

impl FilterOp {
    pub fn from_key(key: &str) -> Option<Self> {
        Some(match key {
            "$eq" => FilterOp::Eq,
            "$ne" | "$neq" => FilterOp::Ne,
            "$in" => FilterOp::In,
            "$nin" => FilterOp::NIn,
            "$exists" => FilterOp::Exists,
            _ => return None,
        })
    }
}

/// A single `field <op> data` comparison
#[derive(Debug, Clone, PartialEq)]
pub struct FilterWhereInfo {
    pub column: String,
    pub operator: FilterOp,
    pub data: Value,
}

/// Parsed filter tree. Sibling nodes are implicitly AND-ed.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterNode {
    Condition(FilterWhereInfo),
    And(Vec<FilterNode>),
    Or(Vec<FilterNode>),
    Not(Box<FilterNode>),
}

impl FilterNode {
    /// Every field path the node compares against
    pub fn columns(&self) -> Vec<&str> {
        match self {
            FilterNode::Condition(info) => vec![info.column.as_str()],
            FilterNode::And(nodes) | FilterNode::Or(nodes) => nodes.iter().flat_map(FilterNode::columns).collect(),
            FilterNode::Not(node) => node.columns(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<Value>,
}
