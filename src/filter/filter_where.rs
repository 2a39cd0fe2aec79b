use serde_json::{json, Value};

use super::error::FilterError;
use super::filter::Filter;
use super::types::{FilterNode, FilterOp, FilterWhereInfo, SqlResult};

/// Parses JSON filters and renders them as PostgreSQL `jsonb_path_exists`
/// predicates. Paths are written in lax mode with `[*]` after every segment,
/// so arrays anywhere along the path are searched element by element.
pub struct FilterWhere {
    column: String,
    param_values: Vec<Value>,
    param_index: usize,
}

impl FilterWhere {
    pub fn new(column: &str, starting_param_index: usize) -> Self {
        Self {
            column: column.to_string(),
            param_values: vec![],
            param_index: starting_param_index,
        }
    }

    pub fn generate(nodes: &[FilterNode], column: &str, starting_param_index: usize) -> Result<SqlResult, FilterError> {
        let mut filter_where = Self::new(column, starting_param_index);
        let query = filter_where.build_all(nodes)?;
        Ok(SqlResult { query, params: filter_where.param_values })
    }

    pub fn parse(where_data: &Value) -> Result<Vec<FilterNode>, FilterError> {
        match where_data {
            Value::Null => Ok(vec![]),
            Value::Object(obj) => {
                let mut nodes = Vec::new();
                for (key, value) in obj {
                    if key.starts_with('$') {
                        nodes.push(Self::parse_logical_operator(key, value)?);
                    } else {
                        nodes.extend(Self::parse_field_condition(key, value)?);
                    }
                }
                Ok(nodes)
            }
            _ => Err(FilterError::InvalidWhereClause("filter must be an object".to_string())),
        }
    }

    fn parse_logical_operator(op: &str, value: &Value) -> Result<FilterNode, FilterError> {
        match op {
            "$and" | "$or" => {
                let arr = value
                    .as_array()
                    .ok_or_else(|| FilterError::InvalidOperatorData(format!("{} requires array", op)))?;
                let mut children = Vec::with_capacity(arr.len());
                for v in arr {
                    children.push(Self::group(Self::parse(v)?));
                }
                Ok(if op == "$and" { FilterNode::And(children) } else { FilterNode::Or(children) })
            }
            "$not" => Ok(FilterNode::Not(Box::new(Self::group(Self::parse(value)?)))),
            _ => Err(FilterError::UnsupportedOperator(op.to_string())),
        }
    }

    fn parse_field_condition(field: &str, value: &Value) -> Result<Vec<FilterNode>, FilterError> {
        Filter::validate_field(field)?;

        if let Value::Object(obj) = value {
            if !obj.is_empty() && obj.keys().all(|k| k.starts_with('$')) {
                let mut nodes = Vec::with_capacity(obj.len());
                for (op_key, op_val) in obj {
                    let operator = FilterOp::from_key(op_key)
                        .ok_or_else(|| FilterError::UnsupportedOperator(op_key.to_string()))?;
                    Self::check_operator_data(operator, op_val)?;
                    nodes.push(FilterNode::Condition(FilterWhereInfo {
                        column: field.to_string(),
                        operator,
                        data: op_val.clone(),
                    }));
                }
                return Ok(nodes);
            }
        }

        // Implicit equality: { field: value }
        Self::check_operator_data(FilterOp::Eq, value)?;
        Ok(vec![FilterNode::Condition(FilterWhereInfo {
            column: field.to_string(),
            operator: FilterOp::Eq,
            data: value.clone(),
        })])
    }

    fn check_operator_data(operator: FilterOp, data: &Value) -> Result<(), FilterError> {
        let scalar = |v: &Value| !v.is_object() && !v.is_array();
        match operator {
            FilterOp::Eq | FilterOp::Ne if !scalar(data) => Err(FilterError::InvalidOperatorData(
                "equality requires a scalar value".to_string(),
            )),
            FilterOp::In | FilterOp::NIn => match data.as_array() {
                Some(values) if values.iter().all(scalar) => Ok(()),
                _ => Err(FilterError::InvalidOperatorData("$in/$nin require an array of scalars".to_string())),
            },
            FilterOp::Exists if !data.is_boolean() => {
                Err(FilterError::InvalidOperatorData("$exists requires a boolean".to_string()))
            }
            _ => Ok(()),
        }
    }

    fn group(mut nodes: Vec<FilterNode>) -> FilterNode {
        if nodes.len() == 1 {
            if let Some(node) = nodes.pop() {
                return node;
            }
        }
        FilterNode::And(nodes)
    }

    fn build_all(&mut self, nodes: &[FilterNode]) -> Result<String, FilterError> {
        match nodes {
            [] => Ok("TRUE".to_string()),
            [single] => self.build_node(single),
            many => self.join(many, " AND ", "TRUE"),
        }
    }

    fn join(&mut self, nodes: &[FilterNode], joiner: &str, empty: &str) -> Result<String, FilterError> {
        if nodes.is_empty() {
            return Ok(empty.to_string());
        }
        let mut parts = Vec::with_capacity(nodes.len());
        for node in nodes {
            parts.push(format!("({})", self.build_node(node)?));
        }
        Ok(parts.join(joiner))
    }

    fn build_node(&mut self, node: &FilterNode) -> Result<String, FilterError> {
        match node {
            FilterNode::Condition(condition) => self.build_sql_condition(condition),
            FilterNode::And(children) => self.join(children, " AND ", "TRUE"),
            FilterNode::Or(children) => self.join(children, " OR ", "FALSE"),
            FilterNode::Not(inner) => Ok(format!("NOT ({})", self.build_node(inner)?)),
        }
    }

    fn build_sql_condition(&mut self, condition: &FilterWhereInfo) -> Result<String, FilterError> {
        let path = Self::json_path(&condition.column)?;
        match condition.operator {
            FilterOp::Eq => Ok(self.equals(&path, &condition.data)),
            FilterOp::Ne => Ok(format!("NOT ({})", self.equals(&path, &condition.data))),
            FilterOp::In => Ok(self.any_of(&path, &condition.data)),
            FilterOp::NIn => Ok(format!("NOT ({})", self.any_of(&path, &condition.data))),
            FilterOp::Exists => {
                let exists = format!("jsonb_path_exists({}, '{}'::jsonpath)", self.column, path);
                match condition.data.as_bool() {
                    Some(true) => Ok(exists),
                    Some(false) => Ok(format!("NOT {}", exists)),
                    None => Err(FilterError::InvalidOperatorData("$exists requires a boolean".to_string())),
                }
            }
        }
    }

    fn equals(&mut self, path: &str, data: &Value) -> String {
        if data.is_null() {
            return format!("NOT jsonb_path_exists({}, '{} ? (@ != null)'::jsonpath)", self.column, path);
        }
        let vars = self.param(json!({ "value": data }));
        format!("jsonb_path_exists({}, '{} ? (@ == $value)'::jsonpath, {})", self.column, path, vars)
    }

    fn any_of(&mut self, path: &str, data: &Value) -> String {
        match data.as_array() {
            Some(values) if !values.is_empty() => {
                let vars = self.param(json!({ "values": values }));
                format!("jsonb_path_exists({}, '{} ? (@ == $values[*])'::jsonpath, {})", self.column, path, vars)
            }
            _ => "FALSE".to_string(),
        }
    }

    fn json_path(column: &str) -> Result<String, FilterError> {
        Filter::validate_field(column)?;
        let mut path = String::from("$");
        for segment in column.split('.') {
            path.push_str(&format!(".\"{}\"[*]", segment));
        }
        Ok(path)
    }

    fn param(&mut self, value: Value) -> String {
        self.param_values.push(value);
        self.param_index += 1;
        format!("${}", self.param_index)
    }
}
