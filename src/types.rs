/// Shared types used across the codebase

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// A stored document: a JSON object keyed by field name
pub type Document = Map<String, Value>;

/// Field holding the store-assigned identifier of every document
pub const ID_FIELD: &str = "id";

/// Document collections known to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Clients,
    Services,
    Contacts,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Clients => "clients",
            Collection::Services => "services",
            Collection::Contacts => "contacts",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Collect the values found at a dotted path.
///
/// Arrays met along the way (and at the end of the path) are unwrapped, so
/// `attached_to_client.client_id` yields every `client_id` of every element.
pub fn values_at<'a>(document: &'a Document, path: &str) -> Vec<&'a Value> {
    let mut segments = path.split('.');
    let Some(head) = segments.next() else {
        return Vec::new();
    };

    let mut current: Vec<&Value> = match document.get(head) {
        Some(value) => unwrap_arrays(value),
        None => return Vec::new(),
    };

    for segment in segments {
        current = current
            .into_iter()
            .filter_map(|value| value.as_object().and_then(|obj| obj.get(segment)))
            .flat_map(unwrap_arrays)
            .collect();
    }

    current
}

fn unwrap_arrays(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn values_at_reads_top_level_field() {
        let d = doc(json!({ "client_name": "Acme" }));
        assert_eq!(values_at(&d, "client_name"), vec![&json!("Acme")]);
    }

    #[test]
    fn values_at_unwraps_arrays_of_objects() {
        let d = doc(json!({
            "attached_to_client": [{ "client_id": "a" }, { "client_id": "b" }, { "other": 1 }]
        }));
        assert_eq!(values_at(&d, "attached_to_client.client_id"), vec![&json!("a"), &json!("b")]);
    }

    #[test]
    fn values_at_missing_path_is_empty() {
        let d = doc(json!({ "attached_to_client": [] }));
        assert!(values_at(&d, "attached_to_client.client_id").is_empty());
        assert!(values_at(&d, "nope").is_empty());
    }

    #[test]
    fn collection_names() {
        assert_eq!(Collection::Clients.to_string(), "clients");
        assert_eq!(serde_json::to_value(Collection::Contacts).unwrap(), json!("contacts"));
    }
}
