pub mod entity;
pub mod root;
pub mod services;

use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::filter::Filter;

/// Query string of list endpoints
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// JSON filter, e.g. `{"client_name":{"$in":["Acme","Globex"]}}`
    pub filter: Option<String>,
}

/// Parse a path identifier, rejecting malformed values with a 400
pub fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::validation_error(format!("Invalid id: {}", raw)))
}

/// Parse the `filter` query parameter; absent or blank means everything
pub fn parse_filter(raw: Option<&str>) -> Result<Filter, ApiError> {
    let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Ok(Filter::all());
    };
    let value: serde_json::Value =
        serde_json::from_str(raw).map_err(|e| ApiError::bad_request(format!("Invalid filter: {}", e)))?;
    Filter::parse(&value).map_err(|e| ApiError::bad_request(format!("Invalid filter: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_parameter() {
        assert!(parse_filter(None).unwrap().is_empty());
        assert!(parse_filter(Some("  ")).unwrap().is_empty());
        assert_eq!(parse_filter(Some(r#"{"client_name":"Acme"}"#)).unwrap(), Filter::eq("client_name", "Acme"));

        let err = parse_filter(Some("{not json")).unwrap_err();
        assert!(err.message().starts_with("Invalid filter"));
        assert!(parse_filter(Some(r#"{"client_name":{"$regex":"A"}}"#)).is_err());
        assert!(parse_filter(Some(r#"{"bad-field":1}"#)).is_err());
    }
}
