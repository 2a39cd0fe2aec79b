use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::pipeline::Relation;
use crate::types::Collection;

use super::contact::ContactSummary;
use super::service::ServiceSummary;
use super::validation::ValidationErrors;
use super::Entity;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Client {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub client_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slack_channel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_on: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_on: Option<DateTime<Utc>>,
}

/// A client with its services and contacts resolved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientResponse {
    pub id: Uuid,
    pub client_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slack_channel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_url: Option<String>,
    #[serde(default)]
    pub managed_services: Vec<ServiceSummary>,
    #[serde(default)]
    pub client_contacts: Vec<ContactSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_on: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_on: Option<DateTime<Utc>>,
}

/// A client as it appears inside a service or contact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientSummary {
    pub id: Uuid,
    #[serde(default)]
    pub client_name: String,
}

impl Entity for Client {
    type Response = ClientResponse;

    const COLLECTION: Collection = Collection::Clients;
    const KIND: &'static str = "Client";
    const UNIQUE_FIELD: Option<&'static str> = Some("client_name");
    const RESPONSE_FIELDS: &'static [&'static str] =
        &["id", "client_name", "slack_channel", "web_url", "created_on", "modified_on"];
    const RELATIONS: &'static [Relation] = &[
        Relation {
            from: Collection::Services,
            local_field: "id",
            foreign_field: "attached_to_client.client_id",
            as_field: "managed_services",
            fields: &[
                "id",
                "service_name",
                "service_type",
                "service_status",
                "invoice_frequency",
                "invoice_amount",
                "management_fee",
            ],
        },
        Relation {
            from: Collection::Contacts,
            local_field: "id",
            foreign_field: "attached_to_client.client_id",
            as_field: "client_contacts",
            fields: &["id", "first_name", "last_name", "full_name", "email", "phone_number", "role"],
        },
    ];

    fn id(&self) -> Option<Uuid> {
        self.id
    }

    fn set_id(&mut self, id: Option<Uuid>) {
        self.id = id;
    }

    fn unique_value(&self) -> Option<&str> {
        Some(&self.client_name)
    }

    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.require("client_name", &self.client_name);
        errors.into_result()
    }

    fn created_on(&self) -> Option<DateTime<Utc>> {
        self.created_on
    }

    fn set_timestamps(&mut self, created_on: DateTime<Utc>, modified_on: DateTime<Utc>) {
        self.created_on = Some(created_on);
        self.modified_on = Some(modified_on);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn client_name_is_required() {
        let client: Client = serde_json::from_value(json!({ "web_url": "https://acme.test" })).unwrap();
        let errors = client.validate().unwrap_err();
        assert!(errors.fields().contains_key("client_name"));
    }

    #[test]
    fn optional_fields_are_omitted_when_unset() {
        let client = Client { client_name: "Acme".to_string(), ..Client::default() };
        assert_eq!(serde_json::to_value(&client).unwrap(), json!({ "client_name": "Acme" }));
    }
}
