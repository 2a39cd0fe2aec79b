use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::pipeline::Relation;
use crate::types::Collection;

use super::client::ClientSummary;
use super::validation::ValidationErrors;
use super::{null_as_empty, ClientRef, Entity};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Service {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub service_name: String,
    #[serde(default)]
    pub service_type: String,
    #[serde(default)]
    pub service_owner: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_description: Option<String>,
    #[serde(default)]
    pub service_status: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub attached_to_client: Vec<ClientRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_frequency: Option<String>,
    #[serde(default)]
    pub invoice_amount: f64,
    #[serde(default)]
    pub management_fee: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_on: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_on: Option<DateTime<Utc>>,
}

/// A service with the clients it is attached to resolved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceResponse {
    pub id: Uuid,
    pub service_name: String,
    pub service_type: String,
    pub service_owner: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_description: Option<String>,
    pub service_status: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub attached_to_client: Vec<ClientRef>,
    #[serde(default)]
    pub client: Vec<ClientSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_frequency: Option<String>,
    #[serde(default)]
    pub invoice_amount: f64,
    #[serde(default)]
    pub management_fee: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_on: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_on: Option<DateTime<Utc>>,
}

/// A service as listed under its client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceSummary {
    pub id: Uuid,
    #[serde(default)]
    pub service_name: String,
    #[serde(default)]
    pub service_type: String,
    #[serde(default)]
    pub service_status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_frequency: Option<String>,
    #[serde(default)]
    pub invoice_amount: f64,
    #[serde(default)]
    pub management_fee: f64,
}

/// Services and contacts both resolve their clients the same way
pub(crate) const ATTACHED_CLIENTS: Relation = Relation {
    from: Collection::Clients,
    local_field: "attached_to_client.client_id",
    foreign_field: "id",
    as_field: "client",
    fields: &["id", "client_name"],
};

impl Entity for Service {
    type Response = ServiceResponse;

    const COLLECTION: Collection = Collection::Services;
    const KIND: &'static str = "Service";
    const UNIQUE_FIELD: Option<&'static str> = Some("service_name");
    const RESPONSE_FIELDS: &'static [&'static str] = &[
        "id",
        "service_name",
        "service_type",
        "service_owner",
        "service_description",
        "service_status",
        "attached_to_client",
        "invoice_frequency",
        "invoice_amount",
        "management_fee",
        "created_on",
        "modified_on",
    ];
    const RELATIONS: &'static [Relation] = &[ATTACHED_CLIENTS];

    fn id(&self) -> Option<Uuid> {
        self.id
    }

    fn set_id(&mut self, id: Option<Uuid>) {
        self.id = id;
    }

    fn unique_value(&self) -> Option<&str> {
        Some(&self.service_name)
    }

    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.require("service_name", &self.service_name);
        errors.require("service_type", &self.service_type);
        errors.require("service_owner", &self.service_owner);
        errors.require("service_status", &self.service_status);
        errors.into_result()
    }

    fn created_on(&self) -> Option<DateTime<Utc>> {
        self.created_on
    }

    fn set_timestamps(&mut self, created_on: DateTime<Utc>, modified_on: DateTime<Utc>) {
        self.created_on = Some(created_on);
        self.modified_on = Some(modified_on);
    }

    fn back_references(&self) -> Vec<Uuid> {
        self.attached_to_client.iter().map(|r| r.client_id).collect()
    }
}
