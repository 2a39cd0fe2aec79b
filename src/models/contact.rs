use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::pipeline::Relation;
use crate::types::Collection;

use super::client::ClientSummary;
use super::service::ATTACHED_CLIENTS;
use super::validation::ValidationErrors;
use super::{null_as_empty, ClientRef, Entity};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub attached_to_client: Vec<ClientRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_on: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_on: Option<DateTime<Utc>>,
}

impl Contact {
    fn derived_full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactResponse {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub attached_to_client: Vec<ClientRef>,
    #[serde(default)]
    pub client: Vec<ClientSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_on: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_on: Option<DateTime<Utc>>,
}

/// A contact as listed under its client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactSummary {
    pub id: Uuid,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl Entity for Contact {
    type Response = ContactResponse;

    const COLLECTION: Collection = Collection::Contacts;
    const KIND: &'static str = "Contact";
    const RESPONSE_FIELDS: &'static [&'static str] = &[
        "id",
        "first_name",
        "last_name",
        "full_name",
        "email",
        "phone_number",
        "role",
        "attached_to_client",
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

    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.require("first_name", &self.first_name);
        errors.require("last_name", &self.last_name);
        errors.require_email("email", &self.email);
        errors.into_result()
    }

    fn created_on(&self) -> Option<DateTime<Utc>> {
        self.created_on
    }

    fn set_timestamps(&mut self, created_on: DateTime<Utc>, modified_on: DateTime<Utc>) {
        self.created_on = Some(created_on);
        self.modified_on = Some(modified_on);
    }

    /// Full name is always derived on create
    fn before_create(&mut self) {
        self.full_name = Some(self.derived_full_name());
    }

    /// On update an explicit full name is kept, a missing one is derived
    fn before_update(&mut self) {
        let missing = self.full_name.as_deref().map_or(true, |name| name.trim().is_empty());
        if missing {
            self.full_name = Some(self.derived_full_name());
        }
    }

    fn back_references(&self) -> Vec<Uuid> {
        self.attached_to_client.iter().map(|r| r.client_id).collect()
    }
}
