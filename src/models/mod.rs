pub mod validation;
pub mod client;
pub mod service;
pub mod contact;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::pipeline::Relation;
use crate::types::Collection;

pub use client::{Client, ClientResponse, ClientSummary};
pub use contact::{Contact, ContactResponse, ContactSummary};
pub use service::{Service, ServiceResponse, ServiceSummary};
pub use validation::ValidationErrors;

/// Field holding the client back-references of services and contacts
pub const ATTACHED_TO_CLIENT: &str = "attached_to_client";

/// Back-reference from a service or contact to the client it belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRef {
    pub client_id: Uuid,
}

/// Read an explicit `null` list as empty
pub(crate) fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// A document type managed through `Repository<E>`.
///
/// The associated constants describe how the entity is stored and how its
/// enriched read view is assembled; the methods carry its validation and
/// lifecycle rules.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Enriched read view, with related documents inlined
    type Response: Serialize + DeserializeOwned + Send + Sync + 'static;

    const COLLECTION: Collection;
    /// Display name used in messages ("Client deleted, id: ...")
    const KIND: &'static str;
    /// Top-level field that must be unique within the collection
    const UNIQUE_FIELD: Option<&'static str> = None;
    /// Fields of the entity kept in its read view
    const RESPONSE_FIELDS: &'static [&'static str];
    const RELATIONS: &'static [Relation] = &[];

    fn id(&self) -> Option<Uuid>;

    fn set_id(&mut self, id: Option<Uuid>);

    fn unique_value(&self) -> Option<&str> {
        None
    }

    fn validate(&self) -> Result<(), ValidationErrors>;

    fn created_on(&self) -> Option<DateTime<Utc>>;

    fn set_timestamps(&mut self, created_on: DateTime<Utc>, modified_on: DateTime<Utc>);

    fn before_create(&mut self) {}

    fn before_update(&mut self) {}

    /// Clients this entity points at
    fn back_references(&self) -> Vec<Uuid> {
        Vec::new()
    }
}
