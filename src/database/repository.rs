use chrono::Utc;
use serde_json::Value;
use std::collections::HashSet;
use std::marker::PhantomData;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::filter::Filter;
use crate::models::{Client, ClientRef, Entity, Service, ServiceResponse, ValidationErrors, ATTACHED_TO_CLIENT};
use crate::pipeline::RelationshipResolver;
use crate::types::{Document, ID_FIELD};

use super::store::{DocumentStore, StoreError};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    #[error("{kind} already exists: {name}")]
    DuplicateName { kind: &'static str, name: String },

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: Uuid },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Create / read / replace / delete for one entity type.
///
/// Reads go through the relationship resolver and return the enriched
/// response type; writes validate the entity, enforce the unique name and
/// check that every client back-reference exists.
pub struct Repository<E: Entity> {
    store: Arc<dyn DocumentStore>,
    _phantom: PhantomData<E>,
}

impl<E: Entity> Repository<E> {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            _phantom: PhantomData,
        }
    }

    fn not_found(id: Uuid) -> RepositoryError {
        RepositoryError::NotFound { kind: E::KIND, id }
    }

    /// Register the unique-name constraint with the store
    pub async fn ensure_indexes(&self) -> Result<(), StoreError> {
        if let Some(field) = E::UNIQUE_FIELD {
            self.store.ensure_unique(E::COLLECTION, field).await?;
        }
        Ok(())
    }

    /// Every entity matching `filter`, with relationships. Conditions may
    /// name joined fields such as `managed_services.service_name`.
    pub async fn list(&self, filter: Filter) -> Result<Vec<E::Response>, RepositoryError> {
        let resolver = RelationshipResolver::new(self.store.as_ref());
        Ok(resolver.list::<E>(filter).await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<E::Response, RepositoryError> {
        let resolver = RelationshipResolver::new(self.store.as_ref());
        resolver.get::<E>(id).await?.ok_or_else(|| Self::not_found(id))
    }

    pub async fn exists(&self, id: Uuid) -> Result<bool, RepositoryError> {
        Ok(self.store.count(E::COLLECTION, &Filter::id(id)).await? > 0)
    }

    /// The stored entity, without relationships
    pub async fn find(&self, id: Uuid) -> Result<E, RepositoryError> {
        let document = self
            .store
            .find_one(E::COLLECTION, &Filter::id(id))
            .await?
            .ok_or_else(|| Self::not_found(id))?;
        Ok(from_document(document)?)
    }

    pub async fn create(&self, mut entity: E) -> Result<Uuid, RepositoryError> {
        entity.validate()?;
        entity.set_id(None);
        entity.before_create();
        self.check_back_references(&entity).await?;
        self.check_unique(&entity, None).await?;

        let now = Utc::now();
        entity.set_timestamps(now, now);

        let id = self
            .store
            .insert(E::COLLECTION, to_document(&entity)?)
            .await
            .map_err(|e| Self::write_error(e, &entity))?;

        info!(%id, kind = E::KIND, "created");
        Ok(id)
    }

    /// Full replace of the stored document. `created_on` survives from the
    /// stored version, `modified_on` is bumped.
    pub async fn update(&self, id: Uuid, mut entity: E) -> Result<E::Response, RepositoryError> {
        entity.validate()?;
        let existing = self.find(id).await?;

        entity.set_id(None);
        entity.before_update();
        self.check_back_references(&entity).await?;
        self.check_unique(&entity, Some(id)).await?;

        let now = Utc::now();
        entity.set_timestamps(existing.created_on().unwrap_or(now), now);

        self.replace(id, &entity).await?;
        info!(%id, kind = E::KIND, "updated");
        self.get(id).await
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        let deleted = self.store.delete(E::COLLECTION, id).await?;
        if deleted == 0 {
            return Err(Self::not_found(id));
        }
        info!(%id, kind = E::KIND, "deleted");
        Ok(())
    }

    async fn replace(&self, id: Uuid, entity: &E) -> Result<(), RepositoryError> {
        let matched = self
            .store
            .replace(E::COLLECTION, id, to_document(entity)?)
            .await
            .map_err(|e| Self::write_error(e, entity))?;
        // Deleted between the existence check and the write
        if matched == 0 {
            return Err(Self::not_found(id));
        }
        Ok(())
    }

    /// Friendly duplicate check ahead of the write; the store constraint
    /// still catches concurrent writers.
    async fn check_unique(&self, entity: &E, exclude: Option<Uuid>) -> Result<(), RepositoryError> {
        let (Some(field), Some(value)) = (E::UNIQUE_FIELD, entity.unique_value()) else {
            return Ok(());
        };

        let mut filter = Filter::eq(field, value);
        if let Some(id) = exclude {
            filter = filter.and(Filter::ne(ID_FIELD, id.to_string()));
        }

        if self.store.count(E::COLLECTION, &filter).await? > 0 {
            return Err(RepositoryError::DuplicateName {
                kind: E::KIND,
                name: value.to_string(),
            });
        }
        Ok(())
    }

    async fn check_back_references(&self, entity: &E) -> Result<(), RepositoryError> {
        let wanted: Vec<Uuid> = entity.back_references();
        if wanted.is_empty() {
            return Ok(());
        }

        let keys = wanted.iter().map(|id| Value::String(id.to_string())).collect();
        let found: HashSet<String> = self
            .store
            .find(Client::COLLECTION, &Filter::any_of(ID_FIELD, keys))
            .await?
            .iter()
            .filter_map(|client| client.get(ID_FIELD).and_then(Value::as_str).map(str::to_string))
            .collect();

        let mut errors = ValidationErrors::new();
        for id in wanted.iter().filter(|id| !found.contains(&id.to_string())) {
            errors.add(ATTACHED_TO_CLIENT, format!("client {} does not exist", id));
        }
        Ok(errors.into_result()?)
    }

    fn write_error(error: StoreError, entity: &E) -> RepositoryError {
        match error {
            StoreError::Duplicate { .. } => RepositoryError::DuplicateName {
                kind: E::KIND,
                name: entity.unique_value().unwrap_or_default().to_string(),
            },
            other => RepositoryError::Store(other),
        }
    }
}

impl Repository<Service> {
    /// Append a client back-reference to a stored service. The append is a
    /// single store write, so concurrent attaches all land. Duplicate
    /// attachments are kept as given.
    pub async fn attach_client(&self, id: Uuid, client: ClientRef) -> Result<ServiceResponse, RepositoryError> {
        let exists = self
            .store
            .count(Client::COLLECTION, &Filter::id(client.client_id))
            .await?;
        if exists == 0 {
            return Err(RepositoryError::NotFound { kind: Client::KIND, id: client.client_id });
        }

        let reference = serde_json::to_value(client).map_err(|e| StoreError::Decode(e.to_string()))?;
        let modified_on = serde_json::to_value(Utc::now()).map_err(|e| StoreError::Decode(e.to_string()))?;
        let mut updates = Document::new();
        updates.insert("modified_on".to_string(), modified_on);

        let matched = self
            .store
            .push(Service::COLLECTION, id, ATTACHED_TO_CLIENT, reference, updates)
            .await?;
        if matched == 0 {
            return Err(Self::not_found(id));
        }

        info!(%id, client_id = %client.client_id, "client attached to service");
        self.get(id).await
    }
}

fn to_document<T: serde::Serialize>(value: &T) -> Result<Document, StoreError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(document)) => Ok(document),
        Ok(_) => Err(StoreError::Decode("entity did not serialize to an object".to_string())),
        Err(e) => Err(StoreError::Decode(e.to_string())),
    }
}

fn from_document<T: serde::de::DeserializeOwned>(document: Document) -> Result<T, StoreError> {
    serde_json::from_value(Value::Object(document)).map_err(|e| StoreError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryDocumentStore;
    use crate::models::Contact;
    use serde_json::json;

    async fn repositories() -> (Repository<Client>, Repository<Service>, Repository<Contact>, MemoryDocumentStore) {
        let store = MemoryDocumentStore::new();
        let shared: Arc<dyn DocumentStore> = Arc::new(store.clone());
        let clients = Repository::<Client>::new(shared.clone());
        let services = Repository::<Service>::new(shared.clone());
        let contacts = Repository::<Contact>::new(shared);
        clients.ensure_indexes().await.unwrap();
        services.ensure_indexes().await.unwrap();
        contacts.ensure_indexes().await.unwrap();
        (clients, services, contacts, store)
    }

    fn client(name: &str) -> Client {
        Client { client_name: name.to_string(), ..Client::default() }
    }

    fn service(name: &str, clients: &[Uuid]) -> Service {
        serde_json::from_value(json!({
            "service_name": name,
            "service_type": "hosting",
            "service_owner": "ops",
            "service_status": "active",
            "invoice_frequency": "monthly",
            "invoice_amount": 120.5,
            "attached_to_client": clients.iter().map(|id| json!({ "client_id": id })).collect::<Vec<_>>()
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn create_then_get_round_trips_fields() {
        let (clients, _, _, _) = repositories().await;
        let mut acme = client("Acme");
        acme.slack_channel = Some("#acme".to_string());

        let id = clients.create(acme).await.unwrap();
        let fetched = clients.get(id).await.unwrap();
        assert_eq!(fetched.id, id);
        assert_eq!(fetched.client_name, "Acme");
        assert_eq!(fetched.slack_channel.as_deref(), Some("#acme"));
        assert!(fetched.created_on.is_some());
        assert_eq!(fetched.created_on, fetched.modified_on);
    }

    #[tokio::test]
    async fn invalid_create_persists_nothing() {
        let (clients, _, _, store) = repositories().await;
        let err = clients.create(client("  ")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Validation(_)));
        assert_eq!(store.count(Client::COLLECTION, &Filter::all()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn duplicate_names_are_rejected() {
        let (clients, _, _, _) = repositories().await;
        clients.create(client("Acme")).await.unwrap();
        let err = clients.create(client("Acme")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::DuplicateName { kind: "Client", .. }));
    }

    #[tokio::test]
    async fn update_replaces_and_keeps_created_on() {
        let (clients, _, _, _) = repositories().await;
        let id = clients.create(client("Acme")).await.unwrap();
        let before = clients.get(id).await.unwrap();
        let other = clients.create(client("Globex")).await.unwrap();

        let mut replacement = client("Acme Corp");
        replacement.web_url = Some("https://acme.test".to_string());
        let updated = clients.update(id, replacement).await.unwrap();
        assert_eq!(updated.client_name, "Acme Corp");
        assert_eq!(updated.web_url.as_deref(), Some("https://acme.test"));
        assert_eq!(updated.created_on, before.created_on);
        assert!(updated.modified_on >= before.modified_on);

        // Keeping its own name is fine, taking another's is not
        assert!(clients.update(id, client("Acme Corp")).await.is_ok());
        let err = clients.update(other, client("Acme Corp")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::DuplicateName { .. }));

        let err = clients.update(Uuid::new_v4(), client("Nobody")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { .. }));
    }

    #[tokio::test]
    async fn delete_then_get_is_not_found() {
        let (clients, _, _, _) = repositories().await;
        let id = clients.create(client("Acme")).await.unwrap();
        clients.delete(id).await.unwrap();
        assert!(matches!(clients.get(id).await, Err(RepositoryError::NotFound { .. })));
        assert!(matches!(clients.delete(id).await, Err(RepositoryError::NotFound { .. })));
    }

    #[tokio::test]
    async fn back_references_must_exist() {
        let (clients, services, _, _) = repositories().await;
        let acme = clients.create(client("Acme")).await.unwrap();

        let err = services.create(service("Hosting", &[acme, Uuid::new_v4()])).await.unwrap_err();
        match err {
            RepositoryError::Validation(errors) => assert!(errors.fields().contains_key("attached_to_client")),
            other => panic!("expected validation error, got {:?}", other),
        }

        let id = services.create(service("Hosting", &[acme])).await.unwrap();
        let fetched = services.get(id).await.unwrap();
        assert_eq!(fetched.client.len(), 1);
        assert_eq!(fetched.client[0].client_name, "Acme");
        assert_eq!(fetched.invoice_amount, 120.5);
    }

    #[tokio::test]
    async fn attach_appends_client() {
        let (clients, services, _, _) = repositories().await;
        let acme = clients.create(client("Acme")).await.unwrap();
        let globex = clients.create(client("Globex")).await.unwrap();
        let id = services.create(service("Hosting", &[acme])).await.unwrap();

        let attached = services.attach_client(id, ClientRef { client_id: globex }).await.unwrap();
        assert_eq!(attached.attached_to_client.len(), 2);
        let names: Vec<&str> = attached.client.iter().map(|c| c.client_name.as_str()).collect();
        assert_eq!(names, vec!["Acme", "Globex"]);

        let err = services
            .attach_client(id, ClientRef { client_id: Uuid::new_v4() })
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { kind: "Client", .. }));

        let err = services
            .attach_client(Uuid::new_v4(), ClientRef { client_id: acme })
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { kind: "Service", .. }));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_attaches_keep_every_client() {
        let (clients, services, _, store) = repositories().await;
        let id = services.create(service("Hosting", &[])).await.unwrap();

        let mut ids = Vec::new();
        for n in 0..50 {
            ids.push(clients.create(client(&format!("Client {}", n))).await.unwrap());
        }

        let services = Arc::new(services);
        let tasks: Vec<_> = ids
            .iter()
            .map(|client_id| {
                let services = services.clone();
                let client_id = *client_id;
                tokio::spawn(async move { services.attach_client(id, ClientRef { client_id }).await })
            })
            .collect();
        for task in tasks {
            assert!(task.await.unwrap().is_ok());
        }

        let stored = services.find(id).await.unwrap();
        assert_eq!(stored.attached_to_client.len(), ids.len());
        let resolved = services.get(id).await.unwrap();
        assert_eq!(resolved.client.len(), ids.len());
        assert_eq!(store.count(Service::COLLECTION, &Filter::all()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn contacts_derive_full_name() {
        let (clients, _, contacts, _) = repositories().await;
        let acme = clients.create(client("Acme")).await.unwrap();
        let contact: Contact = serde_json::from_value(json!({
            "first_name": "Jane",
            "last_name": "Doe",
            "email": "jane@acme.test",
            "attached_to_client": [{ "client_id": acme }]
        }))
        .unwrap();

        let id = contacts.create(contact).await.unwrap();
        let fetched = contacts.get(id).await.unwrap();
        assert_eq!(fetched.full_name.as_deref(), Some("Jane Doe"));

        let enriched = clients.get(acme).await.unwrap();
        assert_eq!(enriched.client_contacts.len(), 1);
        assert_eq!(enriched.client_contacts[0].id, id);
    }
}
