use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::filter::Filter;
use crate::pipeline::Pipeline;
use crate::types::{Collection, Document, ID_FIELD};

use super::store::{DocumentStore, StoreError};

/// Process-local store. Cloning shares the underlying data.
#[derive(Clone, Default)]
pub struct MemoryDocumentStore {
    state: Arc<RwLock<MemoryState>>,
}

#[derive(Default)]
struct MemoryState {
    collections: HashMap<Collection, Vec<Document>>,
    unique_fields: HashMap<Collection, Vec<String>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MemoryState {
    fn documents(&self, collection: Collection) -> &[Document] {
        self.collections.get(&collection).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Reject `document` if it collides with another document on a unique field
    fn check_unique(&self, collection: Collection, document: &Document, id: &str) -> Result<(), StoreError> {
        let Some(fields) = self.unique_fields.get(&collection) else {
            return Ok(());
        };

        for field in fields {
            let value = match document.get(field) {
                Some(Value::Null) | None => continue,
                Some(value) => value,
            };
            let taken = self
                .documents(collection)
                .iter()
                .any(|other| document_id(other) != Some(id) && other.get(field) == Some(value));
            if taken {
                return Err(StoreError::Duplicate {
                    collection,
                    detail: format!("{} {} already exists", field, value),
                });
            }
        }
        Ok(())
    }
}

fn document_id(document: &Document) -> Option<&str> {
    document.get(ID_FIELD).and_then(Value::as_str)
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn find(&self, collection: Collection, filter: &Filter) -> Result<Vec<Document>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .documents(collection)
            .iter()
            .filter(|document| filter.matches(document))
            .cloned()
            .collect())
    }

    async fn find_one(&self, collection: Collection, filter: &Filter) -> Result<Option<Document>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .documents(collection)
            .iter()
            .find(|document| filter.matches(document))
            .cloned())
    }

    async fn count(&self, collection: Collection, filter: &Filter) -> Result<u64, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .documents(collection)
            .iter()
            .filter(|document| filter.matches(document))
            .count() as u64)
    }

    async fn insert(&self, collection: Collection, mut document: Document) -> Result<Uuid, StoreError> {
        let id = Uuid::new_v4();
        let id_string = id.to_string();
        document.insert(ID_FIELD.to_string(), Value::String(id_string.clone()));

        let mut state = self.state.write().await;
        state.check_unique(collection, &document, &id_string)?;
        state.collections.entry(collection).or_default().push(document);
        Ok(id)
    }

    async fn replace(&self, collection: Collection, id: Uuid, mut document: Document) -> Result<u64, StoreError> {
        let id_string = id.to_string();
        document.insert(ID_FIELD.to_string(), Value::String(id_string.clone()));

        let mut state = self.state.write().await;
        let Some(position) = state
            .documents(collection)
            .iter()
            .position(|existing| document_id(existing) == Some(id_string.as_str()))
        else {
            return Ok(0);
        };

        state.check_unique(collection, &document, &id_string)?;
        if let Some(slot) = state.collections.get_mut(&collection).and_then(|docs| docs.get_mut(position)) {
            *slot = document;
        }
        Ok(1)
    }

    async fn push(
        &self,
        collection: Collection,
        id: Uuid,
        field: &str,
        value: Value,
        updates: Document,
    ) -> Result<u64, StoreError> {
        Filter::validate_field(field)?;
        let id_string = id.to_string();

        let mut state = self.state.write().await;
        let Some(document) = state
            .collections
            .get_mut(&collection)
            .and_then(|documents| documents.iter_mut().find(|d| document_id(d) == Some(id_string.as_str())))
        else {
            return Ok(0);
        };

        match document.get_mut(field) {
            Some(Value::Array(items)) => items.push(value),
            _ => {
                document.insert(field.to_string(), Value::Array(vec![value]));
            }
        }
        for (key, update) in updates {
            if key != ID_FIELD {
                document.insert(key, update);
            }
        }
        Ok(1)
    }

    async fn delete(&self, collection: Collection, id: Uuid) -> Result<u64, StoreError> {
        let id_string = id.to_string();
        let mut state = self.state.write().await;
        let Some(documents) = state.collections.get_mut(&collection) else {
            return Ok(0);
        };
        let before = documents.len();
        documents.retain(|document| document_id(document) != Some(id_string.as_str()));
        Ok((before - documents.len()) as u64)
    }

    async fn aggregate(&self, collection: Collection, pipeline: &Pipeline) -> Result<Vec<Document>, StoreError> {
        pipeline.run(self, collection).await
    }

    async fn ensure_unique(&self, collection: Collection, field: &str) -> Result<(), StoreError> {
        Filter::validate_field(field)?;
        let mut state = self.state.write().await;
        let fields = state.unique_fields.entry(collection).or_default();
        if !fields.iter().any(|f| f == field) {
            fields.push(field.to_string());
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
