use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::database::{DocumentStore, StoreError};
use crate::filter::Filter;
use crate::models::Entity;
use crate::types::{Collection, Document};

use super::{Lookup, Pipeline, Projection};

/// A read-time join from an entity to documents of another collection.
#[derive(Debug, Clone, Copy)]
pub struct Relation {
    pub from: Collection,
    pub local_field: &'static str,
    pub foreign_field: &'static str,
    pub as_field: &'static str,
    /// Fields of the joined documents kept in the response
    pub fields: &'static [&'static str],
}

impl Relation {
    pub fn lookup(&self) -> Lookup {
        Lookup {
            from: self.from,
            local_field: self.local_field.to_string(),
            foreign_field: self.foreign_field.to_string(),
            as_field: self.as_field.to_string(),
        }
    }

    /// Whether `column` reads from the documents this relation joins in
    fn covers(&self, column: &str) -> bool {
        column
            .strip_prefix(self.as_field)
            .map_or(false, |rest| rest.is_empty() || rest.starts_with('.'))
    }

    fn projected_paths(&self) -> impl Iterator<Item = String> + '_ {
        self.fields.iter().map(move |field| format!("{}.{}", self.as_field, field))
    }
}

/// Builds and runs the enriched read view of an entity type
pub struct RelationshipResolver<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> RelationshipResolver<'a> {
    pub fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    /// Id and base-field matches, one lookup per relation, matches on joined
    /// fields, then the allow-list projection. The base-field part of
    /// `filter` is handed to the store; the part naming a relation's output
    /// field can only run once the lookups are done.
    pub fn pipeline(base_fields: &[&str], relations: &[Relation], id: Option<Uuid>, filter: Filter) -> Pipeline {
        let (base, joined) = filter.partition(|column| relations.iter().any(|relation| relation.covers(column)));

        let leading = match id {
            Some(id) => Filter::id(id).and(base),
            None => base,
        };
        let mut pipeline = Pipeline::new();
        if !leading.is_empty() {
            pipeline = pipeline.filter(leading);
        }

        let mut paths: Vec<String> = base_fields.iter().map(|field| field.to_string()).collect();
        for relation in relations {
            pipeline = pipeline.lookup(relation.lookup());
            paths.extend(relation.projected_paths());
        }

        if !joined.is_empty() {
            pipeline = pipeline.filter(joined);
        }
        pipeline.project(Projection::new(paths))
    }

    pub async fn list<E: Entity>(&self, filter: Filter) -> Result<Vec<E::Response>, StoreError> {
        let pipeline = Self::pipeline(E::RESPONSE_FIELDS, E::RELATIONS, None, filter);
        let documents = self.store.aggregate(E::COLLECTION, &pipeline).await?;
        debug!(collection = %E::COLLECTION, count = documents.len(), "resolved list");
        documents.into_iter().map(decode::<E::Response>).collect()
    }

    pub async fn get<E: Entity>(&self, id: Uuid) -> Result<Option<E::Response>, StoreError> {
        let pipeline = Self::pipeline(E::RESPONSE_FIELDS, E::RELATIONS, Some(id), Filter::all());
        let documents = self.store.aggregate(E::COLLECTION, &pipeline).await?;
        documents.into_iter().next().map(decode::<E::Response>).transpose()
    }
}

fn decode<R: DeserializeOwned>(document: Document) -> Result<R, StoreError> {
    serde_json::from_value(Value::Object(document)).map_err(|e| StoreError::Decode(e.to_string()))
}
