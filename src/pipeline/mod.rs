//! Aggregation pipelines over a [`DocumentStore`]: match, lookup and
//! projection stages, evaluated against whichever backend holds the data.

pub mod resolver;

use serde_json::{Map, Value};
use std::collections::HashSet;

use crate::database::{DocumentStore, StoreError};
use crate::filter::Filter;
use crate::types::{values_at, Collection, Document};

pub use resolver::{Relation, RelationshipResolver};

#[derive(Debug, Clone)]
pub enum Stage {
    Match(Filter),
    Lookup(Lookup),
    Project(Projection),
}

#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.stages.push(Stage::Match(filter));
        self
    }

    pub fn lookup(mut self, lookup: Lookup) -> Self {
        self.stages.push(Stage::Lookup(lookup));
        self
    }

    pub fn project(mut self, projection: Projection) -> Self {
        self.stages.push(Stage::Project(projection));
        self
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Evaluate the pipeline against `collection`. A leading match stage is
    /// handed to the store query; the rest run in process.
    pub async fn run(&self, store: &dyn DocumentStore, collection: Collection) -> Result<Vec<Document>, StoreError> {
        let (mut documents, rest) = match self.stages.split_first() {
            Some((Stage::Match(filter), rest)) => (store.find(collection, filter).await?, rest),
            _ => (store.find(collection, &Filter::all()).await?, self.stages.as_slice()),
        };

        for stage in rest {
            match stage {
                Stage::Match(filter) => documents.retain(|document| filter.matches(document)),
                Stage::Lookup(lookup) => lookup.apply(store, &mut documents).await?,
                Stage::Project(projection) => {
                    documents = documents.iter().map(|document| projection.apply(document)).collect();
                }
            }
        }

        Ok(documents)
    }
}

/// Left outer join against another collection
#[derive(Debug, Clone)]
pub struct Lookup {
    pub from: Collection,
    pub local_field: String,
    pub foreign_field: String,
    pub as_field: String,
}

impl Lookup {
    /// Attach to every document an array of the foreign documents whose
    /// `foreign_field` values intersect its `local_field` values. The array
    /// is always present, empty when nothing joins.
    pub async fn apply(&self, store: &dyn DocumentStore, documents: &mut [Document]) -> Result<(), StoreError> {
        let mut keys: Vec<Value> = Vec::new();
        let mut seen = HashSet::new();
        for document in documents.iter() {
            for value in values_at(document, &self.local_field) {
                if !value.is_null() && seen.insert(value.to_string()) {
                    keys.push(value.clone());
                }
            }
        }

        let foreign = if keys.is_empty() {
            Vec::new()
        } else {
            store.find(self.from, &Filter::any_of(self.foreign_field.as_str(), keys)).await?
        };

        for document in documents.iter_mut() {
            let joined: Vec<Value> = {
                let local = values_at(document, &self.local_field);
                foreign
                    .iter()
                    .filter(|candidate| {
                        values_at(candidate, &self.foreign_field)
                            .iter()
                            .any(|value| local.contains(value))
                    })
                    .map(|candidate| Value::Object(candidate.clone()))
                    .collect()
            };
            document.insert(self.as_field.clone(), Value::Array(joined));
        }

        Ok(())
    }
}

/// Keep only the listed dotted paths. A path that crosses an array is
/// applied to each element.
#[derive(Debug, Clone, Default)]
pub struct Projection {
    paths: Vec<String>,
}

impl Projection {
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { paths: paths.into_iter().map(Into::into).collect() }
    }

    pub fn apply(&self, document: &Document) -> Document {
        let mut out = Map::new();
        for path in &self.paths {
            let segments: Vec<&str> = path.split('.').collect();
            project_into(&mut out, document, &segments);
        }
        out
    }
}

fn project_into(out: &mut Map<String, Value>, source: &Map<String, Value>, segments: &[&str]) {
    let Some((head, rest)) = segments.split_first() else {
        return;
    };
    let Some(value) = source.get(*head) else {
        return;
    };

    if rest.is_empty() {
        out.insert(head.to_string(), value.clone());
        return;
    }

    match value {
        Value::Object(inner) => {
            let slot = out
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(slot) = slot {
                project_into(slot, inner, rest);
            }
        }
        Value::Array(items) => {
            // Scalars inside the array have no sub-fields to keep; slots
            // line up with the object elements only
            let objects: Vec<&Map<String, Value>> = items.iter().filter_map(Value::as_object).collect();
            let slot = out
                .entry(head.to_string())
                .or_insert_with(|| Value::Array(vec![Value::Object(Map::new()); objects.len()]));
            if let Value::Array(slot_items) = slot {
                for (target, item) in slot_items.iter_mut().zip(objects) {
                    if let Value::Object(target) = target {
                        project_into(target, item, rest);
                    }
                }
            }
        }
        _ => {}
    }
}
