use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::filter::{Filter, FilterError};
use crate::pipeline::Pipeline;
use crate::types::{Collection, Document};

/// Errors raised by a document store backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Duplicate value in {collection}: {detail}")]
    Duplicate { collection: Collection, detail: String },

    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// A JSON document store organised in collections.
///
/// Documents are returned in natural (insertion) order. The store owns the
/// `id` field: `insert` assigns a fresh v4 identifier and writes it into the
/// document, `replace` keeps the identifier it was given.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find(&self, collection: Collection, filter: &Filter) -> Result<Vec<Document>, StoreError>;

    async fn find_one(&self, collection: Collection, filter: &Filter) -> Result<Option<Document>, StoreError>;

    async fn count(&self, collection: Collection, filter: &Filter) -> Result<u64, StoreError>;

    async fn insert(&self, collection: Collection, document: Document) -> Result<Uuid, StoreError>;

    /// Replace the whole document. Returns the number of matched documents.
    async fn replace(&self, collection: Collection, id: Uuid, document: Document) -> Result<u64, StoreError>;

    /// Append `value` to the top-level array `field` and merge `updates`
    /// into the document, as one atomic write. A missing or null field
    /// starts a new array. Returns the number of matched documents.
    async fn push(
        &self,
        collection: Collection,
        id: Uuid,
        field: &str,
        value: Value,
        updates: Document,
    ) -> Result<u64, StoreError>;

    async fn delete(&self, collection: Collection, id: Uuid) -> Result<u64, StoreError>;

    async fn aggregate(&self, collection: Collection, pipeline: &Pipeline) -> Result<Vec<Document>, StoreError>;

    /// Enforce uniqueness of a top-level field within a collection
    async fn ensure_unique(&self, collection: Collection, field: &str) -> Result<(), StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}
