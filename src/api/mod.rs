pub mod routes;

use std::sync::Arc;
use std::time::SystemTime;
use tracing::info;

use crate::database::{DocumentStore, Repository, StoreError};
use crate::models::{Client, Contact, Entity, Service};

pub use routes::router;

/// Shared request context, constructed once at startup
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub started_at: SystemTime,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            started_at: SystemTime::now(),
        }
    }

    /// Build the state and register the unique-name constraints
    pub async fn init(store: Arc<dyn DocumentStore>) -> Result<Self, StoreError> {
        let state = Self::new(store);
        state.repository::<Client>().ensure_indexes().await?;
        state.repository::<Service>().ensure_indexes().await?;
        state.repository::<Contact>().ensure_indexes().await?;
        info!("Document store indexes ready");
        Ok(state)
    }

    pub fn repository<E: Entity>(&self) -> Repository<E> {
        Repository::new(self.store.clone())
    }
}
