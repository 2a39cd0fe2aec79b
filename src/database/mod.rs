pub mod store;
pub mod postgres;
pub mod memory;
pub mod manager;
pub mod repository;

pub use manager::DatabaseManager;
pub use memory::MemoryDocumentStore;
pub use postgres::PgDocumentStore;
pub use repository::{Repository, RepositoryError};
pub use store::{DocumentStore, StoreError};
