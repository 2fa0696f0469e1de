pub mod manager;
pub mod pg_store;

pub use manager::DatabaseManager;
pub use pg_store::PgDocumentStore;
