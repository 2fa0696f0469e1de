//! Document store contract.
//!
//! The handlers issue at most one outstanding call at a time and never retry;
//! errors come back to the caller as-is.

pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::types::Document;

pub use memory::MemoryStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Invalid document id: {0}")]
    InvalidId(String),

    #[error("Invalid collection name: {0}")]
    InvalidCollection(String),

    #[error("Store connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error(transparent)]
    Sqlx(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            // The backend could not be reached; everything else is a query-level failure
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => StoreError::Connection(err.to_string()),
            other => StoreError::Sqlx(other),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Minimal contract to the backing store for one collection
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch one document; `None` when nothing has that id
    async fn find_by_id(&self, id: &str) -> StoreResult<Option<Document>>;

    /// Documents whose top-level fields equal every filter entry, sorted by id ascending
    async fn find_many(&self, filter: &Document) -> StoreResult<Vec<Document>>;

    /// Persist a new document and return it with its assigned id
    async fn insert_one(&self, doc: Document) -> StoreResult<Document>;

    /// Set the given fields, leaving the rest of the document untouched
    async fn update_by_id(&self, id: &str, patch: &Document) -> StoreResult<()>;

    async fn delete_by_id(&self, id: &str) -> StoreResult<()>;
}
