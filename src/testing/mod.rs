//! Shared fixtures for unit tests

use std::sync::Arc;

use argon2::Params;
use async_trait::async_trait;
use serde_json::Value;

use crate::crud::{Crud, CrudError, Reply, ResourceConfig};
use crate::hashing::SecretHasher;
use crate::store::{DocumentStore, MemoryStore, StoreError, StoreResult};
use crate::types::{CrudRequest, Document, Principal, ID_FIELD};

pub fn doc(value: Value) -> Document {
    value.as_object().cloned().expect("fixture must be a JSON object")
}

pub fn normal(id: &str) -> Principal {
    Principal::new(id, "normal")
}

pub fn admin(id: &str) -> Principal {
    Principal::new(id, "admin")
}

pub fn request(principal: Option<Principal>) -> CrudRequest {
    CrudRequest::new(principal)
}

/// Argon2 parameters cheap enough for debug-build tests
pub fn test_hasher() -> Arc<SecretHasher> {
    Arc::new(SecretHasher::with_params(
        Params::new(1024, 1, 1, None).expect("valid argon2 params"),
    ))
}

/// Resource config as YAML, the way deployments write it
pub fn config(yaml: &str) -> ResourceConfig {
    ResourceConfig::from_yaml_str(yaml).expect("fixture config must resolve")
}

/// Handlers over a fresh in-memory store
pub fn crud(config: ResourceConfig) -> (Crud, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let crud = Crud::new(config, store.clone(), test_hasher());
    (crud, store)
}

/// Seed documents straight into the store, bypassing the handlers
pub async fn seed(store: &MemoryStore, docs: Vec<Value>) {
    for value in docs {
        store.insert_one(doc(value)).await.expect("seed insert");
    }
}

/// Store whose every call fails as if the backend were unreachable
pub struct UnreachableStore;

#[async_trait]
impl DocumentStore for UnreachableStore {
    async fn find_by_id(&self, _id: &str) -> StoreResult<Option<Document>> {
        Err(StoreError::Connection("connection refused".to_string()))
    }

    async fn find_many(&self, _filter: &Document) -> StoreResult<Vec<Document>> {
        Err(StoreError::Connection("connection refused".to_string()))
    }

    async fn insert_one(&self, _doc: Document) -> StoreResult<Document> {
        Err(StoreError::Connection("connection refused".to_string()))
    }

    async fn update_by_id(&self, _id: &str, _patch: &Document) -> StoreResult<()> {
        Err(StoreError::Connection("connection refused".to_string()))
    }

    async fn delete_by_id(&self, _id: &str) -> StoreResult<()> {
        Err(StoreError::Connection("connection refused".to_string()))
    }
}

/// In-memory store that, like the Postgres one, refuses ids that are not integers
#[derive(Default)]
pub struct IntegerIdStore {
    pub inner: MemoryStore,
}

fn integer_id(id: &str) -> StoreResult<()> {
    id.parse::<u64>()
        .map(|_| ())
        .map_err(|_| StoreError::InvalidId(id.to_string()))
}

#[async_trait]
impl DocumentStore for IntegerIdStore {
    async fn find_by_id(&self, id: &str) -> StoreResult<Option<Document>> {
        integer_id(id)?;
        self.inner.find_by_id(id).await
    }

    async fn find_many(&self, filter: &Document) -> StoreResult<Vec<Document>> {
        if let Some(Value::String(id)) = filter.get(ID_FIELD) {
            integer_id(id)?;
        }
        self.inner.find_many(filter).await
    }

    async fn insert_one(&self, doc: Document) -> StoreResult<Document> {
        self.inner.insert_one(doc).await
    }

    async fn update_by_id(&self, id: &str, patch: &Document) -> StoreResult<()> {
        integer_id(id)?;
        self.inner.update_by_id(id, patch).await
    }

    async fn delete_by_id(&self, id: &str) -> StoreResult<()> {
        integer_id(id)?;
        self.inner.delete_by_id(id).await
    }
}

/// Reply that records what the handler answered
#[derive(Debug, Default)]
pub struct CapturedReply;

#[derive(Debug)]
pub enum Captured {
    Ok(Value),
    Error(CrudError),
}

impl Reply for CapturedReply {
    type Output = Captured;

    fn ok(self, value: Value) -> Captured {
        Captured::Ok(value)
    }

    fn error(self, err: CrudError) -> Captured {
        Captured::Error(err)
    }
}
