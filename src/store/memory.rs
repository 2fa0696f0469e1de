use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{DocumentStore, StoreError, StoreResult};
use crate::types::{Document, ID_FIELD};

/// In-process store with sequential integer ids
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    next_id: u64,
    docs: BTreeMap<u64, Document>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.docs.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn parse_id(id: &str) -> StoreResult<u64> {
        id.trim()
            .parse()
            .map_err(|_| StoreError::InvalidId(id.to_string()))
    }

    fn matches(doc: &Document, filter: &Document) -> bool {
        filter.iter().all(|(key, expected)| match doc.get(key) {
            Some(actual) if key == ID_FIELD => same_id(actual, expected),
            Some(actual) => actual == expected,
            None => expected.is_null(),
        })
    }
}

/// Ids arrive as text from paths and query strings but are stored as numbers
fn same_id(actual: &Value, expected: &Value) -> bool {
    match expected {
        Value::String(s) => s.trim().parse::<u64>().ok() == actual.as_u64(),
        other => other == actual,
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find_by_id(&self, id: &str) -> StoreResult<Option<Document>> {
        let id = Self::parse_id(id)?;
        Ok(self.inner.read().await.docs.get(&id).cloned())
    }

    async fn find_many(&self, filter: &Document) -> StoreResult<Vec<Document>> {
        let inner = self.inner.read().await;
        Ok(inner
            .docs
            .values()
            .filter(|doc| Self::matches(doc, filter))
            .cloned()
            .collect())
    }

    async fn insert_one(&self, mut doc: Document) -> StoreResult<Document> {
        let mut inner = self.inner.write().await;
        inner.next_id += 1;
        let id = inner.next_id;
        doc.insert(ID_FIELD.to_string(), Value::from(id));
        inner.docs.insert(id, doc.clone());
        Ok(doc)
    }

    async fn update_by_id(&self, id: &str, patch: &Document) -> StoreResult<()> {
        let id = Self::parse_id(id)?;
        let mut inner = self.inner.write().await;
        if let Some(doc) = inner.docs.get_mut(&id) {
            for (key, value) in patch {
                if key != ID_FIELD {
                    doc.insert(key.clone(), value.clone());
                }
            }
        }
        Ok(())
    }

    async fn delete_by_id(&self, id: &str) -> StoreResult<()> {
        let id = Self::parse_id(id)?;
        self.inner.write().await.docs.remove(&id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn insert_assigns_sequential_ids() {
        let store = MemoryStore::new();
        let a = store.insert_one(doc(json!({"v": 1}))).await.unwrap();
        let b = store.insert_one(doc(json!({"v": 2}))).await.unwrap();
        assert_eq!(a[ID_FIELD], json!(1));
        assert_eq!(b[ID_FIELD], json!(2));
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn find_many_filters_and_sorts_by_id() {
        let store = MemoryStore::new();
        for (owner, v) in [("u1", 1), ("u2", 2), ("u1", 3)] {
            store.insert_one(doc(json!({"uId": owner, "v": v}))).await.unwrap();
        }

        let found = store.find_many(&doc(json!({"uId": "u1"}))).await.unwrap();
        let values: Vec<_> = found.iter().map(|d| d["v"].clone()).collect();
        assert_eq!(values, vec![json!(1), json!(3)]);

        let by_id = store.find_many(&doc(json!({"_id": "2"}))).await.unwrap();
        assert_eq!(by_id.len(), 1);
        assert_eq!(by_id[0]["v"], json!(2));
    }

    #[tokio::test]
    async fn update_merges_fields() {
        let store = MemoryStore::new();
        store.insert_one(doc(json!({"a": 1, "b": 2}))).await.unwrap();
        store.update_by_id("1", &doc(json!({"b": 3, "c": 4}))).await.unwrap();
        let updated = store.find_by_id("1").await.unwrap().unwrap();
        assert_eq!(Value::Object(updated), json!({"_id": 1, "a": 1, "b": 3, "c": 4}));
    }

    #[tokio::test]
    async fn delete_removes_document() {
        let store = MemoryStore::new();
        store.insert_one(doc(json!({"a": 1}))).await.unwrap();
        store.delete_by_id("1").await.unwrap();
        assert!(store.find_by_id("1").await.unwrap().is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn non_numeric_id_is_rejected() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.find_by_id("abc").await,
            Err(StoreError::InvalidId(_))
        ));
    }
}
