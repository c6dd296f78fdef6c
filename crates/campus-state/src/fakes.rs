//! In-memory fake for the storage traits (tests and ephemeral deployments)
//!
//! Provides `MemoryDocumentStore`, which satisfies the `DocumentStore`
//! contract without any external dependencies.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StorageError;
use crate::storage_traits::*;

/// In-memory document store backed by `HashMap<collection, Vec<document>>`.
///
/// Documents keep insertion order within a collection, so `find` results are
/// deterministic.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    collections: Mutex<HashMap<String, Vec<Value>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents currently stored in a collection.
    pub fn count(&self, collection: &str) -> usize {
        let collections = self.collections.lock().unwrap();
        collections.get(collection).map(Vec::len).unwrap_or(0)
    }
}

fn not_found(collection: &str, id: &str) -> StorageError {
    StorageError::NotFound {
        collection: collection.to_string(),
        id: id.to_string(),
    }
}

fn position(docs: &[Value], id: &str) -> Option<usize> {
    docs.iter()
        .position(|d| d.get("id").and_then(Value::as_str) == Some(id))
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> StorageResult<Option<Value>> {
        let collections = self.collections.lock().unwrap();
        Ok(collections
            .get(collection)
            .and_then(|docs| position(docs, id).map(|i| docs[i].clone())))
    }

    async fn find(&self, collection: &str, filter: &Filter) -> StorageResult<Vec<Value>> {
        filter.validate()?;
        let collections = self.collections.lock().unwrap();
        Ok(collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|d| filter.matches(d))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn create(&self, collection: &str, doc: Value) -> StorageResult<Value> {
        validate_identifier(collection)?;
        let (id, doc) = prepare_new_document(doc)?;
        let mut collections = self.collections.lock().unwrap();
        let docs = collections.entry(collection.to_string()).or_default();
        if position(docs, &id).is_some() {
            return Err(StorageError::Conflict {
                collection: collection.to_string(),
                id,
                reason: "id already exists".to_string(),
            });
        }
        docs.push(doc.clone());
        Ok(doc)
    }

    async fn save(&self, collection: &str, id: &str, doc: Value) -> StorageResult<()> {
        check_document_id(id, &doc)?;
        let mut collections = self.collections.lock().unwrap();
        let docs = collections
            .get_mut(collection)
            .ok_or_else(|| not_found(collection, id))?;
        let idx = position(docs, id).ok_or_else(|| not_found(collection, id))?;
        let slot = &mut docs[idx];
        *slot = doc;
        Ok(())
    }

    async fn save_if(
        &self,
        collection: &str,
        id: &str,
        doc: Value,
        expected: &Filter,
    ) -> StorageResult<()> {
        check_document_id(id, &doc)?;
        expected.validate()?;
        let mut collections = self.collections.lock().unwrap();
        let docs = collections
            .get_mut(collection)
            .ok_or_else(|| not_found(collection, id))?;
        let idx = position(docs, id).ok_or_else(|| not_found(collection, id))?;
        let slot = &mut docs[idx];
        if !expected.matches(slot) {
            return Err(StorageError::Conflict {
                collection: collection.to_string(),
                id: id.to_string(),
                reason: "stored document no longer matches expectation".to_string(),
            });
        }
        *slot = doc;
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> StorageResult<()> {
        let mut collections = self.collections.lock().unwrap();
        if let Some(docs) = collections.get_mut(collection) {
            docs.retain(|d| d.get("id").and_then(Value::as_str) != Some(id));
        }
        Ok(())
    }
}
