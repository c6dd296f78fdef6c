//! Storage trait definitions for the campus workflow engine
//!
//! These types define the persistence collaborator the workflow core relies on:
//! - `DocumentStore`: untyped, object-safe document database (JSON values)
//! - `Filter`: conjunction of simple field conditions used by `find`
//! - `Collection<T>`: typed wrapper that (de)serializes [`Document`] types
//!
//! The trait is async and backend-agnostic. An in-memory fake is provided in
//! the `fakes` module.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::StorageError;

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

// ---------------------------------------------------------------------------
// Filter
// ---------------------------------------------------------------------------

/// A single condition on one document field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    /// Field equals the value.
    Eq(Value),
    /// Field equals one of the values.
    In(Vec<Value>),
    /// Field is an array containing the value.
    Contains(Value),
}

impl Condition {
    fn matches(&self, field: Option<&Value>) -> bool {
        match (self, field) {
            (Condition::Eq(expected), Some(actual)) => actual == expected,
            (Condition::Eq(Value::Null), None) => true,
            (Condition::In(options), Some(actual)) => options.contains(actual),
            (Condition::Contains(needle), Some(Value::Array(items))) => items.contains(needle),
            _ => false,
        }
    }
}

/// Conjunction of field conditions. An empty filter matches every document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    clauses: Vec<(String, Condition)>,
}

impl Filter {
    /// Filter matching all documents.
    pub fn all() -> Self {
        Self::default()
    }

    /// Require `field == value`.
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.clauses
            .push((field.into(), Condition::Eq(value.into())));
        self
    }

    /// Require `field` to equal any of `values`.
    pub fn any_of<V: Into<Value>>(
        mut self,
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let values = values.into_iter().map(Into::into).collect();
        self.clauses.push((field.into(), Condition::In(values)));
        self
    }

    /// Require the array `field` to contain `value`.
    pub fn contains(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.clauses
            .push((field.into(), Condition::Contains(value.into())));
        self
    }

    /// The clauses in insertion order.
    pub fn clauses(&self) -> &[(String, Condition)] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Evaluate the filter against a JSON document.
    pub fn matches(&self, doc: &Value) -> bool {
        self.clauses
            .iter()
            .all(|(field, cond)| cond.matches(doc.get(field)))
    }

    /// Reject field names that cannot be safely embedded in a backend query.
    pub fn validate(&self) -> StorageResult<()> {
        for (field, _) in &self.clauses {
            validate_identifier(field)?;
        }
        Ok(())
    }
}

/// Collection and field names are restricted to `[A-Za-z_][A-Za-z0-9_]*`.
pub fn validate_identifier(name: &str) -> StorageResult<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidFilter(format!(
            "invalid identifier: {name:?}"
        )))
    }
}

// ---------------------------------------------------------------------------
// DocumentStore
// ---------------------------------------------------------------------------

/// Document database collaborator.
///
/// Guarantees:
/// - Every stored document is a JSON object with a string `id` field.
/// - Writes to a single document are atomic; nothing spans documents.
/// - `save_if` only writes when the stored document still matches `expected`,
///   which lets callers detect lost updates without multi-document transactions.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Load a document by id. Returns `Ok(None)` if absent.
    async fn get(&self, collection: &str, id: &str) -> StorageResult<Option<Value>>;

    /// Return all documents of a collection matching the filter.
    async fn find(&self, collection: &str, filter: &Filter) -> StorageResult<Vec<Value>>;

    /// Insert a new document, assigning a UUID `id` when missing.
    /// Fails with `StorageError::Conflict` if the id is already taken.
    async fn create(&self, collection: &str, doc: Value) -> StorageResult<Value>;

    /// Replace an existing document. Fails with `StorageError::NotFound` if absent.
    async fn save(&self, collection: &str, id: &str, doc: Value) -> StorageResult<()>;

    /// Replace an existing document only if it currently matches `expected`.
    /// Fails with `StorageError::Conflict` when the expectation no longer holds.
    async fn save_if(
        &self,
        collection: &str,
        id: &str,
        doc: Value,
        expected: &Filter,
    ) -> StorageResult<()>;

    /// Delete a document by id. No-op if absent.
    async fn delete(&self, collection: &str, id: &str) -> StorageResult<()>;
}

/// Ensure `doc` is an object and carries a string id, generating one if needed.
pub(crate) fn prepare_new_document(mut doc: Value) -> StorageResult<(String, Value)> {
    let obj = doc
        .as_object_mut()
        .ok_or_else(|| StorageError::InvalidDocument("document must be a JSON object".into()))?;
    let id = match obj.get("id") {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        None | Some(Value::Null) | Some(Value::String(_)) => {
            let id = uuid::Uuid::new_v4().to_string();
            obj.insert("id".into(), Value::String(id.clone()));
            id
        }
        Some(other) => {
            return Err(StorageError::InvalidDocument(format!(
                "document id must be a string, got {other}"
            )))
        }
    };
    Ok((id, doc))
}

/// Check that a replacement document keeps the id it is saved under.
pub(crate) fn check_document_id(id: &str, doc: &Value) -> StorageResult<()> {
    match doc.get("id").and_then(Value::as_str) {
        Some(doc_id) if doc_id == id => Ok(()),
        Some(doc_id) => Err(StorageError::InvalidDocument(format!(
            "document id {doc_id} does not match target id {id}"
        ))),
        None => Err(StorageError::InvalidDocument(
            "document must carry a string id".into(),
        )),
    }
}

// ---------------------------------------------------------------------------
// Typed access
// ---------------------------------------------------------------------------

/// An entity persisted as a document in a fixed collection.
pub trait Document: Serialize + DeserializeOwned + Send + Sync {
    /// Collection (table) name.
    const COLLECTION: &'static str;

    /// The document id.
    fn id(&self) -> &str;
}

/// Typed view over one collection of a [`DocumentStore`].
pub struct Collection<T> {
    store: Arc<dyn DocumentStore>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            _marker: PhantomData,
        }
    }
}

impl<T: Document> Collection<T> {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            _marker: PhantomData,
        }
    }

    /// Load by id, `None` if absent.
    pub async fn get(&self, id: &str) -> StorageResult<Option<T>> {
        match self.store.get(T::COLLECTION, id).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Load by id, `StorageError::NotFound` if absent.
    pub async fn fetch(&self, id: &str) -> StorageResult<T> {
        self.get(id).await?.ok_or_else(|| StorageError::NotFound {
            collection: T::COLLECTION.to_string(),
            id: id.to_string(),
        })
    }

    pub async fn find(&self, filter: &Filter) -> StorageResult<Vec<T>> {
        self.store
            .find(T::COLLECTION, filter)
            .await?
            .into_iter()
            .map(|v| serde_json::from_value(v).map_err(StorageError::from))
            .collect()
    }

    pub async fn find_one(&self, filter: &Filter) -> StorageResult<Option<T>> {
        Ok(self.find(filter).await?.into_iter().next())
    }

    pub async fn create(&self, doc: &T) -> StorageResult<T> {
        let stored = self
            .store
            .create(T::COLLECTION, serde_json::to_value(doc)?)
            .await?;
        Ok(serde_json::from_value(stored)?)
    }

    pub async fn save(&self, doc: &T) -> StorageResult<()> {
        self.store
            .save(T::COLLECTION, doc.id(), serde_json::to_value(doc)?)
            .await
    }

    pub async fn save_if(&self, doc: &T, expected: &Filter) -> StorageResult<()> {
        self.store
            .save_if(T::COLLECTION, doc.id(), serde_json::to_value(doc)?, expected)
            .await
    }

    pub async fn delete(&self, id: &str) -> StorageResult<()> {
        self.store.delete(T::COLLECTION, id).await
    }
}
