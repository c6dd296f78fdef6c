//! SurrealDB-backed DocumentStore implementation
//!
//! Documents are stored in one SCHEMALESS table per collection. The JSON `id`
//! is moved into `doc_id` on write and restored on read; SurrealDB record ids
//! never leave this module.

use std::collections::HashSet;

use async_trait::async_trait;
use serde_json::{Map, Value};
use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::StorageError;
use crate::handle::{self, CloudConfig};
use crate::migrations::{self, DOC_ID_FIELD};
use crate::storage_traits::{
    check_document_id, prepare_new_document, validate_identifier, Condition, DocumentStore,
    Filter, StorageResult,
};

/// SurrealDB-backed implementation of [`DocumentStore`].
pub struct SurrealDocumentStore {
    db: Surreal<Any>,
    defined: Mutex<HashSet<String>>,
}

impl SurrealDocumentStore {
    fn new(db: Surreal<Any>) -> Self {
        Self {
            db,
            defined: Mutex::new(HashSet::new()),
        }
    }

    /// Create an in-memory instance for testing.
    pub async fn in_memory() -> crate::Result<Self> {
        let db = handle::connect_url("mem://").await?;
        info!("SurrealDocumentStore connected (in-memory)");
        Ok(Self::new(db))
    }

    /// Connect to an explicit engine URL (`ws://`, `mem://`, `surrealkv://`).
    pub async fn connect(url: &str) -> crate::Result<Self> {
        let db = handle::connect_url(url).await?;
        info!("SurrealDocumentStore connected ({})", url);
        Ok(Self::new(db))
    }

    /// Connect to SurrealDB Cloud.
    pub async fn connect_cloud(config: &CloudConfig) -> crate::Result<Self> {
        let db = handle::connect_cloud(config).await?;
        info!("SurrealDocumentStore connected (cloud)");
        Ok(Self::new(db))
    }

    /// Create from environment variables.
    ///
    /// Tries `CloudConfig::from_env`, then `SURREALDB_URL`, then a local
    /// `surrealkv://.campus/db` database.
    pub async fn from_env() -> crate::Result<Self> {
        let db = handle::connect_from_env().await?;
        Ok(Self::new(db))
    }

    /// Define all known collections up front instead of on first use.
    pub async fn init_schema(&self, collections: &[&str]) -> crate::Result<()> {
        migrations::init_schema(&self.db, collections).await?;
        let mut defined = self.defined.lock().await;
        defined.extend(collections.iter().map(|c| c.to_string()));
        info!(count = collections.len(), "SurrealDocumentStore schema initialized");
        Ok(())
    }

    // -- private helpers -----------------------------------------------------

    /// Define the collection table on first use.
    async fn ensure_collection(&self, collection: &str) -> StorageResult<()> {
        validate_identifier(collection)?;
        let mut defined = self.defined.lock().await;
        if defined.contains(collection) {
            return Ok(());
        }
        migrations::define_collection(&self.db, collection)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        defined.insert(collection.to_string());
        Ok(())
    }

    /// Fetch the raw row for a document id.
    async fn fetch_row(&self, collection: &str, id: &str) -> StorageResult<Option<Value>> {
        let mut res = self
            .db
            .query("SELECT * OMIT id FROM type::table($tb) WHERE doc_id = $doc_id")
            .bind(("tb", collection.to_string()))
            .bind(("doc_id", id.to_string()))
            .await?;

        let rows: Vec<Value> = res.take(0)?;
        rows.into_iter().next().map(from_row).transpose()
    }
}

/// Move the JSON `id` into `doc_id` for storage.
fn to_row(doc: Value) -> StorageResult<Value> {
    let Value::Object(mut obj) = doc else {
        return Err(StorageError::InvalidDocument(
            "document must be a JSON object".into(),
        ));
    };
    let id = obj
        .remove("id")
        .ok_or_else(|| StorageError::InvalidDocument("document must carry an id".into()))?;
    obj.insert(DOC_ID_FIELD.to_string(), id);
    Ok(Value::Object(obj))
}

/// Restore the JSON `id` from a stored row.
fn from_row(row: Value) -> StorageResult<Value> {
    let Value::Object(mut obj) = row else {
        return Err(StorageError::Backend(format!(
            "unexpected row shape: {row}"
        )));
    };
    obj.remove("id");
    let id = obj
        .remove(DOC_ID_FIELD)
        .ok_or_else(|| StorageError::Backend("row is missing doc_id".into()))?;
    let mut doc = Map::with_capacity(obj.len() + 1);
    doc.insert("id".to_string(), id);
    doc.extend(obj);
    Ok(Value::Object(doc))
}

/// Render filter clauses as a SurrealQL condition plus its bind values.
///
/// Field names are validated identifiers; values are always bound.
fn where_clause(filter: &Filter) -> StorageResult<(String, Vec<(String, Value)>)> {
    filter.validate()?;
    let mut parts = Vec::with_capacity(filter.clauses().len());
    let mut binds = Vec::with_capacity(filter.clauses().len());

    for (i, (field, cond)) in filter.clauses().iter().enumerate() {
        let field = if field == "id" { DOC_ID_FIELD } else { field.as_str() };
        let param = format!("p{i}");
        let (expr, value) = match cond {
            Condition::Eq(Value::Null) => (format!("{field} IS NONE OR {field} IS NULL"), None),
            Condition::Eq(v) => (format!("{field} = ${param}"), Some(v.clone())),
            Condition::In(vs) => (format!("{field} IN ${param}"), Some(Value::Array(vs.clone()))),
            Condition::Contains(v) => (format!("{field} CONTAINS ${param}"), Some(v.clone())),
        };
        parts.push(format!("({expr})"));
        if let Some(value) = value {
            binds.push((param, value));
        }
    }

    Ok((parts.join(" AND "), binds))
}

#[async_trait]
impl DocumentStore for SurrealDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> StorageResult<Option<Value>> {
        self.ensure_collection(collection).await?;
        self.fetch_row(collection, id).await
    }

    async fn find(&self, collection: &str, filter: &Filter) -> StorageResult<Vec<Value>> {
        self.ensure_collection(collection).await?;
        let (condition, binds) = where_clause(filter)?;

        let sql = if condition.is_empty() {
            "SELECT * OMIT id FROM type::table($tb)".to_string()
        } else {
            format!("SELECT * OMIT id FROM type::table($tb) WHERE {condition}")
        };
        debug!(collection, sql = %sql, "find");

        let mut query = self.db.query(sql).bind(("tb", collection.to_string()));
        for bind in binds {
            query = query.bind(bind);
        }
        let mut res = query.await?;

        let rows: Vec<Value> = res.take(0)?;
        rows.into_iter().map(from_row).collect()
    }

    async fn create(&self, collection: &str, doc: Value) -> StorageResult<Value> {
        self.ensure_collection(collection).await?;
        let (id, doc) = prepare_new_document(doc)?;

        if self.fetch_row(collection, &id).await?.is_some() {
            return Err(StorageError::Conflict {
                collection: collection.to_string(),
                id,
                reason: "id already exists".to_string(),
            });
        }

        // The unique doc_id index rejects a concurrent duplicate insert.
        self.db
            .query("CREATE type::table($tb) CONTENT $doc")
            .bind(("tb", collection.to_string()))
            .bind(("doc", to_row(doc.clone())?))
            .await?
            .check()
            .map_err(|e| StorageError::Conflict {
                collection: collection.to_string(),
                id: id.clone(),
                reason: e.to_string(),
            })?;

        debug!(collection, id = %id, "document created");
        Ok(doc)
    }

    async fn save(&self, collection: &str, id: &str, doc: Value) -> StorageResult<()> {
        self.save_if(collection, id, doc, &Filter::all()).await
    }

    async fn save_if(
        &self,
        collection: &str,
        id: &str,
        doc: Value,
        expected: &Filter,
    ) -> StorageResult<()> {
        check_document_id(id, &doc)?;
        self.ensure_collection(collection).await?;
        let (condition, binds) = where_clause(expected)?;

        let sql = if condition.is_empty() {
            "UPDATE type::table($tb) CONTENT $doc WHERE doc_id = $doc_id RETURN doc_id".to_string()
        } else {
            format!(
                "UPDATE type::table($tb) CONTENT $doc WHERE doc_id = $doc_id AND {condition} RETURN doc_id"
            )
        };

        let mut query = self
            .db
            .query(sql)
            .bind(("tb", collection.to_string()))
            .bind(("doc_id", id.to_string()))
            .bind(("doc", to_row(doc)?));
        for bind in binds {
            query = query.bind(bind);
        }
        let mut res = query.await?;

        let updated: Vec<Value> = res.take(0)?;
        if !updated.is_empty() {
            return Ok(());
        }

        // Nothing matched: tell a missing document apart from a stale expectation.
        if expected.is_empty() || self.fetch_row(collection, id).await?.is_none() {
            return Err(StorageError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }
        Err(StorageError::Conflict {
            collection: collection.to_string(),
            id: id.to_string(),
            reason: "stored document no longer matches expectation".to_string(),
        })
    }

    async fn delete(&self, collection: &str, id: &str) -> StorageResult<()> {
        self.ensure_collection(collection).await?;
        self.db
            .query("DELETE type::table($tb) WHERE doc_id = $doc_id")
            .bind(("tb", collection.to_string()))
            .bind(("doc_id", id.to_string()))
            .await?
            .check()?;
        Ok(())
    }
}
