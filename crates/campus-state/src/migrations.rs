//! SurrealDB schema definitions
//!
//! Every collection maps to a SCHEMALESS table. The document id is kept in a
//! `doc_id` field (SurrealDB reserves `id` for record ids) guarded by a
//! unique index, so duplicate creates are rejected by the database as well.
//!
//! All statements use `IF NOT EXISTS` and are safe to run repeatedly.

use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::debug;

use crate::error::StateError;
use crate::storage_traits::validate_identifier;
use crate::Result;

/// Field holding the document id inside SurrealDB rows.
pub const DOC_ID_FIELD: &str = "doc_id";

/// Define the table and unique `doc_id` index for a collection.
///
/// Schema:
/// ```text
/// TABLE <collection> {
///   doc_id: STRING (unique)
///   ...     document fields (schemaless)
/// }
/// ```
pub async fn define_collection(db: &Surreal<Any>, collection: &str) -> Result<()> {
    validate_identifier(collection).map_err(|e| StateError::SchemaSetup(e.to_string()))?;
    debug!(collection, "defining collection table");

    let sql = format!(
        "DEFINE TABLE IF NOT EXISTS {collection} SCHEMALESS;
         DEFINE INDEX IF NOT EXISTS idx_{collection}_doc_id ON TABLE {collection} FIELDS {DOC_ID_FIELD} UNIQUE;"
    );

    db.query(sql)
        .await?
        .check()
        .map_err(|e| StateError::SchemaSetup(e.to_string()))?;
    Ok(())
}

/// Define every collection in `collections`. Idempotent.
pub async fn init_schema(db: &Surreal<Any>, collections: &[&str]) -> Result<()> {
    for collection in collections {
        define_collection(db, collection).await?;
    }
    debug!(count = collections.len(), "schema initialized");
    Ok(())
}
