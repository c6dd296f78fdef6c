//! Error types for campus-state

use thiserror::Error;

/// Errors raised while connecting to or preparing a backend
#[derive(Error, Debug)]
pub enum StateError {
    /// Database connection error
    #[error("Database connection failed: {0}")]
    Connection(String),

    /// Database query error
    #[error("Database query failed: {0}")]
    Query(String),

    /// Schema setup error
    #[error("Schema setup failed: {0}")]
    SchemaSetup(String),
}

impl From<surrealdb::Error> for StateError {
    fn from(err: surrealdb::Error) -> Self {
        StateError::Query(err.to_string())
    }
}

/// Errors returned by [`crate::DocumentStore`] operations
#[derive(Error, Debug)]
pub enum StorageError {
    /// No document with this id exists in the collection
    #[error("document not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    /// A write lost against the stored document (duplicate id or expectation mismatch)
    #[error("write conflict on {collection}/{id}: {reason}")]
    Conflict {
        collection: String,
        id: String,
        reason: String,
    },

    /// Collection or field name cannot be used in a query
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    /// Document is not a JSON object or lacks an id
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    /// Serialization error
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Backend failure
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<surrealdb::Error> for StorageError {
    fn from(err: surrealdb::Error) -> Self {
        StorageError::Backend(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = StorageError::NotFound {
            collection: "registrations".into(),
            id: "r-1".into(),
        };
        assert_eq!(err.to_string(), "document not found: registrations/r-1");
    }

    #[test]
    fn test_conflict_display_carries_reason() {
        let err = StorageError::Conflict {
            collection: "elections".into(),
            id: "e-1".into(),
            reason: "expected state voting_open".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("elections/e-1"));
        assert!(msg.contains("voting_open"));
    }
}
