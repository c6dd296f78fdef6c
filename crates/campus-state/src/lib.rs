//! Campus-State: document persistence for the campus workflow engine
//!
//! Workflow orchestrators never talk to a database directly. They go through
//! the [`DocumentStore`] trait, which models a plain document database:
//! collections of JSON documents addressed by string id, with simple
//! equality-style filtered queries and single-document atomic writes.
//!
//! ## Key Components
//!
//! - `DocumentStore`: backend-agnostic async trait (get / find / create / save / delete)
//! - `Collection<T>`: typed view over one collection for a [`Document`] type
//! - `MemoryDocumentStore`: in-memory fake for tests and the `--memory` daemon mode
//! - `SurrealDocumentStore`: SurrealDB-backed implementation

mod error;
pub mod fakes;
mod handle;
pub mod migrations;
pub mod storage_traits;
pub mod surreal_store;

pub use error::{StateError, StorageError};
pub use fakes::MemoryDocumentStore;
pub use handle::CloudConfig;
pub use storage_traits::{
    Collection, Condition, Document, DocumentStore, Filter, StorageResult,
};
pub use surreal_store::SurrealDocumentStore;

/// Result type for connection and schema operations
pub type Result<T> = std::result::Result<T, StateError>;
