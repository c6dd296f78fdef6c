//! Trait contract tests for DocumentStore.
//!
//! Every check runs against the in-memory fake and the SurrealDB store
//! (`mem://`). Any conforming implementation must pass these.

use campus_state::storage_traits::*;
use campus_state::{MemoryDocumentStore, StorageError, SurrealDocumentStore};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

async fn stores() -> Vec<(&'static str, Arc<dyn DocumentStore>)> {
    vec![
        ("memory", Arc::new(MemoryDocumentStore::new())),
        (
            "surreal",
            Arc::new(SurrealDocumentStore::in_memory().await.unwrap()),
        ),
    ]
}

// ── create / get ──

#[tokio::test]
async fn create_assigns_id_and_get_returns_document() {
    for (name, store) in stores().await {
        let created = store
            .create("courses", json!({"code": "CSE101", "credits": 3}))
            .await
            .unwrap();
        let id = created["id"].as_str().unwrap().to_string();

        let fetched = store.get("courses", &id).await.unwrap().unwrap();
        assert_eq!(fetched["code"], "CSE101", "{name}");
        assert_eq!(fetched["credits"], 3, "{name}");
        assert_eq!(fetched["id"], json!(id), "{name}");
    }
}

#[tokio::test]
async fn get_missing_returns_none() {
    for (name, store) in stores().await {
        assert!(store.get("courses", "nope").await.unwrap().is_none(), "{name}");
    }
}

#[tokio::test]
async fn create_duplicate_id_conflicts() {
    for (name, store) in stores().await {
        store
            .create("votes", json!({"id": "v-1", "voter_id": "s-1"}))
            .await
            .unwrap();
        let err = store
            .create("votes", json!({"id": "v-1", "voter_id": "s-2"}))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict { .. }), "{name}: {err}");
    }
}

#[tokio::test]
async fn create_rejects_non_object() {
    for (name, store) in stores().await {
        let err = store.create("courses", json!([1, 2, 3])).await.unwrap_err();
        assert!(
            matches!(err, StorageError::InvalidDocument(_)),
            "{name}: {err}"
        );
    }
}

// ── find ──

#[tokio::test]
async fn find_applies_all_clauses() {
    for (name, store) in stores().await {
        for (id, state, semester) in [
            ("r-1", "submitted", "1-1"),
            ("r-2", "draft", "1-1"),
            ("r-3", "submitted", "1-2"),
        ] {
            store
                .create(
                    "registrations",
                    json!({"id": id, "state": state, "semester": semester}),
                )
                .await
                .unwrap();
        }

        let hits = store
            .find(
                "registrations",
                &Filter::all().eq("state", "submitted").eq("semester", "1-1"),
            )
            .await
            .unwrap();
        assert_eq!(hits.len(), 1, "{name}");
        assert_eq!(hits[0]["id"], "r-1", "{name}");

        let hits = store
            .find(
                "registrations",
                &Filter::all().any_of("state", ["submitted", "draft"]),
            )
            .await
            .unwrap();
        assert_eq!(hits.len(), 3, "{name}");

        let all = store.find("registrations", &Filter::all()).await.unwrap();
        assert_eq!(all.len(), 3, "{name}");
    }
}

#[tokio::test]
async fn find_contains_matches_array_members() {
    for (name, store) in stores().await {
        store
            .create("classrooms", json!({"id": "c-1", "students": ["s-1", "s-2"]}))
            .await
            .unwrap();
        store
            .create("classrooms", json!({"id": "c-2", "students": ["s-3"]}))
            .await
            .unwrap();

        let hits = store
            .find("classrooms", &Filter::all().contains("students", "s-2"))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1, "{name}");
        assert_eq!(hits[0]["id"], "c-1", "{name}");
    }
}

#[tokio::test]
async fn find_rejects_invalid_field_names() {
    for (name, store) in stores().await {
        let err = store
            .find("courses", &Filter::all().eq("code = 1 OR true", "x"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidFilter(_)), "{name}: {err}");
    }
}

// ── save / save_if / delete ──

#[tokio::test]
async fn save_replaces_existing_document() {
    for (name, store) in stores().await {
        store
            .create("users", json!({"id": "u-1", "name": "Ada"}))
            .await
            .unwrap();
        store
            .save("users", "u-1", json!({"id": "u-1", "name": "Ada L."}))
            .await
            .unwrap();
        let doc = store.get("users", "u-1").await.unwrap().unwrap();
        assert_eq!(doc["name"], "Ada L.", "{name}");
    }
}

#[tokio::test]
async fn save_missing_is_not_found() {
    for (name, store) in stores().await {
        let err = store
            .save("users", "ghost", json!({"id": "ghost"}))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }), "{name}: {err}");
    }
}

#[tokio::test]
async fn save_if_detects_stale_expectation() {
    for (name, store) in stores().await {
        store
            .create("elections", json!({"id": "e-1", "state": "draft"}))
            .await
            .unwrap();

        store
            .save_if(
                "elections",
                "e-1",
                json!({"id": "e-1", "state": "nomination_open"}),
                &Filter::all().eq("state", "draft"),
            )
            .await
            .unwrap();

        let err = store
            .save_if(
                "elections",
                "e-1",
                json!({"id": "e-1", "state": "cancelled"}),
                &Filter::all().eq("state", "draft"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict { .. }), "{name}: {err}");

        let doc = store.get("elections", "e-1").await.unwrap().unwrap();
        assert_eq!(doc["state"], "nomination_open", "{name}");
    }
}

#[tokio::test]
async fn delete_is_idempotent() {
    for (name, store) in stores().await {
        store
            .create("candidates", json!({"id": "c-1"}))
            .await
            .unwrap();
        store.delete("candidates", "c-1").await.unwrap();
        store.delete("candidates", "c-1").await.unwrap();
        assert!(store.get("candidates", "c-1").await.unwrap().is_none(), "{name}");
    }
}

// ── typed collections ──

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Notice {
    id: String,
    title: String,
    pinned: bool,
}

impl Document for Notice {
    const COLLECTION: &'static str = "notices";

    fn id(&self) -> &str {
        &self.id
    }
}

#[tokio::test]
async fn typed_collection_fetch_and_find() {
    for (name, store) in stores().await {
        let notices: Collection<Notice> = Collection::new(store);
        let notice = Notice {
            id: "n-1".into(),
            title: "Exam schedule".into(),
            pinned: true,
        };
        notices.create(&notice).await.unwrap();

        assert_eq!(notices.fetch("n-1").await.unwrap(), notice, "{name}");
        let pinned = notices
            .find_one(&Filter::all().eq("pinned", true))
            .await
            .unwrap();
        assert_eq!(pinned, Some(notice), "{name}");

        let err = notices.fetch("n-2").await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }), "{name}: {err}");
    }
}

// ── schema ──

#[tokio::test]
async fn surreal_init_schema_is_idempotent() {
    let store = SurrealDocumentStore::in_memory().await.unwrap();
    store.init_schema(&["users", "notices"]).await.unwrap();
    store.init_schema(&["users", "notices"]).await.unwrap();

    store
        .create("users", json!({"id": "u-1", "name": "Ada"}))
        .await
        .unwrap();
    let err = store
        .create("users", json!({"id": "u-1", "name": "Ada again"}))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Conflict { .. }), "{err}");
}

#[tokio::test]
async fn surreal_init_schema_rejects_bad_names() {
    let store = SurrealDocumentStore::in_memory().await.unwrap();
    assert!(store.init_schema(&["bad name"]).await.is_err());
}
