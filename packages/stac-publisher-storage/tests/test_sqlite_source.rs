//! Integration tests for the SQLite document source
//!
//! - Persistence across reopen
//! - Status gating of searches after a bulk update

#![cfg(feature = "sqlite")]

use chrono::{Duration, Utc};
use stac_publisher_storage::{
    Document, DocumentSource, DocumentStatus, RangeOp, SearchQuery, SqliteDocumentSource,
    StatusUpdate, TimeRange,
};

fn item(id: &str, age: Duration) -> Document {
    Document::new(
        id,
        Utc::now() - age,
        serde_json::json!({"item_id": id, "description_path": format!("/desc/{id}.json")}),
    )
}

#[tokio::test]
async fn test_documents_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("documents.db");

    {
        let store = SqliteDocumentSource::open(&path).unwrap();
        store
            .upsert_all(&[item("a", Duration::minutes(10)), item("b", Duration::minutes(1))])
            .unwrap();
        store
            .update_by_query(&StatusUpdate::new(
                "item_id",
                vec!["a".to_string()],
                DocumentStatus::New,
                DocumentStatus::Queued,
            ))
            .await
            .unwrap();
    }

    let reopened = SqliteDocumentSource::open(&path).unwrap();
    assert_eq!(reopened.get("a").unwrap().status, DocumentStatus::Queued);
    assert_eq!(reopened.get("b").unwrap().status, DocumentStatus::New);
}

#[tokio::test]
async fn test_queued_documents_are_not_selected_again() {
    let store = SqliteDocumentSource::new_in_memory().unwrap();
    store
        .upsert_all(&[
            item("a", Duration::minutes(10)),
            item("c", Duration::minutes(30)).with_status(DocumentStatus::Other("aggregated".into())),
        ])
        .unwrap();

    let query = SearchQuery::new(
        DocumentStatus::New,
        TimeRange::new(RangeOp::AtOrBefore, Utc::now()),
        100,
    );

    let before = store.search(&query, None).await.unwrap();
    assert_eq!(before.total, 1);
    assert_eq!(before.hits[0].id, "a");

    store
        .update_by_query(&StatusUpdate::new(
            "item_id",
            vec!["a".to_string()],
            DocumentStatus::New,
            DocumentStatus::Queued,
        ))
        .await
        .unwrap();

    let after = store.search(&query, None).await.unwrap();
    assert_eq!(after.total, 0);
    assert!(after.hits.is_empty());
    assert!(after.next.is_none());
}
