use burrow_core::{AddValue, DeletionRequest, InternalStats, ShortCode};
use burrow_storage::{FileStore, Store, StoreError};
use std::fs;
use tempfile::TempDir;

const BASE: &str = "http://localhost:8080";

fn code(value: &str) -> ShortCode {
    ShortCode::new_unchecked(value)
}

fn params(url: &str, short: &str, owner: &str) -> AddValue {
    AddValue {
        original_url: url.to_string(),
        base_url: BASE.to_string(),
        short_code: code(short),
        owner_id: owner.to_string(),
    }
}

#[tokio::test]
async fn records_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("urls.jsonl");

    {
        let store = FileStore::open(&path).unwrap();
        store
            .add_value(params("https://a.example", "aaa", "u1"))
            .await
            .unwrap();
        store
            .add_value(params("https://b.example", "bbb", "u2"))
            .await
            .unwrap();
    }

    let store = FileStore::open(&path).unwrap();
    assert_eq!(
        store.get_original_url(&code("aaa")).await.unwrap(),
        "https://a.example"
    );
    assert_eq!(
        store.get_internal_stats().await.unwrap(),
        InternalStats { urls: 2, users: 2 }
    );
}

#[tokio::test]
async fn soft_deletes_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("urls.jsonl");

    {
        let store = FileStore::open(&path).unwrap();
        store
            .add_value(params("https://a.example", "aaa", "u1"))
            .await
            .unwrap();
        store
            .delete_urls(&[DeletionRequest::new("u1", vec![code("aaa")])])
            .await
            .unwrap();
    }

    let store = FileStore::open(&path).unwrap();
    let err = store.get_original_url(&code("aaa")).await.unwrap_err();
    assert!(matches!(err, StoreError::Gone(_)));
    assert_eq!(store.get_internal_stats().await.unwrap().urls, 1);
}

#[tokio::test]
async fn sequence_resumes_after_highest_replayed_id() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("urls.jsonl");
    fs::write(
        &path,
        concat!(
            r#"{"uuid":3,"short_url":"c","original_url":"https://c.example","user_id":"u1","is_deleted":false}"#,
            "\n",
            r#"{"uuid":7,"short_url":"g","original_url":"https://g.example","user_id":"u1","is_deleted":false}"#,
            "\n",
        ),
    )
    .unwrap();

    let store = FileStore::open(&path).unwrap();
    store
        .add_value(params("https://h.example", "h", "u1"))
        .await
        .unwrap();

    let content = fs::read_to_string(&path).unwrap();
    let last: serde_json::Value = serde_json::from_str(content.lines().last().unwrap()).unwrap();
    assert_eq!(last["uuid"], 8);
    assert_eq!(last["short_url"], "h");
}

#[tokio::test]
async fn conflict_is_detected_against_replayed_records() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("urls.jsonl");

    {
        let store = FileStore::open(&path).unwrap();
        store
            .add_value(params("https://example.com", "first", "u1"))
            .await
            .unwrap();
    }

    let store = FileStore::open(&path).unwrap();
    let err = store
        .add_value(params("https://example.com", "second", "u1"))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        StoreError::Conflict {
            short_url: "http://localhost:8080/first".to_string()
        }
    );
}

#[tokio::test]
async fn user_urls_include_soft_deleted_records() {
    let dir = TempDir::new().unwrap();
    let store = FileStore::open(dir.path().join("urls.jsonl")).unwrap();

    store
        .add_value(params("https://a.example", "aaa", "u1"))
        .await
        .unwrap();
    store
        .add_value(params("https://b.example", "bbb", "u1"))
        .await
        .unwrap();
    store
        .delete_urls(&[DeletionRequest::new("u1", vec![code("aaa")])])
        .await
        .unwrap();

    let urls = store.get_user_urls("u1", BASE).await.unwrap();
    assert_eq!(urls.len(), 2);
    assert_eq!(urls[0].short_url, "http://localhost:8080/aaa");
    assert_eq!(urls[1].short_url, "http://localhost:8080/bbb");
}
