// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Crash-safety of document writes and recovery of abandoned lock claims.

use serde_json::{json, Value};
use shelter_community::db::{
    atomic_io, DocumentBackend, DocumentKey, DocumentStore, FsDocumentBackend, LockClaim,
};
use shelter_community::error::{ErrorCode, StoreError};
use shelter_community::time_utils::now_millis;
use std::time::Duration;

#[tokio::test]
async fn test_interrupted_write_leaves_previous_document() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shelter").join("s1.json");

    atomic_io::atomic_write_json(&path, &json!({"version": 1}))
        .await
        .unwrap();

    // A writer that dies after writing its temp file but before the rename.
    let temp = atomic_io::write_temp(&path, br#"{"version": 2}"#)
        .await
        .unwrap();
    assert!(temp.exists());

    let current = atomic_io::read_json_file(&path).await.unwrap();
    assert_eq!(current, Some(json!({"version": 1})));

    let removed = atomic_io::sweep_stale_temp_files(dir.path(), Duration::ZERO)
        .await
        .unwrap();
    assert_eq!(removed, 1);
    assert!(!temp.exists());
    assert_eq!(
        atomic_io::read_json_file(&path).await.unwrap(),
        Some(json!({"version": 1}))
    );
}

#[tokio::test]
async fn test_sweep_keeps_recent_temp_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("admin.json");

    let temp = atomic_io::write_temp(&path, b"{}").await.unwrap();
    let removed = atomic_io::sweep_stale_temp_files(dir.path(), Duration::from_secs(3600))
        .await
        .unwrap();

    assert_eq!(removed, 0);
    assert!(temp.exists());
}

#[tokio::test]
async fn test_sweep_of_missing_root() {
    let dir = tempfile::tempdir().unwrap();
    let removed = atomic_io::sweep_stale_temp_files(&dir.path().join("absent"), Duration::ZERO)
        .await
        .unwrap();
    assert_eq!(removed, 0);
}

#[tokio::test]
async fn test_corrupt_document_is_reported_not_replaced() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("checkins.json");
    tokio::fs::write(&path, b"{\"pins\": [").await.unwrap();

    let err = atomic_io::read_json_file(&path).await.unwrap_err();
    assert!(matches!(err, StoreError::Parse { .. }));
    assert_eq!(err.code(), ErrorCode::InternalError);
}

async fn plant_claim(backend: &FsDocumentBackend, key: &DocumentKey, claim: &LockClaim) {
    let lock_path = backend.lock_path(key);
    tokio::fs::create_dir_all(lock_path.parent().unwrap())
        .await
        .unwrap();
    tokio::fs::write(&lock_path, serde_json::to_vec(claim).unwrap())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_expired_claim_from_crashed_writer_is_reclaimed() {
    let dir = tempfile::tempdir().unwrap();
    let backend = FsDocumentBackend::new(dir.path());
    let key = DocumentKey::shelter("s1");

    plant_claim(
        &backend,
        &key,
        &LockClaim {
            holder_id: "crashed-writer".to_string(),
            expires_at: now_millis() - 1_000,
        },
    )
    .await;

    let store = DocumentStore::filesystem(dir.path(), Duration::from_secs(15));
    let written: Value = store
        .update(&key, || json!({"count": 0}), |doc: &mut Value| {
            doc["count"] = json!(1);
            Ok(doc.clone())
        })
        .await
        .unwrap();

    assert_eq!(written, json!({"count": 1}));
    assert!(!backend.lock_path(&key).exists());
    assert_eq!(backend.read(&key).await.unwrap(), Some(json!({"count": 1})));
}

#[tokio::test]
async fn test_live_foreign_claim_times_out_as_retryable() {
    let dir = tempfile::tempdir().unwrap();
    let backend = FsDocumentBackend::new(dir.path());
    let key = DocumentKey::device("d1");

    let foreign = LockClaim {
        holder_id: "other-process".to_string(),
        expires_at: now_millis() + 60_000,
    };
    plant_claim(&backend, &key, &foreign).await;

    let store = DocumentStore::filesystem(dir.path(), Duration::from_secs(15));
    let err = store
        .update(&key, || json!({}), |doc: &mut Value| Ok(doc.clone()))
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::LockTimeout { .. }));
    assert!(err.is_retryable());

    // The foreign claim is untouched and nothing was written.
    let impostor = LockClaim {
        holder_id: "someone-else".to_string(),
        expires_at: foreign.expires_at,
    };
    assert!(!backend.unlock(&key, &impostor).await.unwrap());
    assert!(backend.unlock(&key, &foreign).await.unwrap());
    assert_eq!(backend.read(&key).await.unwrap(), None);
}
