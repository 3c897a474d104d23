// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Typed document access with locked read-modify-write.

use super::backend::DocumentBackend;
use super::fs_backend::FsDocumentBackend;
use super::lock::{LockManager, RetryPolicy};
use super::memory_backend::MemoryDocumentBackend;
use super::DocumentKey;
use crate::error::{StoreError, StoreResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Document store: a backend plus the lock manager guarding it.
#[derive(Clone)]
pub struct DocumentStore {
    backend: Arc<dyn DocumentBackend>,
    locks: LockManager,
}

impl DocumentStore {
    pub fn new(backend: Arc<dyn DocumentBackend>, lock_ttl: Duration, retry: RetryPolicy) -> Self {
        let locks = LockManager::new(backend.clone(), lock_ttl, retry);
        Self { backend, locks }
    }

    /// Store backed by JSON files under `root`.
    pub fn filesystem(root: impl Into<PathBuf>, lock_ttl: Duration) -> Self {
        Self::new(
            Arc::new(FsDocumentBackend::new(root)),
            lock_ttl,
            RetryPolicy::default(),
        )
    }

    /// Process-local store, used by tests.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryDocumentBackend::new()),
            super::lock::DEFAULT_LOCK_TTL,
            RetryPolicy::default(),
        )
    }

    pub fn locks(&self) -> &LockManager {
        &self.locks
    }

    /// Read a document without locking. Readers see the last complete write.
    pub async fn read<T: DeserializeOwned>(&self, key: &DocumentKey) -> StoreResult<Option<T>> {
        self.backend
            .read(key)
            .await?
            .map(|value| {
                serde_json::from_value(value).map_err(|e| {
                    StoreError::Internal(format!("Malformed document {}: {}", key, e))
                })
            })
            .transpose()
    }

    /// Run `transform` on the current document under the document's lock and
    /// persist the result.
    ///
    /// A missing document starts from `init()`. If `transform` fails, nothing
    /// is written. The lock is released on every path.
    pub async fn update<T, R, I, F>(&self, key: &DocumentKey, init: I, transform: F) -> StoreResult<R>
    where
        T: Serialize + DeserializeOwned + Send,
        R: Send,
        I: FnOnce() -> T + Send,
        F: FnOnce(&mut T) -> StoreResult<R> + Send,
    {
        let handle = self.locks.acquire(key).await?;
        let outcome = self.read_modify_write(key, init, transform).await;

        if let Err(e) = self.locks.release(handle).await {
            tracing::warn!(key = %key, error = %e, "Failed to release document lock");
        }

        if let Err(ref e) = outcome {
            tracing::debug!(key = %key, error = %e, "Document update aborted");
        }
        outcome
    }

    async fn read_modify_write<T, R, I, F>(
        &self,
        key: &DocumentKey,
        init: I,
        transform: F,
    ) -> StoreResult<R>
    where
        T: Serialize + DeserializeOwned + Send,
        R: Send,
        I: FnOnce() -> T + Send,
        F: FnOnce(&mut T) -> StoreResult<R> + Send,
    {
        let mut document = self.read::<T>(key).await?.unwrap_or_else(init);
        let result = transform(&mut document)?;

        let value = serde_json::to_value(&document)
            .map_err(|e| StoreError::Internal(format!("Failed to serialize {}: {}", key, e)))?;
        self.backend.write(key, &value).await?;

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct Counter {
        value: u32,
    }

    #[tokio::test]
    async fn test_update_creates_document_lazily() {
        let store = DocumentStore::in_memory();
        let key = DocumentKey::shelter("s1");

        let value = store
            .update(&key, Counter::default, |c: &mut Counter| {
                c.value += 1;
                Ok(c.value)
            })
            .await
            .unwrap();

        assert_eq!(value, 1);
        let stored: Counter = store.read(&key).await.unwrap().unwrap();
        assert_eq!(stored.value, 1);
    }

    #[tokio::test]
    async fn test_failed_transform_writes_nothing_and_releases_lock() {
        let store = DocumentStore::in_memory();
        let key = DocumentKey::shelter("s1");

        let err = store
            .update(&key, Counter::default, |c: &mut Counter| -> StoreResult<()> {
                c.value = 99;
                Err(StoreError::NotFound("comment".to_string()))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
        assert!(store.read::<Counter>(&key).await.unwrap().is_none());

        // The lock was released, so the next update proceeds immediately.
        store
            .update(&key, Counter::default, |c: &mut Counter| {
                c.value += 1;
                Ok(())
            })
            .await
            .unwrap();
    }
}
