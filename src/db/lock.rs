// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! TTL-bound document locks.
//!
//! Acquiring a lock is two-layered:
//! 1. Callers in this process queue on a per-key async mutex, so local
//!    contention is served in arrival order without polling.
//! 2. The queue head then records a claim `{holderId, expiresAt}` through the
//!    backend, retrying with capped exponential backoff while another
//!    process holds a live claim.
//!
//! Claims are never renewed. A holder that crashes leaves a claim that simply
//! expires, so every read-modify-write must finish well inside the TTL.

use super::backend::DocumentBackend;
use super::DocumentKey;
use crate::error::{StoreError, StoreResult};
use crate::time_utils::{now_millis, random_id};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Default lock TTL.
pub const DEFAULT_LOCK_TTL: Duration = Duration::from_millis(15_000);

/// A claim on one document key, as persisted by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockClaim {
    /// Random id of the holder; release only succeeds for the same id.
    pub holder_id: String,
    /// Expiry in milliseconds since the Unix epoch.
    pub expires_at: i64,
}

impl LockClaim {
    /// Create a fresh claim that expires `ttl` from now.
    pub fn new(ttl: Duration) -> StoreResult<Self> {
        let holder_id = random_id()
            .map_err(|_| StoreError::Internal("System RNG unavailable".to_string()))?;
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);

        Ok(Self {
            holder_id,
            expires_at: now_millis().saturating_add(ttl_ms),
        })
    }

    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        self.expires_at <= now_ms
    }
}

/// Backoff schedule for contended claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(50),
            max_delay: Duration::from_millis(500),
            max_attempts: 5,
        }
    }
}

impl RetryPolicy {
    /// Delay to sleep after the given failed attempt (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.initial_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Total time spent sleeping before giving up.
    pub fn budget(&self) -> Duration {
        (1..self.max_attempts).map(|a| self.delay_after(a)).sum()
    }
}

/// Proof of holding a document lock. Pass it back to [`LockManager::release`].
pub struct LockHandle {
    key: DocumentKey,
    claim: LockClaim,
    local: OwnedMutexGuard<()>,
}

impl LockHandle {
    pub fn key(&self) -> &DocumentKey {
        &self.key
    }

    pub fn holder_id(&self) -> &str {
        &self.claim.holder_id
    }

    pub fn expires_at(&self) -> i64 {
        self.claim.expires_at
    }
}

impl fmt::Debug for LockHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockHandle")
            .field("key", &self.key)
            .field("claim", &self.claim)
            .finish_non_exhaustive()
    }
}

/// Shared per-key async mutexes for callers within this process.
type LocalLocks = Arc<DashMap<DocumentKey, Arc<Mutex<()>>>>;

/// Serializes read-modify-write cycles per document key.
#[derive(Clone)]
pub struct LockManager {
    backend: Arc<dyn DocumentBackend>,
    local: LocalLocks,
    ttl: Duration,
    retry: RetryPolicy,
}

impl LockManager {
    pub fn new(backend: Arc<dyn DocumentBackend>, ttl: Duration, retry: RetryPolicy) -> Self {
        Self {
            backend,
            local: Arc::new(DashMap::new()),
            ttl,
            retry,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Claim `key`.
    ///
    /// Callers in this process queue on a local mutex for at most one TTL
    /// (every holder finishes or loses its claim within that). The shared
    /// claim is then retried with backoff up to the retry budget.
    pub async fn acquire(&self, key: &DocumentKey) -> StoreResult<LockHandle> {
        let mutex = self
            .local
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let local = match tokio::time::timeout(self.ttl, mutex.lock_owned()).await {
            Ok(guard) => guard,
            Err(_) => {
                tracing::warn!(key = %key, "Timed out waiting for in-process lock queue");
                self.forget_if_idle(key);
                return Err(StoreError::LockTimeout {
                    key: key.to_string(),
                });
            }
        };

        for attempt in 1..=self.retry.max_attempts {
            let claim = LockClaim::new(self.ttl)?;
            let acquired = match self.backend.try_lock(key, &claim, now_millis()).await {
                Ok(acquired) => acquired,
                Err(e) => {
                    drop(local);
                    self.forget_if_idle(key);
                    return Err(e);
                }
            };

            if acquired {
                tracing::trace!(key = %key, attempt, "Lock acquired");
                return Ok(LockHandle {
                    key: key.clone(),
                    claim,
                    local,
                });
            }

            if attempt < self.retry.max_attempts {
                let delay = self.retry.delay_after(attempt);
                tracing::debug!(
                    key = %key,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Document locked by another process, backing off"
                );
                tokio::time::sleep(delay).await;
            }
        }

        drop(local);
        self.forget_if_idle(key);
        tracing::warn!(
            key = %key,
            attempts = self.retry.max_attempts,
            "Lock acquisition exhausted retries"
        );
        Err(StoreError::LockTimeout {
            key: key.to_string(),
        })
    }

    /// Release a lock. Only clears the stored claim if this handle still owns it.
    pub async fn release(&self, handle: LockHandle) -> StoreResult<()> {
        let LockHandle { key, claim, local } = handle;

        let result = self.backend.unlock(&key, &claim).await;
        drop(local);
        self.forget_if_idle(&key);

        match result {
            Ok(true) => Ok(()),
            Ok(false) => {
                tracing::warn!(
                    key = %key,
                    holder_id = %claim.holder_id,
                    "Lock claim expired or was reclaimed before release"
                );
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Drop the local mutex for `key` when nobody else is holding or waiting on it.
    fn forget_if_idle(&self, key: &DocumentKey) {
        self.local
            .remove_if(key, |_, mutex| Arc::strong_count(mutex) == 1);
    }

    #[cfg(test)]
    fn local_len(&self) -> usize {
        self.local.len()
    }
}
