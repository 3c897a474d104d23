// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory backend with conditional-write claims.
//!
//! Stands in for a key-value store in tests and single-process setups.
//! Documents vanish with the process.

use super::backend::DocumentBackend;
use super::lock::LockClaim;
use super::DocumentKey;
use crate::error::StoreResult;
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::Value;

#[derive(Default)]
pub struct MemoryDocumentBackend {
    documents: DashMap<DocumentKey, Value>,
    claims: DashMap<DocumentKey, LockClaim>,
}

impl MemoryDocumentBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// The claim currently recorded for `key`, live or expired.
    pub fn current_claim(&self, key: &DocumentKey) -> Option<LockClaim> {
        self.claims.get(key).map(|c| c.clone())
    }

    /// Overwrite the claim for `key` unconditionally (simulates a crashed holder).
    pub fn force_claim(&self, key: &DocumentKey, claim: LockClaim) {
        self.claims.insert(key.clone(), claim);
    }
}

#[async_trait]
impl DocumentBackend for MemoryDocumentBackend {
    async fn read(&self, key: &DocumentKey) -> StoreResult<Option<Value>> {
        Ok(self.documents.get(key).map(|v| v.clone()))
    }

    async fn write(&self, key: &DocumentKey, value: &Value) -> StoreResult<()> {
        self.documents.insert(key.clone(), value.clone());
        Ok(())
    }

    async fn try_lock(&self, key: &DocumentKey, claim: &LockClaim, now_ms: i64) -> StoreResult<bool> {
        match self.claims.entry(key.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(claim.clone());
                Ok(true)
            }
            Entry::Occupied(mut slot) => {
                if slot.get().is_expired_at(now_ms) {
                    slot.insert(claim.clone());
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
        }
    }

    async fn unlock(&self, key: &DocumentKey, claim: &LockClaim) -> StoreResult<bool> {
        Ok(self
            .claims
            .remove_if(key, |_, held| held.holder_id == claim.holder_id)
            .is_some())
    }
}
