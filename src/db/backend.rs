// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Storage backend contract.
//!
//! A backend stores whole JSON documents by key and arbitrates lock claims.
//! `try_lock` must be a conditional write: it succeeds only when no live claim
//! exists (or the existing claim has expired), so any store with
//! compare-and-set semantics can stand in for the local filesystem.

use super::lock::LockClaim;
use super::DocumentKey;
use crate::error::StoreResult;
use async_trait::async_trait;
use serde_json::Value;

#[async_trait]
pub trait DocumentBackend: Send + Sync {
    /// Read a document, `None` if it has never been written.
    async fn read(&self, key: &DocumentKey) -> StoreResult<Option<Value>>;

    /// Replace a document as a single atomic step.
    async fn write(&self, key: &DocumentKey, value: &Value) -> StoreResult<()>;

    /// Record `claim` for `key` if the key is unclaimed or its claim expired
    /// before `now_ms`. Returns `false` when another live claim holds the key.
    async fn try_lock(&self, key: &DocumentKey, claim: &LockClaim, now_ms: i64) -> StoreResult<bool>;

    /// Clear the claim for `key` if it is still held by `claim.holder_id`.
    /// Returns `false` when the claim was already gone or reclaimed.
    async fn unlock(&self, key: &DocumentKey, claim: &LockClaim) -> StoreResult<bool>;
}
