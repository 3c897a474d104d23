// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! The public store API.
//!
//! `CommunityStore` owns the document store, the rate limiter consulted by
//! per-device actions, and the tunables. The operations themselves live in
//! `services::{community, checkin, device, admin}` as further `impl` blocks.

use super::rate_limit::{InMemoryRateLimiter, RateLimiter};
use crate::config::StoreLimits;
use crate::db::{DocumentKey, DocumentStore};
use crate::error::{StoreError, StoreResult};
use crate::models::{AdminState, ModerationPolicy};
use crate::time_utils::random_id;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Per-device actions that are rate limited inside the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceAction {
    Vote,
    Comment,
    Report,
    Checkin,
}

impl DeviceAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceAction::Vote => "vote",
            DeviceAction::Comment => "comment",
            DeviceAction::Report => "report",
            DeviceAction::Checkin => "checkin",
        }
    }
}

#[derive(Clone)]
pub struct CommunityStore {
    docs: DocumentStore,
    limiter: Arc<dyn RateLimiter>,
    limits: StoreLimits,
}

impl CommunityStore {
    pub fn new(docs: DocumentStore, limiter: Arc<dyn RateLimiter>, limits: StoreLimits) -> Self {
        Self {
            docs,
            limiter,
            limits,
        }
    }

    /// Store backed by JSON files under `root`.
    pub fn filesystem(
        root: impl Into<PathBuf>,
        limiter: Arc<dyn RateLimiter>,
        limits: StoreLimits,
    ) -> Self {
        let docs = DocumentStore::filesystem(root, limits.lock_ttl);
        Self::new(docs, limiter, limits)
    }

    /// Process-local store with its own limiter, used by tests.
    pub fn in_memory(limits: StoreLimits) -> Self {
        Self::new(
            DocumentStore::in_memory(),
            Arc::new(InMemoryRateLimiter::new()),
            limits,
        )
    }

    pub fn limits(&self) -> &StoreLimits {
        &self.limits
    }

    pub fn documents(&self) -> &DocumentStore {
        &self.docs
    }

    /// Consume one unit of the device's budget for `action`.
    pub(crate) fn check_device_rate(
        &self,
        action: DeviceAction,
        device_id: &str,
    ) -> StoreResult<()> {
        let (limit, window) = self.device_budget(action);
        let key = format!("{}:{}", action.as_str(), device_id);

        self.limiter
            .check(&key, limit, window)
            .into_result()
            .map_err(|retry_after_ms| {
                tracing::info!(
                    action = action.as_str(),
                    device_id = %device_id,
                    retry_after_ms,
                    "Device rate limited"
                );
                StoreError::RateLimited { retry_after_ms }
            })
    }

    fn device_budget(&self, action: DeviceAction) -> (u32, Duration) {
        let l = &self.limits;
        match action {
            DeviceAction::Vote => (l.vote_limit, l.vote_window),
            DeviceAction::Comment => (l.comment_limit, l.comment_window),
            DeviceAction::Report => (l.report_limit, l.report_window),
            DeviceAction::Checkin => (l.checkin_limit, l.checkin_window),
        }
    }

    /// Current moderation thresholds (defaults when no admin document exists).
    pub(crate) async fn moderation_policy(&self) -> StoreResult<ModerationPolicy> {
        Ok(self
            .docs
            .read::<AdminState>(&DocumentKey::Admin)
            .await?
            .map(|state| state.moderation_policy)
            .unwrap_or_default())
    }
}

/// Fresh random id for comments and pins.
pub(crate) fn new_id() -> StoreResult<String> {
    random_id().map_err(|_| StoreError::Internal("Random id generation failed".to_string()))
}

/// Trim `text` and check it is non-empty and at most `max_chars` characters.
pub(crate) fn clean_text(field: &str, text: &str, max_chars: usize) -> StoreResult<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(StoreError::InvalidBody(format!("{} must not be empty", field)));
    }
    if trimmed.chars().count() > max_chars {
        return Err(StoreError::InvalidBody(format!(
            "{} exceeds {} characters",
            field, max_chars
        )));
    }
    Ok(trimmed.to_string())
}
