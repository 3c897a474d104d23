// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Local filesystem backend.
//!
//! Layout under the store root:
//! - `device/{id}.json`, `shelter/{id}.json`, `admin.json`, `checkins.json`
//! - `{document}.json.lock` sidecar claims
//!
//! A claim file is written to a temp sibling and then hard-linked into place.
//! `link(2)` fails if the target exists, which makes claim creation an atomic
//! create-with-content that also works between processes on one volume.

use super::atomic_io::{atomic_write_json, read_json_file, temp_path_for, write_temp};
use super::backend::DocumentBackend;
use super::lock::LockClaim;
use super::DocumentKey;
use crate::error::{StoreError, StoreResult};
use async_trait::async_trait;
use serde_json::Value;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::fs;

const LOCK_SUFFIX: &str = ".lock";

/// What is currently on disk at a lock path.
enum ClaimFile {
    Missing,
    Held(LockClaim),
    Corrupt,
}

#[derive(Debug, Clone)]
pub struct FsDocumentBackend {
    root: PathBuf,
}

impl FsDocumentBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn document_path(&self, key: &DocumentKey) -> PathBuf {
        self.root.join(key.relative_path())
    }

    pub fn lock_path(&self, key: &DocumentKey) -> PathBuf {
        let mut name: OsString = self.document_path(key).into_os_string();
        name.push(LOCK_SUFFIX);
        PathBuf::from(name)
    }

    async fn read_claim(path: &Path) -> StoreResult<ClaimFile> {
        match fs::read(path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)
                .map(ClaimFile::Held)
                .unwrap_or(ClaimFile::Corrupt)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ClaimFile::Missing),
            Err(e) => Err(StoreError::io(path, e)),
        }
    }

    /// Create the claim file only if none exists. Returns `false` if one does.
    async fn create_claim(path: &Path, claim: &LockClaim) -> StoreResult<bool> {
        let bytes = serde_json::to_vec(claim)
            .map_err(|e| StoreError::Internal(format!("Failed to serialize lock claim: {}", e)))?;
        let temp = write_temp(path, &bytes).await?;

        let linked = fs::hard_link(&temp, path).await;
        let _ = fs::remove_file(&temp).await;

        match linked {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(StoreError::io(path, e)),
        }
    }

    /// Remove the claim file only if `holder_id` still holds it.
    ///
    /// The claim is first renamed aside, so the file that gets checked is the
    /// file that gets deleted. A claim taken by someone else in the meantime
    /// is linked back into place. Returns `true` if the path is now free.
    async fn remove_claim_held_by(path: &Path, holder_id: &str) -> StoreResult<bool> {
        let tombstone = temp_path_for(path)?;
        match fs::rename(path, &tombstone).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(true),
            Err(e) => return Err(StoreError::io(path, e)),
        }

        let stale = matches!(
            Self::read_claim(&tombstone).await,
            Ok(ClaimFile::Held(ref current)) if current.holder_id == holder_id
        );
        if !stale {
            match fs::hard_link(&tombstone, path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    tracing::warn!(
                        path = %path.display(),
                        "Displaced lock claim was replaced before restore"
                    );
                }
                Err(e) => {
                    let _ = fs::remove_file(&tombstone).await;
                    return Err(StoreError::io(path, e));
                }
            }
        }

        Self::remove_claim(&tombstone).await?;
        Ok(stale)
    }

    async fn remove_claim(path: &Path) -> StoreResult<()> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::io(path, e)),
        }
    }
}

#[async_trait]
impl DocumentBackend for FsDocumentBackend {
    async fn read(&self, key: &DocumentKey) -> StoreResult<Option<Value>> {
        read_json_file(&self.document_path(key)).await
    }

    async fn write(&self, key: &DocumentKey, value: &Value) -> StoreResult<()> {
        atomic_write_json(&self.document_path(key), value).await
    }

    async fn try_lock(&self, key: &DocumentKey, claim: &LockClaim, now_ms: i64) -> StoreResult<bool> {
        let path = self.lock_path(key);
        if Self::create_claim(&path, claim).await? {
            return Ok(true);
        }

        match Self::read_claim(&path).await? {
            // Released between our attempt and the read.
            ClaimFile::Missing => Self::create_claim(&path, claim).await,
            ClaimFile::Held(existing) if !existing.is_expired_at(now_ms) => Ok(false),
            ClaimFile::Held(existing) => {
                tracing::info!(
                    key = %key,
                    stale_holder = %existing.holder_id,
                    expired_ms_ago = now_ms - existing.expires_at,
                    "Reclaiming expired document lock"
                );
                if Self::remove_claim_held_by(&path, &existing.holder_id).await? {
                    Self::create_claim(&path, claim).await
                } else {
                    // Someone else reclaimed it first.
                    Ok(false)
                }
            }
            ClaimFile::Corrupt => {
                tracing::warn!(key = %key, "Replacing unreadable lock file");
                Self::remove_claim(&path).await?;
                Self::create_claim(&path, claim).await
            }
        }
    }

    async fn unlock(&self, key: &DocumentKey, claim: &LockClaim) -> StoreResult<bool> {
        let path = self.lock_path(key);
        match Self::read_claim(&path).await? {
            ClaimFile::Held(existing) if existing.holder_id == claim.holder_id => {
                Self::remove_claim(&path).await?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
