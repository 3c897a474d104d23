// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Whole-file JSON reads and crash-safe JSON writes.
//!
//! Writes go to a temporary file in the target's own directory and are then
//! renamed over the target. The rename is the only step that changes what a
//! reader sees, so a reader observes either the old document or the new one,
//! never a torn write.

use crate::error::{StoreError, StoreResult};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Marker embedded in temporary file names.
const TEMP_MARKER: &str = ".tmp-";

/// Read and parse a JSON file.
///
/// Returns `Ok(None)` when the file does not exist.
pub async fn read_json_file(path: &Path) -> StoreResult<Option<Value>> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StoreError::io(path, e)),
    };

    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|source| StoreError::Parse {
            path: path.to_path_buf(),
            source,
        })
}

/// Atomically replace `path` with the JSON serialization of `value`.
pub async fn atomic_write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> StoreResult<()> {
    let bytes = serde_json::to_vec_pretty(value)
        .map_err(|e| StoreError::Internal(format!("Failed to serialize document: {}", e)))?;

    let temp = write_temp(path, &bytes).await?;
    if let Err(e) = commit_temp(&temp, path).await {
        let _ = fs::remove_file(&temp).await;
        return Err(e);
    }
    Ok(())
}

/// Write `bytes` to a fresh temporary sibling of `path` and flush it to disk.
///
/// The target itself is untouched until [`commit_temp`] runs.
pub async fn write_temp(path: &Path, bytes: &[u8]) -> StoreResult<PathBuf> {
    let parent = parent_dir(path);
    fs::create_dir_all(&parent)
        .await
        .map_err(|e| StoreError::io(&parent, e))?;

    let temp = temp_path_for(path)?;
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&temp)
        .await
        .map_err(|e| StoreError::io(&temp, e))?;

    let written = async {
        file.write_all(bytes).await?;
        file.flush().await?;
        file.sync_all().await
    }
    .await;

    if let Err(e) = written {
        drop(file);
        let _ = fs::remove_file(&temp).await;
        return Err(StoreError::io(&temp, e));
    }

    Ok(temp)
}

/// Move a temporary file written by [`write_temp`] onto its target.
pub async fn commit_temp(temp: &Path, path: &Path) -> StoreResult<()> {
    fs::rename(temp, path)
        .await
        .map_err(|e| StoreError::io(path, e))
}

/// Remove temporary files older than `max_age` left behind by crashed writers.
///
/// Returns the number of files removed.
pub async fn sweep_stale_temp_files(root: &Path, max_age: Duration) -> StoreResult<usize> {
    let mut removed = 0;
    let mut pending = vec![root.to_path_buf()];
    let now = SystemTime::now();

    while let Some(dir) = pending.pop() {
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(StoreError::io(&dir, e)),
        };

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::io(&dir, e))?
        {
            let path = entry.path();
            let Ok(metadata) = entry.metadata().await else {
                continue;
            };

            if metadata.is_dir() {
                pending.push(path);
                continue;
            }

            let is_temp = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.contains(TEMP_MARKER))
                .unwrap_or(false);
            if !is_temp {
                continue;
            }

            let age = metadata
                .modified()
                .ok()
                .and_then(|m| now.duration_since(m).ok())
                .unwrap_or_default();
            if age >= max_age && fs::remove_file(&path).await.is_ok() {
                tracing::debug!(path = %path.display(), "Removed orphaned temp file");
                removed += 1;
            }
        }
    }

    Ok(removed)
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

pub(crate) fn temp_path_for(path: &Path) -> StoreResult<PathBuf> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| StoreError::Internal(format!("Invalid document path: {}", path.display())))?;
    let suffix = crate::time_utils::random_id()
        .map_err(|_| StoreError::Internal("System RNG unavailable".to_string()))?;

    Ok(parent_dir(path).join(format!(".{}{}{}", name, TEMP_MARKER, suffix)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_missing_file_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let value = read_json_file(&dir.path().join("absent.json")).await.unwrap();
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn test_invalid_json_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, b"{\"votes\": [").await.unwrap();

        let err = read_json_file(&path).await.unwrap_err();
        assert!(matches!(err, StoreError::Parse { .. }));
    }

    #[tokio::test]
    async fn test_write_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shelter").join("a.json");

        atomic_write_json(&path, &json!({"votes": []})).await.unwrap();

        let value = read_json_file(&path).await.unwrap().unwrap();
        assert_eq!(value, json!({"votes": []}));
    }

    #[tokio::test]
    async fn test_write_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("admin.json");

        atomic_write_json(&path, &json!({"banner": "a"})).await.unwrap();
        atomic_write_json(&path, &json!({"banner": "b"})).await.unwrap();

        let mut entries = fs::read_dir(dir.path()).await.unwrap();
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
        assert_eq!(names, vec!["admin.json".to_string()]);
    }

    #[tokio::test]
    async fn test_sweep_only_removes_old_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("device").join("d1.json");
        atomic_write_json(&path, &json!({"deviceId": "d1"})).await.unwrap();
        write_temp(&path, b"{}").await.unwrap();

        let removed = sweep_stale_temp_files(dir.path(), Duration::from_secs(3600))
            .await
            .unwrap();
        assert_eq!(removed, 0);

        let removed = sweep_stale_temp_files(dir.path(), Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert!(read_json_file(&path).await.unwrap().is_some());
    }
}
