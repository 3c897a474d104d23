// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Document storage layer (JSON files with TTL-bound locks).

pub mod atomic_io;
pub mod backend;
pub mod fs_backend;
pub mod lock;
pub mod memory_backend;
pub mod store;

pub use backend::DocumentBackend;
pub use fs_backend::FsDocumentBackend;
pub use lock::{LockClaim, LockHandle, LockManager, RetryPolicy};
pub use memory_backend::MemoryDocumentBackend;
pub use store::DocumentStore;

use std::fmt;
use std::path::PathBuf;

/// Directory and file names under the store root.
pub mod collections {
    pub const DEVICES: &str = "device";
    pub const SHELTERS: &str = "shelter";
    pub const ADMIN: &str = "admin";
    pub const CHECKINS: &str = "checkins";
}

/// Identifies one document: the unit of locking and of atomic replacement.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DocumentKey {
    /// Community snapshot (votes and comments) for one shelter.
    Shelter(String),
    /// Per-device state.
    Device(String),
    /// Admin banner and moderation policy.
    Admin,
    /// The check-in pin collection.
    Checkins,
}

impl DocumentKey {
    pub fn shelter(id: impl Into<String>) -> Self {
        DocumentKey::Shelter(id.into())
    }

    pub fn device(id: impl Into<String>) -> Self {
        DocumentKey::Device(id.into())
    }

    /// Path of the document relative to the store root.
    ///
    /// Ids are percent-encoded so they can never escape their directory.
    pub fn relative_path(&self) -> PathBuf {
        match self {
            DocumentKey::Shelter(id) => PathBuf::from(collections::SHELTERS)
                .join(format!("{}.json", urlencoding::encode(id))),
            DocumentKey::Device(id) => PathBuf::from(collections::DEVICES)
                .join(format!("{}.json", urlencoding::encode(id))),
            DocumentKey::Admin => PathBuf::from(format!("{}.json", collections::ADMIN)),
            DocumentKey::Checkins => PathBuf::from(format!("{}.json", collections::CHECKINS)),
        }
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentKey::Shelter(id) => write!(f, "{}:{}", collections::SHELTERS, id),
            DocumentKey::Device(id) => write!(f, "{}:{}", collections::DEVICES, id),
            DocumentKey::Admin => f.write_str(collections::ADMIN),
            DocumentKey::Checkins => f.write_str(collections::CHECKINS),
        }
    }
}
