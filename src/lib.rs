// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shelter community store.
//!
//! Crowd-submitted disaster information (shelter crowding votes, comments,
//! check-in pins, per-device settings) kept in JSON documents with atomic
//! writes, TTL-bound locks and fixed-window rate limits, plus the HTTP API
//! that serves it.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use services::{CommunityStore, InMemoryRateLimiter, IpHasher};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: CommunityStore,
    /// Shared by per-IP route budgets and per-device store limits.
    pub limiter: Arc<InMemoryRateLimiter>,
    pub ip_hasher: IpHasher,
}

impl AppState {
    /// State backed by the filesystem store at `config.store_root`.
    pub fn new(config: Config) -> Self {
        let limiter = Arc::new(InMemoryRateLimiter::new());
        let store = CommunityStore::filesystem(
            config.store_root.clone(),
            limiter.clone(),
            config.limits.clone(),
        );
        let ip_hasher = IpHasher::new(config.ip_hash_secret.clone());

        Self {
            config,
            store,
            limiter,
            ip_hasher,
        }
    }
}
