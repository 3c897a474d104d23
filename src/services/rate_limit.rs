// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Fixed-window rate limiting.
//!
//! Buckets are kept in process memory, so limits are per instance: with N
//! instances behind a load balancer an identity can get up to N times the
//! budget. That is acceptable for abuse throttling; it is not a quota.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    Limited { retry_after: Duration },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateDecision::Allowed)
    }

    /// `Err(retry_after_ms)` when limited.
    pub fn into_result(self) -> Result<(), u64> {
        match self {
            RateDecision::Allowed => Ok(()),
            RateDecision::Limited { retry_after } => Err(retry_after.as_millis() as u64),
        }
    }
}

/// Counter service consulted before mutating state.
///
/// Keys are `"{action}:{identity}"` strings.
pub trait RateLimiter: Send + Sync {
    fn check(&self, key: &str, limit: u32, window: Duration) -> RateDecision;
}

#[derive(Debug, Clone, Copy)]
struct RateBucket {
    count: u32,
    reset_at: Instant,
}

/// In-process fixed-window limiter.
#[derive(Default)]
pub struct InMemoryRateLimiter {
    buckets: DashMap<String, RateBucket>,
}

impl InMemoryRateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check against an explicit clock reading.
    pub fn check_at(&self, key: &str, limit: u32, window: Duration, now: Instant) -> RateDecision {
        match self.buckets.entry(key.to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(RateBucket {
                    count: 1,
                    reset_at: now + window,
                });
                RateDecision::Allowed
            }
            Entry::Occupied(mut slot) => {
                let bucket = slot.get_mut();
                if now >= bucket.reset_at {
                    *bucket = RateBucket {
                        count: 1,
                        reset_at: now + window,
                    };
                    RateDecision::Allowed
                } else if bucket.count >= limit {
                    RateDecision::Limited {
                        retry_after: bucket.reset_at.saturating_duration_since(now),
                    }
                } else {
                    bucket.count += 1;
                    RateDecision::Allowed
                }
            }
        }
    }

    /// Drop buckets whose window has ended. Returns how many were removed.
    pub fn prune_expired(&self, now: Instant) -> usize {
        let before = self.buckets.len();
        self.buckets.retain(|_, bucket| bucket.reset_at > now);
        before.saturating_sub(self.buckets.len())
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Periodically prune expired buckets for the life of the process.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        let limiter = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let removed = limiter.prune_expired(Instant::now());
                if removed > 0 {
                    tracing::debug!(removed, remaining = limiter.len(), "Pruned rate buckets");
                }
            }
        })
    }
}

impl RateLimiter for InMemoryRateLimiter {
    fn check(&self, key: &str, limit: u32, window: Duration) -> RateDecision {
        self.check_at(key, limit, window, Instant::now())
    }
}
