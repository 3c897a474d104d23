// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod admin;
pub mod checkin;
pub mod community;
pub mod device;
pub mod ip_hash;
pub mod rate_limit;
pub mod store;
pub mod transfer_code;

pub use admin::{ModerationOutcome, ModerationTarget};
pub use checkin::NewCheckinPin;
pub use community::RemovedContent;
pub use ip_hash::IpHasher;
pub use rate_limit::{InMemoryRateLimiter, RateDecision, RateLimiter};
pub use store::{CommunityStore, DeviceAction};
pub use transfer_code::TransferCodeError;
