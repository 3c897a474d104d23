// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the community store.

pub mod admin;
pub mod checkin;
pub mod community;
pub mod device;
pub mod moderation;

pub use admin::AdminState;
pub use checkin::{CheckinCollection, CheckinPin, CheckinStatus, PinPrecision, PinQuery};
pub use community::{
    CommunityComment, CommunityVote, CrowdLevel, ShelterCommunity, ShelterCommunityView,
    ShelterSnapshot,
};
pub use device::{CheckinEvent, DeviceSettings, DeviceState, DeviceStatePatch, Language, SavedArea};
pub use moderation::{HiddenBy, Moderation, ModerationAction, ModerationPolicy, ModerationState};
