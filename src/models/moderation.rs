// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Report/moderation lifecycle shared by comments and check-in pins.
//!
//! Derived state:
//! - `hiddenByAdmin` → `Hidden { by: Admin }`, whatever the report count says
//! - `reportCount >= hide threshold` → `Hidden { by: Threshold }`
//! - `reportCount >= caution threshold` → `Cautioned`
//! - otherwise `Visible`

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const DEFAULT_REPORT_CAUTION_THRESHOLD: u32 = 3;
pub const DEFAULT_REPORT_HIDE_THRESHOLD: u32 = 6;

/// Report-count thresholds, adjustable by admins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationPolicy {
    pub report_caution_threshold: u32,
    pub report_hide_threshold: u32,
}

impl Default for ModerationPolicy {
    fn default() -> Self {
        Self {
            report_caution_threshold: DEFAULT_REPORT_CAUTION_THRESHOLD,
            report_hide_threshold: DEFAULT_REPORT_HIDE_THRESHOLD,
        }
    }
}

impl ModerationPolicy {
    /// Thresholds must satisfy `1 <= caution <= hide`.
    pub fn validate(&self) -> Result<(), String> {
        if self.report_caution_threshold == 0 {
            return Err("reportCautionThreshold must be at least 1".to_string());
        }
        if self.report_hide_threshold < self.report_caution_threshold {
            return Err("reportHideThreshold must not be below reportCautionThreshold".to_string());
        }
        Ok(())
    }
}

/// Who hid an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HiddenBy {
    Threshold,
    Admin,
}

/// Public visibility of a comment or pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModerationState {
    Visible,
    Cautioned,
    Hidden { by: HiddenBy },
}

impl ModerationState {
    pub fn is_hidden(&self) -> bool {
        matches!(self, ModerationState::Hidden { .. })
    }
}

/// Admin moderation verbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ModerationAction {
    Hide,
    Unhide,
    Delete,
    ClearReports,
}

/// Report bookkeeping embedded (flattened) in comments and pins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Moderation {
    #[serde(default)]
    pub reporter_ids: BTreeSet<String>,
    #[serde(default)]
    pub report_count: u32,
    /// Cached "excluded from public listings" flag, kept in sync by `refresh`.
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub hidden_by_admin: bool,
}

impl Moderation {
    /// Starts admin-hidden when the author is under a sticky admin hide.
    pub fn new(hidden_by_admin: bool) -> Self {
        Self {
            hidden: hidden_by_admin,
            hidden_by_admin,
            ..Self::default()
        }
    }

    pub fn state(&self, policy: &ModerationPolicy) -> ModerationState {
        if self.hidden_by_admin {
            ModerationState::Hidden { by: HiddenBy::Admin }
        } else if self.report_count >= policy.report_hide_threshold {
            ModerationState::Hidden {
                by: HiddenBy::Threshold,
            }
        } else if self.report_count >= policy.report_caution_threshold {
            ModerationState::Cautioned
        } else {
            ModerationState::Visible
        }
    }

    /// Record a report. A reporter counts once per entity; repeats return `false`.
    pub fn report(&mut self, reporter_id: &str, policy: &ModerationPolicy) -> bool {
        if !self.reporter_ids.insert(reporter_id.to_string()) {
            return false;
        }
        self.report_count = self.report_count.saturating_add(1);
        self.refresh(policy);
        true
    }

    /// Recompute the cached `hidden` flag. Never clears an admin hide.
    pub fn refresh(&mut self, policy: &ModerationPolicy) {
        self.hidden = self.state(policy).is_hidden();
    }

    pub fn admin_hide(&mut self) {
        self.hidden_by_admin = true;
        self.hidden = true;
    }

    /// Lift an admin hide and start the report lifecycle over.
    pub fn admin_unhide(&mut self, policy: &ModerationPolicy) {
        self.hidden_by_admin = false;
        self.clear_reports(policy);
    }

    /// Forget all reports. An admin hide stays in force.
    pub fn clear_reports(&mut self, policy: &ModerationPolicy) {
        self.reporter_ids.clear();
        self.report_count = 0;
        self.refresh(policy);
    }
}
