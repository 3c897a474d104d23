// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Admin-controlled state: the site banner and the moderation policy.
//!
//! Stored at: `admin.json`

use super::moderation::ModerationPolicy;
use serde::{Deserialize, Serialize};

/// Longest banner accepted, in characters.
pub const MAX_BANNER_CHARS: usize = 500;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminState {
    #[serde(default)]
    pub banner: Option<String>,
    #[serde(default)]
    pub moderation_policy: ModerationPolicy,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_default_policy() {
        let state: AdminState = serde_json::from_str("{}").unwrap();
        assert_eq!(state.banner, None);
        assert_eq!(state.moderation_policy.report_caution_threshold, 3);
        assert_eq!(state.moderation_policy.report_hide_threshold, 6);
    }
}
