// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-shelter community document: crowding votes and comments.
//!
//! Stored at: `shelter/{shelterId}.json`

use super::moderation::{Moderation, ModerationPolicy, ModerationState};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// How crowded a shelter is, as reported by visitors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CrowdLevel {
    Empty,
    Normal,
    Crowded,
    Full,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityVote {
    pub device_id: String,
    pub ip_hash: String,
    pub value: CrowdLevel,
    /// When the vote was cast (RFC3339)
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityComment {
    pub id: String,
    pub device_id: String,
    pub ip_hash: String,
    pub text: String,
    pub created_at: String,
    #[serde(flatten)]
    pub moderation: Moderation,
}

/// The stored document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShelterCommunity {
    pub shelter_id: String,
    #[serde(default)]
    pub updated_at: Option<String>,
    /// Oldest first; at most one per device.
    #[serde(default)]
    pub votes: Vec<CommunityVote>,
    /// Oldest first.
    #[serde(default)]
    pub comments: Vec<CommunityComment>,
    /// Devices an admin has hidden here. Their new comments start hidden.
    #[serde(default)]
    pub admin_hidden_device_ids: BTreeSet<String>,
}

impl ShelterCommunity {
    pub fn new(shelter_id: impl Into<String>) -> Self {
        Self {
            shelter_id: shelter_id.into(),
            ..Self::default()
        }
    }

    /// Record a vote, replacing any earlier vote from the same device and
    /// dropping the oldest votes beyond `max_votes`.
    pub fn upsert_vote(&mut self, vote: CommunityVote, max_votes: usize) {
        self.votes.retain(|v| v.device_id != vote.device_id);
        self.updated_at = Some(vote.timestamp.clone());
        self.votes.push(vote);
        truncate_front(&mut self.votes, max_votes);
    }

    /// Append a comment, dropping the oldest beyond `max_comments`.
    pub fn add_comment(&mut self, comment: CommunityComment, max_comments: usize) {
        self.updated_at = Some(comment.created_at.clone());
        self.comments.push(comment);
        truncate_front(&mut self.comments, max_comments);
    }

    /// Whether new content from `device_id` starts admin-hidden.
    pub fn is_device_admin_hidden(&self, device_id: &str) -> bool {
        self.admin_hidden_device_ids.contains(device_id)
    }

    /// Lift the sticky hide on `device_id` once none of its comments here
    /// remain admin-hidden.
    pub fn release_admin_hidden_device(&mut self, device_id: &str) {
        let still_hidden = self
            .comments
            .iter()
            .any(|c| c.device_id == device_id && c.moderation.hidden_by_admin);
        if !still_hidden {
            self.admin_hidden_device_ids.remove(device_id);
        }
    }

    /// Remove one device's vote and comments. Returns `(vote_removed, comments_removed)`.
    pub fn remove_device_content(&mut self, device_id: &str) -> (bool, usize) {
        let votes_before = self.votes.len();
        self.votes.retain(|v| v.device_id != device_id);
        let comments_before = self.comments.len();
        self.comments.retain(|c| c.device_id != device_id);

        (
            self.votes.len() != votes_before,
            comments_before - self.comments.len(),
        )
    }

    pub fn comment_mut(&mut self, comment_id: &str) -> Option<&mut CommunityComment> {
        self.comments.iter_mut().find(|c| c.id == comment_id)
    }

    /// Remove a comment by id, returning it.
    pub fn remove_comment(&mut self, comment_id: &str) -> Option<CommunityComment> {
        let index = self.comments.iter().position(|c| c.id == comment_id)?;
        Some(self.comments.remove(index))
    }

    /// Re-derive cached hidden flags after a policy change.
    pub fn refresh_moderation(&mut self, policy: &ModerationPolicy) {
        for comment in &mut self.comments {
            comment.moderation.refresh(policy);
        }
    }
}

fn truncate_front<T>(items: &mut Vec<T>, max: usize) {
    if items.len() > max {
        let excess = items.len() - max;
        items.drain(..excess);
    }
}

/// Raw snapshot handed to the route layer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShelterSnapshot {
    pub updated_at: Option<String>,
    pub votes: Vec<CommunityVote>,
    pub comments: Vec<CommunityComment>,
}

impl From<ShelterCommunity> for ShelterSnapshot {
    fn from(doc: ShelterCommunity) -> Self {
        Self {
            updated_at: doc.updated_at,
            votes: doc.votes,
            comments: doc.comments,
        }
    }
}

/// A comment as shown publicly. Author identifiers are not exposed.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct PublicComment {
    pub id: String,
    pub text: String,
    pub created_at: String,
    /// Reported often enough to warrant a caution label.
    pub cautioned: bool,
}

/// Public community view of one shelter.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct ShelterCommunityView {
    pub updated_at: Option<String>,
    pub votes_summary: BTreeMap<CrowdLevel, u32>,
    pub vote_count: u32,
    /// Newest first; empty when collapsed.
    pub comments: Vec<PublicComment>,
    /// Comments not hidden by moderation.
    pub comment_count: u32,
    pub hidden_count: u32,
    /// Set when a pile-on pushed any comment past the hide threshold.
    pub comments_collapsed: bool,
}

impl ShelterCommunityView {
    pub fn derive(snapshot: &ShelterSnapshot, policy: &ModerationPolicy) -> Self {
        let mut votes_summary = BTreeMap::new();
        for vote in &snapshot.votes {
            *votes_summary.entry(vote.value).or_insert(0) += 1;
        }

        let mut visible = Vec::new();
        let mut hidden_count = 0u32;
        let mut most_reported = 0u32;

        for comment in &snapshot.comments {
            most_reported = most_reported.max(comment.moderation.report_count);
            match comment.moderation.state(policy) {
                ModerationState::Hidden { .. } => hidden_count += 1,
                state => visible.push(PublicComment {
                    id: comment.id.clone(),
                    text: comment.text.clone(),
                    created_at: comment.created_at.clone(),
                    cautioned: state == ModerationState::Cautioned,
                }),
            }
        }

        let comment_count = visible.len() as u32;
        let comments_collapsed = most_reported >= policy.report_hide_threshold;
        if comments_collapsed {
            visible.clear();
        } else {
            visible.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        }

        Self {
            updated_at: snapshot.updated_at.clone(),
            votes_summary,
            vote_count: snapshot.votes.len() as u32,
            comments: visible,
            comment_count,
            hidden_count,
            comments_collapsed,
        }
    }
}
