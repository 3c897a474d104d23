// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shelter community operations: votes, comments, comment reports.

use super::store::{clean_text, new_id, CommunityStore, DeviceAction};
use crate::db::DocumentKey;
use crate::error::{StoreError, StoreResult};
use crate::models::{
    CommunityComment, CommunityVote, CrowdLevel, Moderation, ModerationState, ShelterCommunity,
    ShelterCommunityView, ShelterSnapshot,
};
use crate::time_utils::now_rfc3339;
use serde::Serialize;

/// What `delete_shelter_vote_and_comment` removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovedContent {
    pub vote_removed: bool,
    pub comments_removed: usize,
}

impl CommunityStore {
    /// Raw votes and comments for a shelter. Unknown shelters are empty.
    pub async fn get_shelter_community_snapshot(
        &self,
        shelter_id: &str,
    ) -> StoreResult<ShelterSnapshot> {
        let doc = self
            .documents()
            .read::<ShelterCommunity>(&DocumentKey::shelter(shelter_id))
            .await?
            .unwrap_or_else(|| ShelterCommunity::new(shelter_id));
        Ok(doc.into())
    }

    /// Snapshot summarized under the current moderation policy.
    pub async fn get_shelter_community_view(
        &self,
        shelter_id: &str,
    ) -> StoreResult<ShelterCommunityView> {
        let snapshot = self.get_shelter_community_snapshot(shelter_id).await?;
        let policy = self.moderation_policy().await?;
        Ok(ShelterCommunityView::derive(&snapshot, &policy))
    }

    /// Cast or replace this device's crowding vote.
    pub async fn submit_vote(
        &self,
        shelter_id: &str,
        device_id: &str,
        ip_hash: &str,
        value: CrowdLevel,
    ) -> StoreResult<ShelterSnapshot> {
        self.check_device_rate(DeviceAction::Vote, device_id)?;

        let max_votes = self.limits().max_votes_history_per_shelter;
        let vote = CommunityVote {
            device_id: device_id.to_string(),
            ip_hash: ip_hash.to_string(),
            value,
            timestamp: now_rfc3339(),
        };

        let snapshot = self
            .documents()
            .update(
                &DocumentKey::shelter(shelter_id),
                || ShelterCommunity::new(shelter_id),
                |doc: &mut ShelterCommunity| {
                    doc.upsert_vote(vote, max_votes);
                    Ok(ShelterSnapshot::from(doc.clone()))
                },
            )
            .await?;

        tracing::info!(
            shelter_id = %shelter_id,
            device_id = %device_id,
            value = ?value,
            votes = snapshot.votes.len(),
            "Vote recorded"
        );
        Ok(snapshot)
    }

    /// Post a comment. Devices under an admin hide in this shelter post hidden.
    pub async fn submit_comment(
        &self,
        shelter_id: &str,
        device_id: &str,
        ip_hash: &str,
        text: &str,
    ) -> StoreResult<CommunityComment> {
        let text = clean_text("text", text, self.limits().max_comment_chars)?;
        self.check_device_rate(DeviceAction::Comment, device_id)?;

        let max_comments = self.limits().max_comments_per_shelter;
        let id = new_id()?;

        let comment = self
            .documents()
            .update(
                &DocumentKey::shelter(shelter_id),
                || ShelterCommunity::new(shelter_id),
                |doc: &mut ShelterCommunity| {
                    let comment = CommunityComment {
                        id,
                        device_id: device_id.to_string(),
                        ip_hash: ip_hash.to_string(),
                        text,
                        created_at: now_rfc3339(),
                        moderation: Moderation::new(doc.is_device_admin_hidden(device_id)),
                    };
                    doc.add_comment(comment.clone(), max_comments);
                    Ok(comment)
                },
            )
            .await?;

        tracing::info!(
            shelter_id = %shelter_id,
            comment_id = %comment.id,
            hidden = comment.moderation.hidden,
            "Comment added"
        );
        Ok(comment)
    }

    /// Report a comment. Repeat reports from the same device change nothing.
    pub async fn report_comment(
        &self,
        shelter_id: &str,
        comment_id: &str,
        reporter_device_id: &str,
    ) -> StoreResult<ModerationState> {
        self.check_device_rate(DeviceAction::Report, reporter_device_id)?;
        let policy = self.moderation_policy().await?;

        let (counted, state) = self
            .documents()
            .update(
                &DocumentKey::shelter(shelter_id),
                || ShelterCommunity::new(shelter_id),
                |doc: &mut ShelterCommunity| {
                    doc.refresh_moderation(&policy);
                    let comment = doc.comment_mut(comment_id).ok_or_else(|| {
                        StoreError::NotFound(format!("Comment {} not found", comment_id))
                    })?;
                    let counted = comment.moderation.report(reporter_device_id, &policy);
                    Ok((counted, comment.moderation.state(&policy)))
                },
            )
            .await?;

        tracing::info!(
            shelter_id = %shelter_id,
            comment_id = %comment_id,
            counted,
            state = ?state,
            "Comment reported"
        );
        Ok(state)
    }

    /// Remove one device's vote and all of its comments from a shelter.
    ///
    /// Fails with `NotFound` when the device has nothing there.
    pub async fn delete_shelter_vote_and_comment(
        &self,
        shelter_id: &str,
        device_id: &str,
    ) -> StoreResult<RemovedContent> {
        let removed = self
            .documents()
            .update(
                &DocumentKey::shelter(shelter_id),
                || ShelterCommunity::new(shelter_id),
                |doc: &mut ShelterCommunity| {
                    let (vote_removed, comments_removed) = doc.remove_device_content(device_id);
                    if !vote_removed && comments_removed == 0 {
                        return Err(StoreError::NotFound(format!(
                            "No vote or comment from device {} in shelter {}",
                            device_id, shelter_id
                        )));
                    }
                    doc.updated_at = Some(now_rfc3339());
                    Ok(RemovedContent {
                        vote_removed,
                        comments_removed,
                    })
                },
            )
            .await?;

        tracing::info!(
            shelter_id = %shelter_id,
            device_id = %device_id,
            vote_removed = removed.vote_removed,
            comments_removed = removed.comments_removed,
            "Device content removed"
        );
        Ok(removed)
    }
}
