// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Admin operations: banner, moderation policy, moderation actions.
//!
//! Changing the policy does not rewrite every document. Visibility is always
//! derived from the policy at read time, and the cached `hidden` flag on a
//! comment or pin is refreshed the next time its document is written.

use super::store::CommunityStore;
use crate::db::DocumentKey;
use crate::error::{StoreError, StoreResult};
use crate::models::admin::MAX_BANNER_CHARS;
use crate::models::{
    AdminState, CheckinCollection, ModerationAction, ModerationPolicy, ModerationState,
    ShelterCommunity,
};
use crate::time_utils::now_rfc3339;
use serde::Serialize;

/// The entity a moderation action applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModerationTarget {
    Comment {
        shelter_id: String,
        comment_id: String,
    },
    Pin {
        pin_id: String,
    },
}

/// Result of a moderation action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationOutcome {
    pub action: ModerationAction,
    /// State after the action; `None` once deleted.
    pub state: Option<ModerationState>,
}

impl CommunityStore {
    pub async fn get_admin_state(&self) -> StoreResult<AdminState> {
        Ok(self
            .documents()
            .read::<AdminState>(&DocumentKey::Admin)
            .await?
            .unwrap_or_default())
    }

    /// Set or clear (`None` or blank) the site banner.
    pub async fn set_banner(&self, banner: Option<String>) -> StoreResult<AdminState> {
        let banner = banner
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty());
        if let Some(text) = &banner {
            if text.chars().count() > MAX_BANNER_CHARS {
                return Err(StoreError::InvalidBody(format!(
                    "banner exceeds {} characters",
                    MAX_BANNER_CHARS
                )));
            }
        }

        let state = self
            .documents()
            .update(&DocumentKey::Admin, AdminState::default, |state: &mut AdminState| {
                state.banner = banner;
                state.updated_at = Some(now_rfc3339());
                Ok(state.clone())
            })
            .await?;

        tracing::info!(banner_set = state.banner.is_some(), "Banner updated");
        Ok(state)
    }

    pub async fn set_moderation_policy(
        &self,
        policy: ModerationPolicy,
    ) -> StoreResult<AdminState> {
        policy.validate().map_err(StoreError::InvalidBody)?;

        let state = self
            .documents()
            .update(&DocumentKey::Admin, AdminState::default, |state: &mut AdminState| {
                state.moderation_policy = policy;
                state.updated_at = Some(now_rfc3339());
                Ok(state.clone())
            })
            .await?;

        tracing::info!(
            caution = policy.report_caution_threshold,
            hide = policy.report_hide_threshold,
            "Moderation policy updated"
        );
        Ok(state)
    }

    pub async fn moderation_action(
        &self,
        action: ModerationAction,
        target: ModerationTarget,
    ) -> StoreResult<ModerationOutcome> {
        let policy = self.moderation_policy().await?;

        let state = match &target {
            ModerationTarget::Comment {
                shelter_id,
                comment_id,
            } => {
                self.documents()
                    .update(
                        &DocumentKey::shelter(shelter_id.as_str()),
                        || ShelterCommunity::new(shelter_id.as_str()),
                        |doc: &mut ShelterCommunity| {
                            moderate_comment(doc, comment_id, action, &policy)
                        },
                    )
                    .await?
            }
            ModerationTarget::Pin { pin_id } => {
                self.documents()
                    .update(
                        &DocumentKey::Checkins,
                        CheckinCollection::default,
                        |pins: &mut CheckinCollection| moderate_pin(pins, pin_id, action, &policy),
                    )
                    .await?
            }
        };

        tracing::info!(action = ?action, target = ?target, state = ?state, "Moderation action applied");
        Ok(ModerationOutcome { action, state })
    }
}

fn moderate_comment(
    doc: &mut ShelterCommunity,
    comment_id: &str,
    action: ModerationAction,
    policy: &ModerationPolicy,
) -> StoreResult<Option<ModerationState>> {
    doc.refresh_moderation(policy);
    let not_found = || StoreError::NotFound(format!("Comment {} not found", comment_id));

    let state = match action {
        ModerationAction::Delete => {
            doc.remove_comment(comment_id).ok_or_else(not_found)?;
            None
        }
        ModerationAction::Hide => {
            let comment = doc.comment_mut(comment_id).ok_or_else(not_found)?;
            comment.moderation.admin_hide();
            let (device_id, state) = (comment.device_id.clone(), comment.moderation.state(policy));
            // Later comments from the same device in this shelter start hidden.
            doc.admin_hidden_device_ids.insert(device_id);
            Some(state)
        }
        ModerationAction::Unhide => {
            let comment = doc.comment_mut(comment_id).ok_or_else(not_found)?;
            comment.moderation.admin_unhide(policy);
            let (device_id, state) = (comment.device_id.clone(), comment.moderation.state(policy));
            doc.release_admin_hidden_device(&device_id);
            Some(state)
        }
        ModerationAction::ClearReports => {
            let comment = doc.comment_mut(comment_id).ok_or_else(not_found)?;
            comment.moderation.clear_reports(policy);
            Some(comment.moderation.state(policy))
        }
    };

    doc.updated_at = Some(now_rfc3339());
    Ok(state)
}

fn moderate_pin(
    pins: &mut CheckinCollection,
    pin_id: &str,
    action: ModerationAction,
    policy: &ModerationPolicy,
) -> StoreResult<Option<ModerationState>> {
    pins.refresh_moderation(policy);
    let not_found = || StoreError::NotFound(format!("Check-in pin {} not found", pin_id));

    if action == ModerationAction::Delete {
        pins.remove(pin_id).ok_or_else(not_found)?;
        pins.updated_at = Some(now_rfc3339());
        return Ok(None);
    }

    let pin = pins.pin_mut(pin_id).ok_or_else(not_found)?;
    match action {
        ModerationAction::Hide => pin.moderation.admin_hide(),
        ModerationAction::Unhide => pin.moderation.admin_unhide(policy),
        ModerationAction::ClearReports => pin.moderation.clear_reports(policy),
        ModerationAction::Delete => {}
    }
    let (device_id, state) = (pin.device_id.clone(), pin.moderation.state(policy));

    // Same sticky rule as comments: later pins from this device start hidden.
    match action {
        ModerationAction::Hide => {
            pins.admin_hidden_device_ids.insert(device_id);
        }
        ModerationAction::Unhide => pins.release_admin_hidden_device(&device_id),
        _ => {}
    }
    pins.updated_at = Some(now_rfc3339());
    Ok(Some(state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreLimits;
    use crate::models::{CheckinStatus, HiddenBy, PinPrecision, PinQuery};
    use crate::services::NewCheckinPin;

    fn store() -> CommunityStore {
        CommunityStore::in_memory(StoreLimits {
            comment_limit: 100,
            report_limit: 100,
            checkin_limit: 100,
            ..StoreLimits::default()
        })
    }

    fn comment_target(comment_id: &str) -> ModerationTarget {
        ModerationTarget::Comment {
            shelter_id: "s1".to_string(),
            comment_id: comment_id.to_string(),
        }
    }

    #[tokio::test]
    async fn test_banner_set_and_clear() {
        let store = store();
        let state = store
            .set_banner(Some("  避難所情報を更新しました  ".to_string()))
            .await
            .unwrap();
        assert_eq!(state.banner.as_deref(), Some("避難所情報を更新しました"));

        let state = store.set_banner(Some(" ".to_string())).await.unwrap();
        assert_eq!(state.banner, None);

        let err = store
            .set_banner(Some("x".repeat(MAX_BANNER_CHARS + 1)))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidBody(_)));
    }

    #[tokio::test]
    async fn test_invalid_policy_rejected() {
        let store = store();
        let err = store
            .set_moderation_policy(ModerationPolicy {
                report_caution_threshold: 4,
                report_hide_threshold: 2,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidBody(_)));
        assert_eq!(
            store.get_admin_state().await.unwrap().moderation_policy,
            ModerationPolicy::default()
        );
    }

    #[tokio::test]
    async fn test_policy_change_applies_to_existing_comments() {
        let store = store();
        let comment = store.submit_comment("s1", "d1", "ip", "hi").await.unwrap();
        store.report_comment("s1", &comment.id, "r1").await.unwrap();

        store
            .set_moderation_policy(ModerationPolicy {
                report_caution_threshold: 1,
                report_hide_threshold: 1,
            })
            .await
            .unwrap();

        let view = store.get_shelter_community_view("s1").await.unwrap();
        assert_eq!(view.hidden_count, 1);
    }

    #[tokio::test]
    async fn test_admin_hide_is_sticky_across_resubmit() {
        let store = store();
        let first = store.submit_comment("s1", "d1", "ip", "spam").await.unwrap();

        let outcome = store
            .moderation_action(ModerationAction::Hide, comment_target(&first.id))
            .await
            .unwrap();
        assert_eq!(
            outcome.state,
            Some(ModerationState::Hidden { by: HiddenBy::Admin })
        );

        store
            .delete_shelter_vote_and_comment("s1", "d1")
            .await
            .unwrap();
        let second = store.submit_comment("s1", "d1", "ip", "spam").await.unwrap();
        assert!(second.moderation.hidden_by_admin);

        let outcome = store
            .moderation_action(ModerationAction::ClearReports, comment_target(&second.id))
            .await
            .unwrap();
        assert!(outcome.state.unwrap().is_hidden());

        let outcome = store
            .moderation_action(ModerationAction::Unhide, comment_target(&second.id))
            .await
            .unwrap();
        assert_eq!(outcome.state, Some(ModerationState::Visible));
        let third = store.submit_comment("s1", "d1", "ip", "ok").await.unwrap();
        assert!(!third.moderation.hidden_by_admin);
    }

    #[tokio::test]
    async fn test_unhiding_one_comment_keeps_device_hidden_while_another_is() {
        let store = store();
        let c1 = store.submit_comment("s1", "d1", "ip", "spam 1").await.unwrap();
        let c2 = store.submit_comment("s1", "d1", "ip", "spam 2").await.unwrap();
        for id in [&c1.id, &c2.id] {
            store
                .moderation_action(ModerationAction::Hide, comment_target(id))
                .await
                .unwrap();
        }

        store
            .moderation_action(ModerationAction::Unhide, comment_target(&c1.id))
            .await
            .unwrap();

        store
            .delete_shelter_vote_and_comment("s1", "d1")
            .await
            .unwrap();
        let resubmitted = store.submit_comment("s1", "d1", "ip", "spam").await.unwrap();
        assert!(resubmitted.moderation.hidden_by_admin);

        let view = store.get_shelter_community_view("s1").await.unwrap();
        assert!(view.comments.is_empty());
    }

    fn pin_target(pin_id: &str) -> ModerationTarget {
        ModerationTarget::Pin {
            pin_id: pin_id.to_string(),
        }
    }

    fn new_pin() -> NewCheckinPin {
        NewCheckinPin {
            status: CheckinStatus::Safe,
            shelter_id: None,
            lat: 35.68,
            lon: 139.77,
            precision: PinPrecision::Coarse,
            comment: None,
        }
    }

    #[tokio::test]
    async fn test_admin_hide_is_sticky_for_later_pins() {
        let store = store();
        let first = store.submit_checkin_pin("d1", "ip", new_pin()).await.unwrap();
        store
            .moderation_action(ModerationAction::Hide, pin_target(&first.id))
            .await
            .unwrap();

        let second = store.submit_checkin_pin("d1", "ip", new_pin()).await.unwrap();
        assert!(second.moderation.hidden_by_admin);
        let other = store.submit_checkin_pin("d2", "ip", new_pin()).await.unwrap();
        assert!(!other.moderation.hidden_by_admin);

        // One pin is still admin-hidden, so the device stays hidden.
        store
            .moderation_action(ModerationAction::Unhide, pin_target(&first.id))
            .await
            .unwrap();
        let third = store.submit_checkin_pin("d1", "ip", new_pin()).await.unwrap();
        assert!(third.moderation.hidden_by_admin);

        for id in [&second.id, &third.id] {
            store
                .moderation_action(ModerationAction::Unhide, pin_target(id))
                .await
                .unwrap();
        }
        let pins = store.list_checkin_pins(&PinQuery::default()).await.unwrap();
        let ids: Vec<&str> = pins.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec![third.id.as_str(), other.id.as_str()]);
    }

    #[tokio::test]
    async fn test_delete_comment_and_missing_target() {
        let store = store();
        let comment = store.submit_comment("s1", "d1", "ip", "hi").await.unwrap();

        let outcome = store
            .moderation_action(ModerationAction::Delete, comment_target(&comment.id))
            .await
            .unwrap();
        assert_eq!(outcome.state, None);

        let err = store
            .moderation_action(ModerationAction::Delete, comment_target(&comment.id))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));

        let err = store
            .moderation_action(
                ModerationAction::Hide,
                ModerationTarget::Pin {
                    pin_id: "missing".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}
