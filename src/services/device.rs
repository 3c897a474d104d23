// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Device state operations and transfer codes.

use super::store::CommunityStore;
use super::transfer_code;
use crate::db::DocumentKey;
use crate::error::{StoreError, StoreResult};
use crate::models::{CheckinEvent, CheckinStatus, DeviceState, DeviceStatePatch};
use crate::time_utils::now_rfc3339;

impl CommunityStore {
    /// The stored state, or a fresh one for devices never written.
    pub async fn get_device_state(&self, device_id: &str) -> StoreResult<DeviceState> {
        Ok(self
            .documents()
            .read::<DeviceState>(&DocumentKey::device(device_id))
            .await?
            .unwrap_or_else(|| DeviceState::new(device_id)))
    }

    /// Merge the fields present in `patch`.
    ///
    /// Size limits are enforced by the caller before this is invoked.
    pub async fn update_device_state(
        &self,
        device_id: &str,
        patch: DeviceStatePatch,
    ) -> StoreResult<DeviceState> {
        let state = self
            .documents()
            .update(
                &DocumentKey::device(device_id),
                || DeviceState::new(device_id),
                |state: &mut DeviceState| {
                    state.apply(patch, &now_rfc3339());
                    Ok(state.clone())
                },
            )
            .await?;

        tracing::debug!(device_id = %device_id, "Device state updated");
        Ok(state)
    }

    /// Append to the check-in history; the new status becomes current.
    pub async fn append_checkin(
        &self,
        device_id: &str,
        status: CheckinStatus,
        shelter_id: Option<String>,
    ) -> StoreResult<DeviceState> {
        let event = CheckinEvent {
            status,
            shelter_id,
            at: now_rfc3339(),
        };

        self.documents()
            .update(
                &DocumentKey::device(device_id),
                || DeviceState::new(device_id),
                |state: &mut DeviceState| {
                    state.record_checkin(event);
                    Ok(state.clone())
                },
            )
            .await
    }

    pub async fn export_transfer_code(&self, device_id: &str) -> StoreResult<String> {
        let state = self.get_device_state(device_id).await?;
        let payload = serde_json::to_value(&state)
            .map_err(|e| StoreError::Internal(format!("Failed to serialize device state: {}", e)))?;

        tracing::info!(device_id = %device_id, "Transfer code exported");
        Ok(transfer_code::encode(&payload))
    }

    /// Replace `device_id`'s state with the one carried by `code`.
    ///
    /// The imported document takes the target device id; nothing of the
    /// target's previous state is kept.
    pub async fn import_transfer_code(
        &self,
        device_id: &str,
        code: &str,
    ) -> StoreResult<DeviceState> {
        let payload =
            transfer_code::decode(code).map_err(|e| StoreError::InvalidBody(e.to_string()))?;
        let mut imported: DeviceState = serde_json::from_value(payload).map_err(|e| {
            StoreError::InvalidBody(format!("Transfer code does not hold a device state: {}", e))
        })?;

        DeviceStatePatch {
            settings: Some(imported.settings.clone()),
            saved_areas: Some(imported.saved_areas.clone()),
            favorites: Some(imported.favorites.clone()),
            recent: Some(imported.recent.clone()),
        }
        .validate(self.limits())
        .map_err(StoreError::InvalidBody)?;

        let source_device_id = std::mem::replace(&mut imported.device_id, device_id.to_string());
        imported.updated_at = Some(now_rfc3339());

        let state = self
            .documents()
            .update(
                &DocumentKey::device(device_id),
                || DeviceState::new(device_id),
                |state: &mut DeviceState| {
                    *state = imported;
                    Ok(state.clone())
                },
            )
            .await?;

        tracing::info!(
            device_id = %device_id,
            source_device_id = %source_device_id,
            "Transfer code imported"
        );
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreLimits;
    use crate::models::device::ShelterIdList;

    #[tokio::test]
    async fn test_unknown_device_reads_as_empty() {
        let store = CommunityStore::in_memory(StoreLimits::default());
        let state = store.get_device_state("new-device").await.unwrap();
        assert_eq!(state, DeviceState::new("new-device"));
    }

    #[tokio::test]
    async fn test_append_checkin_latest_wins() {
        let store = CommunityStore::in_memory(StoreLimits::default());
        store
            .append_checkin("d1", CheckinStatus::Evacuating, None)
            .await
            .unwrap();
        let state = store
            .append_checkin("d1", CheckinStatus::Sheltered, Some("s1".to_string()))
            .await
            .unwrap();

        assert_eq!(state.checkin_history.len(), 2);
        assert_eq!(state.current_status, Some(CheckinStatus::Sheltered));
        assert_eq!(state.checkin_history[1].shelter_id.as_deref(), Some("s1"));
    }

    #[tokio::test]
    async fn test_import_rejects_oversized_lists() {
        let limits = StoreLimits::default();
        let store = CommunityStore::in_memory(limits.clone());

        let mut state = DeviceState::new("old");
        state.favorites = ShelterIdList {
            shelter_ids: (0..=limits.max_favorites).map(|i| format!("s{}", i)).collect(),
        };
        let code = transfer_code::encode(&serde_json::to_value(&state).unwrap());

        let err = store.import_transfer_code("new", &code).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidBody(_)));
    }

    #[tokio::test]
    async fn test_import_rejects_non_device_payload() {
        let store = CommunityStore::in_memory(StoreLimits::default());
        let code = transfer_code::encode(&serde_json::json!([1, 2, 3]));
        let err = store.import_transfer_code("d1", &code).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidBody(_)));
    }
}
