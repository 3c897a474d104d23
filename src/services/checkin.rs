// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Check-in pin operations.

use super::store::{clean_text, new_id, CommunityStore, DeviceAction};
use crate::db::DocumentKey;
use crate::error::{StoreError, StoreResult};
use crate::models::checkin::coarsen;
use crate::models::{
    CheckinCollection, CheckinPin, CheckinStatus, Moderation, ModerationState, PinPrecision,
    PinQuery,
};
use crate::time_utils::now_rfc3339;
use chrono::Utc;

/// A pin as submitted by a device.
#[derive(Debug, Clone)]
pub struct NewCheckinPin {
    pub status: CheckinStatus,
    pub shelter_id: Option<String>,
    pub lat: f64,
    pub lon: f64,
    pub precision: PinPrecision,
    pub comment: Option<String>,
}

impl CommunityStore {
    pub async fn submit_checkin_pin(
        &self,
        device_id: &str,
        ip_hash: &str,
        new_pin: NewCheckinPin,
    ) -> StoreResult<CheckinPin> {
        if !new_pin.lat.is_finite() || !(-90.0..=90.0).contains(&new_pin.lat) {
            return Err(StoreError::InvalidBody("lat out of range".to_string()));
        }
        if !new_pin.lon.is_finite() || !(-180.0..=180.0).contains(&new_pin.lon) {
            return Err(StoreError::InvalidBody("lon out of range".to_string()));
        }
        let comment = match new_pin.comment.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(text) => Some(clean_text(
                "comment",
                text,
                self.limits().max_pin_comment_chars,
            )?),
        };
        self.check_device_rate(DeviceAction::Checkin, device_id)?;

        let (lat, lon) = match new_pin.precision {
            PinPrecision::Coarse => (coarsen(new_pin.lat), coarsen(new_pin.lon)),
            PinPrecision::Precise => (new_pin.lat, new_pin.lon),
        };
        let pin = CheckinPin {
            id: new_id()?,
            device_id: device_id.to_string(),
            ip_hash: ip_hash.to_string(),
            status: new_pin.status,
            shelter_id: new_pin.shelter_id,
            lat,
            lon,
            precision: new_pin.precision,
            comment,
            created_at: now_rfc3339(),
            moderation: Moderation::default(),
        };

        let max_pins = self.limits().max_checkin_pins;
        let (pin, total) = self
            .documents()
            .update(
                &DocumentKey::Checkins,
                CheckinCollection::default,
                |pins: &mut CheckinCollection| {
                    let mut pin = pin;
                    pin.moderation = Moderation::new(pins.is_device_admin_hidden(device_id));
                    pins.add(pin.clone(), max_pins);
                    Ok((pin, pins.pins.len()))
                },
            )
            .await?;

        tracing::info!(
            pin_id = %pin.id,
            device_id = %device_id,
            status = ?pin.status,
            total,
            "Check-in pin added"
        );
        Ok(pin)
    }

    /// Report a pin. Repeat reports from the same device change nothing.
    pub async fn report_checkin_pin(
        &self,
        pin_id: &str,
        reporter_device_id: &str,
    ) -> StoreResult<ModerationState> {
        self.check_device_rate(DeviceAction::Report, reporter_device_id)?;
        let policy = self.moderation_policy().await?;

        let (counted, state) = self
            .documents()
            .update(
                &DocumentKey::Checkins,
                CheckinCollection::default,
                |pins: &mut CheckinCollection| {
                    pins.refresh_moderation(&policy);
                    let pin = pins.pin_mut(pin_id).ok_or_else(|| {
                        StoreError::NotFound(format!("Check-in pin {} not found", pin_id))
                    })?;
                    let counted = pin.moderation.report(reporter_device_id, &policy);
                    Ok((counted, pin.moderation.state(&policy)))
                },
            )
            .await?;

        tracing::info!(pin_id = %pin_id, counted, state = ?state, "Check-in pin reported");
        Ok(state)
    }

    /// Publicly listable pins, newest first.
    pub async fn list_checkin_pins(&self, query: &PinQuery) -> StoreResult<Vec<CheckinPin>> {
        let collection = self
            .documents()
            .read::<CheckinCollection>(&DocumentKey::Checkins)
            .await?
            .unwrap_or_default();
        let policy = self.moderation_policy().await?;
        let max_age = chrono::Duration::from_std(self.limits().checkin_pin_max_age)
            .map_err(|e| StoreError::Internal(format!("Invalid pin max age: {}", e)))?;

        Ok(collection.list(query, &policy, Utc::now(), max_age))
    }
}
