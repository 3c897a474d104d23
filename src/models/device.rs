// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-device state: settings, saved areas, favorites, check-in history.
//!
//! Stored at: `device/{deviceId}.json`. Created lazily on first write.

use super::checkin::CheckinStatus;
use crate::config::StoreLimits;
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Longest saved-area label, in characters.
pub const MAX_SAVED_AREA_LABEL_CHARS: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Ja,
    En,
}

/// Which hazard alerts a device wants pushed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(default, rename_all = "camelCase")]
pub struct HazardAlertPrefs {
    pub earthquake: bool,
    pub tsunami: bool,
    pub heavy_rain: bool,
    /// JMA seismic intensity (1..=7) at or above which quake alerts fire.
    pub min_quake_intensity: u8,
}

impl Default for HazardAlertPrefs {
    fn default() -> Self {
        Self {
            earthquake: true,
            tsunami: true,
            heavy_rain: true,
            min_quake_intensity: 4,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSettings {
    #[serde(default)]
    pub language: Language,
    #[serde(default)]
    pub push_enabled: bool,
    #[serde(default)]
    pub hazard_alert_prefs: HazardAlertPrefs,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct SavedArea {
    pub id: String,
    pub label: String,
    pub lat: f64,
    pub lon: f64,
}

/// An ordered list of shelter ids (favorites or recently viewed).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct ShelterIdList {
    #[serde(default)]
    pub shelter_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct CheckinEvent {
    pub status: CheckinStatus,
    #[serde(default)]
    pub shelter_id: Option<String>,
    pub at: String,
}

/// The stored document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct DeviceState {
    pub device_id: String,
    #[serde(default)]
    pub settings: DeviceSettings,
    #[serde(default)]
    pub saved_areas: Vec<SavedArea>,
    #[serde(default)]
    pub favorites: ShelterIdList,
    #[serde(default)]
    pub recent: ShelterIdList,
    /// Append-only.
    #[serde(default)]
    pub checkin_history: Vec<CheckinEvent>,
    #[serde(default)]
    pub current_status: Option<CheckinStatus>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl DeviceState {
    pub fn new(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            ..Self::default()
        }
    }

    /// Overwrite the fields present in `patch`; leave the rest alone.
    pub fn apply(&mut self, patch: DeviceStatePatch, now: &str) {
        if let Some(settings) = patch.settings {
            self.settings = settings;
        }
        if let Some(saved_areas) = patch.saved_areas {
            self.saved_areas = saved_areas;
        }
        if let Some(favorites) = patch.favorites {
            self.favorites = favorites;
        }
        if let Some(recent) = patch.recent {
            self.recent = recent;
        }
        self.updated_at = Some(now.to_string());
    }

    /// Record a check-in; the newest status becomes current.
    pub fn record_checkin(&mut self, event: CheckinEvent) {
        self.current_status = Some(event.status);
        self.updated_at = Some(event.at.clone());
        self.checkin_history.push(event);
    }
}

/// Partial update accepted by `update_device_state`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceStatePatch {
    #[serde(default)]
    pub settings: Option<DeviceSettings>,
    #[serde(default)]
    pub saved_areas: Option<Vec<SavedArea>>,
    #[serde(default)]
    pub favorites: Option<ShelterIdList>,
    #[serde(default)]
    pub recent: Option<ShelterIdList>,
}

impl DeviceStatePatch {
    /// Shape and size checks, run before the store is called.
    pub fn validate(&self, limits: &StoreLimits) -> Result<(), String> {
        if let Some(settings) = &self.settings {
            let intensity = settings.hazard_alert_prefs.min_quake_intensity;
            if !(1..=7).contains(&intensity) {
                return Err("minQuakeIntensity must be between 1 and 7".to_string());
            }
        }

        if let Some(areas) = &self.saved_areas {
            if areas.len() > limits.max_saved_areas {
                return Err(format!(
                    "savedAreas exceeds limit of {}",
                    limits.max_saved_areas
                ));
            }
            for area in areas {
                if area.label.trim().is_empty()
                    || area.label.chars().count() > MAX_SAVED_AREA_LABEL_CHARS
                {
                    return Err(format!(
                        "savedAreas label must be 1-{} characters",
                        MAX_SAVED_AREA_LABEL_CHARS
                    ));
                }
                if !(-90.0..=90.0).contains(&area.lat) || !(-180.0..=180.0).contains(&area.lon) {
                    return Err("savedAreas coordinates out of range".to_string());
                }
            }
        }

        if let Some(favorites) = &self.favorites {
            if favorites.shelter_ids.len() > limits.max_favorites {
                return Err(format!("favorites exceeds limit of {}", limits.max_favorites));
            }
        }

        if let Some(recent) = &self.recent {
            if recent.shelter_ids.len() > limits.max_recent_shelters {
                return Err(format!(
                    "recent exceeds limit of {}",
                    limits.max_recent_shelters
                ));
            }
        }

        Ok(())
    }
}
