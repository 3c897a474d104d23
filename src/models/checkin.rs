// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Check-in pins: crowd-submitted location/status markers.
//!
//! All pins live in one document, `checkins.json`.

use super::moderation::{Moderation, ModerationPolicy};
use crate::time_utils::parse_rfc3339;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Decimal places kept for coarse pins (about 1 km).
const COARSE_DECIMALS: i32 = 2;

/// Safety status reported by a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckinStatus {
    Safe,
    Evacuating,
    Sheltered,
    NeedHelp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PinPrecision {
    Precise,
    #[default]
    Coarse,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckinPin {
    pub id: String,
    pub device_id: String,
    pub ip_hash: String,
    pub status: CheckinStatus,
    #[serde(default)]
    pub shelter_id: Option<String>,
    pub lat: f64,
    pub lon: f64,
    pub precision: PinPrecision,
    #[serde(default)]
    pub comment: Option<String>,
    pub created_at: String,
    #[serde(flatten)]
    pub moderation: Moderation,
}

impl CheckinPin {
    fn created_at(&self) -> Option<DateTime<Utc>> {
        parse_rfc3339(&self.created_at)
    }
}

/// Round a coordinate to the coarse grid.
pub fn coarsen(coordinate: f64) -> f64 {
    let scale = 10f64.powi(COARSE_DECIMALS);
    (coordinate * scale).round() / scale
}

/// The stored pin collection (oldest first).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckinCollection {
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub pins: Vec<CheckinPin>,
    /// Devices an admin has hidden. Their new pins start hidden.
    #[serde(default)]
    pub admin_hidden_device_ids: BTreeSet<String>,
}

/// Filters for listing pins.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PinQuery {
    /// Include earlier pins from devices that have since posted again.
    #[serde(default)]
    pub include_history: bool,
    /// Include pins older than the active window.
    #[serde(default)]
    pub include_old: bool,
    /// Only these statuses (all when empty).
    #[serde(default)]
    pub statuses: Vec<CheckinStatus>,
}

impl CheckinCollection {
    pub fn add(&mut self, pin: CheckinPin, max_pins: usize) {
        self.updated_at = Some(pin.created_at.clone());
        self.pins.push(pin);
        if self.pins.len() > max_pins {
            let excess = self.pins.len() - max_pins;
            self.pins.drain(..excess);
        }
    }

    /// Whether new pins from `device_id` start admin-hidden.
    pub fn is_device_admin_hidden(&self, device_id: &str) -> bool {
        self.admin_hidden_device_ids.contains(device_id)
    }

    /// Lift the sticky hide on `device_id` once none of its pins remain
    /// admin-hidden.
    pub fn release_admin_hidden_device(&mut self, device_id: &str) {
        let still_hidden = self
            .pins
            .iter()
            .any(|p| p.device_id == device_id && p.moderation.hidden_by_admin);
        if !still_hidden {
            self.admin_hidden_device_ids.remove(device_id);
        }
    }

    pub fn pin_mut(&mut self, pin_id: &str) -> Option<&mut CheckinPin> {
        self.pins.iter_mut().find(|p| p.id == pin_id)
    }

    pub fn remove(&mut self, pin_id: &str) -> Option<CheckinPin> {
        let index = self.pins.iter().position(|p| p.id == pin_id)?;
        Some(self.pins.remove(index))
    }

    pub fn refresh_moderation(&mut self, policy: &ModerationPolicy) {
        for pin in &mut self.pins {
            pin.moderation.refresh(policy);
        }
    }

    /// Publicly listable pins matching `query`, newest first.
    ///
    /// Pins without a parseable timestamp count as old.
    pub fn list(
        &self,
        query: &PinQuery,
        policy: &ModerationPolicy,
        now: DateTime<Utc>,
        max_age: chrono::Duration,
    ) -> Vec<CheckinPin> {
        let cutoff = now - max_age;
        let mut seen_devices = HashSet::new();
        let mut result = Vec::new();

        for pin in self.pins.iter().rev() {
            if !query.include_history && !seen_devices.insert(pin.device_id.as_str()) {
                continue;
            }
            if pin.moderation.state(policy).is_hidden() {
                continue;
            }
            if !query.include_old && pin.created_at().map_or(true, |t| t < cutoff) {
                continue;
            }
            if !query.statuses.is_empty() && !query.statuses.contains(&pin.status) {
                continue;
            }
            result.push(pin.clone());
        }

        result
    }
}
