// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Check-in pin routes.

use super::community::ReportRequest;
use super::extract::{check_path_id, validate_identifier, ValidJson};
use crate::error::{AppError, Result};
use crate::middleware::ClientIdentity;
use crate::models::{
    CheckinPin, CheckinStatus, ModerationPolicy, ModerationState, PinPrecision, PinQuery,
};
use crate::services::NewCheckinPin;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/checkins", get(list_pins).post(submit_pin))
        .route("/api/checkins/{pin_id}/report", post(report_pin))
}

/// A pin as shown publicly. Author identifiers are not exposed.
#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct PublicPin {
    pub id: String,
    pub status: CheckinStatus,
    pub shelter_id: Option<String>,
    pub lat: f64,
    pub lon: f64,
    pub precision: PinPrecision,
    pub comment: Option<String>,
    pub created_at: String,
    pub cautioned: bool,
}

impl PublicPin {
    fn new(pin: CheckinPin, policy: &ModerationPolicy) -> Self {
        let cautioned = pin.moderation.state(policy) == ModerationState::Cautioned;
        Self {
            id: pin.id,
            status: pin.status,
            shelter_id: pin.shelter_id,
            lat: pin.lat,
            lon: pin.lon,
            precision: pin.precision,
            comment: pin.comment,
            created_at: pin.created_at,
            cautioned,
        }
    }
}

// ─── Listing ─────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListQuery {
    #[serde(default)]
    include_history: bool,
    #[serde(default)]
    include_old: bool,
    /// Comma-separated statuses, e.g. `SAFE,NEED_HELP`.
    statuses: Option<String>,
}

fn parse_statuses(raw: Option<&str>) -> Result<Vec<CheckinStatus>> {
    raw.into_iter()
        .flat_map(|list| list.split(','))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            serde_json::from_value(serde_json::Value::String(s.to_string()))
                .map_err(|_| AppError::BadRequest(format!("Unknown status '{}'", s)))
        })
        .collect()
}

async fn list_pins(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListQuery>,
) -> Result<Json<Vec<PublicPin>>> {
    let query = PinQuery {
        include_history: params.include_history,
        include_old: params.include_old,
        statuses: parse_statuses(params.statuses.as_deref())?,
    };

    let pins = state.store.list_checkin_pins(&query).await?;
    let policy = state.store.moderation_policy().await?;

    Ok(Json(
        pins.into_iter()
            .map(|pin| PublicPin::new(pin, &policy))
            .collect(),
    ))
}

// ─── Submission ──────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct CheckinRequest {
    #[validate(custom(function = "validate_identifier"))]
    device_id: String,
    status: CheckinStatus,
    #[validate(custom(function = "validate_identifier"))]
    shelter_id: Option<String>,
    #[validate(range(min = -90.0, max = 90.0))]
    lat: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    lon: f64,
    #[serde(default)]
    precision: PinPrecision,
    #[validate(length(max = 120))]
    comment: Option<String>,
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct CheckinResponse {
    pub pin: PublicPin,
    pub current_status: Option<CheckinStatus>,
}

/// Drop a pin and record the check-in on the device.
async fn submit_pin(
    State(state): State<Arc<AppState>>,
    Extension(client): Extension<ClientIdentity>,
    ValidJson(body): ValidJson<CheckinRequest>,
) -> Result<(StatusCode, Json<CheckinResponse>)> {
    let pin = state
        .store
        .submit_checkin_pin(
            &body.device_id,
            &client.ip_hash,
            NewCheckinPin {
                status: body.status,
                shelter_id: body.shelter_id.clone(),
                lat: body.lat,
                lon: body.lon,
                precision: body.precision,
                comment: body.comment,
            },
        )
        .await?;

    // Separate document; a failure here leaves the pin in place.
    let device = state
        .store
        .append_checkin(&body.device_id, body.status, body.shelter_id)
        .await?;

    let policy = state.store.moderation_policy().await?;
    Ok((
        StatusCode::CREATED,
        Json(CheckinResponse {
            pin: PublicPin::new(pin, &policy),
            current_status: device.current_status,
        }),
    ))
}

async fn report_pin(
    State(state): State<Arc<AppState>>,
    Path(pin_id): Path<String>,
    ValidJson(body): ValidJson<ReportRequest>,
) -> Result<Json<ModerationState>> {
    check_path_id("pin id", &pin_id)?;
    Ok(Json(
        state
            .store
            .report_checkin_pin(&pin_id, &body.device_id)
            .await?,
    ))
}
