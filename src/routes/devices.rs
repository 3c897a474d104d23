// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Device state and transfer-code routes.

use super::extract::{check_path_id, JsonBody, ValidJson};
use crate::error::{AppError, Result};
use crate::models::{DeviceState, DeviceStatePatch};
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/devices/{id}", get(get_device).put(update_device))
        .route("/api/devices/{id}/transfer/export", post(export_code))
        .route("/api/devices/{id}/transfer/import", post(import_code))
}

async fn get_device(
    State(state): State<Arc<AppState>>,
    Path(device_id): Path<String>,
) -> Result<Json<DeviceState>> {
    check_path_id("device id", &device_id)?;
    Ok(Json(state.store.get_device_state(&device_id).await?))
}

async fn update_device(
    State(state): State<Arc<AppState>>,
    Path(device_id): Path<String>,
    JsonBody(patch): JsonBody<DeviceStatePatch>,
) -> Result<Json<DeviceState>> {
    check_path_id("device id", &device_id)?;
    patch
        .validate(state.store.limits())
        .map_err(AppError::BadRequest)?;

    Ok(Json(
        state.store.update_device_state(&device_id, patch).await?,
    ))
}

// ─── Transfer codes ──────────────────────────────────────────

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct TransferCodeResponse {
    pub code: String,
}

async fn export_code(
    State(state): State<Arc<AppState>>,
    Path(device_id): Path<String>,
) -> Result<Json<TransferCodeResponse>> {
    check_path_id("device id", &device_id)?;
    let code = state.store.export_transfer_code(&device_id).await?;
    Ok(Json(TransferCodeResponse { code }))
}

#[derive(Debug, Deserialize, Validate)]
struct ImportRequest {
    #[validate(length(min = 1, max = 65536))]
    code: String,
}

async fn import_code(
    State(state): State<Arc<AppState>>,
    Path(device_id): Path<String>,
    ValidJson(body): ValidJson<ImportRequest>,
) -> Result<Json<DeviceState>> {
    check_path_id("device id", &device_id)?;
    Ok(Json(
        state
            .store
            .import_transfer_code(&device_id, &body.code)
            .await?,
    ))
}
