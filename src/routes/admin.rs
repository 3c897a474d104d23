// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Admin routes, plus the public banner.
//!
//! `routes()` is mounted behind `require_admin` in routes/mod.rs.

use super::extract::{validate_identifier, JsonBody, ValidJson};
use crate::error::{AppError, Result};
use crate::models::{AdminState, ModerationAction, ModerationPolicy};
use crate::services::{ModerationOutcome, ModerationTarget};
use crate::AppState;
use axum::{
    extract::State,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/admin/state", get(get_state))
        .route("/api/admin/banner", put(set_banner))
        .route("/api/admin/moderation-policy", put(set_policy))
        .route("/api/admin/moderation", post(moderate))
}

pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/banner", get(get_banner))
}

#[derive(Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct BannerBody {
    #[serde(default)]
    pub banner: Option<String>,
}

async fn get_banner(State(state): State<Arc<AppState>>) -> Result<Json<BannerBody>> {
    let admin = state.store.get_admin_state().await?;
    Ok(Json(BannerBody {
        banner: admin.banner,
    }))
}

async fn get_state(State(state): State<Arc<AppState>>) -> Result<Json<AdminState>> {
    Ok(Json(state.store.get_admin_state().await?))
}

async fn set_banner(
    State(state): State<Arc<AppState>>,
    JsonBody(body): JsonBody<BannerBody>,
) -> Result<Json<AdminState>> {
    Ok(Json(state.store.set_banner(body.banner).await?))
}

async fn set_policy(
    State(state): State<Arc<AppState>>,
    JsonBody(policy): JsonBody<ModerationPolicy>,
) -> Result<Json<AdminState>> {
    Ok(Json(state.store.set_moderation_policy(policy).await?))
}

// ─── Moderation actions ──────────────────────────────────────

/// `{action, shelterId, commentId}` for a comment or `{action, pinId}` for a pin.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct ModerationRequest {
    action: ModerationAction,
    #[validate(custom(function = "validate_identifier"))]
    shelter_id: Option<String>,
    #[validate(custom(function = "validate_identifier"))]
    comment_id: Option<String>,
    #[validate(custom(function = "validate_identifier"))]
    pin_id: Option<String>,
}

impl ModerationRequest {
    fn target(self) -> Result<ModerationTarget> {
        match (self.shelter_id, self.comment_id, self.pin_id) {
            (Some(shelter_id), Some(comment_id), None) => Ok(ModerationTarget::Comment {
                shelter_id,
                comment_id,
            }),
            (None, None, Some(pin_id)) => Ok(ModerationTarget::Pin { pin_id }),
            _ => Err(AppError::BadRequest(
                "Target must be shelterId + commentId, or pinId".to_string(),
            )),
        }
    }
}

async fn moderate(
    State(state): State<Arc<AppState>>,
    ValidJson(body): ValidJson<ModerationRequest>,
) -> Result<Json<ModerationOutcome>> {
    let action = body.action;
    let target = body.target()?;
    Ok(Json(state.store.moderation_action(action, target).await?))
}
