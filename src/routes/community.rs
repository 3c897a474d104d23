// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shelter community routes: votes, comments, reports.

use super::extract::{check_path_id, validate_identifier, ValidJson};
use crate::error::Result;
use crate::middleware::ClientIdentity;
use crate::models::{CommunityComment, CrowdLevel, ModerationState, ShelterCommunityView};
use crate::services::RemovedContent;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/shelters/{id}/community", get(get_community))
        .route("/api/shelters/{id}/votes", post(submit_vote))
        .route("/api/shelters/{id}/comments", post(submit_comment))
        .route(
            "/api/shelters/{id}/comments/{comment_id}/report",
            post(report_comment),
        )
        .route(
            "/api/shelters/{id}/community/{device_id}",
            delete(delete_device_content),
        )
}

/// Public community view of a shelter.
async fn get_community(
    State(state): State<Arc<AppState>>,
    Path(shelter_id): Path<String>,
) -> Result<Json<ShelterCommunityView>> {
    check_path_id("shelter id", &shelter_id)?;
    Ok(Json(state.store.get_shelter_community_view(&shelter_id).await?))
}

// ─── Votes ───────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct VoteRequest {
    #[validate(custom(function = "validate_identifier"))]
    device_id: String,
    value: CrowdLevel,
}

async fn submit_vote(
    State(state): State<Arc<AppState>>,
    Path(shelter_id): Path<String>,
    Extension(client): Extension<ClientIdentity>,
    ValidJson(body): ValidJson<VoteRequest>,
) -> Result<Json<ShelterCommunityView>> {
    check_path_id("shelter id", &shelter_id)?;

    let snapshot = state
        .store
        .submit_vote(&shelter_id, &body.device_id, &client.ip_hash, body.value)
        .await?;
    let policy = state.store.moderation_policy().await?;

    Ok(Json(ShelterCommunityView::derive(&snapshot, &policy)))
}

// ─── Comments ────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct CommentRequest {
    #[validate(custom(function = "validate_identifier"))]
    device_id: String,
    #[validate(length(min = 1, max = 300))]
    text: String,
}

/// The author's view of a just-posted comment.
#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    pub id: String,
    pub text: String,
    pub created_at: String,
    pub hidden: bool,
}

impl From<CommunityComment> for CommentResponse {
    fn from(comment: CommunityComment) -> Self {
        Self {
            id: comment.id,
            text: comment.text,
            created_at: comment.created_at,
            hidden: comment.moderation.hidden,
        }
    }
}

async fn submit_comment(
    State(state): State<Arc<AppState>>,
    Path(shelter_id): Path<String>,
    Extension(client): Extension<ClientIdentity>,
    ValidJson(body): ValidJson<CommentRequest>,
) -> Result<(StatusCode, Json<CommentResponse>)> {
    check_path_id("shelter id", &shelter_id)?;

    let comment = state
        .store
        .submit_comment(&shelter_id, &body.device_id, &client.ip_hash, &body.text)
        .await?;

    Ok((StatusCode::CREATED, Json(comment.into())))
}

// ─── Reports ─────────────────────────────────────────────────

/// Body of every report endpoint.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ReportRequest {
    #[validate(custom(function = "validate_identifier"))]
    pub device_id: String,
}

async fn report_comment(
    State(state): State<Arc<AppState>>,
    Path((shelter_id, comment_id)): Path<(String, String)>,
    ValidJson(body): ValidJson<ReportRequest>,
) -> Result<Json<ModerationState>> {
    check_path_id("shelter id", &shelter_id)?;
    check_path_id("comment id", &comment_id)?;

    let moderation_state = state
        .store
        .report_comment(&shelter_id, &comment_id, &body.device_id)
        .await?;
    Ok(Json(moderation_state))
}

// ─── Removal ─────────────────────────────────────────────────

/// A device withdrawing its own vote and comments.
async fn delete_device_content(
    State(state): State<Arc<AppState>>,
    Path((shelter_id, device_id)): Path<(String, String)>,
) -> Result<Json<RemovedContent>> {
    check_path_id("shelter id", &shelter_id)?;
    check_path_id("device id", &device_id)?;

    Ok(Json(
        state
            .store
            .delete_shelter_vote_and_comment(&shelter_id, &device_id)
            .await?,
    ))
}
