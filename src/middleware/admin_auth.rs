// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Admin bearer-token middleware.

use crate::error::AppError;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// Require `Authorization: Bearer {ADMIN_TOKEN}` for `/api/admin/*` routes.
///
/// With no token configured every admin request is refused.
pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let expected = state.config.admin_token.as_bytes();

    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim);

    let authorized = match presented {
        Some(token) if !expected.is_empty() => bool::from(token.as_bytes().ct_eq(expected)),
        _ => false,
    };

    if !authorized {
        tracing::warn!(
            path = %request.uri().path(),
            token_present = presented.is_some(),
            "Blocked admin request"
        );
        return Err(AppError::Forbidden);
    }

    Ok(next.run(request).await)
}
