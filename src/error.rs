// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Error types for the community store and its HTTP surface.
//!
//! `StoreError` is what every store operation returns; `AppError` is what
//! route handlers return and knows how to render itself as a JSON response.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::path::PathBuf;

/// Stable failure codes surfaced to callers of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    RateLimited,
    InvalidBody,
    NotFound,
    LockTimeout,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::RateLimited => "RATE_LIMITED",
            ErrorCode::InvalidBody => "INVALID_BODY",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::LockTimeout => "LOCK_TIMEOUT",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

/// Failure of a store operation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Invalid request: {0}")]
    InvalidBody(String),

    #[error("Rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Document {key} is locked by another writer")]
    LockTimeout { key: String },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl StoreError {
    pub fn code(&self) -> ErrorCode {
        match self {
            StoreError::InvalidBody(_) => ErrorCode::InvalidBody,
            StoreError::RateLimited { .. } => ErrorCode::RateLimited,
            StoreError::NotFound(_) => ErrorCode::NotFound,
            StoreError::LockTimeout { .. } => ErrorCode::LockTimeout,
            StoreError::Parse { .. } | StoreError::Io { .. } | StoreError::Internal(_) => {
                ErrorCode::InternalError
            }
        }
    }

    /// Whether the caller may retry the same request later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StoreError::RateLimited { .. } | StoreError::LockTimeout { .. }
        )
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Hint sent with `LOCK_TIMEOUT` responses.
const LOCK_TIMEOUT_RETRY_AFTER_MS: u64 = 1_000;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Admin credentials required")]
    Forbidden,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Too many requests, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("Document busy: {0}")]
    Busy(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidBody(msg) => AppError::BadRequest(msg),
            StoreError::RateLimited { retry_after_ms } => AppError::RateLimited { retry_after_ms },
            StoreError::NotFound(msg) => AppError::NotFound(msg),
            StoreError::LockTimeout { key } => AppError::Busy(key),
            other => AppError::Internal(anyhow::Error::new(other)),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::BadRequest(errors.to_string())
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
    #[serde(rename = "retryAfterMs", skip_serializing_if = "Option::is_none")]
    retry_after_ms: Option<u64>,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::RateLimited { .. } | AppError::Busy(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn retry_after_ms(&self) -> Option<u64> {
        match self {
            AppError::RateLimited { retry_after_ms } => Some(*retry_after_ms),
            AppError::Busy(_) => Some(LOCK_TIMEOUT_RETRY_AFTER_MS),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let retry_after_ms = self.retry_after_ms();
        let (error, details) = match &self {
            AppError::Forbidden => ("FORBIDDEN", None),
            AppError::NotFound(msg) => (ErrorCode::NotFound.as_str(), Some(msg.clone())),
            AppError::BadRequest(msg) => (ErrorCode::InvalidBody.as_str(), Some(msg.clone())),
            AppError::RateLimited { .. } => (ErrorCode::RateLimited.as_str(), None),
            AppError::Busy(key) => {
                tracing::warn!(key = %key, "Lock contention surfaced to client");
                (ErrorCode::LockTimeout.as_str(), None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (ErrorCode::InternalError.as_str(), None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
            retry_after_ms,
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(ms) = retry_after_ms {
            // Retry-After is whole seconds; round up so clients never retry early.
            let secs = ms.div_ceil(1000).max(1);
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
