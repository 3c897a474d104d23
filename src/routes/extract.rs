// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Request extractors and input checks shared by the route modules.

use crate::error::AppError;
use axum::extract::{FromRequest, Request};
use axum::Json;
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationError};

/// Longest device, shelter, comment or pin id accepted.
pub const MAX_ID_LEN: usize = 128;

/// JSON body whose rejections render as `INVALID_BODY`.
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
        Ok(JsonBody(value))
    }
}

/// JSON body that must also pass its `validator` rules.
pub struct ValidJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let JsonBody(value) = JsonBody::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(ValidJson(value))
    }
}

fn is_identifier(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= MAX_ID_LEN
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// `validator` hook for id fields in request bodies.
pub fn validate_identifier(value: &str) -> Result<(), ValidationError> {
    if is_identifier(value) {
        Ok(())
    } else {
        Err(ValidationError::new("identifier"))
    }
}

/// Check an id taken from the URL path.
pub fn check_path_id(field: &str, value: &str) -> Result<(), AppError> {
    if is_identifier(value) {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!("Invalid {}", field)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifiers() {
        assert!(check_path_id("id", "tokyo-chiyoda_001").is_ok());
        assert!(check_path_id("id", "").is_err());
        assert!(check_path_id("id", "../admin").is_err());
        assert!(check_path_id("id", "避難所").is_err());
        assert!(check_path_id("id", &"a".repeat(MAX_ID_LEN + 1)).is_err());
        assert!(validate_identifier("d1").is_ok());
    }
}
