// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Transfer codes: portable, checksummed encodings of a JSON payload.
//!
//! Format: `{base64url(json)}.{first 10 hex chars of sha256(base64url)}`.
//!
//! The checksum is 40 bits of an unkeyed hash. It catches typos and
//! truncation when a user copies a code between installs; it does not stop
//! anyone from forging a code, since the checksum can be recomputed by anyone.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Hex characters of the checksum segment.
pub const CHECKSUM_LEN: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransferCodeError {
    #[error("Transfer code is not in the expected format")]
    InvalidFormat,

    #[error("Transfer code checksum does not match")]
    ChecksumMismatch,

    #[error("Transfer code payload could not be decoded: {0}")]
    InvalidPayload(String),
}

fn checksum(encoded: &str) -> String {
    let digest = Sha256::digest(encoded.as_bytes());
    let mut hex = hex::encode(digest);
    hex.truncate(CHECKSUM_LEN);
    hex
}

/// Encode a JSON payload as a transfer code.
pub fn encode(payload: &Value) -> String {
    // Serializing a `Value` cannot fail: all map keys are strings.
    let json = payload.to_string();
    let encoded = URL_SAFE_NO_PAD.encode(json.as_bytes());
    let sum = checksum(&encoded);
    format!("{}.{}", encoded, sum)
}

/// Decode and verify a transfer code.
pub fn decode(code: &str) -> Result<Value, TransferCodeError> {
    let code = code.trim();
    let (encoded, sum) = code
        .rsplit_once('.')
        .ok_or(TransferCodeError::InvalidFormat)?;

    if encoded.is_empty() || sum.is_empty() {
        return Err(TransferCodeError::InvalidFormat);
    }

    if checksum(encoded) != sum {
        return Err(TransferCodeError::ChecksumMismatch);
    }

    let bytes = URL_SAFE_NO_PAD
        .decode(encoded.trim_end_matches('='))
        .map_err(|e| TransferCodeError::InvalidPayload(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| TransferCodeError::InvalidPayload(e.to_string()))
}
