// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Keyed hashing of client IP addresses.
//!
//! Raw addresses are never stored; votes, comments and pins carry an
//! HMAC-SHA256 digest instead, which is also the identity for per-IP
//! request budgets.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Bytes of the digest kept (hex-encoded to twice this length).
const IP_HASH_BYTES: usize = 16;

#[derive(Clone)]
pub struct IpHasher {
    secret: Vec<u8>,
}

impl IpHasher {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    pub fn hash(&self, ip: &str) -> String {
        // HMAC accepts keys of any length, so this cannot fail.
        let Ok(mut mac) = HmacSha256::new_from_slice(&self.secret) else {
            return String::new();
        };
        mac.update(ip.trim().as_bytes());
        let digest = mac.finalize().into_bytes();
        hex::encode(&digest[..IP_HASH_BYTES])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_stable_and_keyed() {
        let a = IpHasher::new("secret-a");
        let b = IpHasher::new("secret-b");

        assert_eq!(a.hash("203.0.113.7"), a.hash(" 203.0.113.7 "));
        assert_ne!(a.hash("203.0.113.7"), a.hash("203.0.113.8"));
        assert_ne!(a.hash("203.0.113.7"), b.hash("203.0.113.7"));
        assert_eq!(a.hash("203.0.113.7").len(), IP_HASH_BYTES * 2);
    }
}
