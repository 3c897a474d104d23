// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-client request budgets for `/api/*`.
//!
//! Clients are identified by the keyed hash of their IP address, which is
//! also handed to handlers as a [`ClientIdentity`] extension.

use crate::error::AppError;
use crate::services::RateLimiter;
use crate::AppState;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, Method},
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;
use std::sync::Arc;

/// Hashed client address of the current request.
#[derive(Debug, Clone)]
pub struct ClientIdentity {
    pub ip_hash: String,
}

/// Endpoint classes with separate budgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    Read,
    Write,
    Report,
    Admin,
}

impl RouteClass {
    pub fn classify(method: &Method, path: &str) -> Self {
        if path.starts_with("/api/admin/") {
            RouteClass::Admin
        } else if path.ends_with("/report") {
            RouteClass::Report
        } else if method == Method::GET || method == Method::HEAD {
            RouteClass::Read
        } else {
            RouteClass::Write
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RouteClass::Read => "read",
            RouteClass::Write => "write",
            RouteClass::Report => "report",
            RouteClass::Admin => "admin",
        }
    }
}

/// Best-effort client address.
///
/// Each of the `trusted_hops` proxies in front of us appends one
/// `X-Forwarded-For` entry, so the client is the entry that many places from
/// the end. Anything before it is client-supplied. With no trusted proxies
/// the headers are ignored and the socket peer is used.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>, trusted_hops: usize) -> String {
    let peer_ip = || peer.map(|addr| addr.ip().to_string());
    if trusted_hops == 0 {
        return peer_ip().unwrap_or_else(|| "unknown".to_string());
    }

    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| {
            let hops: Vec<&str> = h.split(',').map(str::trim).collect();
            let index = hops.len().saturating_sub(trusted_hops);
            hops.get(index).copied()
        })
        .filter(|ip| !ip.is_empty());

    let real_ip = || {
        headers
            .get("x-real-ip")
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
    };

    forwarded
        .or_else(real_ip)
        .map(str::to_string)
        .or_else(peer_ip)
        .unwrap_or_else(|| "unknown".to_string())
}

/// Charge the request against its class budget and attach the client identity.
pub async fn enforce_route_budget(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0);
    let ip_hash = state
        .ip_hasher
        .hash(&client_ip(request.headers(), peer, state.config.trusted_proxy_hops));

    let class = RouteClass::classify(request.method(), request.uri().path());
    let budgets = &state.config.route_budgets;
    let limit = match class {
        RouteClass::Read => budgets.read,
        RouteClass::Write => budgets.write,
        RouteClass::Report => budgets.report,
        RouteClass::Admin => budgets.admin,
    };

    let key = format!("ip-{}:{}", class.as_str(), ip_hash);
    if let Err(retry_after_ms) = state
        .limiter
        .check(&key, limit, budgets.window)
        .into_result()
    {
        tracing::info!(
            class = class.as_str(),
            ip_hash = %ip_hash,
            retry_after_ms,
            "Request budget exhausted"
        );
        return Err(AppError::RateLimited { retry_after_ms });
    }

    request.extensions_mut().insert(ClientIdentity { ip_hash });
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_classify() {
        assert_eq!(
            RouteClass::classify(&Method::GET, "/api/shelters/s1/community"),
            RouteClass::Read
        );
        assert_eq!(
            RouteClass::classify(&Method::POST, "/api/shelters/s1/votes"),
            RouteClass::Write
        );
        assert_eq!(
            RouteClass::classify(&Method::POST, "/api/checkins/p1/report"),
            RouteClass::Report
        );
        assert_eq!(
            RouteClass::classify(&Method::GET, "/api/admin/state"),
            RouteClass::Admin
        );
    }

    #[test]
    fn test_client_ip_precedence() {
        let peer: SocketAddr = "192.0.2.1:5000".parse().unwrap();
        let mut headers = HeaderMap::new();
        assert_eq!(client_ip(&headers, Some(peer), 1), "192.0.2.1");
        assert_eq!(client_ip(&headers, None, 1), "unknown");

        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.2"));
        assert_eq!(client_ip(&headers, Some(peer), 1), "198.51.100.2");

        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.9, 10.0.0.1"),
        );
        assert_eq!(client_ip(&headers, Some(peer), 1), "10.0.0.1");
        assert_eq!(client_ip(&headers, Some(peer), 2), "203.0.113.9");
        assert_eq!(client_ip(&headers, Some(peer), 5), "203.0.113.9");
        assert_eq!(client_ip(&headers, Some(peer), 0), "192.0.2.1");
    }

    #[test]
    fn test_client_prepended_forwarded_entries_are_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("1.2.3.4, 5.6.7.8, 203.0.113.10"),
        );
        assert_eq!(client_ip(&headers, None, 1), "203.0.113.10");

        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("9.9.9.9, 203.0.113.10"),
        );
        assert_eq!(client_ip(&headers, None, 1), "203.0.113.10");
    }
}
