// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Middleware modules (admin auth, request budgets, security headers).

pub mod admin_auth;
pub mod rate_limit;
pub mod security;

pub use admin_auth::require_admin;
pub use rate_limit::{enforce_route_budget, ClientIdentity, RouteClass};
