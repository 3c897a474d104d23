// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Store tunables. Every value can be overridden from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLimits {
    /// How long a document lock claim stays valid (`STORE_LOCK_TTL_MS`).
    pub lock_ttl: Duration,

    // --- Device state ---
    pub max_saved_areas: usize,
    pub max_favorites: usize,
    pub max_recent_shelters: usize,

    // --- Shelter community ---
    pub max_comments_per_shelter: usize,
    pub max_votes_history_per_shelter: usize,
    pub max_comment_chars: usize,

    // --- Check-in pins ---
    pub max_checkin_pins: usize,
    pub max_pin_comment_chars: usize,
    /// Pins older than this are omitted unless `includeOld` is set.
    pub checkin_pin_max_age: Duration,

    // --- Per-device rate windows ---
    pub vote_window: Duration,
    pub vote_limit: u32,
    pub comment_window: Duration,
    pub comment_limit: u32,
    pub report_window: Duration,
    pub report_limit: u32,
    pub checkin_window: Duration,
    pub checkin_limit: u32,
}

impl Default for StoreLimits {
    fn default() -> Self {
        Self {
            lock_ttl: Duration::from_millis(15_000),
            max_saved_areas: 5,
            max_favorites: 5,
            max_recent_shelters: 50,
            max_comments_per_shelter: 200,
            max_votes_history_per_shelter: 500,
            max_comment_chars: 300,
            max_checkin_pins: 2_000,
            max_pin_comment_chars: 120,
            checkin_pin_max_age: Duration::from_secs(24 * 60 * 60),
            vote_window: Duration::from_millis(600_000),
            vote_limit: 3,
            comment_window: Duration::from_millis(120_000),
            comment_limit: 3,
            report_window: Duration::from_millis(60_000),
            report_limit: 5,
            checkin_window: Duration::from_millis(60_000),
            checkin_limit: 3,
        }
    }
}

impl StoreLimits {
    /// Defaults overridden by any `STORE_*` variables that are set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        Ok(Self {
            lock_ttl: env_millis("STORE_LOCK_TTL_MS", defaults.lock_ttl)?,
            max_saved_areas: env_parse("STORE_MAX_SAVED_AREAS", defaults.max_saved_areas)?,
            max_favorites: env_parse("STORE_MAX_FAVORITES", defaults.max_favorites)?,
            max_recent_shelters: env_parse(
                "STORE_MAX_RECENT_SHELTERS",
                defaults.max_recent_shelters,
            )?,
            max_comments_per_shelter: env_parse(
                "STORE_MAX_COMMENTS_PER_SHELTER",
                defaults.max_comments_per_shelter,
            )?,
            max_votes_history_per_shelter: env_parse(
                "STORE_MAX_VOTES_HISTORY_PER_SHELTER",
                defaults.max_votes_history_per_shelter,
            )?,
            max_checkin_pins: env_parse("STORE_MAX_CHECKIN_PINS", defaults.max_checkin_pins)?,
            vote_window: env_millis("STORE_VOTE_WINDOW_MS", defaults.vote_window)?,
            comment_window: env_millis("STORE_COMMENT_WINDOW_MS", defaults.comment_window)?,
            report_window: env_millis("STORE_REPORT_WINDOW_MS", defaults.report_window)?,
            ..defaults
        })
    }
}

/// Per-IP request budgets at the HTTP boundary, one per endpoint class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteBudgets {
    pub window: Duration,
    pub read: u32,
    pub write: u32,
    pub report: u32,
    pub admin: u32,
}

impl Default for RouteBudgets {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(60),
            read: 120,
            write: 30,
            report: 10,
            admin: 30,
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// Directory holding the JSON documents
    pub store_root: PathBuf,
    /// Reverse proxies in front of the server that append to
    /// `X-Forwarded-For`. Zero means use the socket peer.
    pub trusted_proxy_hops: usize,

    // --- Secrets ---
    /// Bearer token for `/api/admin/*`. Admin routes are closed when empty.
    pub admin_token: String,
    /// HMAC key for hashing client IPs before they are stored
    pub ip_hash_secret: Vec<u8>,

    pub limits: StoreLimits,
    pub route_budgets: RouteBudgets,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            port: 8080,
            frontend_url: "http://localhost:5173".to_string(),
            store_root: PathBuf::from("store"),
            trusted_proxy_hops: 1,
            admin_token: "test_admin_token".to_string(),
            ip_hash_secret: b"test_ip_hash_secret".to_vec(),
            limits: StoreLimits::default(),
            route_budgets: RouteBudgets::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            store_root: env::var("STORE_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("store")),
            trusted_proxy_hops: env_parse("TRUSTED_PROXY_HOPS", 1)?,

            admin_token: env::var("ADMIN_TOKEN")
                .map(|v| v.trim().to_string())
                .unwrap_or_default(),
            ip_hash_secret: env::var("IP_HASH_SECRET")
                .map_err(|_| ConfigError::Missing("IP_HASH_SECRET"))?
                .into_bytes(),

            limits: StoreLimits::from_env()?,
            route_budgets: RouteBudgets::default(),
        })
    }
}

fn env_parse<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(default),
    }
}

fn env_millis(name: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
