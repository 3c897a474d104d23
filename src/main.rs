// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shelter Community API Server
//!
//! Serves crowd-submitted shelter votes, comments, check-in pins and device
//! state out of a JSON document store.

use shelter_community::{config::Config, db::atomic_io, AppState};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How often expired rate buckets are dropped.
const RATE_BUCKET_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(
        port = config.port,
        store_root = %config.store_root.display(),
        "Starting Shelter Community API"
    );
    if config.admin_token.is_empty() {
        tracing::warn!("ADMIN_TOKEN not set; admin routes are disabled");
    }

    // Temp files left by writers that crashed mid-write. Anything older than
    // the lock TTL cannot belong to a live writer.
    let removed = atomic_io::sweep_stale_temp_files(&config.store_root, config.limits.lock_ttl)
        .await?;
    if removed > 0 {
        tracing::info!(removed, "Removed stale temp files");
    }

    // Build shared state
    let state = Arc::new(AppState::new(config.clone()));
    let _sweeper = state.limiter.spawn_sweeper(RATE_BUCKET_SWEEP_INTERVAL);

    // Build router
    let app = shelter_community::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    // Directives are literals; parsing cannot fail.
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("shelter_community=debug".parse().unwrap())
        .add_directive("info".parse().unwrap());

    tracing_subscriber::registry()
        .with(filter)
        .with(format)
        .init();
}
