// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Vidhub Accounts API Server
//!
//! Serves registration, login, and token refresh for user accounts.

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vidhub_accounts::{
    config::{Config, StoreBackend},
    db::{FirestoreDb, MemoryUserStore, UserStore},
    services::{CloudinaryMedia, MediaStore},
    AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting Vidhub Accounts API");

    let store: Arc<dyn UserStore> = match config.store_backend {
        StoreBackend::Firestore => Arc::new(FirestoreDb::new(&config.gcp_project_id).await?),
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory user store; accounts are lost on restart");
            Arc::new(MemoryUserStore::new())
        }
    };

    let media: Arc<dyn MediaStore> = Arc::new(CloudinaryMedia::new(config.media.clone()));
    if config.media.cloud_name.is_empty() {
        tracing::warn!("CLOUDINARY_CLOUD_NAME not set; image uploads will fail");
    } else {
        tracing::info!(
            signature_algorithm = config.media.signature_algorithm.as_str(),
            "Media uploads signed"
        );
    }

    // Build shared state
    let state = Arc::new(AppState::new(config.clone(), store, media)?);

    // Build router
    let app = vidhub_accounts::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("vidhub_accounts=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
