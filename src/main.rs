// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Postboard API Server
//!
//! Serves a shared feed of text posts. Users sign in through an OpenID
//! Connect provider and are provisioned locally on first sign-in.

use postboard::{
    config::{Config, DatastoreKind},
    db::{Datastore, FirestoreDb, MemoryStore},
    services::OidcGateway,
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(
        port = config.port,
        datastore = ?config.datastore,
        "Starting Postboard API"
    );

    let db: Arc<dyn Datastore> = match config.datastore {
        DatastoreKind::Firestore => Arc::new(FirestoreDb::new(&config.gcp_project_id).await?),
        DatastoreKind::Memory => {
            tracing::warn!("Using in-memory datastore; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let identity = Arc::new(OidcGateway::new(&config)?);
    tracing::info!(callback = %config.callback_url(), "Identity provider configured");

    // Build shared state
    let addr = format!("0.0.0.0:{}", config.port);
    let state = Arc::new(AppState::new(config, db, identity));

    // Build router
    let app = postboard::routes::create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("postboard=debug,info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(format)
        .init();
}
