// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! EcoBreak API Server
//!
//! Serves the active-break catalog and schedules, and pushes reminders
//! ahead of each scheduled break.

use ecobreak_api::{
    config::Config,
    db::FirestoreDb,
    services::{GoogleAuth, IdentityService},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(
        port = config.port,
        schedule_offset_minutes = config.schedule_utc_offset_minutes,
        "Starting EcoBreak API"
    );

    // Initialize Firestore database
    let db = FirestoreDb::new(&config.firebase_project_id).await?;

    // Google credentials shared by Drive and FCM
    let google_auth = GoogleAuth::new(config.service_account.clone());
    if config.service_account.is_none() {
        tracing::info!("No service account configured, using metadata server credentials");
    }
    let identity = IdentityService::new(&config.firebase_api_key);

    let state = Arc::new(AppState::new(config.clone(), db, google_auth, identity)?);

    // Reminder loop
    if config.notification_cron_interval_secs > 0 {
        let interval = std::time::Duration::from_secs(config.notification_cron_interval_secs);
        state.cron.clone().spawn(interval);
        tracing::info!(
            interval_secs = config.notification_cron_interval_secs,
            "Notification cron started"
        );
    } else {
        tracing::info!("Notification cron disabled; relying on /tasks trigger");
    }

    // Build router
    let app = ecobreak_api::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ecobreak_api=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
