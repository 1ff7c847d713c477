//! Application setup and initialization

pub mod database;
pub mod routes;
pub mod server;
pub mod services;

use crate::state::AppState;
use anyhow::{Context, Result};
use atlvs_core::Config;
use std::sync::Arc;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    config.validate().context("Configuration validation failed")?;

    atlvs_infra::init_telemetry(config.log_format(), config.environment())?;

    tracing::info!(
        environment = %config.environment(),
        auth_provider = ?config.auth_provider(),
        feature_flags = config.feature_flags().len(),
        audit_enabled = config.audit_enabled(),
        "Configuration loaded and validated successfully"
    );

    let pool = database::setup_database(&config).await?;

    let state = services::initialize_services(&config, pool)?;

    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
