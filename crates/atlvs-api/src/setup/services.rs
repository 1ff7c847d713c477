//! Gate and state construction

use crate::state::AppState;
use anyhow::{Context, Result};
use atlvs_core::{AuthProviderKind, Config};
use atlvs_gate::auth::{JwtAuthProvider, RemoteAuthProvider};
use atlvs_gate::{AuthProvider, Gate, GateStores};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

/// Auth provider selected by `AUTH_PROVIDER`.
pub fn build_auth_provider(config: &Config) -> Result<Arc<dyn AuthProvider>> {
    match config.auth_provider() {
        AuthProviderKind::Jwt => {
            let secret = config
                .auth_jwt_secret()
                .context("AUTH_JWT_SECRET must be set when AUTH_PROVIDER=jwt")?;
            Ok(Arc::new(JwtAuthProvider::new(
                secret,
                config.auth_jwt_audience(),
            )))
        }
        AuthProviderKind::Remote => {
            let url = config
                .auth_url()
                .context("AUTH_URL must be set when AUTH_PROVIDER=remote")?;
            let anon_key = config
                .auth_anon_key()
                .context("AUTH_ANON_KEY must be set when AUTH_PROVIDER=remote")?;
            let provider = RemoteAuthProvider::new(
                url,
                anon_key,
                Duration::from_secs(config.auth_timeout_seconds()),
            )
            .map_err(|e| anyhow::anyhow!("Failed to build auth client: {}", e))?;
            Ok(Arc::new(provider))
        }
    }
}

/// Wire the gate on top of any set of stores.
pub fn build_state(
    config: &Config,
    provider: Arc<dyn AuthProvider>,
    stores: GateStores,
    pool: Option<PgPool>,
) -> Arc<AppState> {
    let gate = Gate::new(
        provider,
        &stores,
        Arc::new(config.feature_flags().clone()),
        config.audit_enabled(),
    );
    Arc::new(AppState::new(config.clone(), gate, stores, pool))
}

/// Postgres-backed state for the running service.
pub fn initialize_services(config: &Config, pool: PgPool) -> Result<Arc<AppState>> {
    let provider = build_auth_provider(config)?;
    let stores = atlvs_db::pg_stores(pool.clone());
    Ok(build_state(config, provider, stores, Some(pool)))
}
