//! Tenant-scoped transactions

use atlvs_core::AppError;
use atlvs_gate::ScopedOrganization;
use sqlx::{PgPool, Postgres, Transaction};

/// Begin a transaction with `app.current_organization_id` set for its duration.
///
/// Row security policies read that setting. Queries must still filter on
/// `organization_id` themselves.
pub async fn begin_scoped(
    pool: &PgPool,
    organization: &ScopedOrganization,
) -> Result<Transaction<'static, Postgres>, AppError> {
    let mut tx = pool.begin().await.map_err(|e| {
        tracing::error!(error = %e, "Failed to begin database transaction");
        AppError::Database(e)
    })?;

    sqlx::query("SELECT set_config('app.current_organization_id', $1, true)")
        .bind(organization.id().to_string())
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, organization_id = %organization, "Failed to set tenant scope");
            AppError::Database(e)
        })?;

    Ok(tx)
}
