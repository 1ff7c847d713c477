use crate::db::transaction::begin_scoped;
use async_trait::async_trait;
use atlvs_core::models::Organization;
use atlvs_core::AppError;
use atlvs_gate::{OrganizationStore, ScopedOrganization};
use sqlx::{PgPool, Postgres};

#[derive(Clone)]
pub struct OrganizationRepository {
    pool: PgPool,
}

impl OrganizationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrganizationStore for OrganizationRepository {
    #[tracing::instrument(skip(self), fields(db.table = "organizations", db.operation = "select", organization_id = %organization))]
    async fn get_organization(
        &self,
        organization: &ScopedOrganization,
    ) -> Result<Option<Organization>, AppError> {
        let mut tx = begin_scoped(&self.pool, organization).await?;
        let found = sqlx::query_as::<Postgres, Organization>(
            r#"
            SELECT id, name, slug, created_at, updated_at
            FROM organizations
            WHERE id = $1
            "#,
        )
        .bind(organization.id())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, organization_id = %organization, "Failed to fetch organization");
            AppError::Database(e)
        })?;
        tx.commit().await.map_err(AppError::Database)?;

        Ok(found)
    }

    #[tracing::instrument(skip(self), fields(db.table = "memberships", db.operation = "count", organization_id = %organization))]
    async fn count_active_members(
        &self,
        organization: &ScopedOrganization,
    ) -> Result<i64, AppError> {
        let mut tx = begin_scoped(&self.pool, organization).await?;
        let count = sqlx::query_scalar::<Postgres, i64>(
            r#"
            SELECT COUNT(*)
            FROM memberships
            WHERE organization_id = $1 AND status = 'active'
            "#,
        )
        .bind(organization.id())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, organization_id = %organization, "Failed to count members");
            AppError::Database(e)
        })?;
        tx.commit().await.map_err(AppError::Database)?;

        Ok(count)
    }
}
