use async_trait::async_trait;
use atlvs_core::models::{Membership, MembershipStatus, MembershipSummary, Role};
use atlvs_core::AppError;
use atlvs_gate::MembershipStore;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres};
use uuid::Uuid;

/// Raw `memberships` row; role and status are free-form text in storage.
#[derive(Debug, Clone, FromRow)]
pub struct MembershipRow {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub user_id: Uuid,
    pub role: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<MembershipRow> for Membership {
    fn from(row: MembershipRow) -> Self {
        if Role::try_parse(&row.role).is_none() {
            tracing::warn!(
                membership_id = %row.id,
                role = %row.role,
                "Unknown role stored on membership, treating as viewer"
            );
        }
        Membership {
            id: row.id,
            organization_id: row.organization_id,
            user_id: row.user_id,
            role: Role::parse(&row.role),
            status: MembershipStatus::parse(&row.status),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
struct MembershipSummaryRow {
    organization_id: Uuid,
    organization_name: String,
    organization_slug: String,
    role: String,
    joined_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct MembershipRepository {
    pool: PgPool,
}

impl MembershipRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MembershipStore for MembershipRepository {
    #[tracing::instrument(skip(self), fields(db.table = "memberships", db.operation = "select"))]
    async fn find_memberships(
        &self,
        user_id: Uuid,
        organization_id: Option<Uuid>,
    ) -> Result<Vec<Membership>, AppError> {
        let rows = sqlx::query_as::<Postgres, MembershipRow>(
            r#"
            SELECT id, organization_id, user_id, role, status, created_at, updated_at
            FROM memberships
            WHERE user_id = $1
              AND ($2::uuid IS NULL OR organization_id = $2)
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(user_id)
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, user_id = %user_id, "Failed to fetch memberships");
            AppError::Database(e)
        })?;

        Ok(rows.into_iter().map(Membership::from).collect())
    }

    #[tracing::instrument(skip(self), fields(db.table = "memberships", db.operation = "select"))]
    async fn membership_summaries(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<MembershipSummary>, AppError> {
        let rows = sqlx::query_as::<Postgres, MembershipSummaryRow>(
            r#"
            SELECT o.id AS organization_id,
                   o.name AS organization_name,
                   o.slug AS organization_slug,
                   m.role,
                   m.created_at AS joined_at
            FROM memberships m
            JOIN organizations o ON o.id = m.organization_id
            WHERE m.user_id = $1 AND m.status = 'active'
            ORDER BY m.created_at ASC, m.id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, user_id = %user_id, "Failed to list memberships");
            AppError::Database(e)
        })?;

        Ok(rows
            .into_iter()
            .map(|row| MembershipSummary {
                organization_id: row.organization_id,
                organization_name: row.organization_name,
                organization_slug: row.organization_slug,
                role: Role::parse(&row.role),
                joined_at: row.joined_at,
            })
            .collect())
    }
}
