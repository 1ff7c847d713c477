use crate::db::transaction::begin_scoped;
use async_trait::async_trait;
use atlvs_core::constants::MAX_AUDIT_PAGE_SIZE;
use atlvs_core::models::{AuditLogEntry, AuditOutcome, NewAuditLogEntry};
use atlvs_core::AppError;
use atlvs_gate::{AuditLogReader, AuditSink, ScopedOrganization};
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres};
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
struct AuditLogRow {
    id: Uuid,
    organization_id: Uuid,
    actor_id: Option<Uuid>,
    action: String,
    resource_type: String,
    resource_id: Option<Uuid>,
    outcome: String,
    detail: Json<serde_json::Value>,
    occurred_at: DateTime<Utc>,
}

impl From<AuditLogRow> for AuditLogEntry {
    fn from(row: AuditLogRow) -> Self {
        AuditLogEntry {
            id: row.id,
            organization_id: row.organization_id,
            actor_id: row.actor_id,
            action: row.action,
            resource_type: row.resource_type,
            resource_id: row.resource_id,
            outcome: AuditOutcome::parse(&row.outcome).unwrap_or(AuditOutcome::Failed),
            detail: row.detail.0,
            occurred_at: row.occurred_at,
        }
    }
}

/// Append-only `audit_logs` table
#[derive(Clone)]
pub struct AuditLogRepository {
    pool: PgPool,
}

impl AuditLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditSink for AuditLogRepository {
    #[tracing::instrument(skip(self, entry), fields(db.table = "audit_logs", db.operation = "insert"))]
    async fn append(&self, entry: NewAuditLogEntry) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO audit_logs (
                organization_id, actor_id, action, resource_type, resource_id, outcome, detail, occurred_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(entry.organization_id)
        .bind(entry.actor_id)
        .bind(&entry.action)
        .bind(&entry.resource_type)
        .bind(entry.resource_id)
        .bind(entry.outcome.as_str())
        .bind(Json(&entry.detail))
        .bind(entry.occurred_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, organization_id = %entry.organization_id, "Failed to append audit log entry");
            AppError::Database(e)
        })?;

        Ok(())
    }
}

#[async_trait]
impl AuditLogReader for AuditLogRepository {
    #[tracing::instrument(skip(self), fields(db.table = "audit_logs", db.operation = "select", organization_id = %organization))]
    async fn recent_entries(
        &self,
        organization: &ScopedOrganization,
        limit: i64,
    ) -> Result<Vec<AuditLogEntry>, AppError> {
        let limit = limit.clamp(1, MAX_AUDIT_PAGE_SIZE);
        let mut tx = begin_scoped(&self.pool, organization).await?;
        let rows = sqlx::query_as::<Postgres, AuditLogRow>(
            r#"
            SELECT id, organization_id, actor_id, action, resource_type, resource_id,
                   outcome, detail, occurred_at
            FROM audit_logs
            WHERE organization_id = $1
            ORDER BY occurred_at DESC
            LIMIT $2
            "#,
        )
        .bind(organization.id())
        .bind(limit)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, organization_id = %organization, "Failed to list audit log");
            AppError::Database(e)
        })?;
        tx.commit().await.map_err(AppError::Database)?;

        Ok(rows.into_iter().map(AuditLogEntry::from).collect())
    }
}
