use async_trait::async_trait;
use atlvs_core::models::EntitlementRecord;
use atlvs_core::AppError;
use atlvs_gate::EntitlementStore;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres};
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
struct EntitlementRow {
    subject_id: Uuid,
    flags: Json<serde_json::Value>,
    updated_at: Option<DateTime<Utc>>,
}

impl From<EntitlementRow> for EntitlementRecord {
    /// Only boolean members of the JSON object are flags; anything else is ignored
    /// rather than coerced.
    fn from(row: EntitlementRow) -> Self {
        let mut record = EntitlementRecord::new(row.subject_id);
        record.updated_at = row.updated_at;
        if let serde_json::Value::Object(map) = row.flags.0 {
            for (name, value) in map {
                match value {
                    serde_json::Value::Bool(enabled) => {
                        record.flags.insert(name, enabled);
                    }
                    other => {
                        tracing::warn!(
                            subject_id = %row.subject_id,
                            flag = %name,
                            value = %other,
                            "Ignoring non-boolean entitlement flag"
                        );
                    }
                }
            }
        }
        record
    }
}

#[derive(Clone)]
pub struct EntitlementRepository {
    pool: PgPool,
}

impl EntitlementRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EntitlementStore for EntitlementRepository {
    #[tracing::instrument(skip(self), fields(db.table = "organization_entitlements", db.operation = "select"))]
    async fn organization_entitlements(
        &self,
        organization_id: Uuid,
    ) -> Result<Option<EntitlementRecord>, AppError> {
        let row = sqlx::query_as::<Postgres, EntitlementRow>(
            r#"
            SELECT organization_id AS subject_id, flags, updated_at
            FROM organization_entitlements
            WHERE organization_id = $1
            "#,
        )
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, organization_id = %organization_id, "Failed to fetch organization entitlements");
            AppError::Database(e)
        })?;

        Ok(row.map(EntitlementRecord::from))
    }

    #[tracing::instrument(skip(self), fields(db.table = "user_entitlements", db.operation = "select"))]
    async fn user_entitlements(
        &self,
        user_id: Uuid,
    ) -> Result<Option<EntitlementRecord>, AppError> {
        let row = sqlx::query_as::<Postgres, EntitlementRow>(
            r#"
            SELECT user_id AS subject_id, flags, updated_at
            FROM user_entitlements
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, user_id = %user_id, "Failed to fetch user entitlements");
            AppError::Database(e)
        })?;

        Ok(row.map(EntitlementRecord::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_boolean_flags_survive_conversion() {
        let row = EntitlementRow {
            subject_id: Uuid::new_v4(),
            flags: Json(serde_json::json!({
                "feature_opendeck": true,
                "feature_atlvs": false,
                "unified-analytics": "yes",
                "advanced-dashboards": 1
            })),
            updated_at: None,
        };
        let record = EntitlementRecord::from(row);
        assert_eq!(record.flags.len(), 2);
        assert_eq!(record.flags.get("feature_opendeck"), Some(&true));
        assert_eq!(record.flags.get("feature_atlvs"), Some(&false));
    }

    #[test]
    fn test_non_object_flags_yield_empty_record() {
        let row = EntitlementRow {
            subject_id: Uuid::new_v4(),
            flags: Json(serde_json::json!(["feature_opendeck"])),
            updated_at: None,
        };
        assert!(EntitlementRecord::from(row).flags.is_empty());
    }
}
