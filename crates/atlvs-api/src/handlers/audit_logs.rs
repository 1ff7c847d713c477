use crate::auth::{ClientIp, Granted, RequestContext};
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use atlvs_core::constants::MAX_AUDIT_PAGE_SIZE;
use atlvs_core::models::{AuditLogEntry, AuditOutcome};
use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

const DEFAULT_LIMIT: i64 = 50;

#[derive(Debug, Deserialize, IntoParams)]
pub struct AuditLogQuery {
    /// Number of entries, at most 200
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuditLogResponse {
    pub entries: Vec<AuditLogEntry>,
    pub count: usize,
}

/// Most recent audit entries of the current organization (sensitive read, audited)
#[utoipa::path(
    get,
    path = "/api/v1/audit-logs",
    tag = "audit",
    params(AuditLogQuery),
    responses(
        (status = 200, description = "Newest entries first", body = AuditLogResponse),
        (status = 401, description = "No session or no membership", body = ErrorResponse),
        (status = 403, description = "Only owners and admins see the audit log", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, ctx, grant), fields(user_id = %ctx.user.id, organization_id = %ctx.org_id))]
pub async fn list_audit_logs(
    State(state): State<Arc<AppState>>,
    RequestContext(ctx): RequestContext,
    Granted(grant): Granted,
    ClientIp(client_ip): ClientIp,
    Query(query): Query<AuditLogQuery>,
) -> Result<Json<AuditLogResponse>, HttpAppError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_LIMIT)
        .clamp(1, MAX_AUDIT_PAGE_SIZE);

    let entries = state
        .stores
        .audit_log
        .recent_entries(grant.organization(), limit)
        .await?;

    state
        .gate
        .record(&ctx, &grant, AuditOutcome::Allowed, None, client_ip);

    Ok(Json(AuditLogResponse {
        count: entries.len(),
        entries,
    }))
}
