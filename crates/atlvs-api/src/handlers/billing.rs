use crate::auth::{ClientIp, Granted, RequestContext};
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use atlvs_core::models::AuditOutcome;
use atlvs_core::AppError;
use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, ToSchema)]
pub struct BillingSummary {
    pub organization_id: Uuid,
    pub organization_name: String,
    pub organization_slug: String,
    /// Seats currently in use
    pub active_members: i64,
    pub enabled_features: Vec<String>,
}

/// Billing summary of the current organization (sensitive read, audited)
#[utoipa::path(
    get,
    path = "/api/v1/billing",
    tag = "billing",
    responses(
        (status = 200, description = "Billing summary", body = BillingSummary),
        (status = 401, description = "No session or no membership", body = ErrorResponse),
        (status = 403, description = "Only owners and admins see billing", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, ctx, grant), fields(user_id = %ctx.user.id, organization_id = %ctx.org_id))]
pub async fn get_billing_summary(
    State(state): State<Arc<AppState>>,
    RequestContext(ctx): RequestContext,
    Granted(grant): Granted,
    ClientIp(client_ip): ClientIp,
) -> Result<Json<BillingSummary>, HttpAppError> {
    let organizations = &state.stores.organizations;
    let organization = organizations
        .get_organization(grant.organization())
        .await?
        .ok_or_else(|| AppError::NotFound("Organization not found".to_string()))?;
    let active_members = organizations
        .count_active_members(grant.organization())
        .await?;

    state
        .gate
        .record(&ctx, &grant, AuditOutcome::Allowed, Some(organization.id), client_ip);

    Ok(Json(BillingSummary {
        organization_id: organization.id,
        organization_name: organization.name,
        organization_slug: organization.slug,
        active_members,
        enabled_features: ctx.entitlements.enabled_flags().map(String::from).collect(),
    }))
}
