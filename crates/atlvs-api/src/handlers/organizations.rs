use crate::auth::RequestContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use atlvs_core::models::MembershipSummary;
use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, ToSchema)]
pub struct OrganizationsResponse {
    pub current_organization_id: Uuid,
    pub organizations: Vec<MembershipSummary>,
}

/// Active memberships of the caller, for the organization switcher
#[utoipa::path(
    get,
    path = "/api/v1/organizations",
    tag = "organizations",
    responses(
        (status = 200, description = "Active memberships", body = OrganizationsResponse),
        (status = 401, description = "No session or no membership", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, ctx), fields(user_id = %ctx.user.id))]
pub async fn list_organizations(
    State(state): State<Arc<AppState>>,
    RequestContext(ctx): RequestContext,
) -> Result<Json<OrganizationsResponse>, HttpAppError> {
    let organizations = state.gate.organizations(&ctx.user).await?;

    Ok(Json(OrganizationsResponse {
        current_organization_id: ctx.org_id,
        organizations,
    }))
}
