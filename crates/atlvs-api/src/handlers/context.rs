//! Who am I, where am I, what can I see.

use crate::auth::RequestContext;
use crate::error::ErrorResponse;
use crate::state::AppState;
use atlvs_core::models::EffectiveEntitlements;
use atlvs_gate::{GateContext, NavSection};
use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, ToSchema)]
pub struct NavigationResponse {
    pub sections: Vec<NavSection>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EntitlementsResponse {
    pub organization_id: Uuid,
    pub entitlements: EffectiveEntitlements,
}

/// Resolved gate context of the caller
#[utoipa::path(
    get,
    path = "/api/v1/context",
    tag = "gate",
    params(
        ("x-organization-id" = Option<Uuid>, Header, description = "Organization to act in; defaults to the oldest membership")
    ),
    responses(
        (status = 200, description = "Resolved context", body = GateContext),
        (status = 401, description = "No session or no membership", body = ErrorResponse),
        (status = 403, description = "Not a member of the requested organization", body = ErrorResponse)
    )
)]
pub async fn get_context(RequestContext(ctx): RequestContext) -> Json<GateContext> {
    Json(ctx)
}

/// Navigation filtered for the caller
#[utoipa::path(
    get,
    path = "/api/v1/navigation",
    tag = "gate",
    responses(
        (status = 200, description = "Reachable sections", body = NavigationResponse),
        (status = 401, description = "No session or no membership", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, ctx), fields(user_id = %ctx.user.id, organization_id = %ctx.org_id))]
pub async fn get_navigation(
    State(state): State<Arc<AppState>>,
    RequestContext(ctx): RequestContext,
) -> Json<NavigationResponse> {
    Json(NavigationResponse {
        sections: state.gate.navigation(&ctx),
    })
}

/// Effective feature flags in the current organization
#[utoipa::path(
    get,
    path = "/api/v1/entitlements",
    tag = "gate",
    responses(
        (status = 200, description = "Every known flag with its effective value", body = EntitlementsResponse),
        (status = 401, description = "No session or no membership", body = ErrorResponse)
    )
)]
pub async fn get_entitlements(RequestContext(ctx): RequestContext) -> Json<EntitlementsResponse> {
    Json(EntitlementsResponse {
        organization_id: ctx.org_id,
        entitlements: ctx.entitlements,
    })
}
