//! OpenAPI documentation, served at `/api/openapi.json`.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use atlvs_core::models;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "ATLVS Gate API",
        version = "0.1.0",
        description = "Tenant access gate: session, membership, entitlements and role policy for every organization-scoped request. All JSON endpoints are versioned under /api/v1/."
    ),
    paths(
        handlers::context::get_context,
        handlers::context::get_navigation,
        handlers::context::get_entitlements,
        handlers::organizations::list_organizations,
        handlers::projects::list_projects,
        handlers::projects::create_project,
        handlers::projects::list_organization_projects,
        handlers::billing::get_billing_summary,
        handlers::audit_logs::list_audit_logs,
    ),
    components(
        schemas(
            error::ErrorResponse,
            models::Identity,
            models::Role,
            models::MembershipSummary,
            models::EffectiveEntitlements,
            models::Project,
            models::ProjectStatus,
            models::CreateProjectRequest,
            models::AuditLogEntry,
            models::AuditOutcome,
            atlvs_gate::GateContext,
            atlvs_gate::NavSection,
            atlvs_gate::NavItem,
            atlvs_gate::DataScope,
            atlvs_gate::Narrowing,
            handlers::context::NavigationResponse,
            handlers::context::EntitlementsResponse,
            handlers::organizations::OrganizationsResponse,
            handlers::projects::ProjectListResponse,
            handlers::billing::BillingSummary,
            handlers::audit_logs::AuditLogResponse,
        )
    ),
    tags(
        (name = "gate", description = "Resolved context, navigation and entitlements"),
        (name = "organizations", description = "Organization switcher"),
        (name = "projects", description = "Tenant-scoped project records"),
        (name = "billing", description = "Owner and admin billing view"),
        (name = "audit", description = "Audit log")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_versioned_paths() {
        let spec = ApiDoc::openapi();
        assert!(spec.paths.paths.contains_key("/api/v1/context"));
        assert!(spec.paths.paths.contains_key("/api/v1/projects"));
        assert!(spec
            .paths
            .paths
            .contains_key("/api/v1/organizations/{org_id}/projects"));
    }
}
