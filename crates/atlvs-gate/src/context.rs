//! Resolved per-request context

use crate::policy::PolicyInput;
use crate::tenant_scope::ScopedOrganization;
use atlvs_core::models::{EffectiveEntitlements, Identity, Role};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

/// Who is calling, in which organization, with which role and capabilities.
///
/// Computed once per request and passed explicitly; never cached across requests.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GateContext {
    pub user: Identity,
    pub org_id: Uuid,
    pub role: Role,
    pub entitlements: EffectiveEntitlements,
    pub projects_assigned_count: usize,
    #[serde(skip)]
    pub membership_id: Uuid,
    #[serde(skip)]
    pub assigned_project_ids: Vec<Uuid>,
    #[serde(skip)]
    organization: ScopedOrganization,
}

impl GateContext {
    pub(crate) fn new(
        user: Identity,
        organization: ScopedOrganization,
        membership_id: Uuid,
        role: Role,
        entitlements: EffectiveEntitlements,
        assigned_project_ids: Vec<Uuid>,
    ) -> Self {
        Self {
            user,
            org_id: organization.id(),
            role,
            entitlements,
            projects_assigned_count: assigned_project_ids.len(),
            membership_id,
            assigned_project_ids,
            organization,
        }
    }

    pub fn organization(&self) -> &ScopedOrganization {
        &self.organization
    }

    pub fn policy_input(&self) -> PolicyInput<'_> {
        PolicyInput {
            role: self.role,
            assigned_projects: self.projects_assigned_count,
            entitlements: &self.entitlements,
        }
    }
}

/// Outcome of resolving a context for an authenticated identity.
#[derive(Debug, Clone)]
pub enum ContextResolution {
    Resolved(Box<GateContext>),
    NoMembership,
}
