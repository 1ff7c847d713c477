//! Store abstractions
//!
//! The gate reads tenancy data through these traits. The Postgres implementation
//! lives in `atlvs-db`; [`crate::memory`] provides an in-memory one for tests.
//!
//! Stores that touch tenant-owned records take a [`ScopedOrganization`] rather than
//! a raw id. The membership store is the exception: it is the cross-check that
//! produces the token.

use crate::tenant_scope::ScopedOrganization;
use async_trait::async_trait;
use atlvs_core::models::{
    AuditLogEntry, EntitlementRecord, Membership, MembershipSummary, NewAuditLogEntry, NewProject,
    Organization, Project,
};
use atlvs_core::AppError;
use std::sync::Arc;
use uuid::Uuid;

#[async_trait]
pub trait MembershipStore: Send + Sync {
    /// Every membership row of `user_id`, whatever its status, optionally
    /// restricted to one organization.
    async fn find_memberships(
        &self,
        user_id: Uuid,
        organization_id: Option<Uuid>,
    ) -> Result<Vec<Membership>, AppError>;

    /// Active memberships of `user_id` joined with their organizations.
    async fn membership_summaries(&self, user_id: Uuid)
        -> Result<Vec<MembershipSummary>, AppError>;
}

#[async_trait]
pub trait EntitlementStore: Send + Sync {
    async fn organization_entitlements(
        &self,
        organization_id: Uuid,
    ) -> Result<Option<EntitlementRecord>, AppError>;

    async fn user_entitlements(&self, user_id: Uuid)
        -> Result<Option<EntitlementRecord>, AppError>;
}

#[async_trait]
pub trait ProjectAssignmentStore: Send + Sync {
    async fn assigned_project_ids(
        &self,
        organization: &ScopedOrganization,
        user_id: Uuid,
    ) -> Result<Vec<Uuid>, AppError>;
}

/// Row filter applied on top of the organization scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectFilter {
    All,
    Only(Vec<Uuid>),
}

impl ProjectFilter {
    pub fn admits(&self, project_id: Uuid) -> bool {
        match self {
            ProjectFilter::All => true,
            ProjectFilter::Only(ids) => ids.contains(&project_id),
        }
    }
}

#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn list_projects(
        &self,
        organization: &ScopedOrganization,
        filter: &ProjectFilter,
    ) -> Result<Vec<Project>, AppError>;

    /// Insert a project. With `assign_creator` the creator is also added to the
    /// project's members in the same transaction.
    async fn create_project(
        &self,
        organization: &ScopedOrganization,
        project: NewProject,
        assign_creator: bool,
    ) -> Result<Project, AppError>;
}

#[async_trait]
pub trait OrganizationStore: Send + Sync {
    async fn get_organization(
        &self,
        organization: &ScopedOrganization,
    ) -> Result<Option<Organization>, AppError>;

    async fn count_active_members(&self, organization: &ScopedOrganization)
        -> Result<i64, AppError>;
}

/// Append side of the audit log.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn append(&self, entry: NewAuditLogEntry) -> Result<(), AppError>;
}

#[async_trait]
pub trait AuditLogReader: Send + Sync {
    /// Most recent entries first.
    async fn recent_entries(
        &self,
        organization: &ScopedOrganization,
        limit: i64,
    ) -> Result<Vec<AuditLogEntry>, AppError>;
}

/// Every store the service needs, behind trait objects.
#[derive(Clone)]
pub struct GateStores {
    pub memberships: Arc<dyn MembershipStore>,
    pub entitlements: Arc<dyn EntitlementStore>,
    pub assignments: Arc<dyn ProjectAssignmentStore>,
    pub projects: Arc<dyn ProjectStore>,
    pub organizations: Arc<dyn OrganizationStore>,
    pub audit_sink: Arc<dyn AuditSink>,
    pub audit_log: Arc<dyn AuditLogReader>,
}
