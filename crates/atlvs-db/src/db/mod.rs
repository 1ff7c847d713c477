//! Database repositories for the tenant access gate
//!
//! One repository per table group. Tenant-owned tables are only reached through a
//! [`atlvs_gate::ScopedOrganization`]: every such query filters on
//! `organization_id` explicitly and also runs inside a transaction that sets
//! `app.current_organization_id` for the row security policies.

pub mod audit_log;
pub mod entitlement;
pub mod membership;
pub mod organization;
pub mod project;
pub mod transaction;

pub use audit_log::AuditLogRepository;
pub use entitlement::EntitlementRepository;
pub use membership::MembershipRepository;
pub use organization::OrganizationRepository;
pub use project::{ProjectAssignmentRepository, ProjectRepository};

use atlvs_gate::GateStores;
use sqlx::PgPool;
use std::sync::Arc;

/// Every gate store backed by one connection pool.
pub fn pg_stores(pool: PgPool) -> GateStores {
    let audit = Arc::new(AuditLogRepository::new(pool.clone()));
    GateStores {
        memberships: Arc::new(MembershipRepository::new(pool.clone())),
        entitlements: Arc::new(EntitlementRepository::new(pool.clone())),
        assignments: Arc::new(ProjectAssignmentRepository::new(pool.clone())),
        projects: Arc::new(ProjectRepository::new(pool.clone())),
        organizations: Arc::new(OrganizationRepository::new(pool)),
        audit_sink: audit.clone(),
        audit_log: audit,
    }
}
