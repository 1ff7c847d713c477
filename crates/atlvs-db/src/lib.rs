//! ATLVS Database Layer
//!
//! Postgres repositories implementing the gate's store traits.

pub mod db;

pub use db::{
    pg_stores, AuditLogRepository, EntitlementRepository, MembershipRepository,
    OrganizationRepository, ProjectAssignmentRepository, ProjectRepository,
};
pub use db::transaction::begin_scoped;
