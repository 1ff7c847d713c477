//! ATLVS tenant access gate
//!
//! The pipeline every protected route goes through: session resolution, membership
//! lookup, entitlement resolution and role policy evaluation. A successful pass yields
//! a [`GateContext`] and, per route, an [`AccessGrant`] carrying the only
//! organization token the data layer accepts.

pub mod audit;
pub mod auth;
pub mod context;
pub mod entitlements;
pub mod gate;
#[cfg(any(test, feature = "test-util"))]
pub mod memory;
pub mod membership;
pub mod navigation;
pub mod policy;
pub mod session;
pub mod store;
pub mod tenant_scope;

pub use audit::AuditRecorder;
pub use auth::{AuthProvider, ProviderSession, RotatedCredential};
pub use context::{ContextResolution, GateContext};
pub use entitlements::EntitlementResolver;
pub use gate::{AccessGrant, Gate};
pub use membership::{MembershipLookup, MembershipResolution};
pub use navigation::{NavItem, NavSection, NavigationTree};
pub use policy::{Action, DataScope, Decision, DenyReason, Narrowing, Resource, RoutePolicy, Verb};
pub use session::{Credentials, SessionResolver, SessionState};
pub use store::{
    AuditLogReader, AuditSink, EntitlementStore, GateStores, MembershipStore, OrganizationStore,
    ProjectAssignmentStore, ProjectFilter, ProjectStore,
};
pub use tenant_scope::ScopedOrganization;
