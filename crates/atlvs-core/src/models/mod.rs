//! Data models for the tenant access gate
//!
//! Each sub-module represents one entity of the tenancy model. Raw values that
//! arrive from storage as free-form text (roles, statuses) are parsed into closed
//! enums here, at the boundary.

mod audit;
mod entitlement;
mod identity;
mod membership;
mod organization;
mod project;
mod role;

pub use audit::*;
pub use entitlement::*;
pub use identity::*;
pub use membership::*;
pub use organization::*;
pub use project::*;
pub use role::*;
