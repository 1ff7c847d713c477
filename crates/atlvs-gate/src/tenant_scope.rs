//! Tenant scope token
//!
//! [`ScopedOrganization`] is the only way to name an organization to the data
//! layer. It can only be minted inside this crate, after membership lookup has
//! confirmed the caller is an active member, so an organization id taken from
//! request input cannot reach a store without that cross-check.

use serde::Serialize;
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ScopedOrganization(Uuid);

impl ScopedOrganization {
    pub(crate) fn new(organization_id: Uuid) -> Self {
        Self(organization_id)
    }

    pub fn id(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for ScopedOrganization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
