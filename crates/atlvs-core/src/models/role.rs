use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use utoipa::ToSchema;

/// Membership role.
///
/// Roles are stored as free-form text. [`Role::parse`] is total: anything it does
/// not recognise becomes [`Role::Viewer`], the most restrictive role.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Owner,
    Admin,
    Manager,
    Contributor,
    Member,
    Viewer,
    TeamMember,
    Client,
    Vendor,
    Partner,
}

impl Role {
    pub const ALL: [Role; 10] = [
        Role::Owner,
        Role::Admin,
        Role::Manager,
        Role::Contributor,
        Role::Member,
        Role::Viewer,
        Role::TeamMember,
        Role::Client,
        Role::Vendor,
        Role::Partner,
    ];

    /// Parse a raw role string. Case, surrounding whitespace and `-`/space
    /// separators are ignored; unknown values map to `Viewer`.
    pub fn parse(raw: &str) -> Role {
        Self::try_parse(raw).unwrap_or(Role::Viewer)
    }

    /// Strict variant of [`Role::parse`], used where the caller wants to know
    /// that normalization happened.
    pub fn try_parse(raw: &str) -> Option<Role> {
        let normalized = raw.trim().to_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "owner" => Some(Role::Owner),
            "admin" => Some(Role::Admin),
            "manager" => Some(Role::Manager),
            "contributor" => Some(Role::Contributor),
            "member" => Some(Role::Member),
            "viewer" => Some(Role::Viewer),
            "team_member" => Some(Role::TeamMember),
            "client" => Some(Role::Client),
            "vendor" => Some(Role::Vendor),
            "partner" => Some(Role::Partner),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Contributor => "contributor",
            Role::Member => "member",
            Role::Viewer => "viewer",
            Role::TeamMember => "team_member",
            Role::Client => "client",
            Role::Vendor => "vendor",
            Role::Partner => "partner",
        }
    }

    /// Owner and admin hold every capability across the organization.
    pub fn is_org_admin(&self) -> bool {
        matches!(self, Role::Owner | Role::Admin)
    }

    /// Roles whose whole view collapses to "overview" without project assignments.
    pub fn is_limited(&self) -> bool {
        matches!(
            self,
            Role::TeamMember | Role::Viewer | Role::Client | Role::Vendor | Role::Partner
        )
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}
