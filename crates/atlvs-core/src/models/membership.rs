use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::Role;

/// Membership lifecycle. Memberships are never hard-deleted; `Removed` is terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MembershipStatus {
    Active,
    Invited,
    Suspended,
    Removed,
}

impl MembershipStatus {
    /// Unknown statuses are treated as `Suspended` so they never grant access.
    pub fn parse(raw: &str) -> MembershipStatus {
        match raw.trim().to_lowercase().as_str() {
            "active" => MembershipStatus::Active,
            "invited" | "pending" => MembershipStatus::Invited,
            "removed" => MembershipStatus::Removed,
            _ => MembershipStatus::Suspended,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipStatus::Active => "active",
            MembershipStatus::Invited => "invited",
            MembershipStatus::Suspended => "suspended",
            MembershipStatus::Removed => "removed",
        }
    }
}

/// Link between an identity and an organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Membership {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub user_id: Uuid,
    pub role: Role,
    pub status: MembershipStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Membership {
    pub fn is_active(&self) -> bool {
        self.status == MembershipStatus::Active
    }
}

/// Entry of the organization switcher.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MembershipSummary {
    pub organization_id: Uuid,
    pub organization_name: String,
    pub organization_slug: String,
    pub role: Role,
    pub joined_at: DateTime<Utc>,
}
