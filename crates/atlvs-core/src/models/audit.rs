//! Audit log model
//!
//! Append-only record of an access decision and the action taken.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Outcome of a gated operation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    /// The policy allowed the operation and it completed
    Allowed,
    /// The policy denied the operation
    Denied,
    /// The policy allowed the operation but it failed
    Failed,
}

impl AuditOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditOutcome::Allowed => "allowed",
            AuditOutcome::Denied => "denied",
            AuditOutcome::Failed => "failed",
        }
    }

    pub fn parse(raw: &str) -> Option<AuditOutcome> {
        match raw {
            "allowed" => Some(AuditOutcome::Allowed),
            "denied" => Some(AuditOutcome::Denied),
            "failed" => Some(AuditOutcome::Failed),
            _ => None,
        }
    }
}

/// Stored audit record
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub actor_id: Option<Uuid>,
    /// Verb that was attempted, e.g. `create`
    pub action: String,
    /// Resource the verb applied to, e.g. `projects`
    pub resource_type: String,
    pub resource_id: Option<Uuid>,
    pub outcome: AuditOutcome,
    #[schema(value_type = Object)]
    pub detail: serde_json::Value,
    pub occurred_at: DateTime<Utc>,
}

/// Audit record before it is persisted
#[derive(Debug, Clone, PartialEq)]
pub struct NewAuditLogEntry {
    pub organization_id: Uuid,
    pub actor_id: Option<Uuid>,
    pub action: String,
    pub resource_type: String,
    pub resource_id: Option<Uuid>,
    pub outcome: AuditOutcome,
    pub detail: serde_json::Value,
    pub occurred_at: DateTime<Utc>,
}

impl NewAuditLogEntry {
    pub fn new(
        organization_id: Uuid,
        action: impl Into<String>,
        resource_type: impl Into<String>,
        outcome: AuditOutcome,
    ) -> Self {
        Self {
            organization_id,
            actor_id: None,
            action: action.into(),
            resource_type: resource_type.into(),
            resource_id: None,
            outcome,
            detail: serde_json::Value::Object(serde_json::Map::new()),
            occurred_at: Utc::now(),
        }
    }

    /// Set the acting identity
    pub fn with_actor_id(mut self, actor_id: Uuid) -> Self {
        self.actor_id = Some(actor_id);
        self
    }

    /// Set the affected record
    pub fn with_resource_id(mut self, resource_id: Uuid) -> Self {
        self.resource_id = Some(resource_id);
        self
    }

    /// Add one key to the detail object
    pub fn with_detail(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        if let serde_json::Value::Object(ref mut map) = self.detail {
            map.insert(key.to_string(), value.into());
        }
        self
    }

    pub fn into_entry(self, id: Uuid) -> AuditLogEntry {
        AuditLogEntry {
            id,
            organization_id: self.organization_id,
            actor_id: self.actor_id,
            action: self.action,
            resource_type: self.resource_type,
            resource_id: self.resource_id,
            outcome: self.outcome,
            detail: self.detail,
            occurred_at: self.occurred_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_collects_detail() {
        let org = Uuid::new_v4();
        let actor = Uuid::new_v4();
        let entry = NewAuditLogEntry::new(org, "view", "billing", AuditOutcome::Denied)
            .with_actor_id(actor)
            .with_detail("role", "manager")
            .with_detail("reason", "capability");

        assert_eq!(entry.actor_id, Some(actor));
        assert_eq!(entry.detail["role"], "manager");
        assert_eq!(entry.detail["reason"], "capability");
        assert_eq!(entry.outcome.as_str(), "denied");
    }
}
