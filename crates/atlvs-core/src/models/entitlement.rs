use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;
use uuid::Uuid;

/// One entitlement row, at organization or user granularity.
///
/// `flags` is the raw JSON object stored alongside the subject. Names that the
/// feature flag registry does not know are carried but ignored by resolution.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntitlementRecord {
    pub subject_id: Uuid,
    pub flags: BTreeMap<String, bool>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl EntitlementRecord {
    pub fn new(subject_id: Uuid) -> Self {
        Self {
            subject_id,
            ..Default::default()
        }
    }

    pub fn with_flag(mut self, name: impl Into<String>, enabled: bool) -> Self {
        self.flags.insert(name.into(), enabled);
        self
    }
}

/// Effective `{flag: enabled}` map for every known flag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct EffectiveEntitlements(pub BTreeMap<String, bool>);

impl EffectiveEntitlements {
    /// Unknown flags are disabled.
    pub fn is_enabled(&self, flag: &str) -> bool {
        self.0.get(flag).copied().unwrap_or(false)
    }

    pub fn enabled_flags(&self) -> impl Iterator<Item = &str> {
        self.0
            .iter()
            .filter(|(_, enabled)| **enabled)
            .map(|(name, _)| name.as_str())
    }

    pub fn as_map(&self) -> &BTreeMap<String, bool> {
        &self.0
    }
}
