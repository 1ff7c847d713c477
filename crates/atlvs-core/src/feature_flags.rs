//! Feature flag registry
//!
//! The set of flags the entitlement resolver knows about. Built once at startup
//! (from `FEATURE_FLAGS` or the built-in table) and injected into the gate; policy
//! code never carries its own list of flag names.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// Which entitlement level is allowed to grant a flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FlagScope {
    /// Only the organization row can grant the flag.
    Organization,
    /// Only the user row can grant the flag.
    User,
    /// Either row grants the flag (logical OR).
    Any,
}

impl FlagScope {
    pub fn consults_organization(self) -> bool {
        matches!(self, FlagScope::Organization | FlagScope::Any)
    }

    pub fn consults_user(self) -> bool {
        matches!(self, FlagScope::User | FlagScope::Any)
    }
}

impl FromStr for FlagScope {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "org" | "organization" => Ok(FlagScope::Organization),
            "user" => Ok(FlagScope::User),
            "any" | "both" => Ok(FlagScope::Any),
            other => Err(anyhow::anyhow!("Unknown feature flag scope: {}", other)),
        }
    }
}

impl fmt::Display for FlagScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlagScope::Organization => write!(f, "organization"),
            FlagScope::User => write!(f, "user"),
            FlagScope::Any => write!(f, "any"),
        }
    }
}

/// A single known flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FeatureFlagDefinition {
    pub name: String,
    pub scope: FlagScope,
    /// Value used when an entitlement row exists but does not mention the flag.
    /// A missing row is always treated as all-false.
    pub default_enabled: bool,
}

impl FeatureFlagDefinition {
    pub fn new(name: impl Into<String>, scope: FlagScope, default_enabled: bool) -> Self {
        Self {
            name: name.into(),
            scope,
            default_enabled,
        }
    }
}

/// Ordered, de-duplicated set of known feature flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureFlagRegistry {
    flags: Vec<FeatureFlagDefinition>,
}

pub const FEATURE_ATLVS: &str = "feature_atlvs";
pub const FEATURE_OPENDECK: &str = "feature_opendeck";
pub const FEATURE_GHXSTSHIP: &str = "feature_ghxstship";
pub const UNIFIED_ANALYTICS: &str = "unified-analytics";
pub const ADVANCED_DASHBOARDS: &str = "advanced-dashboards";

impl FeatureFlagRegistry {
    pub fn new(flags: Vec<FeatureFlagDefinition>) -> Result<Self, anyhow::Error> {
        let mut seen = std::collections::HashSet::new();
        for flag in &flags {
            if flag.name.trim().is_empty() {
                return Err(anyhow::anyhow!("Feature flag names must not be empty"));
            }
            if !seen.insert(flag.name.as_str()) {
                return Err(anyhow::anyhow!("Duplicate feature flag: {}", flag.name));
            }
        }
        Ok(Self { flags })
    }

    /// The product flags shipped with the application.
    pub fn builtin() -> Self {
        Self {
            flags: vec![
                FeatureFlagDefinition::new(FEATURE_ATLVS, FlagScope::Any, false),
                FeatureFlagDefinition::new(FEATURE_OPENDECK, FlagScope::Any, false),
                FeatureFlagDefinition::new(FEATURE_GHXSTSHIP, FlagScope::Any, false),
                FeatureFlagDefinition::new(UNIFIED_ANALYTICS, FlagScope::Any, false),
                FeatureFlagDefinition::new(ADVANCED_DASHBOARDS, FlagScope::Any, false),
            ],
        }
    }

    /// Parse `name[:scope[:default]]` entries separated by commas.
    ///
    /// Example: `feature_atlvs:any,unified-analytics:org:false`
    pub fn parse(spec: &str) -> Result<Self, anyhow::Error> {
        let mut flags = Vec::new();
        for entry in spec.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let mut parts = entry.split(':').map(str::trim);
            let name = parts.next().unwrap_or_default();
            let scope = match parts.next() {
                Some(s) if !s.is_empty() => s.parse()?,
                _ => FlagScope::Any,
            };
            let default_enabled = match parts.next() {
                Some(d) if !d.is_empty() => d.to_lowercase().parse::<bool>().map_err(|_| {
                    anyhow::anyhow!("Invalid default for feature flag {}: {}", name, d)
                })?,
                _ => false,
            };
            if parts.next().is_some() {
                return Err(anyhow::anyhow!(
                    "Feature flag entry has too many segments: {}",
                    entry
                ));
            }
            flags.push(FeatureFlagDefinition::new(name, scope, default_enabled));
        }
        if flags.is_empty() {
            return Err(anyhow::anyhow!("FEATURE_FLAGS must name at least one flag"));
        }
        Self::new(flags)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FeatureFlagDefinition> {
        self.flags.iter()
    }

    pub fn get(&self, name: &str) -> Option<&FeatureFlagDefinition> {
        self.flags.iter().find(|f| f.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }
}

impl Default for FeatureFlagRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
