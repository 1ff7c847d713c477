//! Role policy evaluation
//!
//! A pure function of (role, action, assignment count, entitlements, required
//! features). Route tables name actions as `<resource>.<verb>` strings; a name
//! that does not parse is a programmer error, logged at error level and denied.

use atlvs_core::models::{EffectiveEntitlements, Role};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Verb {
    View,
    Create,
    Edit,
    Delete,
    Manage,
}

impl Verb {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::View => "view",
            Verb::Create => "create",
            Verb::Edit => "edit",
            Verb::Delete => "delete",
            Verb::Manage => "manage",
        }
    }

    pub fn is_read(&self) -> bool {
        matches!(self, Verb::View)
    }
}

impl FromStr for Verb {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "view" => Ok(Verb::View),
            "create" => Ok(Verb::Create),
            "edit" => Ok(Verb::Edit),
            "delete" => Ok(Verb::Delete),
            "manage" => Ok(Verb::Manage),
            other => Err(format!("unknown verb: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Overview,
    Projects,
    People,
    Finance,
    Procurement,
    Assets,
    Marketplace,
    Analytics,
    Settings,
    Billing,
    AuditLog,
}

impl Resource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Overview => "overview",
            Resource::Projects => "projects",
            Resource::People => "people",
            Resource::Finance => "finance",
            Resource::Procurement => "procurement",
            Resource::Assets => "assets",
            Resource::Marketplace => "marketplace",
            Resource::Analytics => "analytics",
            Resource::Settings => "settings",
            Resource::Billing => "billing",
            Resource::AuditLog => "audit_log",
        }
    }
}

impl FromStr for Resource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "overview" => Ok(Resource::Overview),
            "projects" => Ok(Resource::Projects),
            "people" => Ok(Resource::People),
            "finance" => Ok(Resource::Finance),
            "procurement" => Ok(Resource::Procurement),
            "assets" => Ok(Resource::Assets),
            "marketplace" => Ok(Resource::Marketplace),
            "analytics" => Ok(Resource::Analytics),
            "settings" => Ok(Resource::Settings),
            "billing" => Ok(Resource::Billing),
            "audit_log" => Ok(Resource::AuditLog),
            other => Err(format!("unknown resource: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Action {
    pub resource: Resource,
    pub verb: Verb,
}

impl Action {
    pub fn new(resource: Resource, verb: Verb) -> Self {
        Self { resource, verb }
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (resource, verb) = s
            .split_once('.')
            .ok_or_else(|| format!("action must be <resource>.<verb>: {}", s))?;
        Ok(Action {
            resource: resource.parse()?,
            verb: verb.parse()?,
        })
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.resource.as_str(), self.verb.as_str())
    }
}

/// Which records of the organization an allowed caller may touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DataScope {
    Organization,
    AssignedProjects,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Narrowing {
    /// The whole view collapses to the overview resource.
    OverviewOnly,
    /// Only the "overview" child of the projects section is reachable.
    ProjectsOverviewOnly,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    MissingCapability,
    OverviewOnly,
    NoProjectAssignments,
    FeatureDisabled,
    UnknownAction,
}

impl DenyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenyReason::MissingCapability => "missing_capability",
            DenyReason::OverviewOnly => "overview_only",
            DenyReason::NoProjectAssignments => "no_project_assignments",
            DenyReason::FeatureDisabled => "feature_disabled",
            DenyReason::UnknownAction => "unknown_action",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow {
        scope: DataScope,
        narrowing: Option<Narrowing>,
    },
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow { .. })
    }
}

/// Policy attached to a route: the action it performs and, optionally, feature
/// flags of which at least one must be enabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePolicy {
    action: String,
    any_of_features: Vec<String>,
}

impl RoutePolicy {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            any_of_features: Vec::new(),
        }
    }

    /// Add a flag that can unlock the route. Several calls mean "any of".
    pub fn requires_feature(mut self, flag: impl Into<String>) -> Self {
        self.any_of_features.push(flag.into());
        self
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn features(&self) -> &[String] {
        &self.any_of_features
    }
}

/// Per-request facts the evaluator needs about the caller.
#[derive(Debug, Clone, Copy)]
pub struct PolicyInput<'a> {
    pub role: Role,
    pub assigned_projects: usize,
    pub entitlements: &'a EffectiveEntitlements,
}

/// Static role to capability table.
pub fn capability(role: Role, action: Action) -> Option<DataScope> {
    use DataScope::{AssignedProjects, Organization};
    use Resource::*;
    use Verb::*;

    let Action { resource, verb } = action;
    if (resource, verb) == (Overview, View) {
        return Some(Organization);
    }

    match role {
        Role::Owner | Role::Admin => Some(Organization),
        Role::Manager => match (resource, verb) {
            (Billing | AuditLog, _) => None,
            (Settings, View) => Some(Organization),
            (Settings, _) => None,
            _ => Some(Organization),
        },
        Role::Contributor | Role::Member => match (resource, verb) {
            (Projects | Assets | Procurement, View | Create | Edit) => Some(AssignedProjects),
            (People | Marketplace | Analytics | Settings, View) => Some(Organization),
            _ => None,
        },
        Role::TeamMember => match (resource, verb) {
            (Projects, View | Edit) => Some(AssignedProjects),
            (Assets, View) => Some(AssignedProjects),
            (Marketplace | Settings, View) => Some(Organization),
            _ => None,
        },
        Role::Viewer | Role::Client | Role::Vendor | Role::Partner => match (resource, verb) {
            (Projects | Assets, View) => Some(AssignedProjects),
            (Marketplace | Settings, View) => Some(Organization),
            _ => None,
        },
    }
}

pub fn evaluate(input: &PolicyInput<'_>, action: Action, any_of_features: &[String]) -> Decision {
    let Some(scope) = capability(input.role, action) else {
        return Decision::Deny(DenyReason::MissingCapability);
    };

    if !any_of_features.is_empty()
        && !any_of_features
            .iter()
            .any(|flag| input.entitlements.is_enabled(flag))
    {
        return Decision::Deny(DenyReason::FeatureDisabled);
    }

    if input.assigned_projects == 0 {
        if input.role.is_limited() {
            return if action.resource == Resource::Overview {
                Decision::Allow {
                    scope,
                    narrowing: Some(Narrowing::OverviewOnly),
                }
            } else {
                Decision::Deny(DenyReason::OverviewOnly)
            };
        }
        if !input.role.is_org_admin() && action.resource == Resource::Projects {
            return if action.verb.is_read() {
                Decision::Allow {
                    scope: DataScope::AssignedProjects,
                    narrowing: Some(Narrowing::ProjectsOverviewOnly),
                }
            } else {
                Decision::Deny(DenyReason::NoProjectAssignments)
            };
        }
    }

    Decision::Allow {
        scope,
        narrowing: None,
    }
}

/// Evaluate a route policy whose action is still a string.
pub fn evaluate_route(input: &PolicyInput<'_>, policy: &RoutePolicy) -> Decision {
    match policy.action().parse::<Action>() {
        Ok(action) => evaluate(input, action, policy.features()),
        Err(e) => {
            tracing::error!(action = %policy.action(), error = %e, "Unknown action in route policy");
            Decision::Deny(DenyReason::UnknownAction)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atlvs_core::feature_flags::{ADVANCED_DASHBOARDS, FEATURE_OPENDECK, UNIFIED_ANALYTICS};
    use std::collections::BTreeMap;

    const VERBS: [Verb; 5] = [Verb::View, Verb::Create, Verb::Edit, Verb::Delete, Verb::Manage];
    const RESOURCES: [Resource; 11] = [
        Resource::Overview,
        Resource::Projects,
        Resource::People,
        Resource::Finance,
        Resource::Procurement,
        Resource::Assets,
        Resource::Marketplace,
        Resource::Analytics,
        Resource::Settings,
        Resource::Billing,
        Resource::AuditLog,
    ];

    fn entitlements(enabled: &[&str]) -> EffectiveEntitlements {
        EffectiveEntitlements(
            enabled
                .iter()
                .map(|f| (f.to_string(), true))
                .collect::<BTreeMap<_, _>>(),
        )
    }

    fn input(role: Role, assigned: usize, ents: &EffectiveEntitlements) -> PolicyInput<'_> {
        PolicyInput {
            role,
            assigned_projects: assigned,
            entitlements: ents,
        }
    }

    fn act(s: &str) -> Action {
        s.parse().unwrap()
    }

    #[test]
    fn test_action_parse() {
        assert_eq!(act("audit_log.view"), Action::new(Resource::AuditLog, Verb::View));
        assert_eq!(act("projects.create").to_string(), "projects.create");
        assert!("projects".parse::<Action>().is_err());
        assert!("projects.fly".parse::<Action>().is_err());
        assert!("spaceships.view".parse::<Action>().is_err());
    }

    #[test]
    fn test_owner_and_admin_hold_every_capability() {
        for role in [Role::Owner, Role::Admin] {
            for resource in RESOURCES {
                for verb in VERBS {
                    assert_eq!(
                        capability(role, Action::new(resource, verb)),
                        Some(DataScope::Organization)
                    );
                }
            }
        }
    }

    #[test]
    fn test_manager_manages_projects_and_people_but_not_billing() {
        assert!(capability(Role::Manager, act("projects.manage")).is_some());
        assert!(capability(Role::Manager, act("people.manage")).is_some());
        assert!(capability(Role::Manager, act("billing.view")).is_none());
        assert!(capability(Role::Manager, act("audit_log.view")).is_none());
        assert!(capability(Role::Manager, act("settings.manage")).is_none());
    }

    #[test]
    fn test_contributor_writes_only_within_assignments() {
        assert_eq!(
            capability(Role::Contributor, act("projects.edit")),
            Some(DataScope::AssignedProjects)
        );
        assert!(capability(Role::Member, act("projects.delete")).is_none());
        assert!(capability(Role::Member, act("finance.view")).is_none());
    }

    #[test]
    fn test_read_only_roles_never_write() {
        for role in [Role::Viewer, Role::Client, Role::Vendor, Role::Partner] {
            for resource in RESOURCES {
                for verb in [Verb::Create, Verb::Edit, Verb::Delete, Verb::Manage] {
                    assert!(capability(role, Action::new(resource, verb)).is_none());
                }
            }
        }
    }

    #[test]
    fn test_overview_is_always_viewable() {
        let none = entitlements(&[]);
        for role in Role::ALL {
            for assigned in [0, 3] {
                assert!(evaluate(&input(role, assigned, &none), act("overview.view"), &[]).is_allowed());
            }
        }
    }

    #[test]
    fn test_limited_role_without_assignments_sees_only_overview() {
        let all = entitlements(&[FEATURE_OPENDECK, UNIFIED_ANALYTICS, ADVANCED_DASHBOARDS]);
        for role in Role::ALL.into_iter().filter(Role::is_limited) {
            for resource in RESOURCES {
                for verb in VERBS {
                    let decision = evaluate(&input(role, 0, &all), Action::new(resource, verb), &[]);
                    if decision.is_allowed() {
                        assert_eq!(resource, Resource::Overview, "{} {:?}", role, resource);
                        assert_eq!(
                            decision,
                            Decision::Allow {
                                scope: DataScope::Organization,
                                narrowing: Some(Narrowing::OverviewOnly)
                            }
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_limited_role_with_assignments_reads_assigned_projects() {
        let none = entitlements(&[]);
        assert_eq!(
            evaluate(&input(Role::Client, 2, &none), act("projects.view"), &[]),
            Decision::Allow {
                scope: DataScope::AssignedProjects,
                narrowing: None
            }
        );
        assert!(evaluate(&input(Role::TeamMember, 1, &none), act("projects.edit"), &[]).is_allowed());
        assert!(!evaluate(&input(Role::TeamMember, 1, &none), act("projects.create"), &[]).is_allowed());
    }

    #[test]
    fn test_manager_without_assignments_gets_projects_overview_only() {
        let none = entitlements(&[]);
        let manager = input(Role::Manager, 0, &none);
        assert_eq!(
            evaluate(&manager, act("projects.view"), &[]),
            Decision::Allow {
                scope: DataScope::AssignedProjects,
                narrowing: Some(Narrowing::ProjectsOverviewOnly)
            }
        );
        assert_eq!(
            evaluate(&manager, act("projects.create"), &[]),
            Decision::Deny(DenyReason::NoProjectAssignments)
        );
        assert_eq!(
            evaluate(&manager, act("billing.view"), &[]),
            Decision::Deny(DenyReason::MissingCapability)
        );
        // other sections are not narrowed
        assert!(evaluate(&manager, act("people.manage"), &[]).is_allowed());
    }

    #[test]
    fn test_admin_without_assignments_is_not_narrowed() {
        let none = entitlements(&[]);
        assert_eq!(
            evaluate(&input(Role::Admin, 0, &none), act("projects.create"), &[]),
            Decision::Allow {
                scope: DataScope::Organization,
                narrowing: None
            }
        );
    }

    #[test]
    fn test_feature_gate_denies_when_no_flag_enabled() {
        let policy = RoutePolicy::new("analytics.view")
            .requires_feature(ADVANCED_DASHBOARDS)
            .requires_feature(UNIFIED_ANALYTICS);

        let none = entitlements(&[]);
        assert_eq!(
            evaluate_route(&input(Role::Owner, 0, &none), &policy),
            Decision::Deny(DenyReason::FeatureDisabled)
        );

        let one = entitlements(&[UNIFIED_ANALYTICS]);
        assert!(evaluate_route(&input(Role::Owner, 0, &one), &policy).is_allowed());
    }

    #[test]
    fn test_unknown_action_is_denied() {
        let none = entitlements(&[]);
        let policy = RoutePolicy::new("projects.teleport");
        assert_eq!(
            evaluate_route(&input(Role::Owner, 5, &none), &policy),
            Decision::Deny(DenyReason::UnknownAction)
        );
    }
}
