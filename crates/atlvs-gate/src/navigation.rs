//! Navigation tree
//!
//! A static table of sections and child routes, each naming its policy. The tree
//! doubles as the route table for shell pages: [`NavigationTree::route`] maps a
//! path back to its policy.

use crate::policy::{evaluate_route, Decision, DenyReason, Narrowing, PolicyInput, RoutePolicy};
use atlvs_core::feature_flags::{ADVANCED_DASHBOARDS, FEATURE_OPENDECK, UNIFIED_ANALYTICS};
use serde::Serialize;
use utoipa::ToSchema;

/// Id of the projects child that stays reachable without assignments.
pub const PROJECTS_OVERVIEW_CHILD: &str = "overview";

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct NavItem {
    pub id: String,
    pub label: String,
    pub href: String,
    #[serde(skip)]
    pub policy: RoutePolicy,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct NavSection {
    pub id: String,
    pub label: String,
    pub href: String,
    pub children: Vec<NavItem>,
    #[serde(skip)]
    pub policy: RoutePolicy,
}

/// Where a page path landed in the tree
#[derive(Debug, Clone, Copy)]
pub struct PageRoute<'a> {
    pub section: &'a NavSection,
    pub item: Option<&'a NavItem>,
}

impl PageRoute<'_> {
    pub fn policy(&self) -> &RoutePolicy {
        self.item.map_or(&self.section.policy, |item| &item.policy)
    }
}

fn item(id: &str, label: &str, href: &str, policy: RoutePolicy) -> NavItem {
    NavItem {
        id: id.to_string(),
        label: label.to_string(),
        href: href.to_string(),
        policy,
    }
}

fn section(id: &str, label: &str, href: &str, policy: RoutePolicy, children: Vec<NavItem>) -> NavSection {
    NavSection {
        id: id.to_string(),
        label: label.to_string(),
        href: href.to_string(),
        children,
        policy,
    }
}

#[derive(Debug, Clone)]
pub struct NavigationTree {
    sections: Vec<NavSection>,
}

impl NavigationTree {
    pub fn new(sections: Vec<NavSection>) -> Self {
        Self { sections }
    }

    /// The product navigation.
    pub fn standard() -> Self {
        let view = RoutePolicy::new;
        let marketplace = || RoutePolicy::new("marketplace.view").requires_feature(FEATURE_OPENDECK);
        let analytics = || {
            RoutePolicy::new("analytics.view")
                .requires_feature(ADVANCED_DASHBOARDS)
                .requires_feature(UNIFIED_ANALYTICS)
        };

        Self::new(vec![
            section("overview", "Overview", "/dashboard", view("overview.view"), vec![]),
            section(
                "projects",
                "Projects",
                "/projects",
                view("projects.view"),
                vec![
                    item(PROJECTS_OVERVIEW_CHILD, "Overview", "/projects/overview", view("projects.view")),
                    item("all", "All Projects", "/projects/all", view("projects.view")),
                    item("schedule", "Schedule", "/projects/schedule", view("projects.view")),
                    item("tasks", "Tasks", "/projects/tasks", view("projects.view")),
                    item("files", "Files", "/projects/files", view("projects.view")),
                ],
            ),
            section(
                "people",
                "People",
                "/people",
                view("people.view"),
                vec![
                    item("directory", "Directory", "/people/directory", view("people.view")),
                    item("roles", "Roles", "/people/roles", view("people.manage")),
                    item("invitations", "Invitations", "/people/invitations", view("people.create")),
                ],
            ),
            section(
                "finance",
                "Finance",
                "/finance",
                view("finance.view"),
                vec![
                    item("budgets", "Budgets", "/finance/budgets", view("finance.view")),
                    item("expenses", "Expenses", "/finance/expenses", view("finance.view")),
                    item("invoices", "Invoices", "/finance/invoices", view("finance.view")),
                ],
            ),
            section(
                "procurement",
                "Procurement",
                "/procurement",
                view("procurement.view"),
                vec![
                    item("orders", "Orders", "/procurement/orders", view("procurement.view")),
                    item("vendors", "Vendors", "/procurement/vendors", view("procurement.view")),
                ],
            ),
            section(
                "assets",
                "Assets",
                "/assets",
                view("assets.view"),
                vec![
                    item("inventory", "Inventory", "/assets/inventory", view("assets.view")),
                    item("maintenance", "Maintenance", "/assets/maintenance", view("assets.edit")),
                ],
            ),
            section(
                "marketplace",
                "Marketplace",
                "/marketplace",
                marketplace(),
                vec![
                    item("listings", "Listings", "/marketplace/listings", marketplace()),
                    item("proposals", "Proposals", "/marketplace/proposals", marketplace()),
                ],
            ),
            section(
                "analytics",
                "Analytics",
                "/analytics",
                analytics(),
                vec![
                    item("dashboards", "Dashboards", "/analytics/dashboards", analytics()),
                    item("reports", "Reports", "/analytics/reports", analytics()),
                ],
            ),
            section(
                "settings",
                "Settings",
                "/settings",
                view("settings.view"),
                vec![
                    item("account", "Account", "/settings/account", view("settings.view")),
                    item("organization", "Organization", "/settings/organization", view("settings.manage")),
                    item("team", "Team", "/settings/team", view("people.manage")),
                    item("billing", "Billing", "/settings/billing", view("billing.view")),
                    item("audit-log", "Audit Log", "/settings/audit-log", view("audit_log.view")),
                ],
            ),
        ])
    }

    pub fn sections(&self) -> &[NavSection] {
        &self.sections
    }

    /// Look up the section or child whose `href` is `path`.
    pub fn route(&self, path: &str) -> Option<PageRoute<'_>> {
        let path = match path.trim_end_matches('/') {
            "" => "/",
            trimmed => trimmed,
        };
        self.sections.iter().find_map(|section| {
            if section.href == path {
                return Some(PageRoute {
                    section,
                    item: None,
                });
            }
            section
                .children
                .iter()
                .find(|child| child.href == path)
                .map(|child| PageRoute {
                    section,
                    item: Some(child),
                })
        })
    }

    /// Decide whether a page route is reachable.
    ///
    /// Under [`Narrowing::ProjectsOverviewOnly`] only the projects section root and
    /// its overview child pass.
    pub fn authorize(&self, input: &PolicyInput<'_>, route: &PageRoute<'_>) -> Decision {
        let decision = evaluate_route(input, route.policy());
        if let Decision::Allow {
            narrowing: Some(Narrowing::ProjectsOverviewOnly),
            ..
        } = decision
        {
            if route
                .item
                .is_some_and(|item| item.id != PROJECTS_OVERVIEW_CHILD)
            {
                return Decision::Deny(DenyReason::NoProjectAssignments);
            }
        }
        decision
    }

    /// The tree filtered for one caller.
    ///
    /// A section is kept when its own policy allows it and, if it has children, at
    /// least one child survives.
    pub fn resolve(&self, input: &PolicyInput<'_>) -> Vec<NavSection> {
        self.sections
            .iter()
            .filter_map(|section| {
                let decision = evaluate_route(input, &section.policy);
                let Decision::Allow { narrowing, .. } = decision else {
                    return None;
                };

                let children: Vec<NavItem> = section
                    .children
                    .iter()
                    .filter(|child| {
                        if narrowing == Some(Narrowing::ProjectsOverviewOnly)
                            && child.id != PROJECTS_OVERVIEW_CHILD
                        {
                            return false;
                        }
                        evaluate_route(input, &child.policy).is_allowed()
                    })
                    .cloned()
                    .collect();

                if !section.children.is_empty() && children.is_empty() {
                    return None;
                }
                Some(NavSection {
                    children,
                    ..section.clone()
                })
            })
            .collect()
    }
}

impl Default for NavigationTree {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atlvs_core::models::{EffectiveEntitlements, Role};

    fn ids(sections: &[NavSection]) -> Vec<&str> {
        sections.iter().map(|s| s.id.as_str()).collect()
    }

    fn input(role: Role, assigned: usize, ents: &EffectiveEntitlements) -> PolicyInput<'_> {
        PolicyInput {
            role,
            assigned_projects: assigned,
            entitlements: ents,
        }
    }

    fn flags(enabled: &[&str]) -> EffectiveEntitlements {
        EffectiveEntitlements(enabled.iter().map(|f| (f.to_string(), true)).collect())
    }

    #[test]
    fn test_every_policy_in_the_tree_parses() {
        let tree = NavigationTree::standard();
        for section in tree.sections() {
            assert!(section.policy.action().parse::<crate::policy::Action>().is_ok());
            for child in &section.children {
                assert!(child.policy.action().parse::<crate::policy::Action>().is_ok());
                assert!(child.href.starts_with(&section.href));
            }
        }
    }

    #[test]
    fn test_manager_without_assignments_sees_projects_overview_only() {
        let tree = NavigationTree::standard();
        let ents = flags(&[]);
        let nav = tree.resolve(&input(Role::Manager, 0, &ents));

        let projects = nav.iter().find(|s| s.id == "projects").unwrap();
        let children: Vec<&str> = projects.children.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(children, vec![PROJECTS_OVERVIEW_CHILD]);

        let settings = nav.iter().find(|s| s.id == "settings").unwrap();
        assert!(settings.children.iter().all(|c| c.id != "billing"));
        assert!(!ids(&nav).contains(&"marketplace"));
    }

    #[test]
    fn test_limited_role_without_assignments_sees_only_overview() {
        let tree = NavigationTree::standard();
        let ents = flags(&[FEATURE_OPENDECK, ADVANCED_DASHBOARDS]);
        for role in [Role::Viewer, Role::Client, Role::Vendor, Role::Partner, Role::TeamMember] {
            let nav = tree.resolve(&input(role, 0, &ents));
            assert_eq!(ids(&nav), vec!["overview"], "role {}", role);
        }
    }

    #[test]
    fn test_owner_sees_feature_sections_only_when_enabled() {
        let tree = NavigationTree::standard();
        let none = flags(&[]);
        let nav = tree.resolve(&input(Role::Owner, 0, &none));
        assert!(!ids(&nav).contains(&"marketplace"));
        assert!(!ids(&nav).contains(&"analytics"));

        let enabled = flags(&[FEATURE_OPENDECK, UNIFIED_ANALYTICS]);
        let nav = tree.resolve(&input(Role::Owner, 0, &enabled));
        assert!(ids(&nav).contains(&"marketplace"));
        assert!(ids(&nav).contains(&"analytics"));
        let projects = nav.iter().find(|s| s.id == "projects").unwrap();
        assert_eq!(projects.children.len(), 5);
    }

    #[test]
    fn test_route_lookup_and_authorize() {
        let tree = NavigationTree::standard();
        let ents = flags(&[]);
        let manager = input(Role::Manager, 0, &ents);

        let billing = tree.route("/settings/billing").unwrap();
        assert_eq!(billing.policy().action(), "billing.view");
        assert!(!tree.authorize(&manager, &billing).is_allowed());

        let overview = tree.route("/projects/overview/").unwrap();
        assert!(tree.authorize(&manager, &overview).is_allowed());
        let root = tree.route("/projects").unwrap();
        assert!(tree.authorize(&manager, &root).is_allowed());
        let all = tree.route("/projects/all").unwrap();
        assert_eq!(
            tree.authorize(&manager, &all),
            Decision::Deny(DenyReason::NoProjectAssignments)
        );

        assert!(tree.route("/nowhere").is_none());
    }
}
