//! The composed gate
//!
//! request → session → membership → entitlements → policy → grant.
//! Handlers receive an [`AccessGrant`] and pass its organization token and
//! project filter to the stores; nothing else can scope a query.

use crate::audit::AuditRecorder;
use crate::auth::AuthProvider;
use crate::context::{ContextResolution, GateContext};
use crate::entitlements::EntitlementResolver;
use crate::membership::{MembershipLookup, MembershipResolution};
use crate::navigation::{NavSection, NavigationTree};
use crate::policy::{evaluate_route, DataScope, Decision, DenyReason, Narrowing, RoutePolicy};
use crate::session::{Credentials, SessionResolver, SessionState};
use crate::store::{GateStores, ProjectAssignmentStore, ProjectFilter};
use crate::tenant_scope::ScopedOrganization;
use atlvs_core::models::{AuditOutcome, Identity, MembershipSummary, NewAuditLogEntry};
use atlvs_core::{AppError, FeatureFlagRegistry};
use std::net::IpAddr;
use std::sync::Arc;
use uuid::Uuid;

/// Permission to run one action, scoped to one organization.
#[derive(Debug, Clone)]
pub struct AccessGrant {
    action: String,
    scope: DataScope,
    narrowing: Option<Narrowing>,
    organization: ScopedOrganization,
    filter: ProjectFilter,
}

impl AccessGrant {
    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn scope(&self) -> DataScope {
        self.scope
    }

    pub fn narrowing(&self) -> Option<Narrowing> {
        self.narrowing
    }

    pub fn organization(&self) -> &ScopedOrganization {
        &self.organization
    }

    /// Rows of project-bound tables the grant admits.
    pub fn project_filter(&self) -> &ProjectFilter {
        &self.filter
    }

    /// Records created under an assignment-scoped grant are assigned to their
    /// creator, otherwise the creator could not see them.
    pub fn assigns_creator(&self) -> bool {
        self.scope == DataScope::AssignedProjects
    }
}

fn resource_of(action: &str) -> &str {
    action.split_once('.').map_or(action, |(resource, _)| resource)
}

fn verb_of(action: &str) -> &str {
    action.split_once('.').map_or(action, |(_, verb)| verb)
}

pub struct Gate {
    sessions: SessionResolver,
    memberships: MembershipLookup,
    entitlements: EntitlementResolver,
    assignments: Arc<dyn ProjectAssignmentStore>,
    navigation: NavigationTree,
    audit: AuditRecorder,
}

impl Gate {
    pub fn new(
        provider: Arc<dyn AuthProvider>,
        stores: &GateStores,
        registry: Arc<FeatureFlagRegistry>,
        audit_enabled: bool,
    ) -> Self {
        Self {
            sessions: SessionResolver::new(provider),
            memberships: MembershipLookup::new(stores.memberships.clone()),
            entitlements: EntitlementResolver::new(stores.entitlements.clone(), registry),
            assignments: stores.assignments.clone(),
            navigation: NavigationTree::standard(),
            audit: AuditRecorder::new(stores.audit_sink.clone(), audit_enabled),
        }
    }

    pub fn with_navigation(mut self, navigation: NavigationTree) -> Self {
        self.navigation = navigation;
        self
    }

    pub fn navigation_tree(&self) -> &NavigationTree {
        &self.navigation
    }

    pub fn audit(&self) -> &AuditRecorder {
        &self.audit
    }

    pub async fn resolve_session(&self, credentials: &Credentials) -> Result<SessionState, AppError> {
        self.sessions.resolve(credentials).await
    }

    /// Build the request context for an authenticated identity.
    ///
    /// An explicitly requested organization the caller is not an active member
    /// of is `Forbidden`, and nothing belonging to it is read. A caller without
    /// any active membership gets `NoMembership`, whatever was requested.
    #[tracing::instrument(skip(self, identity), fields(user_id = %identity.id))]
    pub async fn resolve_context(
        &self,
        identity: &Identity,
        requested_organization: Option<Uuid>,
    ) -> Result<ContextResolution, AppError> {
        let membership = match self
            .memberships
            .resolve(identity, requested_organization)
            .await?
        {
            MembershipResolution::Found(membership) => membership,
            MembershipResolution::NoMembership => {
                return match requested_organization {
                    Some(_) if !self.has_any_membership(identity).await? => {
                        Ok(ContextResolution::NoMembership)
                    }
                    Some(organization_id) => {
                        tracing::warn!(
                            user_id = %identity.id,
                            organization_id = %organization_id,
                            "Cross-tenant request rejected"
                        );
                        Err(AppError::Forbidden(format!(
                            "user {} is not an active member of organization {}",
                            identity.id, organization_id
                        )))
                    }
                    None => Ok(ContextResolution::NoMembership),
                };
            }
        };

        let organization = ScopedOrganization::new(membership.organization_id);
        let entitlements = self
            .entitlements
            .resolve(organization.id(), Some(identity.id))
            .await?;
        let assigned = self
            .assignments
            .assigned_project_ids(&organization, identity.id)
            .await?;

        Ok(ContextResolution::Resolved(Box::new(GateContext::new(
            identity.clone(),
            organization,
            membership.id,
            membership.role,
            entitlements,
            assigned,
        ))))
    }

    async fn has_any_membership(&self, identity: &Identity) -> Result<bool, AppError> {
        Ok(matches!(
            self.memberships.resolve(identity, None).await?,
            MembershipResolution::Found(_)
        ))
    }

    /// Authorize an API route. Denials are audited and returned as `Forbidden`.
    pub fn authorize(&self, ctx: &GateContext, policy: &RoutePolicy) -> Result<AccessGrant, AppError> {
        let decision = evaluate_route(&ctx.policy_input(), policy);
        self.grant_or_deny(ctx, policy.action(), decision)
    }

    /// Authorize a shell page by path. Unknown paths are `NotFound`.
    pub fn authorize_page(&self, ctx: &GateContext, path: &str) -> Result<AccessGrant, AppError> {
        let route = self
            .navigation
            .route(path)
            .ok_or_else(|| AppError::NotFound(format!("No page at {}", path)))?;
        let decision = self.navigation.authorize(&ctx.policy_input(), &route);
        self.grant_or_deny(ctx, route.policy().action(), decision)
    }

    pub fn navigation(&self, ctx: &GateContext) -> Vec<NavSection> {
        self.navigation.resolve(&ctx.policy_input())
    }

    pub async fn organizations(&self, identity: &Identity) -> Result<Vec<MembershipSummary>, AppError> {
        self.memberships.list(identity).await
    }

    /// Audit the outcome of a granted operation.
    pub fn record(
        &self,
        ctx: &GateContext,
        grant: &AccessGrant,
        outcome: AuditOutcome,
        resource_id: Option<Uuid>,
        client_ip: Option<IpAddr>,
    ) {
        let mut entry = NewAuditLogEntry::new(
            ctx.org_id,
            verb_of(grant.action()),
            resource_of(grant.action()),
            outcome,
        )
        .with_actor_id(ctx.user.id)
        .with_detail("role", ctx.role.as_str());
        if let Some(id) = resource_id {
            entry = entry.with_resource_id(id);
        }
        if let Some(ip) = client_ip {
            entry = entry.with_detail("client_ip", ip.to_string());
        }
        self.audit.record(entry);
    }

    fn grant_or_deny(
        &self,
        ctx: &GateContext,
        action: &str,
        decision: Decision,
    ) -> Result<AccessGrant, AppError> {
        match decision {
            Decision::Allow { scope, narrowing } => {
                let filter = match scope {
                    DataScope::Organization => ProjectFilter::All,
                    DataScope::AssignedProjects => {
                        ProjectFilter::Only(ctx.assigned_project_ids.clone())
                    }
                };
                Ok(AccessGrant {
                    action: action.to_string(),
                    scope,
                    narrowing,
                    organization: *ctx.organization(),
                    filter,
                })
            }
            Decision::Deny(reason) => {
                self.audit.record(
                    NewAuditLogEntry::new(
                        ctx.org_id,
                        verb_of(action),
                        resource_of(action),
                        AuditOutcome::Denied,
                    )
                    .with_actor_id(ctx.user.id)
                    .with_detail("role", ctx.role.as_str())
                    .with_detail("reason", reason.as_str()),
                );
                Err(AppError::Forbidden(deny_message(ctx, action, &reason)))
            }
        }
    }
}

fn deny_message(ctx: &GateContext, action: &str, reason: &DenyReason) -> String {
    format!(
        "{} denied for role {} in organization {}: {}",
        action,
        ctx.role,
        ctx.org_id,
        reason.as_str()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{ProviderSession, RotatedCredential};
    use crate::memory::{FailingAuditSink, InMemoryStore};
    use async_trait::async_trait;
    use atlvs_core::feature_flags::FEATURE_OPENDECK;
    use atlvs_core::models::Role;

    struct NoAuth;

    #[async_trait]
    impl AuthProvider for NoAuth {
        async fn get_session(&self, _token: &str) -> Result<ProviderSession, AppError> {
            Ok(ProviderSession::Invalid)
        }

        async fn refresh(
            &self,
            _token: &str,
        ) -> Result<Option<(Identity, RotatedCredential)>, AppError> {
            Ok(None)
        }
    }

    fn gate(stores: &GateStores) -> Gate {
        Gate::new(
            Arc::new(NoAuth),
            stores,
            Arc::new(FeatureFlagRegistry::builtin()),
            true,
        )
    }

    async fn resolved(gate: &Gate, identity: &Identity, org: Option<Uuid>) -> GateContext {
        match gate.resolve_context(identity, org).await.unwrap() {
            ContextResolution::Resolved(ctx) => *ctx,
            ContextResolution::NoMembership => panic!("expected a membership"),
        }
    }

    #[tokio::test]
    async fn test_cross_tenant_request_is_forbidden_without_reads() {
        let store = Arc::new(InMemoryStore::new());
        let mine = store.add_organization("Mine").await;
        let theirs = store.add_organization("Theirs").await;
        store.add_project(theirs, "Secret tour").await;
        let user = Identity::new(Uuid::new_v4(), "crew@example.com");
        store.add_membership(mine, user.id, Role::Owner).await;

        let gate = gate(&GateStores::in_memory(store.clone()));
        let err = gate.resolve_context(&user, Some(theirs)).await.unwrap_err();

        assert!(matches!(err, AppError::Forbidden(_)));
        assert_eq!(store.tenant_reads(theirs).await, 0);
    }

    #[tokio::test]
    async fn test_no_membership_is_an_outcome_not_an_error() {
        let store = Arc::new(InMemoryStore::new());
        let gate = gate(&GateStores::in_memory(store));
        let user = Identity::new(Uuid::new_v4(), "new@example.com");
        assert!(matches!(
            gate.resolve_context(&user, None).await.unwrap(),
            ContextResolution::NoMembership
        ));
    }

    #[tokio::test]
    async fn test_requested_org_without_any_membership_is_no_membership() {
        let store = Arc::new(InMemoryStore::new());
        let elsewhere = store.add_organization("Elsewhere").await;
        let gate = gate(&GateStores::in_memory(store.clone()));
        let user = Identity::new(Uuid::new_v4(), "new@example.com");

        for requested in [elsewhere, Uuid::new_v4()] {
            assert!(matches!(
                gate.resolve_context(&user, Some(requested)).await.unwrap(),
                ContextResolution::NoMembership
            ));
        }
        assert_eq!(store.tenant_reads(elsewhere).await, 0);
    }

    #[tokio::test]
    async fn test_admin_opendeck_from_user_level_flag() {
        let store = Arc::new(InMemoryStore::new());
        let org = store.add_organization("O1").await;
        let user = Identity::new(Uuid::new_v4(), "u2@example.com");
        store.add_membership(org, user.id, Role::Admin).await;
        store
            .set_organization_entitlements(org, &[(FEATURE_OPENDECK, false)])
            .await;
        store
            .set_user_entitlements(user.id, &[(FEATURE_OPENDECK, true)])
            .await;

        let gate = gate(&GateStores::in_memory(store));
        let ctx = resolved(&gate, &user, None).await;
        assert!(ctx.entitlements.is_enabled(FEATURE_OPENDECK));
        assert!(gate.authorize_page(&ctx, "/marketplace/listings").is_ok());
    }

    #[tokio::test]
    async fn test_assignment_scoped_grant_filters_projects() {
        let store = Arc::new(InMemoryStore::new());
        let org = store.add_organization("O1").await;
        let visible = store.add_project(org, "Visible").await;
        store.add_project(org, "Hidden").await;
        let user = Identity::new(Uuid::new_v4(), "client@example.com");
        store.add_membership(org, user.id, Role::Client).await;
        store.assign_project(org, visible, user.id).await;

        let gate = gate(&GateStores::in_memory(store));
        let ctx = resolved(&gate, &user, Some(org)).await;
        assert_eq!(ctx.projects_assigned_count, 1);

        let grant = gate
            .authorize(&ctx, &RoutePolicy::new("projects.view"))
            .unwrap();
        assert_eq!(grant.scope(), DataScope::AssignedProjects);
        assert_eq!(grant.project_filter(), &ProjectFilter::Only(vec![visible]));
        assert_eq!(grant.organization().id(), org);
    }

    #[tokio::test]
    async fn test_denial_is_audited() {
        let store = Arc::new(InMemoryStore::new());
        let org = store.add_organization("O1").await;
        let user = Identity::new(Uuid::new_v4(), "u1@example.com");
        store.add_membership(org, user.id, Role::Manager).await;

        let gate = gate(&GateStores::in_memory(store.clone()));
        let ctx = resolved(&gate, &user, None).await;
        let err = gate.authorize_page(&ctx, "/settings/billing").unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        // the append runs on a detached task
        for _ in 0..50 {
            if !store.audit_entries().await.is_empty() {
                break;
            }
            tokio::task::yield_now().await;
        }
        let entries = store.audit_entries().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].outcome, AuditOutcome::Denied);
        assert_eq!(entries[0].resource_type, "billing");
        assert_eq!(entries[0].detail["reason"], "missing_capability");
    }

    #[tokio::test]
    async fn test_failing_audit_sink_does_not_change_decisions() {
        let store = Arc::new(InMemoryStore::new());
        let org = store.add_organization("O1").await;
        let user = Identity::new(Uuid::new_v4(), "owner@example.com");
        store.add_membership(org, user.id, Role::Owner).await;

        let healthy = gate(&GateStores::in_memory(store.clone()));
        let failing = gate(&GateStores::in_memory(store).with_audit_sink(Arc::new(FailingAuditSink)));

        for path in ["/dashboard", "/settings/billing", "/marketplace", "/nowhere"] {
            let a = resolved(&healthy, &user, None).await;
            let b = resolved(&failing, &user, None).await;
            let left = healthy.authorize_page(&a, path).map(|g| g.scope());
            let right = failing.authorize_page(&b, path).map(|g| g.scope());
            assert_eq!(
                left.as_ref().ok(),
                right.as_ref().ok(),
                "path {}",
                path
            );
            assert_eq!(left.is_err(), right.is_err());
        }
    }

    #[tokio::test]
    async fn test_unknown_page_is_not_found() {
        let store = Arc::new(InMemoryStore::new());
        let org = store.add_organization("O1").await;
        let user = Identity::new(Uuid::new_v4(), "owner@example.com");
        store.add_membership(org, user.id, Role::Owner).await;
        let gate = gate(&GateStores::in_memory(store));
        let ctx = resolved(&gate, &user, None).await;
        assert!(matches!(
            gate.authorize_page(&ctx, "/settings/nothing"),
            Err(AppError::NotFound(_))
        ));
    }
}
