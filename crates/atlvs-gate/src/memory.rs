//! In-memory stores for tests
//!
//! Mirrors the Postgres schema closely enough to exercise the gate, without its
//! constraints: duplicate memberships can be inserted on purpose. Every read of a
//! tenant-owned table is counted per organization so tests can assert that a
//! denied request touched nothing.

use crate::store::{
    AuditLogReader, AuditSink, EntitlementStore, GateStores, MembershipStore, OrganizationStore,
    ProjectAssignmentStore, ProjectFilter, ProjectStore,
};
use crate::tenant_scope::ScopedOrganization;
use async_trait::async_trait;
use atlvs_core::models::{
    AuditLogEntry, EntitlementRecord, Membership, MembershipStatus, MembershipSummary,
    NewAuditLogEntry, NewProject, Organization, Project, ProjectAssignment, ProjectStatus, Role,
};
use atlvs_core::AppError;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct State {
    organizations: Vec<Organization>,
    memberships: Vec<Membership>,
    organization_entitlements: HashMap<Uuid, EntitlementRecord>,
    user_entitlements: HashMap<Uuid, EntitlementRecord>,
    assignments: Vec<ProjectAssignment>,
    projects: Vec<Project>,
    audit: Vec<AuditLogEntry>,
    tenant_reads: HashMap<Uuid, usize>,
}

impl State {
    fn count_read(&mut self, organization_id: Uuid) {
        *self.tenant_reads.entry(organization_id).or_default() += 1;
    }
}

#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_organization(&self, name: &str) -> Uuid {
        let now = Utc::now();
        let organization = Organization {
            id: Uuid::new_v4(),
            name: name.to_string(),
            slug: name.trim().to_lowercase().replace(' ', "-"),
            created_at: now,
            updated_at: now,
        };
        let id = organization.id;
        self.state.write().await.organizations.push(organization);
        id
    }

    pub async fn add_membership(&self, organization_id: Uuid, user_id: Uuid, role: Role) -> Uuid {
        self.add_membership_at(
            organization_id,
            user_id,
            role,
            MembershipStatus::Active,
            Utc::now(),
        )
        .await
    }

    pub async fn add_membership_at(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        role: Role,
        status: MembershipStatus,
        created_at: DateTime<Utc>,
    ) -> Uuid {
        let membership = Membership {
            id: Uuid::new_v4(),
            organization_id,
            user_id,
            role,
            status,
            created_at,
            updated_at: created_at,
        };
        let id = membership.id;
        self.state.write().await.memberships.push(membership);
        id
    }

    pub async fn set_organization_entitlements(&self, organization_id: Uuid, flags: &[(&str, bool)]) {
        let record = to_record(organization_id, flags);
        self.state
            .write()
            .await
            .organization_entitlements
            .insert(organization_id, record);
    }

    pub async fn set_user_entitlements(&self, user_id: Uuid, flags: &[(&str, bool)]) {
        let record = to_record(user_id, flags);
        self.state
            .write()
            .await
            .user_entitlements
            .insert(user_id, record);
    }

    pub async fn add_project(&self, organization_id: Uuid, name: &str) -> Uuid {
        let now = Utc::now();
        let project = Project {
            id: Uuid::new_v4(),
            organization_id,
            name: name.to_string(),
            description: None,
            status: ProjectStatus::Active,
            created_by: None,
            created_at: now,
            updated_at: now,
        };
        let id = project.id;
        self.state.write().await.projects.push(project);
        id
    }

    pub async fn assign_project(&self, organization_id: Uuid, project_id: Uuid, user_id: Uuid) {
        self.state.write().await.assignments.push(ProjectAssignment {
            id: Uuid::new_v4(),
            organization_id,
            project_id,
            user_id,
            created_at: Utc::now(),
        });
    }

    pub async fn audit_entries(&self) -> Vec<AuditLogEntry> {
        self.state.read().await.audit.clone()
    }

    pub async fn projects_in(&self, organization_id: Uuid) -> Vec<Project> {
        self.state
            .read()
            .await
            .projects
            .iter()
            .filter(|p| p.organization_id == organization_id)
            .cloned()
            .collect()
    }

    /// Reads of tenant-owned tables scoped to `organization_id`.
    pub async fn tenant_reads(&self, organization_id: Uuid) -> usize {
        self.state
            .read()
            .await
            .tenant_reads
            .get(&organization_id)
            .copied()
            .unwrap_or(0)
    }
}

fn to_record(subject_id: Uuid, flags: &[(&str, bool)]) -> EntitlementRecord {
    let mut record = EntitlementRecord::new(subject_id);
    for (name, enabled) in flags {
        record = record.with_flag(*name, *enabled);
    }
    record.updated_at = Some(Utc::now());
    record
}

#[async_trait]
impl MembershipStore for InMemoryStore {
    async fn find_memberships(
        &self,
        user_id: Uuid,
        organization_id: Option<Uuid>,
    ) -> Result<Vec<Membership>, AppError> {
        let state = self.state.read().await;
        Ok(state
            .memberships
            .iter()
            .filter(|m| m.user_id == user_id)
            .filter(|m| organization_id.map_or(true, |org| m.organization_id == org))
            .cloned()
            .collect())
    }

    async fn membership_summaries(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<MembershipSummary>, AppError> {
        let state = self.state.read().await;
        let mut active: Vec<&Membership> = state
            .memberships
            .iter()
            .filter(|m| m.user_id == user_id && m.is_active())
            .collect();
        active.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        Ok(active
            .into_iter()
            .filter_map(|m| {
                state
                    .organizations
                    .iter()
                    .find(|o| o.id == m.organization_id)
                    .map(|o| MembershipSummary {
                        organization_id: o.id,
                        organization_name: o.name.clone(),
                        organization_slug: o.slug.clone(),
                        role: m.role,
                        joined_at: m.created_at,
                    })
            })
            .collect())
    }
}

#[async_trait]
impl EntitlementStore for InMemoryStore {
    async fn organization_entitlements(
        &self,
        organization_id: Uuid,
    ) -> Result<Option<EntitlementRecord>, AppError> {
        let mut state = self.state.write().await;
        state.count_read(organization_id);
        Ok(state.organization_entitlements.get(&organization_id).cloned())
    }

    async fn user_entitlements(
        &self,
        user_id: Uuid,
    ) -> Result<Option<EntitlementRecord>, AppError> {
        Ok(self.state.read().await.user_entitlements.get(&user_id).cloned())
    }
}

#[async_trait]
impl ProjectAssignmentStore for InMemoryStore {
    async fn assigned_project_ids(
        &self,
        organization: &ScopedOrganization,
        user_id: Uuid,
    ) -> Result<Vec<Uuid>, AppError> {
        let mut state = self.state.write().await;
        state.count_read(organization.id());
        Ok(state
            .assignments
            .iter()
            .filter(|a| a.organization_id == organization.id() && a.user_id == user_id)
            .map(|a| a.project_id)
            .collect())
    }
}

#[async_trait]
impl ProjectStore for InMemoryStore {
    async fn list_projects(
        &self,
        organization: &ScopedOrganization,
        filter: &ProjectFilter,
    ) -> Result<Vec<Project>, AppError> {
        let mut state = self.state.write().await;
        state.count_read(organization.id());
        let mut projects: Vec<Project> = state
            .projects
            .iter()
            .filter(|p| p.organization_id == organization.id() && filter.admits(p.id))
            .cloned()
            .collect();
        projects.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(projects)
    }

    async fn create_project(
        &self,
        organization: &ScopedOrganization,
        project: NewProject,
        assign_creator: bool,
    ) -> Result<Project, AppError> {
        let now = Utc::now();
        let created = Project {
            id: Uuid::new_v4(),
            organization_id: organization.id(),
            name: project.name,
            description: project.description,
            status: project.status,
            created_by: Some(project.created_by),
            created_at: now,
            updated_at: now,
        };
        let mut state = self.state.write().await;
        state.projects.push(created.clone());
        if assign_creator {
            state.assignments.push(ProjectAssignment {
                id: Uuid::new_v4(),
                organization_id: organization.id(),
                project_id: created.id,
                user_id: project.created_by,
                created_at: now,
            });
        }
        Ok(created)
    }
}

#[async_trait]
impl OrganizationStore for InMemoryStore {
    async fn get_organization(
        &self,
        organization: &ScopedOrganization,
    ) -> Result<Option<Organization>, AppError> {
        let mut state = self.state.write().await;
        state.count_read(organization.id());
        Ok(state
            .organizations
            .iter()
            .find(|o| o.id == organization.id())
            .cloned())
    }

    async fn count_active_members(
        &self,
        organization: &ScopedOrganization,
    ) -> Result<i64, AppError> {
        let mut state = self.state.write().await;
        state.count_read(organization.id());
        let count = state
            .memberships
            .iter()
            .filter(|m| m.organization_id == organization.id() && m.is_active())
            .count();
        Ok(count as i64)
    }
}

#[async_trait]
impl AuditSink for InMemoryStore {
    async fn append(&self, entry: NewAuditLogEntry) -> Result<(), AppError> {
        self.state
            .write()
            .await
            .audit
            .push(entry.into_entry(Uuid::new_v4()));
        Ok(())
    }
}

#[async_trait]
impl AuditLogReader for InMemoryStore {
    async fn recent_entries(
        &self,
        organization: &ScopedOrganization,
        limit: i64,
    ) -> Result<Vec<AuditLogEntry>, AppError> {
        let mut state = self.state.write().await;
        state.count_read(organization.id());
        let mut entries: Vec<AuditLogEntry> = state
            .audit
            .iter()
            .filter(|e| e.organization_id == organization.id())
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));
        entries.truncate(limit.max(0) as usize);
        Ok(entries)
    }
}

/// Sink that always fails, for asserting that audit failures stay contained.
pub struct FailingAuditSink;

#[async_trait]
impl AuditSink for FailingAuditSink {
    async fn append(&self, _entry: NewAuditLogEntry) -> Result<(), AppError> {
        Err(AppError::Infrastructure("audit sink unavailable".to_string()))
    }
}

impl GateStores {
    /// Every store backed by the same in-memory instance.
    pub fn in_memory(store: Arc<InMemoryStore>) -> Self {
        Self {
            memberships: store.clone(),
            entitlements: store.clone(),
            assignments: store.clone(),
            projects: store.clone(),
            organizations: store.clone(),
            audit_sink: store.clone(),
            audit_log: store,
        }
    }

    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit_sink = sink;
        self
    }
}
