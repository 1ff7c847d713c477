use crate::db::transaction::begin_scoped;
use async_trait::async_trait;
use atlvs_core::models::{NewProject, Project, ProjectStatus};
use atlvs_core::AppError;
use atlvs_gate::{ProjectAssignmentStore, ProjectFilter, ProjectStore, ScopedOrganization};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres};
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
struct ProjectRow {
    id: Uuid,
    organization_id: Uuid,
    name: String,
    description: Option<String>,
    status: String,
    created_by: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProjectRow> for Project {
    fn from(row: ProjectRow) -> Self {
        let status = ProjectStatus::parse(&row.status).unwrap_or_else(|| {
            tracing::warn!(project_id = %row.id, status = %row.status, "Unknown project status");
            ProjectStatus::Planning
        });
        Project {
            id: row.id,
            organization_id: row.organization_id,
            name: row.name,
            description: row.description,
            status,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Clone)]
pub struct ProjectRepository {
    pool: PgPool,
}

impl ProjectRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProjectStore for ProjectRepository {
    #[tracing::instrument(skip(self, filter), fields(db.table = "projects", db.operation = "select", organization_id = %organization))]
    async fn list_projects(
        &self,
        organization: &ScopedOrganization,
        filter: &ProjectFilter,
    ) -> Result<Vec<Project>, AppError> {
        let only: Option<Vec<Uuid>> = match filter {
            ProjectFilter::All => None,
            ProjectFilter::Only(ids) if ids.is_empty() => return Ok(Vec::new()),
            ProjectFilter::Only(ids) => Some(ids.clone()),
        };

        let mut tx = begin_scoped(&self.pool, organization).await?;
        let rows = sqlx::query_as::<Postgres, ProjectRow>(
            r#"
            SELECT id, organization_id, name, description, status, created_by, created_at, updated_at
            FROM projects
            WHERE organization_id = $1
              AND ($2::uuid[] IS NULL OR id = ANY($2))
            ORDER BY created_at DESC
            "#,
        )
        .bind(organization.id())
        .bind(only)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, organization_id = %organization, "Failed to list projects");
            AppError::Database(e)
        })?;
        tx.commit().await.map_err(AppError::Database)?;

        Ok(rows.into_iter().map(Project::from).collect())
    }

    #[tracing::instrument(skip(self, project), fields(db.table = "projects", db.operation = "insert", organization_id = %organization))]
    async fn create_project(
        &self,
        organization: &ScopedOrganization,
        project: NewProject,
        assign_creator: bool,
    ) -> Result<Project, AppError> {
        let mut tx = begin_scoped(&self.pool, organization).await?;

        let row = sqlx::query_as::<Postgres, ProjectRow>(
            r#"
            INSERT INTO projects (organization_id, name, description, status, created_by)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, organization_id, name, description, status, created_by, created_at, updated_at
            "#,
        )
        .bind(organization.id())
        .bind(&project.name)
        .bind(&project.description)
        .bind(project.status.as_str())
        .bind(project.created_by)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, organization_id = %organization, "Failed to create project");
            AppError::Database(e)
        })?;

        if assign_creator {
            sqlx::query(
                r#"
                INSERT INTO project_members (organization_id, project_id, user_id)
                VALUES ($1, $2, $3)
                ON CONFLICT (project_id, user_id) DO NOTHING
                "#,
            )
            .bind(organization.id())
            .bind(row.id)
            .bind(project.created_by)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, project_id = %row.id, "Failed to assign project creator");
                AppError::Database(e)
            })?;
        }

        tx.commit().await.map_err(AppError::Database)?;

        tracing::info!(
            project_id = %row.id,
            organization_id = %organization,
            "Project created"
        );

        Ok(row.into())
    }
}

#[derive(Clone)]
pub struct ProjectAssignmentRepository {
    pool: PgPool,
}

impl ProjectAssignmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProjectAssignmentStore for ProjectAssignmentRepository {
    #[tracing::instrument(skip(self), fields(db.table = "project_members", db.operation = "select", organization_id = %organization))]
    async fn assigned_project_ids(
        &self,
        organization: &ScopedOrganization,
        user_id: Uuid,
    ) -> Result<Vec<Uuid>, AppError> {
        let mut tx = begin_scoped(&self.pool, organization).await?;
        let ids = sqlx::query_scalar::<Postgres, Uuid>(
            r#"
            SELECT project_id
            FROM project_members
            WHERE organization_id = $1 AND user_id = $2
            ORDER BY created_at ASC
            "#,
        )
        .bind(organization.id())
        .bind(user_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, user_id = %user_id, "Failed to fetch project assignments");
            AppError::Database(e)
        })?;
        tx.commit().await.map_err(AppError::Database)?;

        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_status_falls_back_to_planning() {
        let now = Utc::now();
        let row = ProjectRow {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            name: "Festival build".to_string(),
            description: None,
            status: "cancelled".to_string(),
            created_by: None,
            created_at: now,
            updated_at: now,
        };
        assert_eq!(Project::from(row).status, ProjectStatus::Planning);
    }
}
