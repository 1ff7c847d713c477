//! Project records, the representative tenant-owned data.
//!
//! Every query goes through the grant: its organization token scopes the
//! statement and its project filter restricts assignment-scoped callers.

use crate::auth::{ClientIp, Granted, RequestContext};
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use atlvs_core::error::FieldErrors;
use atlvs_core::models::{AuditOutcome, CreateProjectRequest, NewProject, Project, ProjectStatus};
use atlvs_core::AppError;
use atlvs_gate::{
    AccessGrant, ContextResolution, DataScope, GateContext, Narrowing, RoutePolicy,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, ToSchema)]
pub struct ProjectListResponse {
    pub organization_id: Uuid,
    pub scope: DataScope,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub narrowing: Option<Narrowing>,
    pub projects: Vec<Project>,
    pub count: usize,
}

async fn load_projects(
    state: &AppState,
    grant: &AccessGrant,
) -> Result<ProjectListResponse, AppError> {
    // Without assignments only the projects overview is reachable: no rows.
    let projects = if grant.narrowing() == Some(Narrowing::ProjectsOverviewOnly) {
        Vec::new()
    } else {
        state
            .stores
            .projects
            .list_projects(grant.organization(), grant.project_filter())
            .await?
    };

    Ok(ProjectListResponse {
        organization_id: grant.organization().id(),
        scope: grant.scope(),
        narrowing: grant.narrowing(),
        count: projects.len(),
        projects,
    })
}

/// List projects visible to the caller in the current organization
#[utoipa::path(
    get,
    path = "/api/v1/projects",
    tag = "projects",
    responses(
        (status = 200, description = "Visible projects", body = ProjectListResponse),
        (status = 401, description = "No session or no membership", body = ErrorResponse),
        (status = 403, description = "Role may not view projects", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, ctx, grant), fields(user_id = %ctx.user.id, organization_id = %ctx.org_id))]
pub async fn list_projects(
    State(state): State<Arc<AppState>>,
    RequestContext(ctx): RequestContext,
    Granted(grant): Granted,
) -> Result<Json<ProjectListResponse>, HttpAppError> {
    let response = load_projects(&state, &grant).await?;
    tracing::debug!(count = response.count, scope = ?response.scope, "Listed projects");
    Ok(Json(response))
}

/// List projects of an explicitly named organization
///
/// The organization id in the path is cross-checked against the caller's
/// memberships before anything is read.
#[utoipa::path(
    get,
    path = "/api/v1/organizations/{org_id}/projects",
    tag = "projects",
    params(("org_id" = Uuid, Path, description = "Organization ID")),
    responses(
        (status = 200, description = "Visible projects", body = ProjectListResponse),
        (status = 401, description = "No session or no membership", body = ErrorResponse),
        (status = 403, description = "Not a member of the organization, or role may not view projects", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, ctx), fields(user_id = %ctx.user.id))]
pub async fn list_organization_projects(
    State(state): State<Arc<AppState>>,
    RequestContext(ctx): RequestContext,
    Path(org_id): Path<Uuid>,
) -> Result<Json<ProjectListResponse>, HttpAppError> {
    let ctx = context_for(&state, ctx, org_id).await?;
    let grant = state
        .gate
        .authorize(&ctx, &RoutePolicy::new("projects.view"))?;
    Ok(Json(load_projects(&state, &grant).await?))
}

async fn context_for(
    state: &AppState,
    ctx: GateContext,
    org_id: Uuid,
) -> Result<GateContext, AppError> {
    if ctx.org_id == org_id {
        return Ok(ctx);
    }
    match state.gate.resolve_context(&ctx.user, Some(org_id)).await? {
        ContextResolution::Resolved(other) => Ok(*other),
        ContextResolution::NoMembership => Err(AppError::Forbidden(format!(
            "user {} is not an active member of organization {}",
            ctx.user.id, org_id
        ))),
    }
}

/// Create a project in the current organization
///
/// Callers whose grant is scoped to their assignments are assigned to the new
/// project.
#[utoipa::path(
    post,
    path = "/api/v1/projects",
    tag = "projects",
    request_body = CreateProjectRequest,
    responses(
        (status = 201, description = "Project created", body = Project),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 401, description = "No session or no membership", body = ErrorResponse),
        (status = 403, description = "Role may not create projects", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, ctx, grant, body), fields(user_id = %ctx.user.id, organization_id = %ctx.org_id))]
pub async fn create_project(
    State(state): State<Arc<AppState>>,
    RequestContext(ctx): RequestContext,
    Granted(grant): Granted,
    ClientIp(client_ip): ClientIp,
    ValidatedJson(body): ValidatedJson<CreateProjectRequest>,
) -> Result<(StatusCode, Json<Project>), HttpAppError> {
    let name = body.name.trim().to_string();
    if name.is_empty() {
        let mut fields = FieldErrors::new();
        fields.insert("name".to_string(), vec!["name must not be blank".to_string()]);
        return Err(AppError::Validation {
            message: "Request validation failed".to_string(),
            fields,
        }
        .into());
    }

    let new_project = NewProject {
        name,
        description: body.description,
        status: body.status.unwrap_or(ProjectStatus::Planning),
        created_by: ctx.user.id,
    };

    match state
        .stores
        .projects
        .create_project(grant.organization(), new_project, grant.assigns_creator())
        .await
    {
        Ok(project) => {
            state.gate.record(
                &ctx,
                &grant,
                AuditOutcome::Allowed,
                Some(project.id),
                client_ip,
            );
            tracing::info!(project_id = %project.id, "Project created");
            Ok((StatusCode::CREATED, Json(project)))
        }
        Err(e) => {
            state
                .gate
                .record(&ctx, &grant, AuditOutcome::Failed, None, client_ip);
            Err(e.into())
        }
    }
}
