use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Project lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Planning,
    Active,
    OnHold,
    Completed,
    Archived,
}

impl ProjectStatus {
    pub fn parse(raw: &str) -> Option<ProjectStatus> {
        match raw.trim().to_lowercase().as_str() {
            "planning" => Some(ProjectStatus::Planning),
            "active" => Some(ProjectStatus::Active),
            "on_hold" => Some(ProjectStatus::OnHold),
            "completed" => Some(ProjectStatus::Completed),
            "archived" => Some(ProjectStatus::Archived),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Planning => "planning",
            ProjectStatus::Active => "active",
            ProjectStatus::OnHold => "on_hold",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Archived => "archived",
        }
    }
}

/// Tenant-owned project record
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Project {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Scopes a limited role to one project.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ProjectAssignment {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Request body for creating a project
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateProjectRequest {
    #[validate(length(min = 1, max = 200, message = "name must be 1-200 characters"))]
    #[schema(example = "Spring Tour 2026")]
    pub name: String,

    #[validate(length(max = 2000, message = "description must be at most 2000 characters"))]
    pub description: Option<String>,

    /// Defaults to `planning`
    pub status: Option<ProjectStatus>,
}

/// Validated input handed to the project store.
#[derive(Debug, Clone)]
pub struct NewProject {
    pub name: String,
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub created_by: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_project_request_validation() {
        let ok = CreateProjectRequest {
            name: "Load-in".to_string(),
            description: None,
            status: None,
        };
        assert!(ok.validate().is_ok());

        let empty = CreateProjectRequest {
            name: String::new(),
            description: None,
            status: None,
        };
        let errors = empty.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("name"));
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(ProjectStatus::parse("On_Hold"), Some(ProjectStatus::OnHold));
        assert_eq!(ProjectStatus::parse("cancelled"), None);
    }
}
