use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::extractor::AuthUser;
use crate::backend::Backend;
use crate::db;
use crate::error::AppError;
use crate::models::{NewProject, Project, ProjectStatus, ProjectType, ProjectUpdate};
use crate::state::SharedState;

const MAX_NAME_LEN: usize = 200;
/// A project is recent while at most this many whole days have passed since
/// its last update.
const RECENT_DAYS: i64 = 7;

#[derive(Deserialize)]
pub struct CreateProject {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub project_type: ProjectType,
    #[serde(default)]
    pub status: Option<ProjectStatus>,
    #[serde(default)]
    pub files: Option<serde_json::Value>,
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub status: Option<ProjectStatus>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ProjectStats {
    pub total: usize,
    pub completed: usize,
    pub generating: usize,
    pub failed: usize,
    /// At most 7 whole days since the last update.
    pub recent: usize,
}

impl ProjectStats {
    pub fn from_projects(projects: &[Project]) -> Self {
        // Whole days elapsed <= 7 means strictly less than 8 days.
        let cutoff = Utc::now() - Duration::days(RECENT_DAYS + 1);
        let count = |status| projects.iter().filter(|p| p.status == status).count();

        ProjectStats {
            total: projects.len(),
            completed: count(ProjectStatus::Completed),
            generating: count(ProjectStatus::Generating),
            failed: count(ProjectStatus::Error),
            recent: projects.iter().filter(|p| p.updated_at > cutoff).count(),
        }
    }
}

/// Load a project the caller owns. Someone else's project looks missing.
pub(crate) async fn owned_project(
    backend: &Backend,
    auth: &AuthUser,
    id: Uuid,
) -> Result<Project, AppError> {
    let project = db::projects::find_by_id(backend, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".to_string()))?;
    auth.require_owner(project.user_id)?;
    Ok(project)
}

pub(crate) fn validate_name(name: &str) -> Result<(), AppError> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
        return Err(AppError::BadRequest(format!(
            "Project name must be between 1 and {MAX_NAME_LEN} characters"
        )));
    }
    Ok(())
}

pub async fn list(
    auth: AuthUser,
    State(state): State<SharedState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Project>>, AppError> {
    let backend = auth.backend(&state);
    let projects = match query.status {
        Some(status) => db::projects::list_by_status(&backend, auth.user_id, status).await?,
        None => db::projects::list(&backend, auth.user_id).await?,
    };
    Ok(Json(projects))
}

pub async fn stats(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<ProjectStats>, AppError> {
    let projects = db::projects::list(&auth.backend(&state), auth.user_id).await?;
    Ok(Json(ProjectStats::from_projects(&projects)))
}

pub async fn create(
    auth: AuthUser,
    State(state): State<SharedState>,
    Json(req): Json<CreateProject>,
) -> Result<(StatusCode, Json<Project>), AppError> {
    validate_name(&req.name)?;

    let project = db::projects::create(
        &auth.backend(&state),
        &NewProject {
            user_id: auth.user_id,
            name: req.name.trim().to_string(),
            description: req.description,
            project_type: req.project_type,
            status: req.status.unwrap_or_default(),
            files: req.files,
            preview_url: None,
        },
    )
    .await?;

    tracing::info!(project_id = %project.id, user_id = %auth.user_id, "Project created");

    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn get(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Project>, AppError> {
    let project = owned_project(&auth.backend(&state), &auth, id).await?;
    Ok(Json(project))
}

pub async fn update(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ProjectUpdate>,
) -> Result<Json<Project>, AppError> {
    if req.is_empty() {
        return Err(AppError::BadRequest("No fields to update".to_string()));
    }
    if let Some(name) = &req.name {
        validate_name(name)?;
    }

    let backend = auth.backend(&state);
    owned_project(&backend, &auth, id).await?;

    let project = db::projects::update(&backend, id, &req).await?;
    Ok(Json(project))
}

pub async fn delete(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let backend = auth.backend(&state);
    owned_project(&backend, &auth, id).await?;

    db::projects::delete(&backend, id).await?;

    tracing::info!(project_id = %id, user_id = %auth.user_id, "Project deleted");

    Ok(Json(serde_json::json!({ "message": "Deleted" })))
}
