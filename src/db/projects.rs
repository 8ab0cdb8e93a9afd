use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::backend::records::Order;
use crate::backend::{Backend, BackendError};
use crate::models::{NewProject, Project, ProjectStatus, ProjectUpdate};

const TABLE: &str = "projects";

/// Update body with the modification time stamped on.
#[derive(Serialize)]
struct Stamped<'a> {
    #[serde(flatten)]
    fields: &'a ProjectUpdate,
    updated_at: DateTime<Utc>,
}

/// Most recently updated first.
pub async fn list(backend: &Backend, user_id: Uuid) -> Result<Vec<Project>, BackendError> {
    backend
        .table(TABLE)
        .eq("user_id", user_id)
        .order("updated_at", Order::Desc)
        .select()
        .await
}

pub async fn list_by_status(
    backend: &Backend,
    user_id: Uuid,
    status: ProjectStatus,
) -> Result<Vec<Project>, BackendError> {
    backend
        .table(TABLE)
        .eq("user_id", user_id)
        .eq("status", status)
        .order("updated_at", Order::Desc)
        .select()
        .await
}

pub async fn create(backend: &Backend, project: &NewProject) -> Result<Project, BackendError> {
    backend.table(TABLE).insert(project).await
}

pub async fn find_by_id(backend: &Backend, id: Uuid) -> Result<Option<Project>, BackendError> {
    backend.table(TABLE).eq("id", id).select_one().await
}

pub async fn update(
    backend: &Backend,
    id: Uuid,
    update: &ProjectUpdate,
) -> Result<Project, BackendError> {
    let body = Stamped {
        fields: update,
        updated_at: Utc::now(),
    };
    backend.table(TABLE).eq("id", id).update(&body).await
}

/// Deleting a missing row is not an error. Files, messages and documents are
/// left to the backend's own constraints.
pub async fn delete(backend: &Backend, id: Uuid) -> Result<(), BackendError> {
    backend.table(TABLE).eq("id", id).delete().await
}
