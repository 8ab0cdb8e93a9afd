use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::backend::records::Order;
use crate::backend::{Backend, BackendError};
use crate::models::{NewProjectFile, ProjectFile};

const TABLE: &str = "project_files";

#[derive(Serialize)]
struct Stamped<'a> {
    #[serde(flatten)]
    file: &'a NewProjectFile,
    updated_at: DateTime<Utc>,
}

/// Ordered by path.
pub async fn list(backend: &Backend, project_id: Uuid) -> Result<Vec<ProjectFile>, BackendError> {
    backend
        .table(TABLE)
        .eq("project_id", project_id)
        .order("file_path", Order::Asc)
        .select()
        .await
}

/// Upsert on `(project_id, file_path)`.
pub async fn save(backend: &Backend, file: &NewProjectFile) -> Result<ProjectFile, BackendError> {
    let body = Stamped {
        file,
        updated_at: Utc::now(),
    };
    backend
        .table(TABLE)
        .upsert(&body, "project_id,file_path")
        .await
}

pub async fn find_by_id(backend: &Backend, id: Uuid) -> Result<Option<ProjectFile>, BackendError> {
    backend.table(TABLE).eq("id", id).select_one().await
}

pub async fn delete(backend: &Backend, id: Uuid) -> Result<(), BackendError> {
    backend.table(TABLE).eq("id", id).delete().await
}
