use uuid::Uuid;

use crate::backend::records::Order;
use crate::backend::{Backend, BackendError};
use crate::models::{Document, NewDocument};

const TABLE: &str = "documents";

pub async fn save(backend: &Backend, document: &NewDocument) -> Result<Document, BackendError> {
    backend.table(TABLE).insert(document).await
}

pub async fn list(backend: &Backend, project_id: Uuid) -> Result<Vec<Document>, BackendError> {
    backend
        .table(TABLE)
        .eq("project_id", project_id)
        .order("created_at", Order::Asc)
        .select()
        .await
}

pub async fn find_by_id(backend: &Backend, id: Uuid) -> Result<Option<Document>, BackendError> {
    backend.table(TABLE).eq("id", id).select_one().await
}

/// Removes the row only; the stored blob is the caller's concern.
pub async fn delete(backend: &Backend, id: Uuid) -> Result<(), BackendError> {
    backend.table(TABLE).eq("id", id).delete().await
}
