use uuid::Uuid;

use crate::backend::records::Order;
use crate::backend::{Backend, BackendError};
use crate::models::{ChatMessage, NewChatMessage};

const TABLE: &str = "chat_messages";

/// Oldest first. Messages with equal `created_at` come back in insertion
/// order, which relies on the backend's sort being stable over its heap order.
pub async fn list(backend: &Backend, project_id: Uuid) -> Result<Vec<ChatMessage>, BackendError> {
    backend
        .table(TABLE)
        .eq("project_id", project_id)
        .order("created_at", Order::Asc)
        .select()
        .await
}

pub async fn save(
    backend: &Backend,
    message: &NewChatMessage,
) -> Result<ChatMessage, BackendError> {
    backend.table(TABLE).insert(message).await
}
