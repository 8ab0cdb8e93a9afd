use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectFile {
    pub id: Uuid,
    pub project_id: Uuid,
    pub file_path: String,
    pub content: String,
    pub language: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A file keyed by `(project_id, file_path)`; saving it again replaces the
/// content of the existing row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProjectFile {
    pub project_id: Uuid,
    pub file_path: String,
    pub content: String,
    pub language: String,
}
