use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub content: String,
    pub file_type: String,
    pub file_size: i64,
    /// Object path inside the documents bucket.
    pub storage_path: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDocument {
    pub project_id: Uuid,
    pub name: String,
    pub content: String,
    pub file_type: String,
    pub file_size: i64,
    pub storage_path: String,
}
