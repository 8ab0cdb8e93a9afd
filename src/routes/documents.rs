use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::IntoResponse;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::extractor::AuthUser;
use crate::db;
use crate::db::storage;
use crate::error::AppError;
use crate::models::{Document, NewDocument};
use crate::routes::projects::owned_project;
use crate::state::SharedState;

pub const DOCUMENTS_BUCKET: &str = "documents";
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Deserialize)]
pub struct UploadQuery {
    pub name: String,
}

#[derive(Serialize)]
pub struct DocumentResponse {
    #[serde(flatten)]
    pub document: Document,
    pub public_url: String,
}

/// Keep names storage-safe: no separators, nothing outside a conservative set.
fn sanitize_name(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn with_url(state: &SharedState, document: Document) -> Result<DocumentResponse, AppError> {
    let public_url = storage::public_url(&state.backend, DOCUMENTS_BUCKET, &document.storage_path)?;
    Ok(DocumentResponse {
        document,
        public_url,
    })
}

async fn owned_document(
    state: &SharedState,
    auth: &AuthUser,
    id: Uuid,
) -> Result<Document, AppError> {
    let backend = auth.backend(state);
    let document = db::documents::find_by_id(&backend, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Document not found".to_string()))?;
    owned_project(&backend, auth, document.project_id).await?;
    Ok(document)
}

pub async fn list(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<Vec<DocumentResponse>>, AppError> {
    let backend = auth.backend(&state);
    owned_project(&backend, &auth, project_id).await?;

    let documents = db::documents::list(&backend, project_id)
        .await?
        .into_iter()
        .map(|d| with_url(&state, d))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(documents))
}

/// Raw body upload. Text content is kept on the row when the body is UTF-8.
pub async fn upload(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(project_id): Path<Uuid>,
    Query(query): Query<UploadQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<DocumentResponse>), AppError> {
    let name = sanitize_name(&query.name);
    if name.is_empty() || name.chars().all(|c| c == '.' || c == '_') {
        return Err(AppError::BadRequest("Document name is required".to_string()));
    }
    if body.is_empty() {
        return Err(AppError::BadRequest("Document is empty".to_string()));
    }

    let backend = auth.backend(&state);
    owned_project(&backend, &auth, project_id).await?;

    let file_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(DEFAULT_CONTENT_TYPE)
        .to_string();
    let storage_path = format!("{project_id}/{}-{name}", Uuid::now_v7());
    let content = String::from_utf8(body.to_vec()).unwrap_or_default();
    let file_size = body.len() as i64;

    storage::upload(&backend, DOCUMENTS_BUCKET, &storage_path, body, &file_type).await?;

    let saved = db::documents::save(
        &backend,
        &NewDocument {
            project_id,
            name,
            content,
            file_type,
            file_size,
            storage_path: storage_path.clone(),
        },
    )
    .await;

    let document = match saved {
        Ok(document) => document,
        Err(e) => {
            if let Err(cleanup) = storage::delete(&backend, DOCUMENTS_BUCKET, &storage_path).await {
                tracing::warn!("Failed to remove orphaned blob {storage_path}: {cleanup}");
            }
            return Err(e.into());
        }
    };

    Ok((StatusCode::CREATED, Json(with_url(&state, document)?)))
}

pub async fn content(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let document = owned_document(&state, &auth, id).await?;
    let data = storage::download(&auth.backend(&state), DOCUMENTS_BUCKET, &document.storage_path)
        .await?;

    Ok(([(header::CONTENT_TYPE, document.file_type)], data))
}

pub async fn delete(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let document = owned_document(&state, &auth, id).await?;
    let backend = auth.backend(&state);

    db::documents::delete(&backend, id).await?;

    if let Err(e) = storage::delete(&backend, DOCUMENTS_BUCKET, &document.storage_path).await {
        tracing::warn!("Failed to remove blob {}: {e}", document.storage_path);
    }

    Ok(Json(serde_json::json!({ "message": "Deleted" })))
}
