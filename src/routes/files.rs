use axum::Json;
use axum::extract::{Path, State};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::extractor::AuthUser;
use crate::db;
use crate::error::AppError;
use crate::models::{NewProjectFile, ProjectFile};
use crate::routes::projects::owned_project;
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct SaveFile {
    pub file_path: String,
    #[serde(default)]
    pub content: String,
    pub language: Option<String>,
}

/// Editor language for a path, by extension.
pub fn language_for(path: &str) -> &'static str {
    let ext = path
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "ts" | "tsx" => "typescript",
        "js" | "jsx" | "mjs" | "cjs" => "javascript",
        "json" => "json",
        "css" => "css",
        "scss" => "scss",
        "html" | "htm" => "html",
        "md" | "mdx" => "markdown",
        "rs" => "rust",
        "py" => "python",
        "sql" => "sql",
        "yml" | "yaml" => "yaml",
        "toml" => "toml",
        "sh" => "shell",
        _ => "plaintext",
    }
}

fn validate_path(path: &str) -> Result<(), AppError> {
    if path.is_empty()
        || path.len() > 512
        || path.starts_with('/')
        || path.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..")
    {
        return Err(AppError::BadRequest(
            "File path must be a relative path without empty, '.' or '..' segments".to_string(),
        ));
    }
    Ok(())
}

pub async fn list(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<Vec<ProjectFile>>, AppError> {
    let backend = auth.backend(&state);
    owned_project(&backend, &auth, project_id).await?;

    let files = db::project_files::list(&backend, project_id).await?;
    Ok(Json(files))
}

pub async fn save(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(project_id): Path<Uuid>,
    Json(req): Json<SaveFile>,
) -> Result<Json<ProjectFile>, AppError> {
    let file_path = req.file_path.trim().to_string();
    validate_path(&file_path)?;

    let backend = auth.backend(&state);
    owned_project(&backend, &auth, project_id).await?;

    let language = req
        .language
        .filter(|l| !l.trim().is_empty())
        .unwrap_or_else(|| language_for(&file_path).to_string());

    let file = db::project_files::save(
        &backend,
        &NewProjectFile {
            project_id,
            file_path,
            content: req.content,
            language,
        },
    )
    .await?;

    Ok(Json(file))
}

pub async fn delete(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let backend = auth.backend(&state);
    let file = db::project_files::find_by_id(&backend, id)
        .await?
        .ok_or_else(|| AppError::NotFound("File not found".to_string()))?;
    owned_project(&backend, &auth, file.project_id).await?;

    db::project_files::delete(&backend, id).await?;
    Ok(Json(serde_json::json!({ "message": "Deleted" })))
}
