use std::convert::Infallible;

use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::stream::{self, Stream};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::auth::extractor::AuthUser;
use crate::backend::Backend;
use crate::db;
use crate::error::AppError;
use crate::generation::{self, GenerationEvent, Outcome};
use crate::models::{NewProject, ProjectStatus, ProjectType, ProjectUpdate};
use crate::routes::projects::validate_name;
use crate::state::SharedState;

const DEFAULT_NAME: &str = "Untitled Project";

#[derive(Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type", default)]
    pub project_type: Option<ProjectType>,
}

/// Validate the description, create the project row in `generating`, then
/// stream the simulated run as server-sent events. The row ends up
/// `completed`, or `error` if the client disconnects first.
pub async fn generate(
    auth: AuthUser,
    State(state): State<SharedState>,
    Json(req): Json<GenerateRequest>,
) -> Result<impl IntoResponse, AppError> {
    let description = generation::validate_description(&req.description)?.to_string();

    let name = req
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| DEFAULT_NAME.to_string());
    validate_name(&name)?;

    let backend = auth.backend(&state);
    let project = db::projects::create(
        &backend,
        &NewProject {
            user_id: auth.user_id,
            name,
            description: description.clone(),
            project_type: req.project_type.unwrap_or(ProjectType::Website),
            status: ProjectStatus::Generating,
            files: None,
            preview_url: None,
        },
    )
    .await?;

    let generation::Run { events, handle } =
        generation::start(&description, project.id.to_string())?;

    tracing::info!(project_id = %project.id, user_id = %auth.user_id, "Generation started");

    // Status writes outlive the request; prefer the service key when present.
    let status_backend = state.backend.service().unwrap_or(backend);
    let project_id = project.id;
    tokio::spawn(async move {
        let status = match handle.await {
            Ok(Outcome::Completed) => ProjectStatus::Completed,
            Ok(Outcome::Cancelled) => {
                tracing::info!(%project_id, "Generation abandoned by client");
                ProjectStatus::Error
            }
            Err(e) => {
                tracing::error!(%project_id, "Generation task failed: {e}");
                ProjectStatus::Error
            }
        };
        finish(&status_backend, project_id, status).await;
    });

    let headers = [("x-project-id", project.id.to_string())];
    Ok((headers, Sse::new(event_stream(events)).keep_alive(KeepAlive::default())))
}

async fn finish(backend: &Backend, project_id: uuid::Uuid, status: ProjectStatus) {
    match db::projects::update(backend, project_id, &ProjectUpdate::status(status)).await {
        Ok(_) => tracing::info!(%project_id, %status, "Generation finished"),
        Err(e) => tracing::error!(%project_id, "Failed to record generation status {status}: {e}"),
    }
}

fn event_stream(
    events: mpsc::Receiver<GenerationEvent>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    stream::unfold(events, |mut events| async move {
        let event = events.recv().await?;
        let name = match &event {
            GenerationEvent::PhaseStarted { .. } => "phase_started",
            GenerationEvent::PhaseCompleted { .. } => "phase_completed",
            GenerationEvent::Completed { .. } => "completed",
        };
        let data = serde_json::to_string(&event).unwrap_or_default();
        Some((Ok(Event::default().event(name).data(data)), events))
    })
}
