use axum::Json;
use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::extractor::AuthUser;
use crate::db;
use crate::error::AppError;
use crate::models::{ChatMessage, ChatRole, NewChatMessage};
use crate::routes::projects::owned_project;
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct SendMessage {
    pub content: String,
}

#[derive(Serialize)]
pub struct ChatHistory {
    pub greeting: String,
    pub messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
pub struct ChatExchange {
    pub user: ChatMessage,
    pub assistant: ChatMessage,
}

pub async fn history(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<ChatHistory>, AppError> {
    let backend = auth.backend(&state);
    owned_project(&backend, &auth, project_id).await?;

    let messages = db::chat_messages::list(&backend, project_id).await?;
    Ok(Json(ChatHistory {
        greeting: state.assistant.greeting().to_string(),
        messages,
    }))
}

pub async fn send(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(project_id): Path<Uuid>,
    Json(req): Json<SendMessage>,
) -> Result<Json<ChatExchange>, AppError> {
    let backend = auth.backend(&state);
    let project = owned_project(&backend, &auth, project_id).await?;

    let reply = state
        .assistant
        .reply(&project, &req.content)
        .await
        .map_err(|e| AppError::BadRequest(e.message))?;

    let user = db::chat_messages::save(
        &backend,
        &NewChatMessage {
            project_id,
            role: ChatRole::User,
            content: req.content,
        },
    )
    .await?;

    let assistant = db::chat_messages::save(
        &backend,
        &NewChatMessage {
            project_id,
            role: ChatRole::Assistant,
            content: reply,
        },
    )
    .await?;

    Ok(Json(ChatExchange { user, assistant }))
}
