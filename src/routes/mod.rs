pub mod auth;
pub mod chat;
pub mod documents;
pub mod files;
pub mod generate;
pub mod projects;

use axum::routing::{delete, get, post};
use axum::Router;

use crate::state::SharedState;

pub fn api_routes() -> Router<SharedState> {
    Router::new()
        // Auth
        .route("/api/v1/auth/signup", post(auth::sign_up))
        .route("/api/v1/auth/signin", post(auth::sign_in))
        .route("/api/v1/auth/refresh", post(auth::refresh))
        .route("/api/v1/auth/signout", post(auth::sign_out))
        .route("/api/v1/auth/oauth/{provider}", get(auth::oauth))
        .route("/api/v1/auth/callback", post(auth::callback))
        .route("/api/v1/auth/session", get(auth::session))
        // Projects
        .route("/api/v1/projects", get(projects::list).post(projects::create))
        .route("/api/v1/projects/stats", get(projects::stats))
        .route(
            "/api/v1/projects/{id}",
            get(projects::get)
                .put(projects::update)
                .delete(projects::delete),
        )
        // Files
        .route(
            "/api/v1/projects/{id}/files",
            get(files::list).put(files::save),
        )
        .route("/api/v1/files/{id}", delete(files::delete))
        // Chat
        .route(
            "/api/v1/projects/{id}/chat",
            get(chat::history).post(chat::send),
        )
        // Documents
        .route(
            "/api/v1/projects/{id}/documents",
            get(documents::list).post(documents::upload),
        )
        .route("/api/v1/documents/{id}", delete(documents::delete))
        .route("/api/v1/documents/{id}/content", get(documents::content))
        // Generation
        .route("/api/v1/generate", post(generate::generate))
}
