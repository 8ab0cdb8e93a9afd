pub mod assistant;
pub mod auth;
pub mod backend;
pub mod config;
pub mod db;
pub mod error;
pub mod generation;
pub mod models;
pub mod rate_limit;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderName, HeaderValue};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::assistant::CannedAssistant;
use crate::auth::events::AuthEvents;
use crate::backend::{Backend, BackendError};
use crate::config::Config;
use crate::rate_limit::LoginRateLimiter;
use crate::state::{AppState, SharedState};

/// Backend client from configuration. Fails here, at startup, when the URL
/// or key is unusable.
pub fn connect_backend(config: &Config) -> Result<Backend, BackendError> {
    Ok(Backend::new(
        &config.backend_url,
        &config.backend_anon_key,
        config.backend_timeout,
    )?
    .with_service_role(config.backend_service_role_key.clone()))
}

pub fn build_app(backend: Backend, config: Config) -> (Router, SharedState) {
    let max_body_size = config.max_body_size;

    let state: SharedState = Arc::new(AppState {
        backend,
        config,
        assistant: Arc::new(CannedAssistant),
        auth_events: AuthEvents::default(),
        login_limiter: LoginRateLimiter::new(),
    });

    let app = Router::new()
        .merge(routes::api_routes())
        .route("/health", axum::routing::get(health))
        .layer(DefaultBodyLimit::max(max_body_size))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-content-type-options"),
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-frame-options"),
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("referrer-policy"),
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ))
        .with_state(state.clone());

    (app, state)
}

async fn health() -> &'static str {
    "ok"
}
