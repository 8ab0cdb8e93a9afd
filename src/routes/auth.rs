use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Redirect;
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::events::AuthEvent;
use crate::auth::extractor::AuthUser;
use crate::auth::{jwt, service};
use crate::backend::BackendError;
use crate::backend::identity::{IdentityUser, OAuthProvider, Session};
use crate::db;
use crate::error::AppError;
use crate::models::User;
use crate::state::SharedState;

const REFRESH_COOKIE_DAYS: i64 = 30;

#[derive(Deserialize)]
pub struct SignUpRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Deserialize)]
pub struct CallbackRequest {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Serialize)]
pub struct SignUpResponse {
    pub message: String,
    pub user: IdentityUser,
    /// False when the backend wants the email confirmed before sign-in.
    pub signed_in: bool,
}

#[derive(Serialize)]
pub struct CallbackResponse {
    pub user: User,
    pub redirect: String,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub profile: Option<User>,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

fn auth_cookies(access_token: &str, expires_in: i64, refresh_token: Option<&str>) -> CookieJar {
    let access = Cookie::build(("access_token", access_token.to_string()))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(expires_in.max(0)))
        .build();

    let jar = CookieJar::new().add(access);

    match refresh_token {
        Some(refresh_token) => {
            let refresh = Cookie::build(("refresh_token", refresh_token.to_string()))
                .path("/")
                .http_only(true)
                .secure(true)
                .same_site(SameSite::Lax)
                .max_age(time::Duration::days(REFRESH_COOKIE_DAYS))
                .build();
            jar.add(refresh)
        }
        None => jar,
    }
}

fn session_cookies(session: &Session) -> CookieJar {
    auth_cookies(
        &session.access_token,
        session.expires_in,
        Some(&session.refresh_token),
    )
}

fn clear_auth_cookies() -> CookieJar {
    let access = Cookie::build(("access_token", ""))
        .path("/")
        .max_age(time::Duration::ZERO)
        .build();
    let refresh = Cookie::build(("refresh_token", ""))
        .path("/")
        .max_age(time::Duration::ZERO)
        .build();
    CookieJar::new().add(access).add(refresh)
}

pub async fn sign_up(
    State(state): State<SharedState>,
    Json(req): Json<SignUpRequest>,
) -> Result<(StatusCode, CookieJar, Json<SignUpResponse>), AppError> {
    let outcome = service::sign_up(&state, &req.name, &req.email, &req.password)
        .await
        .map_err(|e| match e {
            AppError::Backend(BackendError::Status { status: 422, message })
            | AppError::Backend(BackendError::Status { status: 400, message }) => {
                AppError::BadRequest(message)
            }
            other => other,
        })?;

    let jar = match outcome.session() {
        Some(session) => session_cookies(session),
        None => CookieJar::new(),
    };

    Ok((
        StatusCode::CREATED,
        jar,
        Json(SignUpResponse {
            message: "User created successfully".to_string(),
            user: outcome.user().clone(),
            signed_in: outcome.session().is_some(),
        }),
    ))
}

pub async fn sign_in(
    State(state): State<SharedState>,
    Json(req): Json<SignInRequest>,
) -> Result<(CookieJar, Json<Session>), AppError> {
    if state.login_limiter.check(&req.email).is_err() {
        return Err(AppError::RateLimited(
            "Too many sign-in attempts. Please try again later.".to_string(),
        ));
    }

    let session = match state
        .backend
        .sign_in_with_password(&req.email, &req.password)
        .await
    {
        Ok(session) => session,
        Err(BackendError::Status { status: 400 | 401, .. }) => {
            state.login_limiter.record_failure(&req.email);
            return Err(AppError::Unauthorized("Invalid credentials".to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    state.login_limiter.reset(&req.email);
    state.auth_events.publish(AuthEvent::SignedIn {
        user_id: session.user.id,
    });

    Ok((session_cookies(&session), Json(session)))
}

/// Refresh from a JSON body `{ "refresh_token": ... }` or the refresh cookie.
pub async fn refresh(
    State(state): State<SharedState>,
    jar: CookieJar,
    body: Bytes,
) -> Result<(CookieJar, Json<Session>), AppError> {
    let refresh_token = if body.is_empty() {
        jar.get("refresh_token")
            .map(|c| c.value().to_string())
            .ok_or_else(|| AppError::Unauthorized("Missing refresh token".to_string()))?
    } else {
        serde_json::from_slice::<RefreshRequest>(&body)
            .map_err(|e| AppError::BadRequest(format!("Invalid request body: {e}")))?
            .refresh_token
    };

    let session = state
        .backend
        .refresh_session(&refresh_token)
        .await
        .map_err(|e| match e {
            BackendError::Status { status: 400 | 401, .. } => {
                AppError::Unauthorized("Invalid refresh token".to_string())
            }
            other => other.into(),
        })?;

    state.auth_events.publish(AuthEvent::TokenRefreshed {
        user_id: session.user.id,
    });

    Ok((session_cookies(&session), Json(session)))
}

pub async fn sign_out(
    State(state): State<SharedState>,
    auth: AuthUser,
) -> (CookieJar, Json<MessageResponse>) {
    // The local session ends even if the backend could not revoke it.
    if let Err(e) = auth.backend(&state).sign_out().await {
        tracing::warn!("Backend sign-out failed for {}: {e}", auth.user_id);
    }

    state.auth_events.publish(AuthEvent::SignedOut {
        user_id: auth.user_id,
    });

    (
        clear_auth_cookies(),
        Json(MessageResponse {
            message: "Signed out successfully".to_string(),
        }),
    )
}

pub async fn oauth(
    State(state): State<SharedState>,
    Path(provider): Path<String>,
) -> Result<Redirect, AppError> {
    let provider: OAuthProvider = provider.parse().map_err(AppError::NotFound)?;
    if !state.config.oauth_enabled(provider) {
        return Err(AppError::NotFound(format!(
            "Sign-in with {} is not configured",
            provider.as_str()
        )));
    }

    let redirect_to = format!("{}/auth/callback", state.config.base_url);
    let url = state.backend.authorize_url(provider, &redirect_to)?;
    Ok(Redirect::to(url.as_str()))
}

/// Completes an OAuth sign-in with the session the client got back from the
/// identity provider.
pub async fn callback(
    State(state): State<SharedState>,
    Json(req): Json<CallbackRequest>,
) -> Result<(CookieJar, Json<CallbackResponse>), AppError> {
    let claims = jwt::decode_token(&req.access_token, &state.config.session_secret)
        .map_err(|_| AppError::Unauthorized("Invalid or expired token".to_string()))?;

    let user = service::complete_oauth(&state, &req.access_token).await?;

    let expires_in = claims.exp - chrono::Utc::now().timestamp();
    let jar = auth_cookies(&req.access_token, expires_in, req.refresh_token.as_deref());

    Ok((
        jar,
        Json(CallbackResponse {
            user,
            redirect: "/dashboard".to_string(),
        }),
    ))
}

pub async fn session(
    State(state): State<SharedState>,
    auth: AuthUser,
) -> Result<Json<SessionResponse>, AppError> {
    let profile = db::users::find_by_id(&auth.backend(&state), auth.user_id).await?;

    Ok(Json(SessionResponse {
        user_id: auth.user_id,
        email: auth.email.clone(),
        profile,
    }))
}
