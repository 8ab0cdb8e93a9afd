use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::CookieJar;
use uuid::Uuid;

use crate::auth::jwt;
use crate::backend::Backend;
use crate::error::AppError;
use crate::state::SharedState;

/// The signed-in caller. Carries the access token so backend calls run with
/// the caller's own permissions.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub access_token: String,
}

impl AuthUser {
    /// Backend client scoped to this caller.
    pub fn backend(&self, state: &SharedState) -> Backend {
        state.backend.scoped(&self.access_token)
    }

    pub fn require_owner(&self, owner_id: Uuid) -> Result<(), AppError> {
        if self.user_id == owner_id {
            Ok(())
        } else {
            // Same answer as a missing row, so ids of other users' projects don't leak.
            Err(AppError::NotFound("Project not found".to_string()))
        }
    }
}

impl FromRequestParts<SharedState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        // Try Bearer token from Authorization header first
        if let Some(auth_header) = parts.headers.get("authorization") {
            let auth_str = auth_header
                .to_str()
                .map_err(|_| AppError::Unauthorized("Invalid authorization header".to_string()))?;

            if let Some(token) = auth_str.strip_prefix("Bearer ") {
                return authenticate(token, &state.config.session_secret);
            }
        }

        // Try cookie-based auth
        let jar = CookieJar::from_headers(&parts.headers);
        if let Some(cookie) = jar.get("access_token") {
            return authenticate(cookie.value(), &state.config.session_secret);
        }

        Err(AppError::Unauthorized(
            "Missing authentication token".to_string(),
        ))
    }
}

fn authenticate(token: &str, secret: &str) -> Result<AuthUser, AppError> {
    let claims = jwt::decode_token(token, secret)
        .map_err(|_| AppError::Unauthorized("Invalid or expired token".to_string()))?;

    Ok(AuthUser {
        user_id: claims.sub,
        email: claims.email,
        access_token: token.to_string(),
    })
}
