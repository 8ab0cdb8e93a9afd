use std::sync::LazyLock;

use regex::Regex;

use crate::auth::events::AuthEvent;
use crate::backend::identity::SignUpOutcome;
use crate::db;
use crate::error::AppError;
use crate::models::{NewUser, User};
use crate::state::AppState;

pub const MIN_PASSWORD_LEN: usize = 6;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

pub fn validate_sign_up(name: &str, email: &str, password: &str) -> Result<(), AppError> {
    if name.trim().is_empty() || email.trim().is_empty() || password.is_empty() {
        return Err(AppError::BadRequest("All fields are required".to_string()));
    }

    if !EMAIL_RE.is_match(email.trim()) {
        return Err(AppError::BadRequest("Invalid email address".to_string()));
    }

    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    Ok(())
}

/// Create the identity, then the profile row. The profile insert is
/// best-effort: a failure is logged and the sign-up still succeeds.
pub async fn sign_up(
    state: &AppState,
    name: &str,
    email: &str,
    password: &str,
) -> Result<SignUpOutcome, AppError> {
    validate_sign_up(name, email, password)?;

    let name = name.trim();
    let email = email.trim();
    let outcome = state.backend.sign_up(email, password, Some(name)).await?;
    let identity = outcome.user();

    let profile_backend = state
        .backend
        .service()
        .or_else(|| {
            outcome
                .session()
                .map(|s| state.backend.scoped(&s.access_token))
        })
        .unwrap_or_else(|| state.backend.clone());

    let profile = NewUser {
        id: identity.id,
        email: identity.email.clone().unwrap_or_else(|| email.to_string()),
        name: Some(name.to_string()),
        avatar_url: None,
    };
    if let Err(e) = db::users::create(&profile_backend, &profile).await {
        tracing::warn!("Failed to create profile for user {}: {e}", identity.id);
    }

    state.auth_events.publish(AuthEvent::UserCreated {
        user_id: identity.id,
    });

    Ok(outcome)
}

/// Finish an OAuth sign-in: confirm the token with the identity API and make
/// sure a profile row exists.
pub async fn complete_oauth(state: &AppState, access_token: &str) -> Result<User, AppError> {
    let backend = state.backend.scoped(access_token);
    let identity = backend.get_user().await?;
    let profile = db::users::ensure_profile(&backend, &identity).await?;

    state.auth_events.publish(AuthEvent::SignedIn {
        user_id: identity.id,
    });

    Ok(profile)
}
