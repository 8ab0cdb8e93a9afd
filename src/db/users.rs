use uuid::Uuid;

use crate::backend::identity::IdentityUser;
use crate::backend::{Backend, BackendError};
use crate::models::{NewUser, User};

const TABLE: &str = "users";

pub async fn find_by_id(backend: &Backend, id: Uuid) -> Result<Option<User>, BackendError> {
    backend.table(TABLE).eq("id", id).select_one().await
}

pub async fn create(backend: &Backend, user: &NewUser) -> Result<User, BackendError> {
    backend.table(TABLE).insert(user).await
}

/// Create the profile row for an identity if it does not exist yet.
pub async fn ensure_profile(
    backend: &Backend,
    identity: &IdentityUser,
) -> Result<User, BackendError> {
    if let Some(existing) = find_by_id(backend, identity.id).await? {
        return Ok(existing);
    }

    let email = identity
        .email
        .clone()
        .ok_or_else(|| BackendError::Decode("identity has no email".to_string()))?;

    create(
        backend,
        &NewUser {
            id: identity.id,
            email,
            name: identity.display_name(),
            avatar_url: identity.avatar_url(),
        },
    )
    .await
}
