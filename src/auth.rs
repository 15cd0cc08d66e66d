use secrecy::ExposeSecret;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    config::AuthConfig,
    db::UserStore,
    error::Error,
    models::user::{NewUser, User},
};

pub const AUTHORIZATION_HEADER: &str = "X-Authorization";

/// Pulls the token out of an `X-Authorization` value, with or without a
/// `Bearer ` prefix.
pub fn parse_token(header: &str) -> Option<&str> {
    let header = header.trim();
    let token = header.strip_prefix("Bearer ").unwrap_or(header).trim();
    if token.is_empty() {
        return None;
    }

    Some(token)
}

#[instrument(name = "authenticate", skip_all)]
pub async fn authenticate<S>(store: &S, header: Option<&str>) -> Result<User, Error>
where
    S: UserStore + ?Sized,
{
    let token = header.and_then(parse_token).ok_or(Error::Unauthorized)?;

    store
        .find_user_by_token(token)
        .await?
        .ok_or(Error::Unauthorized)
}

/// Opaque bearer token for a newly registered user.
pub fn issue_token() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Creates the configured admin unless a user with that name already exists.
#[instrument(name = "bootstrap_admin", skip_all, fields(username = %config.admin_username))]
pub async fn bootstrap_admin<S>(store: &S, config: &AuthConfig) -> Result<User, Error>
where
    S: UserStore + ?Sized,
{
    if let Some(user) = store.find_user_by_name(&config.admin_username).await? {
        return Ok(user);
    }

    let created = store
        .create_user(NewUser {
            username: config.admin_username.clone(),
            user_group: config.admin_group.clone(),
            token: config.admin_token.expose_secret().to_string(),
            is_admin: true,
            can_upload: true,
            can_search: true,
            can_download: true,
        })
        .await;

    match created {
        Ok(user) => {
            tracing::info!("Created bootstrap admin");
            Ok(user)
        }
        Err(Error::DuplicateUser(_)) => store
            .find_user_by_name(&config.admin_username)
            .await?
            .ok_or_else(|| Error::NotFound(format!("User {} not found", config.admin_username))),
        Err(err) => Err(err),
    }
}
