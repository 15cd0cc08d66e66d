use std::sync::Arc;

use axum::{
    extract::State,
    middleware::from_fn_with_state,
    response::IntoResponse,
    routing::post,
    Extension, Json, Router,
};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::{
    api::{
        middlewares,
        types::{ApiResponse, AppState},
    },
    auth,
    db::UserStore,
    error::Error,
    models::user::{NewUser, Permission, User},
};

pub fn create_router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/users", post(create_user))
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middlewares::authenticate,
        ))
        .with_state(app_state)
}

#[derive(Debug, Default, Clone, Copy, Deserialize, Serialize)]
pub struct Permissions {
    #[serde(default)]
    pub upload: bool,
    #[serde(default)]
    pub search: bool,
    #[serde(default)]
    pub download: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserPayload {
    pub username: String,
    pub group: String,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub permissions: Permissions,
}

/// Returned once at registration; the token is never shown again.
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisteredUser {
    pub username: String,
    pub group: String,
    pub token: String,
    pub is_admin: bool,
    pub permissions: Permissions,
}

#[instrument(
    name = "create_user",
    skip(app_state, admin, payload),
    fields(admin = %admin.username, username = %payload.username)
)]
pub async fn create_user(
    State(app_state): State<Arc<AppState>>,
    Extension(admin): Extension<User>,
    Json(payload): Json<CreateUserPayload>,
) -> Result<impl IntoResponse, Error> {
    admin.require(Permission::Admin)?;

    if payload.username.trim().is_empty() {
        return Err(Error::InvalidQuery("Username must not be empty".to_string()));
    }

    let user = app_state
        .store
        .create_user(NewUser {
            username: payload.username,
            user_group: payload.group,
            token: auth::issue_token(),
            is_admin: payload.is_admin,
            can_upload: payload.permissions.upload,
            can_search: payload.permissions.search,
            can_download: payload.permissions.download,
        })
        .await?;

    let registered = RegisteredUser {
        permissions: Permissions {
            upload: user.can_upload,
            search: user.can_search,
            download: user.can_download,
        },
        username: user.username,
        group: user.user_group,
        token: user.token,
        is_admin: user.is_admin,
    };

    Ok((StatusCode::CREATED, Json(ApiResponse::new(registered))))
}
