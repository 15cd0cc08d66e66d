use std::sync::Arc;

use axum::{
    extract::State, middleware::from_fn_with_state, routing::delete, Extension, Router,
};
use http::StatusCode;
use tracing::instrument;

use crate::{
    api::{middlewares, types::AppState},
    db::Store,
    error::Error,
    models::user::{Permission, User},
};

pub fn create_router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/reset", delete(reset_registry))
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middlewares::authenticate,
        ))
        .with_state(app_state)
}

#[instrument(name = "reset_registry", skip(app_state, admin), fields(admin = %admin.username))]
pub async fn reset_registry(
    State(app_state): State<Arc<AppState>>,
    Extension(admin): Extension<User>,
) -> Result<StatusCode, Error> {
    admin.require(Permission::Admin)?;

    app_state.store.reset().await?;
    app_state.archives.clear().await?;
    tracing::warn!("Registry reset");

    Ok(StatusCode::OK)
}
