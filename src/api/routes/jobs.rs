use std::sync::Arc;

use axum::{
    extract::{Path, State},
    middleware::from_fn_with_state,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    api::{
        middlewares,
        types::{ApiResponse, AppState},
    },
    db::JobStore,
    error::Error,
};

pub fn create_router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/jobs/:id", get(get_job_by_id))
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middlewares::authenticate,
        ))
        .with_state(app_state)
}

#[instrument(name = "get_job_by_id", skip(app_state))]
pub async fn get_job_by_id(
    Path(id): Path<String>,
    State(app_state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, Error> {
    let id = Uuid::parse_str(&id)
        .map_err(|_| Error::InvalidQuery(format!("Invalid job ID {:?}", id)))?;

    let Some(job) = app_state.store.get_job(id).await? else {
        return Err(Error::NotFound(format!("Job {} not found", id)));
    };

    Ok(Json(ApiResponse::new(job)))
}
