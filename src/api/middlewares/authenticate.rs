use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::{
    api::types::AppState,
    auth::{self, AUTHORIZATION_HEADER},
    error::Error,
};

/// Resolves `X-Authorization` to a user and stores it in the request
/// extensions for handlers to pick up.
pub async fn authenticate(
    State(app_state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, Error> {
    let header = req
        .headers()
        .get(AUTHORIZATION_HEADER)
        .and_then(|value| value.to_str().ok());
    let user = auth::authenticate(&*app_state.store, header).await?;

    tracing::Span::current().record("user", user.username.as_str());
    req.extensions_mut().insert(user);

    Ok(next.run(req).await)
}
