use axum::{
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use http::header;
use scalar_doc::Documentation;

use crate::error::Error;

pub fn create_router() -> Router {
    Router::new()
        .route("/", get(index))
        .route("/openapi.json", get(openapi))
}

async fn index() -> Response {
    match Documentation::new("Package Registry API", "/openapi.json").build() {
        Ok(html) => Html(html).into_response(),
        Err(_) => {
            Error::Unknown(anyhow::anyhow!("Failed to render API documentation")).into_response()
        }
    }
}

async fn openapi() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())],
        include_str!("../../../openapi.json"),
    )
}
