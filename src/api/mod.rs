use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::get,
    serve::Serve,
    Router,
};
use axum_tracing_opentelemetry::middleware::{OtelAxumLayer, OtelInResponseLayer};
use http::StatusCode;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::{config::ApplicationConfig, error::Error};

mod middlewares;
mod routes;
pub mod types;

pub use routes::packages::OFFSET_HEADER;
use types::AppState;

pub struct Api {
    port: u16,
    server: Serve<Router, Router>,
}

impl Api {
    pub async fn build(configuration: &ApplicationConfig, app_state: Arc<AppState>) -> Result<Self> {
        let address = format!("{}:{}", configuration.host, configuration.port);
        let listener = TcpListener::bind(&address)
            .await
            .context("Failed to bind address")?;
        let port = listener
            .local_addr()
            .context("Failed to get local address")?
            .port();

        let metrics = app_state.metrics.clone();

        let router = Router::new()
            .merge(routes::packages::create_router(app_state.clone()))
            .merge(routes::jobs::create_router(app_state.clone()))
            .merge(routes::users::create_router(app_state.clone()))
            .merge(routes::reset::create_router(app_state.clone()))
            .merge(routes::openapi::create_router())
            .layer(TraceLayer::new_for_http())
            .layer(from_fn(middlewares::attach_trace_id))
            .layer(from_fn_with_state(
                metrics.clone(),
                middlewares::record_metrics,
            ))
            .layer(OtelInResponseLayer)
            .layer(OtelAxumLayer::default())
            .merge(routes::metrics::create_router(metrics))
            .route("/health", get(health_check))
            .fallback(not_found);

        let server = axum::serve(listener, router);

        Ok(Self { port, server })
    }

    pub async fn run_until_stopped(self) -> Result<()> {
        self.server.await.context("Server failed to start")
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

async fn health_check() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn not_found() -> Error {
    Error::NotFound("Not Found".to_string())
}
