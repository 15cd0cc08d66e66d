use std::sync::Arc;

use anyhow::Context;
use axum::{extract::State, routing::get, Router};
use prometheus::{Encoder, TextEncoder};

use crate::{error::Error, telemetry::Metrics};

pub fn create_router(metrics: Arc<Metrics>) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metrics)
}

async fn metrics_handler(State(metrics): State<Arc<Metrics>>) -> Result<String, Error> {
    let metrics = metrics.registry.gather();
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&metrics, &mut buffer)
        .context("Failed to encode metrics")?;

    Ok(String::from_utf8(buffer).context("Metrics are not valid UTF-8")?)
}
