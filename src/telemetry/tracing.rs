use anyhow::{Context, Result};
use opentelemetry::{
    global, propagation::TextMapCompositePropagator, trace::TracerProvider, KeyValue,
};
use opentelemetry_otlp::{Protocol, WithExportConfig};
use opentelemetry_sdk::{
    propagation::{BaggagePropagator, TraceContextPropagator},
    trace::{SdkTracerProvider, Tracer},
    Resource,
};
use opentelemetry_semantic_conventions::resource;
use tokio::{spawn, task::JoinHandle};
use tracing::{level_filters::LevelFilter, Subscriber};
use tracing_loki::BackgroundTask;
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::{layer::SubscriberExt, registry::LookupSpan, EnvFilter, Layer};
use url::Url;

use crate::config::{ApplicationConfig, TelemetryConfig};

/// Flushes spans and stops the Loki shipper when dropped.
pub struct TracingGuard {
    tracer_provider: Option<SdkTracerProvider>,
    loki_handle: Option<JoinHandle<()>>,
}

impl Drop for TracingGuard {
    fn drop(&mut self) {
        if let Some(tracer_provider) = &self.tracer_provider {
            let _ = tracer_provider.force_flush();
            let _ = tracer_provider.shutdown();
        }
        if let Some(loki_handle) = &self.loki_handle {
            loki_handle.abort();
        }
    }
}

pub fn init_subscribers(
    application: &ApplicationConfig,
    telemetry: &TelemetryConfig,
) -> Result<TracingGuard> {
    // Filter
    let env_filter = build_env_filter_layer();

    // Layers
    let logger_text_layer = build_logger_text_layer();
    let loki = telemetry
        .loki_url
        .as_deref()
        .map(|url| build_loki_layer(application, url))
        .transpose()?;
    let (loki_layer, background_task) = loki.unzip();
    let otel = if telemetry.otlp_endpoint.is_some() || telemetry.stdout_spans {
        Some(build_otel_layer(application, telemetry)?)
    } else {
        None
    };
    let (otel_layer, tracer_provider) = otel.unzip();

    // Subscriber
    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(logger_text_layer)
        .with(loki_layer)
        .with(otel_layer);

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install tracing subscriber")?;

    let loki_handle = background_task.map(spawn);

    Ok(TracingGuard {
        tracer_provider,
        loki_handle,
    })
}

fn build_env_filter_layer() -> EnvFilter {
    let mut filter = std::env::var("RUST_LOG")
        .or_else(|_| std::env::var("OTEL_LOG_LEVEL"))
        .unwrap_or_else(|_| LevelFilter::INFO.to_string());

    filter.push_str(",otel::tracing=trace");

    EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .parse_lossy(filter)
}

fn build_logger_text_layer<S>() -> Box<dyn Layer<S> + Send + Sync + 'static>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    Box::new(
        tracing_subscriber::fmt::layer()
            .pretty()
            .with_line_number(true)
            .with_timer(tracing_subscriber::fmt::time::uptime())
            .with_target(true)
            .with_level(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_file(true),
    )
}

fn build_loki_layer(
    application: &ApplicationConfig,
    loki_url: &str,
) -> Result<(tracing_loki::Layer, BackgroundTask)> {
    let (loki_layer, background_task) = tracing_loki::builder()
        .label("service_name", application.name.as_str())?
        .label("version", application.version.as_str())?
        .label(
            "environment",
            std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()),
        )?
        .build_url(Url::parse(loki_url).context("Invalid Loki URL")?)?;

    Ok((loki_layer, background_task))
}

fn build_otel_layer<S>(
    application: &ApplicationConfig,
    telemetry: &TelemetryConfig,
) -> Result<(OpenTelemetryLayer<S, Tracer>, SdkTracerProvider)>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let resource = Resource::builder()
        .with_attribute(KeyValue::new(
            resource::SERVICE_NAME,
            application.name.clone(),
        ))
        .with_attribute(KeyValue::new(
            resource::SERVICE_VERSION,
            application.version.clone(),
        ))
        .build();

    let mut builder = SdkTracerProvider::builder().with_resource(resource);

    if let Some(endpoint) = &telemetry.otlp_endpoint {
        let otlp_exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .with_endpoint(endpoint.clone())
            .with_protocol(Protocol::Grpc)
            .build()
            .context("Failed to build OTLP exporter")?;
        let batch_exporter =
            opentelemetry_sdk::trace::BatchSpanProcessor::builder(otlp_exporter).build();
        builder = builder.with_span_processor(batch_exporter);
    }
    if telemetry.stdout_spans {
        builder = builder.with_simple_exporter(opentelemetry_stdout::SpanExporter::default());
    }

    let tracer_provider = builder.build();

    init_propagator();

    let layer = tracing_opentelemetry::layer()
        .with_error_records_to_exceptions(true)
        .with_tracer(tracer_provider.tracer(application.name.clone()));
    global::set_tracer_provider(tracer_provider.clone());

    Ok((layer, tracer_provider))
}

fn init_propagator() {
    let propagators = TextMapCompositePropagator::new(vec![
        Box::new(TraceContextPropagator::new()),
        Box::new(BaggagePropagator::new()),
    ]);

    global::set_text_map_propagator(propagators);
}

#[derive(Debug, Clone, Copy)]
pub enum Operation {
    Insert,
    Update,
    Delete,
    Select,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

pub fn instrument_query(operation: Operation, table_name: &str) -> tracing::Span {
    tracing::debug_span!(
        "db_query",
        db.system = "postgres",
        db.operation = %operation,
        db.table = table_name,
        otel.name = format!("{:?}.{}", operation, table_name),
        otel.kind = "CLIENT",
        otel.status_code = tracing::field::Empty,
    )
}
