use std::sync::Arc;

use anyhow::{Context, Result};
use lapin::{
    message::DeliveryResult,
    options::{BasicAckOptions, BasicNackOptions},
    types::FieldTable,
    Connection,
};
use opentelemetry::global;
use tokio::sync::mpsc;
use tracing::{info_span, instrument, Instrument};
use tracing_opentelemetry::OpenTelemetrySpanExt;

use crate::{
    archive::ArchiveStore,
    db::{JobStore, Store},
    error::Error,
    models::{job::IngestJob, version::Version},
    services::rabbitmq::{self, FieldTableExtractor},
    telemetry::Metrics,
    types::IngestMessage,
    upload::{self, Publication},
};

/// Fetches URL uploads and turns them into stored versions.
pub struct Ingestor {
    store: Arc<dyn Store>,
    archives: Arc<dyn ArchiveStore>,
    http_client: reqwest::Client,
    metrics: Arc<Metrics>,
}

impl Ingestor {
    pub fn new(
        store: Arc<dyn Store>,
        archives: Arc<dyn ArchiveStore>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            store,
            archives,
            http_client: reqwest::Client::new(),
            metrics,
        }
    }

    /// Runs one job to completion and records the outcome on it. Only a
    /// failure to update the job itself is returned as an error.
    #[instrument(
        name = "ingest",
        skip_all,
        fields(job_id = %message.job_id, name = %message.package_name, version = %message.package_version)
    )]
    pub async fn ingest(&self, message: IngestMessage) -> Result<IngestJob, Error> {
        let job_id = message.job_id;

        match self.fetch_and_publish(message).await {
            Ok(version) => {
                self.metrics.ingest_jobs_total("completed").inc();
                self.store.complete_job(job_id, version.id).await
            }
            Err(err) => {
                tracing::warn!(error = %err, "Ingestion failed");
                self.metrics.ingest_jobs_total("failed").inc();
                self.store.fail_job(job_id, &err.to_string()).await
            }
        }
    }

    async fn fetch_and_publish(&self, message: IngestMessage) -> Result<Version, Error> {
        let response = self
            .http_client
            .get(&message.url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .with_context(|| format!("Failed to fetch {}", message.url))?;
        let content = response
            .bytes()
            .await
            .with_context(|| format!("Failed to read {}", message.url))?;

        upload::publish_version(
            &*self.store,
            &*self.archives,
            Publication {
                name: message.package_name,
                version: message.package_version,
                author: message.author,
                access_level: message.access_level,
                readme: message.readme,
                package_url: Some(message.url),
                content: content.to_vec(),
            },
        )
        .await
    }
}

pub enum JobSource {
    RabbitMq {
        connection: Arc<Connection>,
        queue_name: String,
    },
    Local(mpsc::UnboundedReceiver<IngestMessage>),
}

pub struct Worker {
    source: JobSource,
    ingestor: Arc<Ingestor>,
}

impl Worker {
    pub fn new(source: JobSource, ingestor: Ingestor) -> Self {
        Self {
            source,
            ingestor: Arc::new(ingestor),
        }
    }

    pub async fn run_until_stopped(self) -> Result<()> {
        match self.source {
            JobSource::RabbitMq {
                connection,
                queue_name,
            } => consume_rabbitmq(connection, &queue_name, self.ingestor).await,
            JobSource::Local(mut receiver) => {
                while let Some(message) = receiver.recv().await {
                    if let Err(err) = self.ingestor.ingest(message).await {
                        tracing::error!("Failed to update ingestion job: {:?}", err);
                    }
                }

                Ok(())
            }
        }
    }
}

async fn consume_rabbitmq(
    connection: Arc<Connection>,
    queue_name: &str,
    ingestor: Arc<Ingestor>,
) -> Result<()> {
    let channel = connection
        .create_channel()
        .await
        .context("Failed to open worker channel")?;
    let consumer = rabbitmq::create_consumer(&channel, queue_name).await?;

    consumer.set_delegate(move |delivery: DeliveryResult| {
        let ingestor = ingestor.clone();

        async move {
            let delivery = match delivery {
                Ok(Some(delivery)) => delivery,
                Ok(None) => return,
                Err(error) => {
                    tracing::error!("Failed to consume queue message: {}", error);
                    return;
                }
            };

            let outcome = parse_and_ingest(
                &delivery.data,
                delivery.properties.headers(),
                &ingestor,
            )
            .await;

            let acknowledged = match outcome {
                Ok(_) => delivery.ack(BasicAckOptions::default()).await,
                Err(err) => {
                    tracing::error!("Failed to process message: {:?}", err);
                    delivery
                        .nack(BasicNackOptions {
                            multiple: false,
                            requeue: false,
                        })
                        .await
                }
            };
            if let Err(err) = acknowledged {
                tracing::error!("Failed to acknowledge message: {:?}", err);
            }
        }
    });

    std::future::pending::<()>().await;

    Ok(())
}

async fn parse_and_ingest(
    data: &[u8],
    headers: &Option<FieldTable>,
    ingestor: &Ingestor,
) -> Result<IngestJob> {
    let message = serde_json::from_slice::<IngestMessage>(data)?;

    let span = info_span!("consumer", job_id = %message.job_id);
    if let Some(headers) = headers {
        let context =
            global::get_text_map_propagator(|prop| prop.extract(&FieldTableExtractor(headers)));
        span.set_parent(context);
    }

    let job = ingestor.ingest(message).instrument(span).await?;

    Ok(job)
}
