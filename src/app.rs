use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::{postgres::PgPoolOptions, Pool, Postgres};

use crate::{
    api::{types::AppState, Api},
    archive::{ArchiveStore, MemoryArchiveStore},
    auth,
    config::{Config, DatabaseConfig, StorageBackend},
    db::{MemoryStore, PgStore, Store},
    queue::{JobQueue, LocalQueue, RabbitMqQueue},
    services::{
        minio::{self, S3ArchiveStore},
        rabbitmq,
    },
    telemetry::Metrics,
    worker::{Ingestor, JobSource, Worker},
};

pub struct Application {
    pub api: Api,
    worker: Worker,
}

/// The collaborators one storage backend provides.
struct Backend {
    store: Arc<dyn Store>,
    archives: Arc<dyn ArchiveStore>,
    queue: Arc<dyn JobQueue>,
    source: JobSource,
}

impl Application {
    pub async fn build(configuration: Config, metrics: Metrics) -> Result<Self> {
        let metrics = Arc::new(metrics);

        let backend = match configuration.storage.backend {
            StorageBackend::Postgres => postgres_backend(&configuration).await?,
            StorageBackend::Memory => memory_backend(),
        };
        tracing::info!(backend = ?configuration.storage.backend, "Storage backend ready");

        auth::bootstrap_admin(&*backend.store, &configuration.auth)
            .await
            .context("Failed to create bootstrap admin")?;

        let ingestor = Ingestor::new(
            backend.store.clone(),
            backend.archives.clone(),
            metrics.clone(),
        );
        let worker = Worker::new(backend.source, ingestor);

        let app_state = Arc::new(AppState {
            store: backend.store,
            archives: backend.archives,
            queue: backend.queue,
            metrics,
        });
        let api = Api::build(&configuration.application, app_state).await?;

        Ok(Self { api, worker })
    }

    pub async fn run_until_stopped(self) -> Result<()> {
        tokio::select! {
            result = self.api.run_until_stopped() => result,
            result = self.worker.run_until_stopped() => result,
        }
    }
}

async fn postgres_backend(configuration: &Config) -> Result<Backend> {
    let db_pool = get_db_pool(&configuration.database);
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .context("Failed to run migrations")?;

    let minio_client = minio::create_client(&configuration.minio).await?;
    minio::ensure_bucket(&minio_client, &configuration.minio.bucket_name).await?;

    let rabbitmq_config = &configuration.rabbitmq;
    let rabbitmq_connection = Arc::new(rabbitmq::connect(rabbitmq_config).await?);
    let channel = rabbitmq_connection.create_channel().await?;
    rabbitmq::declare_exchange(&channel, &rabbitmq_config.exchange_name).await?;
    rabbitmq::declare_queue(
        &channel,
        &rabbitmq_config.exchange_name,
        &rabbitmq_config.ingest_queue,
    )
    .await?;

    Ok(Backend {
        store: Arc::new(PgStore::new(db_pool)),
        archives: Arc::new(S3ArchiveStore::new(
            minio_client,
            configuration.minio.bucket_name.clone(),
        )),
        queue: Arc::new(RabbitMqQueue::new(
            rabbitmq_connection.clone(),
            rabbitmq_config.exchange_name.clone(),
            rabbitmq_config.ingest_queue.clone(),
        )),
        source: JobSource::RabbitMq {
            connection: rabbitmq_connection,
            queue_name: rabbitmq_config.ingest_queue.clone(),
        },
    })
}

fn memory_backend() -> Backend {
    let (queue, receiver) = LocalQueue::new();

    Backend {
        store: Arc::new(MemoryStore::new()),
        archives: Arc::new(MemoryArchiveStore::new()),
        queue: Arc::new(queue),
        source: JobSource::Local(receiver),
    }
}

pub fn get_db_pool(config: &DatabaseConfig) -> Pool<Postgres> {
    PgPoolOptions::new().connect_lazy_with(config.connect_options())
}
