use std::sync::Arc;

use async_trait::async_trait;
use lapin::Connection;
use tokio::sync::mpsc;
use tracing::instrument;

use crate::{error::Error, services::rabbitmq, types::IngestMessage};

/// Where URL uploads are handed off to the ingestion worker.
#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn publish(&self, message: &IngestMessage) -> Result<(), Error>;
}

pub struct RabbitMqQueue {
    connection: Arc<Connection>,
    exchange_name: String,
    routing_key: String,
}

impl RabbitMqQueue {
    pub fn new(connection: Arc<Connection>, exchange_name: String, routing_key: String) -> Self {
        Self {
            connection,
            exchange_name,
            routing_key,
        }
    }
}

#[async_trait]
impl JobQueue for RabbitMqQueue {
    #[instrument(name = "queue_publish", skip_all, fields(job_id = %message.job_id))]
    async fn publish(&self, message: &IngestMessage) -> Result<(), Error> {
        let channel = self.connection.create_channel().await?;
        rabbitmq::publish_message(&channel, &self.exchange_name, &self.routing_key, message)
            .await?;

        Ok(())
    }
}

/// In-process queue for the memory backend.
pub struct LocalQueue {
    sender: mpsc::UnboundedSender<IngestMessage>,
}

impl LocalQueue {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<IngestMessage>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl JobQueue for LocalQueue {
    async fn publish(&self, message: &IngestMessage) -> Result<(), Error> {
        self.sender
            .send(message.clone())
            .map_err(|_| anyhow::anyhow!("Ingestion worker is not running"))?;

        Ok(())
    }
}
