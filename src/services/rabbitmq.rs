use anyhow::Result;
use lapin::{
    options::{
        BasicConsumeOptions, BasicPublishOptions, ExchangeDeclareOptions, QueueBindOptions,
        QueueDeclareOptions,
    },
    types::{AMQPValue, FieldTable, ShortString},
    BasicProperties, Channel, Connection, ConnectionProperties, Consumer, ExchangeKind,
};
use opentelemetry::{
    global,
    propagation::{Extractor, Injector},
};
use serde::Serialize;
use tracing::{debug_span, instrument, Instrument};
use tracing_opentelemetry::OpenTelemetrySpanExt;

use crate::config::RabbitMQConfig;

#[instrument(name = "rabbitmq_connect", skip_all)]
pub async fn connect(config: &RabbitMQConfig) -> Result<Connection> {
    let connection = Connection::connect(&config.url, ConnectionProperties::default()).await?;

    Ok(connection)
}

#[instrument(name = "declare_exchange", skip(channel))]
pub async fn declare_exchange(channel: &Channel, exchange_name: &str) -> Result<()> {
    channel
        .exchange_declare(
            exchange_name,
            ExchangeKind::Direct,
            ExchangeDeclareOptions {
                durable: true,
                ..ExchangeDeclareOptions::default()
            },
            FieldTable::default(),
        )
        .await?;

    Ok(())
}

/// Declares a durable queue bound to `exchange_name`, routed by its own name.
#[instrument(name = "declare_queue", skip(channel))]
pub async fn declare_queue(channel: &Channel, exchange_name: &str, queue_name: &str) -> Result<()> {
    channel
        .queue_declare(
            queue_name,
            QueueDeclareOptions {
                durable: true,
                ..QueueDeclareOptions::default()
            },
            FieldTable::default(),
        )
        .await?;

    channel
        .queue_bind(
            queue_name,
            exchange_name,
            queue_name,
            QueueBindOptions::default(),
            FieldTable::default(),
        )
        .await?;

    Ok(())
}

#[instrument(name = "create_consumer", skip(channel))]
pub async fn create_consumer(channel: &Channel, queue_name: &str) -> Result<Consumer> {
    let consumer = channel
        .basic_consume(
            queue_name,
            &format!("{}_consumer", queue_name),
            BasicConsumeOptions::default(),
            FieldTable::default(),
        )
        .await?;

    Ok(consumer)
}

struct HeaderInjector<'a> {
    headers: &'a mut FieldTable,
}

impl Injector for HeaderInjector<'_> {
    fn set(&mut self, key: &str, value: String) {
        self.headers
            .insert(key.into(), AMQPValue::LongString(value.into()));
    }
}

/// Reads trace context back out of AMQP headers.
pub struct FieldTableExtractor<'a>(pub &'a FieldTable);

impl Extractor for FieldTableExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        let key = ShortString::from(key.to_string());
        self.0.inner().get(&key).and_then(|value| match value {
            AMQPValue::LongString(s) => std::str::from_utf8(s.as_bytes()).ok(),
            _ => None,
        })
    }

    fn keys(&self) -> Vec<&str> {
        self.0.inner().keys().map(|k| k.as_str()).collect()
    }
}

#[instrument(name = "publish_message", skip_all, fields(exchange = %exchange, routing_key = %routing_key))]
pub async fn publish_message<T: Serialize>(
    channel: &Channel,
    exchange: &str,
    routing_key: &str,
    payload: &T,
) -> Result<()> {
    let payload = serde_json::to_vec(payload)?;

    let mut headers = FieldTable::default();
    let current_context = tracing::Span::current().context();

    global::get_text_map_propagator(|propagator| {
        propagator.inject_context(
            &current_context,
            &mut HeaderInjector {
                headers: &mut headers,
            },
        );
    });

    let span = debug_span!(
        "rabbitmq_publish",
        exchange = %exchange,
        routing_key = %routing_key,
    );

    channel
        .basic_publish(
            exchange,
            routing_key,
            BasicPublishOptions::default(),
            &payload,
            BasicProperties::default()
                .with_delivery_mode(2) // persistent
                .with_headers(headers)
                .with_content_type("application/json".into()),
        )
        .instrument(span)
        .await?;

    Ok(())
}
