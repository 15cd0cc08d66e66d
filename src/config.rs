use anyhow::{Context, Result};
use aws_sdk_s3::config::Credentials;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_aux::prelude::*;
use sqlx::postgres::{PgConnectOptions, PgSslMode};

#[derive(Deserialize)]
pub struct Config {
    pub application: ApplicationConfig,
    pub storage: StorageConfig,
    pub database: DatabaseConfig,
    pub rabbitmq: RabbitMQConfig,
    pub minio: MinioConfig,
    pub auth: AuthConfig,
    pub telemetry: TelemetryConfig,
}

#[derive(Deserialize)]
pub struct ApplicationConfig {
    pub name: String,
    pub version: String,
    pub host: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
}

#[derive(Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
}

/// Which collaborators back the registry: Postgres + MinIO + RabbitMQ, or
/// everything in-process.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    Memory,
}

#[derive(Deserialize)]
pub struct DatabaseConfig {
    pub host: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub username: SecretString,
    pub password: SecretString,
    pub database_name: String,
    #[serde(deserialize_with = "deserialize_bool_from_anything")]
    pub require_ssl: bool,
}

#[derive(Deserialize)]
pub struct RabbitMQConfig {
    pub url: String,
    pub exchange_name: String,
    pub ingest_queue: String,
}

#[derive(Deserialize)]
pub struct MinioConfig {
    pub url: String,
    pub username: SecretString,
    pub password: SecretString,
    pub bucket_name: String,
}

#[derive(Deserialize)]
pub struct AuthConfig {
    pub admin_username: String,
    pub admin_group: String,
    pub admin_token: SecretString,
}

#[derive(Deserialize, Default)]
pub struct TelemetryConfig {
    pub loki_url: Option<String>,
    pub otlp_endpoint: Option<String>,
    #[serde(default)]
    pub stdout_spans: bool,
}

impl MinioConfig {
    pub fn credentials(&self) -> Credentials {
        Credentials::new(
            self.username.expose_secret(),
            self.password.expose_secret(),
            None,
            None,
            "minio0",
        )
    }
}

impl DatabaseConfig {
    pub fn connect_options(&self) -> PgConnectOptions {
        self.connect_options_root().database(&self.database_name)
    }

    pub fn connect_options_root(&self) -> PgConnectOptions {
        let ssl_mode = if self.require_ssl {
            PgSslMode::Require
        } else {
            PgSslMode::Prefer
        };

        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(self.username.expose_secret())
            .password(self.password.expose_secret())
            .ssl_mode(ssl_mode)
    }
}

impl Config {
    pub fn build() -> Result<Self> {
        let base_path = std::env::current_dir().context("Failed to determine current directory")?;
        let configuration_directory = base_path.join("configs");

        let environment: Environment = std::env::var("APP_ENVIRONMENT")
            .unwrap_or_else(|_| "dev".into())
            .try_into()
            .map_err(anyhow::Error::msg)
            .context("Failed to parse APP_ENVIRONMENT")?;
        let environment_filename = format!("{}.toml", environment.as_str());

        let mut settings = config::Config::builder()
            .add_source(config::File::from(
                configuration_directory.join("base.toml"),
            ))
            .add_source(
                config::File::from(configuration_directory.join(environment_filename))
                    .required(false),
            )
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .set_override("application.name", env!("CARGO_PKG_NAME"))?
            .set_override("application.version", env!("CARGO_PKG_VERSION"))?;

        for (variable, key) in [
            ("POSTGRES_HOST", "database.host"),
            ("POSTGRES_PORT", "database.port"),
            ("POSTGRES_USER", "database.username"),
            ("POSTGRES_PASSWORD", "database.password"),
            ("POSTGRES_DB", "database.database_name"),
            ("POSTGRES_REQUIRE_SSL", "database.require_ssl"),
            ("RABBITMQ_URL", "rabbitmq.url"),
            ("RABBITMQ_EXCHANGE_NAME", "rabbitmq.exchange_name"),
            ("MINIO_URL", "minio.url"),
            ("MINIO_BUCKET_NAME", "minio.bucket_name"),
            ("LOGGING_LOKI_URL", "telemetry.loki_url"),
            ("OTEL_EXPORTER_OTLP_ENDPOINT", "telemetry.otlp_endpoint"),
        ] {
            if let Some(value) = get_env_var(variable) {
                settings = settings.set_override(key, value)?;
            }
        }

        let settings = settings.build().context("Failed to build configuration")?;

        settings
            .try_deserialize::<Config>()
            .context("Failed to deserialize configuration")
    }
}

fn get_env_var(name: &str) -> Option<String> {
    let var = std::env::var(name).ok()?;
    if var.is_empty() {
        return None;
    }
    Some(var)
}

#[derive(Debug, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
    Staging,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "dev",
            Environment::Production => "production",
            Environment::Staging => "staging",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "dev" => Ok(Environment::Development),
            "production" => Ok(Environment::Production),
            "staging" => Ok(Environment::Staging),
            other => Err(format!("{} is not a valid environment", other)),
        }
    }
}
