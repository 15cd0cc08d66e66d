use anyhow::Result;
use package_registry::{
    app::Application,
    config::Config,
    telemetry::{init_subscribers, Metrics},
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let configuration = Config::build()?;
    let _guard = init_subscribers(&configuration.application, &configuration.telemetry)?;

    let metrics = Metrics::build()?;
    let application = Application::build(configuration, metrics).await?;
    tracing::info!(port = application.api.port(), "Package registry listening");

    application.run_until_stopped().await?;

    Ok(())
}
