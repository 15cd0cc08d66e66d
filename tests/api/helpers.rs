use anyhow::{Context, Result};
use axum::{routing::get, Router};
use base64::{prelude::BASE64_STANDARD, Engine};
use fake::{faker::internet::en::Username, Fake};
use package_registry::{
    app::Application,
    config::{Config, StorageBackend},
    telemetry::Metrics,
};
use reqwest::{Client, Response};
use secrecy::SecretString;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use uuid::Uuid;

pub const AUTHORIZATION: &str = "X-Authorization";

pub struct TestApp {
    pub address: String,
    pub admin_token: String,
    pub client: Client,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub async fn search(&self, token: &str, queries: Value, offset: Option<&str>) -> Result<Response> {
        let url = match offset {
            Some(offset) => self.url(&format!("/packages?offset={}", offset)),
            None => self.url("/packages"),
        };
        let response = self
            .client
            .post(url)
            .header(AUTHORIZATION, token)
            .json(&queries)
            .send()
            .await?;

        Ok(response)
    }

    pub async fn upload(&self, token: &str, body: Value) -> Result<Response> {
        let response = self
            .client
            .post(self.url("/package"))
            .header(AUTHORIZATION, token)
            .json(&body)
            .send()
            .await?;

        Ok(response)
    }

    /// Uploads inline content as the admin and returns the new version id.
    pub async fn upload_content(&self, name: &str, version: &str, readme: Option<&str>) -> Result<String> {
        let response = self
            .upload(
                &self.admin_token,
                json!({
                    "Name": name,
                    "Version": version,
                    "Content": BASE64_STANDARD.encode(format!("{}@{}", name, version)),
                    "Readme": readme,
                }),
            )
            .await?;
        anyhow::ensure!(
            response.status().as_u16() == 201,
            "Upload failed with {}",
            response.status()
        );

        let body: Value = response.json().await?;
        let id = body["metadata"]["ID"]
            .as_str()
            .context("Upload response has no ID")?
            .to_string();

        Ok(id)
    }

    pub async fn download(&self, token: &str, id: &str) -> Result<Response> {
        let response = self
            .client
            .get(self.url(&format!("/package/{}", id)))
            .header(AUTHORIZATION, token)
            .send()
            .await?;

        Ok(response)
    }

    /// Registers a non-admin user and returns their token.
    pub async fn create_user(&self, upload: bool, search: bool, download: bool) -> Result<String> {
        let username: String = Username().fake();
        let response = self
            .client
            .post(self.url("/users"))
            .header(AUTHORIZATION, &self.admin_token)
            .json(&json!({
                "username": format!("{}-{}", username, Uuid::new_v4()),
                "group": "testers",
                "permissions": {"upload": upload, "search": search, "download": download},
            }))
            .send()
            .await?;
        anyhow::ensure!(
            response.status().as_u16() == 201,
            "User creation failed with {}",
            response.status()
        );

        let body: Value = response.json().await?;
        let token = body["data"]["token"]
            .as_str()
            .context("User response has no token")?
            .to_string();

        Ok(token)
    }
}

pub async fn spawn_app() -> Result<TestApp> {
    dotenvy::dotenv().ok();

    let admin_token = Uuid::new_v4().to_string();
    let configuration = {
        let mut configuration = Config::build()?;
        configuration.storage.backend = StorageBackend::Memory;
        configuration.application.host = "127.0.0.1".to_string();
        configuration.application.port = 0;
        configuration.auth.admin_token = SecretString::from(admin_token.clone());
        configuration
    };

    let metrics = Metrics::build()?;
    let application = Application::build(configuration, metrics)
        .await
        .context("Failed to build application.")?;
    let port = application.api.port();
    let address = format!("http://127.0.0.1:{}", port);
    let _ = tokio::spawn(application.run_until_stopped());

    Ok(TestApp {
        address,
        admin_token,
        client: Client::new(),
    })
}

/// Serves `body` at `/archive.zip` on a random port and returns its URL.
pub async fn serve_archive(body: &'static str) -> Result<String> {
    let router = Router::new().route("/archive.zip", get(move || async move { body }));
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let port = listener.local_addr()?.port();
    let _ = tokio::spawn(async move { axum::serve(listener, router).await });

    Ok(format!("http://127.0.0.1:{}/archive.zip", port))
}
