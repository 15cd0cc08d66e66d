use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::helpers::{serve_archive, spawn_app, TestApp, AUTHORIZATION};

async fn wait_for_job(app: &TestApp, id: &str) -> Result<Value> {
    for _ in 0..50 {
        let job: Value = app
            .client
            .get(app.url(&format!("/jobs/{}", id)))
            .header(AUTHORIZATION, &app.admin_token)
            .send()
            .await?
            .json()
            .await?;
        if job["data"]["status"] != "processing" {
            return Ok(job);
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    anyhow::bail!("Job {} never finished", id)
}

#[tokio::test]
async fn test_url_upload_is_ingested() -> Result<()> {
    // Arrange
    let app = spawn_app().await?;
    let archive_url = serve_archive("remote archive").await?;

    // Act
    let response = app
        .upload(
            &app.admin_token,
            json!({"Name": "remote", "Version": "0.1.0", "URL": archive_url}),
        )
        .await?;
    let status = response.status();
    let accepted: Value = response.json().await?;
    let job_id = accepted["data"]["id"].as_str().context("No job id")?;
    let job = wait_for_job(&app, job_id).await?;

    // Assert
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(accepted["data"]["status"], "processing");
    assert_eq!(job["data"]["status"], "completed");
    let version_id = job["data"]["version_id"]
        .as_i64()
        .context("No version id")?
        .to_string();
    let downloaded: Value = app
        .download(&app.admin_token, &version_id)
        .await?
        .json()
        .await?;
    assert_eq!(downloaded["metadata"]["Name"], "remote");
    assert_eq!(downloaded["data"]["URL"], archive_url);

    Ok(())
}

#[tokio::test]
async fn test_unreachable_url_fails_job() -> Result<()> {
    // Arrange
    let app = spawn_app().await?;
    let archive_url = serve_archive("remote archive").await?;
    let missing_url = archive_url.replace("archive.zip", "missing.zip");

    // Act
    let accepted: Value = app
        .upload(
            &app.admin_token,
            json!({"Name": "remote", "Version": "0.1.0", "URL": missing_url}),
        )
        .await?
        .json()
        .await?;
    let job_id = accepted["data"]["id"].as_str().context("No job id")?;
    let job = wait_for_job(&app, job_id).await?;

    // Assert
    assert_eq!(job["data"]["status"], "failed");
    assert!(job["data"]["error"].is_string());

    Ok(())
}

#[tokio::test]
async fn test_unknown_job_returns_404() -> Result<()> {
    // Arrange
    let app = spawn_app().await?;

    // Act
    let response = app
        .client
        .get(app.url(&format!("/jobs/{}", Uuid::new_v4())))
        .header(AUTHORIZATION, &app.admin_token)
        .send()
        .await?;

    // Assert
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    Ok(())
}
