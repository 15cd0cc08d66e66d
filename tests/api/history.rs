use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

use crate::helpers::{spawn_app, TestApp, AUTHORIZATION};

async fn history(app: &TestApp, name: &str, action: &str) -> Result<reqwest::Response> {
    let response = app
        .client
        .get(app.url(&format!("/package/byName/{}/history?action={}", name, action)))
        .header(AUTHORIZATION, &app.admin_token)
        .send()
        .await?;

    Ok(response)
}

#[tokio::test]
async fn test_actions_are_recorded_per_user() -> Result<()> {
    // Arrange
    let app = spawn_app().await?;
    let id = app.upload_content("alpha", "1.0.0", None).await?;
    let reader = app.create_user(false, true, true).await?;
    app.download(&reader, &id).await?;
    app.search(&reader, json!([{"Name": "alpha"}]), None).await?;

    // Act
    let uploads: Vec<Value> = history(&app, "alpha", "UPLOAD").await?.json().await?;
    let downloads: Vec<Value> = history(&app, "alpha", "DOWNLOAD").await?.json().await?;
    let searches: Vec<Value> = history(&app, "alpha", "search").await?.json().await?;

    // Assert
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0]["User"], "admin");
    assert_eq!(downloads.len(), 1);
    assert_ne!(downloads[0]["User"], "admin");
    assert!(downloads[0]["Date"].is_string());
    assert_eq!(searches.len(), 1);
    assert_eq!(searches[0]["User"], downloads[0]["User"]);

    Ok(())
}

#[tokio::test]
async fn test_history_without_entries_is_empty() -> Result<()> {
    // Arrange
    let app = spawn_app().await?;
    app.upload_content("alpha", "1.0.0", None).await?;

    // Act
    let response = history(&app, "alpha", "RATE").await?;

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    let body: Vec<Value> = response.json().await?;
    assert!(body.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_history_rejects_unknown_action() -> Result<()> {
    // Arrange
    let app = spawn_app().await?;

    // Act
    let unknown = history(&app, "alpha", "DELETE").await?;
    let missing = app
        .client
        .get(app.url("/package/byName/alpha/history"))
        .header(AUTHORIZATION, &app.admin_token)
        .send()
        .await?;

    // Assert
    assert_eq!(unknown.status(), StatusCode::BAD_REQUEST);
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);

    Ok(())
}
