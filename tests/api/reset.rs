use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

use crate::helpers::{spawn_app, AUTHORIZATION};

#[tokio::test]
async fn test_reset_clears_registry_but_keeps_users() -> Result<()> {
    // Arrange
    let app = spawn_app().await?;
    let id = app.upload_content("alpha", "1.0.0", None).await?;
    let reader = app.create_user(false, true, true).await?;

    // Act
    let response = app
        .client
        .delete(app.url("/reset"))
        .header(AUTHORIZATION, &app.admin_token)
        .send()
        .await?;

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    let search = app.search(&reader, json!([{"Name": "*"}]), None).await?;
    assert_eq!(search.status(), StatusCode::OK);
    let body: Vec<Value> = search.json().await?;
    assert!(body.is_empty());
    let download = app.download(&reader, &id).await?;
    assert_eq!(download.status(), StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn test_reset_requires_admin() -> Result<()> {
    // Arrange
    let app = spawn_app().await?;
    let reader = app.create_user(true, true, true).await?;

    // Act
    let response = app
        .client
        .delete(app.url("/reset"))
        .header(AUTHORIZATION, &reader)
        .send()
        .await?;

    // Assert
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    Ok(())
}
