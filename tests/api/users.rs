use anyhow::Result;
use base64::{prelude::BASE64_STANDARD, Engine};
use reqwest::StatusCode;
use serde_json::{json, Value};

use crate::helpers::{spawn_app, AUTHORIZATION};

#[tokio::test]
async fn test_permissions_are_enforced() -> Result<()> {
    // Arrange
    let app = spawn_app().await?;
    let id = app.upload_content("alpha", "1.0.0", None).await?;
    let searcher = app.create_user(false, true, false).await?;

    // Act
    let search = app.search(&searcher, json!([{"Name": "alpha"}]), None).await?;
    let download = app.download(&searcher, &id).await?;
    let upload = app
        .upload(
            &searcher,
            json!({"Name": "beta", "Version": "1.0.0", "Content": BASE64_STANDARD.encode("zip")}),
        )
        .await?;

    // Assert
    assert_eq!(search.status(), StatusCode::OK);
    assert_eq!(download.status(), StatusCode::FORBIDDEN);
    assert_eq!(upload.status(), StatusCode::FORBIDDEN);

    Ok(())
}

#[tokio::test]
async fn test_bearer_prefix_is_accepted() -> Result<()> {
    // Arrange
    let app = spawn_app().await?;
    let token = format!("Bearer {}", app.admin_token);

    // Act
    let response = app.search(&token, json!([{"Name": "alpha"}]), None).await?;

    // Assert
    assert_eq!(response.status(), StatusCode::OK);

    Ok(())
}

#[tokio::test]
async fn test_unknown_token_returns_401() -> Result<()> {
    // Arrange
    let app = spawn_app().await?;

    // Act
    let response = app.download("not-a-token", "1").await?;

    // Assert
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    Ok(())
}

#[tokio::test]
async fn test_only_admins_create_users() -> Result<()> {
    // Arrange
    let app = spawn_app().await?;
    let uploader = app.create_user(true, true, true).await?;

    // Act
    let response = app
        .client
        .post(app.url("/users"))
        .header(AUTHORIZATION, &uploader)
        .json(&json!({"username": "mallory", "group": "x"}))
        .send()
        .await?;

    // Assert
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    Ok(())
}

#[tokio::test]
async fn test_duplicate_username_returns_409() -> Result<()> {
    // Arrange
    let app = spawn_app().await?;
    let body = json!({"username": "ada", "group": "eng", "permissions": {"search": true}});
    let first = app
        .client
        .post(app.url("/users"))
        .header(AUTHORIZATION, &app.admin_token)
        .json(&body)
        .send()
        .await?;

    // Act
    let second = app
        .client
        .post(app.url("/users"))
        .header(AUTHORIZATION, &app.admin_token)
        .json(&body)
        .send()
        .await?;

    // Assert
    assert_eq!(first.status(), StatusCode::CREATED);
    let created: Value = first.json().await?;
    assert_eq!(created["data"]["group"], "eng");
    assert_eq!(created["data"]["permissions"]["search"], true);
    assert_eq!(created["data"]["permissions"]["upload"], false);
    assert_eq!(second.status(), StatusCode::CONFLICT);

    Ok(())
}
