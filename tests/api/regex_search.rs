use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

use crate::helpers::{spawn_app, AUTHORIZATION};

#[tokio::test]
async fn test_regex_matches_names_and_readmes() -> Result<()> {
    // Arrange
    let app = spawn_app().await?;
    app.upload_content("test-a", "1.0.0", None).await?;
    app.upload_content("best-b", "1.0.0", Some("Helpers for test harnesses"))
        .await?;
    app.upload_content("other", "1.0.0", None).await?;

    // Act
    let anchored = app
        .client
        .post(app.url("/package/byRegEx"))
        .header(AUTHORIZATION, &app.admin_token)
        .json(&json!({"RegEx": "^test"}))
        .send()
        .await?;
    let anywhere = app
        .client
        .post(app.url("/package/byRegEx"))
        .header(AUTHORIZATION, &app.admin_token)
        .json(&json!({"RegEx": "test"}))
        .send()
        .await?;

    // Assert
    assert_eq!(anchored.status(), StatusCode::OK);
    let anchored: Vec<Value> = anchored.json().await?;
    let names: Vec<&str> = anchored.iter().filter_map(|hit| hit["Name"].as_str()).collect();
    assert_eq!(names, vec!["test-a"]);

    let anywhere: Vec<Value> = anywhere.json().await?;
    let names: Vec<&str> = anywhere.iter().filter_map(|hit| hit["Name"].as_str()).collect();
    assert_eq!(names, vec!["test-a", "best-b"]);

    Ok(())
}

#[tokio::test]
async fn test_invalid_regex_returns_400() -> Result<()> {
    // Arrange
    let app = spawn_app().await?;

    // Act
    let response = app
        .client
        .post(app.url("/package/byRegEx"))
        .header(AUTHORIZATION, &app.admin_token)
        .json(&json!({"RegEx": "(unclosed"}))
        .send()
        .await?;

    // Assert
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn test_regex_without_matches_returns_empty_list() -> Result<()> {
    // Arrange
    let app = spawn_app().await?;
    app.upload_content("alpha", "1.0.0", None).await?;

    // Act
    let response = app
        .client
        .post(app.url("/package/byRegEx"))
        .header(AUTHORIZATION, &app.admin_token)
        .json(&json!({"RegEx": "^zzz$"}))
        .send()
        .await?;

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    let body: Vec<Value> = response.json().await?;
    assert!(body.is_empty());

    Ok(())
}
