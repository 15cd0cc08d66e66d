use anyhow::Result;
use base64::{prelude::BASE64_STANDARD, Engine};
use reqwest::StatusCode;
use serde_json::{json, Value};

use crate::helpers::spawn_app;

#[tokio::test]
async fn test_content_upload_can_be_downloaded() -> Result<()> {
    // Arrange
    let app = spawn_app().await?;
    let content = BASE64_STANDARD.encode(b"PK\x03\x04 archive bytes");

    // Act
    let upload = app
        .upload(
            &app.admin_token,
            json!({"Name": "alpha", "Version": "1.2.3", "Content": content}),
        )
        .await?;
    let upload_status = upload.status();
    let uploaded: Value = upload.json().await?;
    let id = uploaded["metadata"]["ID"].as_str().unwrap_or_default();
    let download = app.download(&app.admin_token, id).await?;

    // Assert
    assert_eq!(upload_status, StatusCode::CREATED);
    assert_eq!(uploaded["metadata"]["Name"], "alpha");
    assert_eq!(download.status(), StatusCode::OK);
    let downloaded: Value = download.json().await?;
    assert_eq!(downloaded["metadata"]["Version"], "1.2.3");
    assert_eq!(downloaded["data"]["Content"], content);

    Ok(())
}

#[tokio::test]
async fn test_duplicate_version_returns_409() -> Result<()> {
    // Arrange
    let app = spawn_app().await?;
    app.upload_content("alpha", "1.0.0", None).await?;

    // Act
    let content = app
        .upload(
            &app.admin_token,
            json!({"Name": "alpha", "Version": "1.0.0", "Content": BASE64_STANDARD.encode("again")}),
        )
        .await?;
    let by_url = app
        .upload(
            &app.admin_token,
            json!({"Name": "alpha", "Version": "1.0.0", "URL": "http://127.0.0.1:1/alpha.zip"}),
        )
        .await?;

    // Assert
    assert_eq!(content.status(), StatusCode::CONFLICT);
    assert_eq!(by_url.status(), StatusCode::CONFLICT);

    Ok(())
}

#[tokio::test]
async fn test_malformed_uploads_return_400() -> Result<()> {
    // Arrange
    let app = spawn_app().await?;
    let content = BASE64_STANDARD.encode("zip");

    for body in [
        json!({"Name": "alpha", "Version": "1.0.0"}),
        json!({"Name": "alpha", "Version": "1.0.0", "Content": content, "URL": "http://localhost/a.zip"}),
        json!({"Name": "alpha", "Version": "not-a-version", "Content": content}),
        json!({"Name": "*", "Version": "1.0.0", "Content": content}),
        json!({"Name": "alpha", "Version": "1.0.0", "Content": "%%% not base64 %%%"}),
        json!({"Name": "alpha", "Version": "1.0.0", "URL": "not a url"}),
    ] {
        // Act
        let response = app.upload(&app.admin_token, body.clone()).await?;

        // Assert
        assert_eq!(
            response.status(),
            StatusCode::BAD_REQUEST,
            "{} should be rejected",
            body
        );
    }

    Ok(())
}

#[tokio::test]
async fn test_invalid_package_id_returns_400() -> Result<()> {
    // Arrange
    let app = spawn_app().await?;

    // Act
    let response = app.download(&app.admin_token, "abc").await?;

    // Assert
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    Ok(())
}
