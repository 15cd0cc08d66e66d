use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

use crate::helpers::spawn_app;

#[tokio::test]
async fn metrics_endpoint_returns_200() -> Result<()> {
    // Arrange
    let app = spawn_app().await?;

    // Act
    let response = app.client.get(app.url("/metrics")).send().await?;

    // Assert
    assert_eq!(response.status(), StatusCode::OK);

    Ok(())
}

#[tokio::test]
async fn metrics_count_requests_and_searches() -> Result<()> {
    // Arrange
    let app = spawn_app().await?;
    app.upload_content("alpha", "1.0.0", None).await?;
    app.search(&app.admin_token, json!([{"Name": "alpha"}]), None)
        .await?;

    // Act
    let body = app
        .client
        .get(app.url("/metrics"))
        .send()
        .await?
        .text()
        .await?;

    // Assert
    assert!(body.contains("http_requests_total"));
    assert!(body.contains(r#"endpoint="/packages""#));
    assert!(body.contains(r#"registry_searches_total{kind="semver"} 1"#));

    Ok(())
}
