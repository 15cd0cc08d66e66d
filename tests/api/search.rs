use anyhow::Result;
use claims::{assert_le, assert_some};
use package_registry::api::OFFSET_HEADER;
use reqwest::StatusCode;
use serde_json::{json, Value};

use crate::helpers::spawn_app;

fn offset_header(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get(OFFSET_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

#[tokio::test]
async fn test_search_pages_through_results() -> Result<()> {
    // Arrange
    let app = spawn_app().await?;
    for patch in 0..55 {
        app.upload_content("alpha", &format!("1.0.{}", patch), None)
            .await?;
    }
    let queries = json!([{"Name": "alpha", "Version": "^1.0.0"}]);

    // Act
    let first = app.search(&app.admin_token, queries.clone(), None).await?;
    let first_offset = assert_some!(offset_header(&first));
    let first_body: Vec<Value> = first.json().await?;
    let second = app
        .search(&app.admin_token, queries, Some(&first_offset))
        .await?;
    let second_offset = assert_some!(offset_header(&second));
    let second_body: Vec<Value> = second.json().await?;

    // Assert
    assert_eq!(first_body.len(), 50);
    assert_eq!(first_offset, "1-0");
    assert_eq!(second_body.len(), 5);
    assert_eq!(second_offset, "-1--1");
    assert_eq!(first_body[0]["Name"], "alpha");
    assert_eq!(first_body[0]["Version"], "1.0.0");
    assert!(first_body[0]["ID"].is_string());
    assert_eq!(second_body[4]["Version"], "1.0.54");

    Ok(())
}

#[tokio::test]
async fn test_search_with_tilde_range_returns_everything_at_once() -> Result<()> {
    // Arrange
    let app = spawn_app().await?;
    for patch in 0..30 {
        app.upload_content("alpha", &format!("1.0.{}", patch), None)
            .await?;
    }
    app.upload_content("alpha", "1.1.0", None).await?;

    // Act
    let response = app
        .search(
            &app.admin_token,
            json!([{"Name": "alpha", "Version": "~1.0.0"}]),
            Some("0-0"),
        )
        .await?;

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(offset_header(&response).as_deref(), Some("-1--1"));
    let body: Vec<Value> = response.json().await?;
    assert_eq!(body.len(), 30);

    Ok(())
}

#[tokio::test]
async fn test_wildcard_name_matches_every_package() -> Result<()> {
    // Arrange
    let app = spawn_app().await?;
    app.upload_content("alpha", "1.0.0", None).await?;
    app.upload_content("beta", "1.0.0", None).await?;
    app.upload_content("beta", "2.0.0", None).await?;

    // Act
    let response = app
        .search(
            &app.admin_token,
            json!([{"Name": "*", "Version": "1.0.0"}]),
            None,
        )
        .await?;

    // Assert
    let body: Vec<Value> = response.json().await?;
    assert_eq!(body.len(), 2);
    assert!(body.iter().all(|hit| hit["Version"] == "1.0.0"));

    Ok(())
}

#[tokio::test]
async fn test_negative_offset_returns_empty_page() -> Result<()> {
    // Arrange
    let app = spawn_app().await?;
    app.upload_content("alpha", "1.0.0", None).await?;

    // Act
    let response = app
        .search(&app.admin_token, json!([{"Name": "alpha"}]), Some("-1--1"))
        .await?;

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(offset_header(&response).as_deref(), Some("-1--1"));
    let body: Vec<Value> = response.json().await?;
    assert!(body.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_page_never_exceeds_fifty_results() -> Result<()> {
    // Arrange
    let app = spawn_app().await?;
    for minor in 0..40 {
        app.upload_content("alpha", &format!("1.{}.0", minor), None)
            .await?;
        app.upload_content("beta", &format!("1.{}.0", minor), None)
            .await?;
    }
    let queries = json!([{"Name": "alpha"}, {"Name": "beta"}]);

    // Act
    let mut offset = "0-0".to_string();
    let mut total = 0;
    while offset != "-1--1" {
        let response = app
            .search(&app.admin_token, queries.clone(), Some(&offset))
            .await?;
        offset = assert_some!(offset_header(&response));
        let body: Vec<Value> = response.json().await?;
        assert_le!(body.len(), 50);
        total += body.len();
    }

    // Assert
    assert_eq!(total, 80);

    Ok(())
}

#[tokio::test]
async fn test_invalid_requests_are_rejected() -> Result<()> {
    // Arrange
    let app = spawn_app().await?;

    // Act
    let bad_offset = app
        .search(&app.admin_token, json!([{"Name": "alpha"}]), Some("zero"))
        .await?;
    let bad_range = app
        .search(
            &app.admin_token,
            json!([{"Name": "alpha", "Version": ">>1"}]),
            None,
        )
        .await?;
    let oversized_range = app
        .search(
            &app.admin_token,
            json!([{"Name": "*", "Version": "^18446744073709551615.0.0"}]),
            None,
        )
        .await?;
    let empty = app.search(&app.admin_token, json!([]), None).await?;

    // Assert
    assert_eq!(bad_offset.status(), StatusCode::BAD_REQUEST);
    assert_eq!(bad_range.status(), StatusCode::BAD_REQUEST);
    assert_eq!(oversized_range.status(), StatusCode::BAD_REQUEST);
    assert_eq!(empty.status(), StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn test_search_requires_authentication() -> Result<()> {
    // Arrange
    let app = spawn_app().await?;

    // Act
    let response = app
        .client
        .post(app.url("/packages"))
        .json(&json!([{"Name": "alpha"}]))
        .send()
        .await?;

    // Assert
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await?;
    assert!(body["message"].is_string());

    Ok(())
}
