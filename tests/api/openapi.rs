use crate::helpers::spawn_app;

#[tokio::test]
async fn test_openapi_returns_json() {
    // Arrange
    let app = spawn_app().await.expect("Failed to spawn app.");

    // Act
    let response = app
        .client
        .get(app.url("/openapi.json"))
        .send()
        .await
        .expect("Failed to execute request.");

    // Assert
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.expect("Invalid JSON");
    assert!(body["paths"]["/packages"].is_object());
}

#[tokio::test]
async fn test_index_returns_200() {
    // Arrange
    let app = spawn_app().await.expect("Failed to spawn app.");

    // Act
    let response = app
        .client
        .get(&app.address)
        .send()
        .await
        .expect("Failed to execute request.");

    // Assert
    assert_eq!(response.status().as_u16(), 200);
}
