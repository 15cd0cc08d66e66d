use uuid::Uuid;

use crate::helpers::spawn_app;

#[tokio::test]
async fn not_found_returns_404() {
    // Arrange
    let app = spawn_app().await.expect("Failed to spawn app.");
    let url = app.url(&format!("/{}", Uuid::new_v4()));

    // Act
    let response = app
        .client
        .get(url)
        .send()
        .await
        .expect("Failed to execute request.");

    // Assert
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn not_found_returns_json_error() {
    // Arrange
    let app = spawn_app().await.expect("Failed to spawn app");
    let url = app.url(&format!("/{}", Uuid::new_v4()));

    // Act
    let response = app
        .client
        .get(url)
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    let body = response
        .json::<serde_json::Value>()
        .await
        .expect("Failed to parse response");
    assert_eq!(body["message"], "Not Found");
}

#[tokio::test]
async fn unknown_package_returns_404() {
    // Arrange
    let app = spawn_app().await.expect("Failed to spawn app");

    // Act
    let response = app
        .download(&app.admin_token, "4242")
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 404);
}
