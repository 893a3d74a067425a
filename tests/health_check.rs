//! Integration tests for the health and fallback routes

mod common;

use common::spawn_app;
use serde_json::Value;

#[tokio::test]
async fn health_check_works() {
    let app = spawn_app().await;

    let response = app
        .client
        .get(app.url("/health"))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "API is healthy");
    assert!(body["data"]["timestamp"].is_string());
}

#[tokio::test]
async fn unknown_route_returns_404_envelope() {
    let app = spawn_app().await;

    let response = app
        .client
        .get(format!("{}/api/v1/nope", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(404, response.status().as_u16());

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Route /api/v1/nope not found");
    assert!(body.get("data").is_none());
}

#[tokio::test]
async fn unknown_auth_route_is_not_found_rather_than_unauthorized() {
    let app = spawn_app().await;

    let response = app
        .client
        .post(app.url("/auth/unknown"))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(404, response.status().as_u16());
}

#[tokio::test]
async fn responses_carry_request_id() {
    let app = spawn_app().await;

    let response = app
        .client
        .get(app.url("/health"))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.headers().contains_key("x-request-id"));
}
