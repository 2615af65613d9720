use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::NamedTempFile;
use tower::ServiceExt;

use listings::database::{AppState, RedbStore};
use listings::route::create_app;

fn setup_test_app(token: Option<&str>) -> (Router, NamedTempFile) {
    let temp_db = NamedTempFile::new().expect("Failed to create temp file");
    let store = RedbStore::open(temp_db.path().to_str().unwrap())
        .expect("Failed to initialize test database");

    let mut state = AppState::new(Arc::new(store));
    if let Some(token) = token {
        state = state.with_auth_token(token);
    }
    (create_app(state), temp_db)
}

/// Helper function to parse response body as JSON
async fn response_json(body: Body) -> Value {
    let bytes = body
        .collect()
        .await
        .expect("Failed to read response body")
        .to_bytes();

    serde_json::from_slice(&bytes).expect("Failed to parse JSON")
}

fn create_builder_request(authorization: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/dashboard/builders")
        .header("content-type", "application/json")
        .header("x-user-id", "admin1")
        .header("x-user-role", "admin");
    if let Some(value) = authorization {
        builder = builder.header("Authorization", value);
    }
    builder
        .body(Body::from(json!({ "name": "Construtora Sol" }).to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_auth_middleware_enabled_valid_token() {
    let (app, _temp_db) = setup_test_app(Some("secret_token"));

    let response = app
        .oneshot(create_builder_request(Some("secret_token")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_auth_middleware_enabled_invalid_token() {
    let (app, _temp_db) = setup_test_app(Some("secret_token"));

    let response = app
        .oneshot(create_builder_request(Some("wrong_token")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = response_json(response.into_body()).await;
    assert_eq!(body["error"], "Unauthorized");
    assert_eq!(body["message"], "Invalid or missing authorization header");
}

#[tokio::test]
async fn test_auth_middleware_enabled_no_token() {
    let (app, _temp_db) = setup_test_app(Some("secret_token"));

    let response = app.oneshot(create_builder_request(None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = response_json(response.into_body()).await;
    assert_eq!(body["code"], "unauthorized");
}

#[tokio::test]
async fn test_auth_middleware_disabled() {
    let (app, _temp_db) = setup_test_app(None);

    let response = app.oneshot(create_builder_request(None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_empty_token_disables_check() {
    let (app, _temp_db) = setup_test_app(Some(""));

    let response = app.oneshot(create_builder_request(None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_public_routes_skip_token_check() {
    let (app, _temp_db) = setup_test_app(Some("secret_token"));

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/properties")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response.into_body()).await;
    assert_eq!(body["total"], 0);
}
