#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use inkpost::{ServerConfig, create_app, db::Database, db::UserRole};
use serde_json::{Value, json};
use tower::ServiceExt;

/// Secret long enough for the production minimum.
pub const TEST_JWT_SECRET: &[u8] = b"test-jwt-secret-at-least-32-bytes!!";

/// Password satisfying the registration policy.
pub const PASSWORD: &str = "Sup3r$ecret";

/// Create a test app over an in-memory database.
pub async fn create_test_app() -> (Router, Database) {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");
    let config = ServerConfig {
        db: db.clone(),
        jwt_secret: TEST_JWT_SECRET.to_vec(),
    };
    (create_app(&config), db)
}

/// Send one request and return (status, parsed JSON body).
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

/// Register a user and return (access token, user uuid).
pub async fn register_user(
    app: &Router,
    username: &str,
    email: &str,
    password: &str,
) -> (String, String) {
    let (status, body) = send(
        app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({
            "username": username,
            "email": email,
            "password": password,
            "confirmPassword": password,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);
    let token = body["data"]["accessToken"].as_str().unwrap().to_string();
    let uuid = body["data"]["user"]["id"].as_str().unwrap().to_string();
    (token, uuid)
}

/// Log in and return the access token.
pub async fn login(app: &Router, email: &str, password: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": email, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {}", body);
    body["data"]["accessToken"].as_str().unwrap().to_string()
}

/// Register a user, promote it to admin, and log in again so the token
/// carries the admin role. Returns (admin token, user uuid).
pub async fn register_admin(
    app: &Router,
    db: &Database,
    username: &str,
    email: &str,
) -> (String, String) {
    let (_token, uuid) = register_user(app, username, email, PASSWORD).await;
    let user = db.users().get_by_uuid(&uuid).await.unwrap().unwrap();
    db.users().set_role(user.id, UserRole::Admin).await.unwrap();
    let token = login(app, email, PASSWORD).await;
    (token, uuid)
}

/// Create a post and return its uuid.
pub async fn create_post(app: &Router, token: &str, title: &str) -> String {
    create_post_with(app, token, title, "TECHNOLOGY", &[]).await
}

pub async fn create_post_with(
    app: &Router,
    token: &str,
    title: &str,
    category: &str,
    tags: &[&str],
) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/posts",
        Some(token),
        Some(json!({
            "title": title,
            "content": format!("Content of {} long enough to pass validation", title),
            "category": category,
            "tags": tags,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create post failed: {}", body);
    body["data"]["post"]["id"].as_str().unwrap().to_string()
}

/// Publish (or unpublish) a post directly through the store.
pub async fn set_published(db: &Database, post_uuid: &str, published: bool) {
    let post = db.posts().get_by_uuid(post_uuid).await.unwrap().unwrap();
    db.posts().set_published(post.id, published).await.unwrap();
}

/// Assert the body is the uniform error envelope for the given code.
pub fn assert_error_envelope(body: &Value, code: u16) {
    let expected_status = if (400..500).contains(&code) {
        "fail"
    } else {
        "error"
    };
    assert_eq!(body["status"], expected_status, "envelope: {}", body);
    assert_eq!(body["code"], code, "envelope: {}", body);
    assert_eq!(body["data"], Value::Null, "envelope: {}", body);
    assert!(body["message"].is_string(), "envelope: {}", body);
}
