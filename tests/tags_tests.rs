//! Tag management: normalization, uniqueness, and deletion rules.

mod common;

use axum::http::StatusCode;
use common::*;
use serde_json::json;

async fn create_tag(app: &axum::Router, admin: &str, name: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/tags",
        Some(admin),
        Some(json!({ "name": name })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create tag failed: {}", body);
    body["data"]["tag"]["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_create_tag_is_admin_only_and_lower_cases() {
    let (app, db) = create_test_app().await;
    let (user, _) = register_user(&app, "alice1", "alice@example.com", PASSWORD).await;
    let (admin, _) = register_admin(&app, &db, "root1", "root@example.com").await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/tags",
        Some(&user),
        Some(json!({ "name": "Rust" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        "POST",
        "/api/tags",
        Some(&admin),
        Some(json!({ "name": "Rust" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["tag"]["name"], "rust");

    // Uniqueness is case-insensitive because names normalize first.
    let (status, body) = send(
        &app,
        "POST",
        "/api/tags",
        Some(&admin),
        Some(json!({ "name": "RUST" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Tag already exists");
}

#[tokio::test]
async fn test_tag_name_validation() {
    let (app, db) = create_test_app().await;
    let (admin, _) = register_admin(&app, &db, "root1", "root@example.com").await;

    for bad in ["a", "has space", "bad!chars"] {
        let (status, _) = send(
            &app,
            "POST",
            "/api/tags",
            Some(&admin),
            Some(json!({ "name": bad })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "accepted: {}", bad);
    }
}

#[tokio::test]
async fn test_list_tags_requires_auth_and_reports_usage() {
    let (app, db) = create_test_app().await;
    let (user, _) = register_user(&app, "alice1", "alice@example.com", PASSWORD).await;
    let (admin, _) = register_admin(&app, &db, "root1", "root@example.com").await;

    let (status, _) = send(&app, "GET", "/api/tags", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    create_tag(&app, &admin, "idle").await;
    create_post_with(&app, &user, "Tagged post", "TECHNOLOGY", &["used"]).await;

    let (status, body) = send(&app, "GET", "/api/tags", Some(&user), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalTags"], 2);
    // Most-used first.
    assert_eq!(body["data"]["tags"][0]["name"], "used");
    assert_eq!(body["data"]["tags"][0]["postCount"], 1);
    assert_eq!(body["data"]["tags"][1]["postCount"], 0);

    let (status, body) = send(&app, "GET", "/api/tags?search=use", Some(&user), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalTags"], 1);
}

#[tokio::test]
async fn test_get_tag_by_name_is_case_insensitive() {
    let (app, db) = create_test_app().await;
    let (user, _) = register_user(&app, "alice1", "alice@example.com", PASSWORD).await;
    let (admin, _) = register_admin(&app, &db, "root1", "root@example.com").await;
    create_tag(&app, &admin, "rust").await;

    let (status, body) = send(&app, "GET", "/api/tags/name/RUST", Some(&user), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["tag"]["name"], "rust");

    let (status, body) = send(&app, "GET", "/api/tags/name/unknown", Some(&user), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Tag not found");
}

#[tokio::test]
async fn test_tag_detail_hides_unpublished_posts_from_users() {
    let (app, db) = create_test_app().await;
    let (user, _) = register_user(&app, "alice1", "alice@example.com", PASSWORD).await;
    let (admin, _) = register_admin(&app, &db, "root1", "root@example.com").await;

    let published = create_post_with(&app, &user, "Published one", "TECHNOLOGY", &["shared"]).await;
    create_post_with(&app, &user, "Draft one", "TECHNOLOGY", &["shared"]).await;
    set_published(&db, &published, true).await;

    let tag_uuid = db.tags().get_by_name("shared").await.unwrap().unwrap().uuid;
    let uri = format!("/api/tags/id/{}", tag_uuid);

    // USER callers see only published posts; the usage count follows.
    let (status, body) = send(&app, "GET", &uri, Some(&user), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["usedIn"], 1);
    assert_eq!(body["data"]["tag"]["posts"].as_array().unwrap().len(), 1);

    // Admins see every post carrying the tag.
    let (status, body) = send(&app, "GET", &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["usedIn"], 2);
}

#[tokio::test]
async fn test_rename_tag_conflicts() {
    let (app, db) = create_test_app().await;
    let (admin, _) = register_admin(&app, &db, "root1", "root@example.com").await;
    let rust = create_tag(&app, &admin, "rust").await;
    create_tag(&app, &admin, "golang").await;

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/tags/id/{}", rust),
        Some(&admin),
        Some(json!({ "name": "GoLang" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Tag with this name already exists");

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/tags/id/{}", rust),
        Some(&admin),
        Some(json!({ "name": "rustlang" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["updatedTag"]["name"], "rustlang");
}

#[tokio::test]
async fn test_delete_tag_refused_while_referenced() {
    let (app, db) = create_test_app().await;
    let (user, _) = register_user(&app, "alice1", "alice@example.com", PASSWORD).await;
    let (admin, _) = register_admin(&app, &db, "root1", "root@example.com").await;

    let post = create_post_with(&app, &user, "Tagged post", "TECHNOLOGY", &["sticky"]).await;
    let tag_uuid = db.tags().get_by_name("sticky").await.unwrap().unwrap().uuid;
    let uri = format!("/api/tags/id/{}", tag_uuid);

    let (status, body) = send(&app, "DELETE", &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "Cannot delete tag because it is associated with existing posts"
    );

    // Deleting the post releases the reference.
    let (status, _) = send(&app, "DELETE", &format!("/api/posts/{}", post), Some(&user), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, "DELETE", &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Tag deleted successfully");
}
