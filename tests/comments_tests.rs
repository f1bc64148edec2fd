//! Comment creation, approval workflow, and visibility rules.

mod common;

use axum::http::StatusCode;
use common::*;
use serde_json::json;

/// Register alice with a published post, bob as a commenter, and an admin.
/// Returns (alice, bob, admin tokens, post uuid).
async fn setup_post(
    app: &axum::Router,
    db: &inkpost::db::Database,
) -> (String, String, String, String) {
    let (alice, _) = register_user(app, "alice1", "alice@example.com", PASSWORD).await;
    let (bob, _) = register_user(app, "bob1", "bob@example.com", PASSWORD).await;
    let (admin, _) = register_admin(app, db, "root1", "root@example.com").await;
    let post = create_post(app, &alice, "Discussion post").await;
    set_published(db, &post, true).await;
    (alice, bob, admin, post)
}

async fn add_comment(app: &axum::Router, token: &str, post: &str, content: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        &format!("/api/posts/{}/comments", post),
        Some(token),
        Some(json!({ "content": content })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "add comment failed: {}", body);
    body["data"]["comment"]["id"].as_str().unwrap().to_string()
}

async fn approve(app: &axum::Router, admin: &str, comment: &str) {
    let (status, body) = send(
        app,
        "PATCH",
        &format!("/api/comments/{}/approve", comment),
        Some(admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "approve failed: {}", body);
}

#[tokio::test]
async fn test_comment_requires_published_post() {
    let (app, _db) = create_test_app().await;
    let (alice, _) = register_user(&app, "alice1", "alice@example.com", PASSWORD).await;
    let draft = create_post(&app, &alice, "Unpublished draft").await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/posts/{}/comments", draft),
        Some(&alice),
        Some(json!({ "content": "First!" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Post not found or not published");
}

#[tokio::test]
async fn test_new_comments_await_approval() {
    let (app, db) = create_test_app().await;
    let (_alice, bob, admin, post) = setup_post(&app, &db).await;

    let first = add_comment(&app, &bob, &post, "First!").await;
    add_comment(&app, &bob, &post, "Second!").await;

    // Nothing approved yet: the public listing 404s rather than showing
    // pending comments.
    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/posts/{}/comments", post),
        Some(&bob),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "No comments found for this post");

    approve(&app, &admin, &first).await;

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/posts/{}/comments", post),
        Some(&bob),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalComments"], 1);
    let comments = body["data"]["comments"].as_array().unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0]["content"], "First!");
    assert_eq!(comments[0]["approved"], true);
}

#[tokio::test]
async fn test_unapproved_comment_visibility() {
    let (app, db) = create_test_app().await;
    let (alice, bob, admin, post) = setup_post(&app, &db).await;
    let comment = add_comment(&app, &bob, &post, "Pending comment").await;
    let uri = format!("/api/comments/{}", comment);

    // A third party cannot read it.
    let (status, body) = send(&app, "GET", &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Comment not approved yet");

    // The author and admins can.
    let (status, _) = send(&app, "GET", &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "GET", &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);

    // Once approved, anyone authenticated can.
    approve(&app, &admin, &comment).await;
    let (status, _) = send(&app, "GET", &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_comment_mutation_is_author_only() {
    let (app, db) = create_test_app().await;
    let (_alice, bob, admin, post) = setup_post(&app, &db).await;
    let comment = add_comment(&app, &bob, &post, "Original").await;
    let uri = format!("/api/comments/{}", comment);

    // Admins get approval power, not edit/delete power.
    let (status, body) = send(
        &app,
        "PUT",
        &uri,
        Some(&admin),
        Some(json!({ "content": "Moderated" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Comment not found or unauthorized");

    let (status, _) = send(&app, "DELETE", &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // The author edits and deletes.
    let (status, body) = send(
        &app,
        "PUT",
        &uri,
        Some(&bob),
        Some(json!({ "content": "Edited" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["comment"]["content"], "Edited");

    let (status, body) = send(&app, "DELETE", &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Comment deleted successfully");
}

#[tokio::test]
async fn test_approve_is_admin_only_and_single_shot() {
    let (app, db) = create_test_app().await;
    let (_alice, bob, admin, post) = setup_post(&app, &db).await;
    let comment = add_comment(&app, &bob, &post, "Pending").await;
    let uri = format!("/api/comments/{}/approve", comment);

    let (status, _) = send(&app, "PATCH", &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, "PATCH", &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, "PATCH", &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Comment already approved");
}

#[tokio::test]
async fn test_moderation_listing_requires_admin_or_post_author() {
    let (app, db) = create_test_app().await;
    let (alice, bob, admin, post) = setup_post(&app, &db).await;
    add_comment(&app, &bob, &post, "Pending").await;
    let approved_comment = add_comment(&app, &bob, &post, "Approved").await;
    approve(&app, &admin, &approved_comment).await;
    let uri = format!("/api/posts/{}/comments/all", post);

    // A commenter is neither admin nor the post's author.
    let (status, body) = send(&app, "GET", &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Unauthorized to view comments of this post");

    // The post's author sees everything, including pending comments.
    let (status, body) = send(&app, "GET", &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalComments"], 2);
    let first = &body["data"]["comments"][0];
    assert!(first["author"]["email"].is_string());
    assert!(first["post"]["title"].is_string());

    // Admins can filter by approval state and author email.
    let (status, body) = send(
        &app,
        "GET",
        &format!("{}?approved=false", uri),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalComments"], 1);
    assert_eq!(body["data"]["comments"][0]["content"], "Pending");

    let (status, body) = send(
        &app,
        "GET",
        &format!("{}?commentUserEmail=bob@", uri),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalComments"], 2);

    let (status, body) = send(
        &app,
        "GET",
        &format!("{}?commentUserEmail=nobody@", uri),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "No comments found");
}

#[tokio::test]
async fn test_own_comments_listing() {
    let (app, db) = create_test_app().await;
    let (alice, bob, _admin, post) = setup_post(&app, &db).await;
    add_comment(&app, &bob, &post, "Bob comment one").await;
    add_comment(&app, &bob, &post, "Bob comment two").await;

    let (status, body) = send(&app, "GET", "/api/comments", Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalComments"], 2);

    // A user with no comments gets a 404, not an empty page.
    let (status, body) = send(&app, "GET", "/api/comments", Some(&alice), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "No comments found for this user");
}

#[tokio::test]
async fn test_admin_user_comments_listing() {
    let (app, db) = create_test_app().await;
    let (_alice, bob, admin, post) = setup_post(&app, &db).await;
    add_comment(&app, &bob, &post, "Bob comment").await;

    let bob_uuid = db
        .users()
        .get_by_email("bob@example.com")
        .await
        .unwrap()
        .unwrap()
        .uuid;
    let uri = format!("/api/users/{}/comments", bob_uuid);

    let (status, _) = send(&app, "GET", &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, "GET", &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalComments"], 1);
    assert_eq!(body["data"]["comments"][0]["content"], "Bob comment");
}
