//! Post endpoints: public feeds, authoring, and admin moderation.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use super::error::{ApiError, ResultExt, validate_uuid};
use super::tags::TagResponse;
use crate::auth::{AdminAuth, ApiAuth};
use crate::category::Category;
use crate::db::{Database, Post, PostFilter, PostOrder};
use crate::impl_has_auth_state;
use crate::jwt::JwtConfig;
use crate::pagination::Pagination;
use crate::revocation::RevocationStore;

/// State for post endpoints.
#[derive(Clone)]
pub struct PostsState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
    pub revocations: Arc<dyn RevocationStore>,
}

impl_has_auth_state!(PostsState);

pub fn router(state: PostsState) -> Router {
    Router::new()
        .route(
            "/",
            get(list_published_posts)
                .post(create_post)
                .delete(delete_all_posts),
        )
        .route("/all", get(list_all_posts))
        .route("/user/{user_id}", get(list_user_posts))
        .route(
            "/{id}",
            get(get_post).put(update_post).delete(delete_post),
        )
        .route("/{id}/publish", patch(update_publish))
        .with_state(state)
}

// --- Request/Response types ---

#[derive(Deserialize)]
struct CreatePostRequest {
    title: String,
    content: String,
    category: String,
    tags: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct UpdatePostRequest {
    title: Option<String>,
    content: Option<String>,
    category: Option<String>,
}

#[derive(Deserialize)]
struct UpdatePublishRequest {
    published: bool,
}

#[derive(Deserialize)]
struct PostListQuery {
    page: Option<String>,
    limit: Option<String>,
    search: Option<String>,
    category: Option<String>,
    published: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostResponse {
    pub id: String,
    pub title: String,
    pub content: String,
    pub category: String,
    pub published: bool,
    pub published_at: Option<String>,
    pub author_id: String,
    pub created_at: String,
    pub updated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<TagResponse>>,
}

impl From<&Post> for PostResponse {
    fn from(post: &Post) -> Self {
        Self {
            id: post.uuid.clone(),
            title: post.title.clone(),
            content: post.content.clone(),
            category: post.category.clone(),
            published: post.published,
            published_at: post.published_at.clone(),
            author_id: post.author_uuid.clone(),
            created_at: post.created_at.clone(),
            updated_at: post.updated_at.clone(),
            tags: None,
        }
    }
}

// --- Helpers ---

/// Trimmed, non-empty search term.
fn search_term(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Tri-state boolean query parameter; anything but "true"/"false" is unset.
pub(super) fn tristate(raw: Option<&str>) -> Option<bool> {
    match raw.map(|s| s.to_lowercase()) {
        Some(s) if s == "true" => Some(true),
        Some(s) if s == "false" => Some(false),
        _ => None,
    }
}

async fn load_with_tags(state: &PostsState, post: &Post) -> Result<PostResponse, ApiError> {
    let tags = state
        .db
        .tags()
        .for_post(post.id)
        .await
        .db_err("Failed to load post tags")?;
    let mut response = PostResponse::from(post);
    response.tags = Some(tags.iter().map(TagResponse::from).collect());
    Ok(response)
}

// --- Handlers ---

/// Public feed of published posts.
async fn list_published_posts(
    State(state): State<PostsState>,
    Query(query): Query<PostListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let pagination = Pagination::from_query(query.page.as_deref(), query.limit.as_deref())?;
    let category = Category::from_filter(query.category.as_deref())?;

    let filter = PostFilter {
        published: Some(true),
        category,
        search: search_term(query.search.as_deref()),
        ..Default::default()
    };

    let total = state
        .db
        .posts()
        .count(&filter)
        .await
        .db_err("Failed to count posts")?;
    let total_pages = pagination.ensure_in_bounds(total)?;

    let posts = state
        .db
        .posts()
        .list(&filter, PostOrder::PublishedAtDesc, pagination.limit, pagination.skip)
        .await
        .db_err("Failed to list posts")?;

    Ok(Json(json!({
        "status": "success",
        "message": "posts retrieved successfully",
        "totalPages": total_pages,
        "currentPage": pagination.page,
        "totalPosts": total,
        "data": { "posts": posts.iter().map(PostResponse::from).collect::<Vec<_>>() },
    })))
}

/// Published posts by one author.
async fn list_user_posts(
    State(state): State<PostsState>,
    Path(user_id): Path<String>,
    Query(query): Query<PostListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let pagination = Pagination::from_query(query.page.as_deref(), query.limit.as_deref())?;
    let category = Category::from_filter(query.category.as_deref())?;

    // An unknown user simply matches no posts.
    let author_id = state
        .db
        .users()
        .get_by_uuid(&user_id)
        .await
        .db_err("Failed to get user")?
        .map(|u| u.id)
        .unwrap_or(-1);

    let filter = PostFilter {
        author_id: Some(author_id),
        published: Some(true),
        category,
        search: search_term(query.search.as_deref()),
    };

    let total = state
        .db
        .posts()
        .count(&filter)
        .await
        .db_err("Failed to count posts")?;
    let total_pages = pagination.ensure_in_bounds(total)?;

    let posts = state
        .db
        .posts()
        .list(&filter, PostOrder::CreatedAtDesc, pagination.limit, pagination.skip)
        .await
        .db_err("Failed to list posts")?;

    Ok(Json(json!({
        "status": "success",
        "message": "posts retrieved successfully",
        "totalPages": total_pages,
        "currentPage": pagination.page,
        "totalPosts": total,
        "data": { "posts": posts.iter().map(PostResponse::from).collect::<Vec<_>>() },
    })))
}

/// Admin listing across publish states.
async fn list_all_posts(
    State(state): State<PostsState>,
    AdminAuth(_admin): AdminAuth,
    Query(query): Query<PostListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let pagination = Pagination::from_query(query.page.as_deref(), query.limit.as_deref())?;
    let category = Category::from_filter(query.category.as_deref())?;

    // Unless the caller asks otherwise, show published posts.
    let published = tristate(query.published.as_deref()).or(Some(true));

    let filter = PostFilter {
        published,
        category,
        search: search_term(query.search.as_deref()),
        ..Default::default()
    };

    let total = state
        .db
        .posts()
        .count(&filter)
        .await
        .db_err("Failed to count posts")?;
    let total_pages = pagination.ensure_in_bounds(total)?;

    let posts = state
        .db
        .posts()
        .list(&filter, PostOrder::CreatedAtDesc, pagination.limit, pagination.skip)
        .await
        .db_err("Failed to list posts")?;

    Ok(Json(json!({
        "status": "success",
        "message": "Filtered posts retrieved successfully",
        "totalPages": total_pages,
        "currentPage": pagination.page,
        "totalPosts": total,
        "data": { "posts": posts.iter().map(PostResponse::from).collect::<Vec<_>>() },
    })))
}

/// Public single-post read; unpublished posts are invisible here.
async fn get_post(
    State(state): State<PostsState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    validate_uuid(&id)?;

    let post = state
        .db
        .posts()
        .get_published_by_uuid(&id)
        .await
        .db_err("Failed to get post")?
        .ok_or_else(|| ApiError::not_found("Post not found or not published yet"))?;

    let response = load_with_tags(&state, &post).await?;

    Ok(super::envelope::success(
        format!("{} post retrieved successfully", post.title),
        json!({ "post": response }),
    ))
}

async fn create_post(
    State(state): State<PostsState>,
    ApiAuth(user): ApiAuth,
    Json(payload): Json<CreatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    super::validate::validate_title(&payload.title)?;
    super::validate::validate_post_content(&payload.content)?;
    let category = Category::parse(&payload.category)
        .ok_or_else(|| ApiError::bad_request("Category must be a valid value"))?;

    let tags = payload.tags.unwrap_or_default();
    if tags.len() > 5 {
        return Err(ApiError::bad_request("You can only add up to 5 tags"));
    }

    let author = state
        .db
        .users()
        .get_by_uuid(&user.claims.id)
        .await
        .db_err("Failed to get user")?
        .ok_or_else(|| ApiError::unauthorized("User not authenticated"))?;

    let duplicate = state
        .db
        .posts()
        .title_exists_for_author(&payload.title, author.id)
        .await
        .db_err("Failed to check post title")?;
    if duplicate {
        return Err(ApiError::conflict(
            "You already have a post with the same title",
        ));
    }

    // Find or create tags under their normalized names.
    let mut tag_ids = Vec::with_capacity(tags.len());
    for name in &tags {
        let normalized = name.to_lowercase();
        let id = state
            .db
            .tags()
            .find_or_create(&normalized)
            .await
            .db_err("Failed to create tag")?;
        tag_ids.push(id);
    }

    let uuid = uuid::Uuid::new_v4().to_string();
    state
        .db
        .posts()
        .create(
            &uuid,
            author.id,
            &payload.title,
            &payload.content,
            category,
            &tag_ids,
        )
        .await
        .db_err("Failed to create post")?;

    let post = state
        .db
        .posts()
        .get_by_uuid(&uuid)
        .await
        .db_err("Failed to get created post")?
        .ok_or_else(|| ApiError::internal("Created post not found"))?;
    let response = load_with_tags(&state, &post).await?;

    Ok((
        StatusCode::CREATED,
        super::envelope::success("Post added successfully", json!({ "post": response })),
    ))
}

/// Author-only update. A miss on the author-scoped lookup is a 404, so a
/// non-author cannot distinguish "not mine" from "does not exist".
async fn update_post(
    State(state): State<PostsState>,
    ApiAuth(user): ApiAuth,
    Path(id): Path<String>,
    Json(payload): Json<UpdatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_uuid(&id)?;

    if let Some(title) = payload.title.as_deref() {
        super::validate::validate_title(title)?;
    }
    if let Some(content) = payload.content.as_deref() {
        super::validate::validate_post_content(content)?;
    }
    let category = match payload.category.as_deref() {
        Some(raw) => Some(
            Category::parse(raw)
                .ok_or_else(|| ApiError::bad_request("Category must be a valid value"))?,
        ),
        None => None,
    };

    let author = state
        .db
        .users()
        .get_by_uuid(&user.claims.id)
        .await
        .db_err("Failed to get user")?
        .ok_or_else(|| ApiError::unauthorized("User not authenticated"))?;

    let post = state
        .db
        .posts()
        .get_by_uuid_for_author(&id, author.id)
        .await
        .db_err("Failed to get post")?
        .ok_or_else(|| ApiError::not_found("Post not found or you're not the author"))?;

    state
        .db
        .posts()
        .update(
            post.id,
            payload.title.as_deref(),
            payload.content.as_deref(),
            category,
        )
        .await
        .db_err("Failed to update post")?;

    let updated = state
        .db
        .posts()
        .get_by_uuid(&id)
        .await
        .db_err("Failed to get updated post")?
        .ok_or_else(|| ApiError::internal("Updated post not found"))?;

    Ok(super::envelope::success(
        format!("{} post updated successfully", post.title),
        json!({ "post": PostResponse::from(&updated) }),
    ))
}

async fn delete_post(
    State(state): State<PostsState>,
    ApiAuth(user): ApiAuth,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    validate_uuid(&id)?;

    let author = state
        .db
        .users()
        .get_by_uuid(&user.claims.id)
        .await
        .db_err("Failed to get user")?
        .ok_or_else(|| ApiError::unauthorized("User not authenticated"))?;

    let post = state
        .db
        .posts()
        .get_by_uuid_for_author(&id, author.id)
        .await
        .db_err("Failed to get post")?
        .ok_or_else(|| ApiError::not_found("Post not found or you're not the author"))?;

    state
        .db
        .posts()
        .delete(post.id)
        .await
        .db_err("Failed to delete post")?;

    Ok(super::envelope::success_empty(format!(
        "{} post deleted successfully",
        post.title
    )))
}

async fn delete_all_posts(
    State(state): State<PostsState>,
    ApiAuth(user): ApiAuth,
) -> Result<impl IntoResponse, ApiError> {
    let author = state
        .db
        .users()
        .get_by_uuid(&user.claims.id)
        .await
        .db_err("Failed to get user")?
        .ok_or_else(|| ApiError::unauthorized("User not authenticated"))?;

    let deleted = state
        .db
        .posts()
        .delete_all_by_author(author.id)
        .await
        .db_err("Failed to delete posts")?;

    let message = if deleted == 0 {
        "You had no posts to delete"
    } else {
        "All posts deleted successfully"
    };
    Ok(super::envelope::success_empty(message))
}

/// Admin publish/unpublish. Publishing stamps `publishedAt`; unpublishing
/// clears it. Admins gain no authorship rights through this route.
async fn update_publish(
    State(state): State<PostsState>,
    AdminAuth(_admin): AdminAuth,
    Path(id): Path<String>,
    Json(payload): Json<UpdatePublishRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_uuid(&id)?;

    let post = state
        .db
        .posts()
        .get_by_uuid(&id)
        .await
        .db_err("Failed to get post")?
        .ok_or_else(|| ApiError::not_found("Post not found"))?;

    state
        .db
        .posts()
        .set_published(post.id, payload.published)
        .await
        .db_err("Failed to update publish state")?;

    let updated = state
        .db
        .posts()
        .get_by_uuid(&id)
        .await
        .db_err("Failed to get updated post")?
        .ok_or_else(|| ApiError::internal("Updated post not found"))?;

    Ok(super::envelope::success(
        "Post published state updated successfully",
        json!({ "post": PostResponse::from(&updated) }),
    ))
}
