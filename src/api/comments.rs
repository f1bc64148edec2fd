//! Comment endpoints, including the post-scoped and admin moderation routes.

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
use super::posts::tristate;
use crate::auth::{AdminAuth, ApiAuth, AuthenticatedUser};
use crate::db::{Comment, CommentFilter, Database, UserRole};
use crate::impl_has_auth_state;
use crate::jwt::JwtConfig;
use crate::pagination::Pagination;
use crate::revocation::RevocationStore;

/// State for comment endpoints.
#[derive(Clone)]
pub struct CommentsState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
    pub revocations: Arc<dyn RevocationStore>,
}

impl_has_auth_state!(CommentsState);

/// Routes mounted at `/comments`.
pub fn router(state: CommentsState) -> Router {
    Router::new()
        .route("/", get(list_my_comments))
        .route(
            "/{id}",
            get(get_comment).put(update_comment).delete(delete_comment),
        )
        .route("/{id}/approve", patch(approve_comment))
        .with_state(state)
}

/// Post-scoped comment routes, merged into the `/posts` router.
pub fn post_comments_router(state: CommentsState) -> Router {
    Router::new()
        .route(
            "/{id}/comments",
            get(approved_comments_of_post).post(add_comment),
        )
        .route("/{id}/comments/all", get(all_comments_of_post))
        .with_state(state)
}

/// Admin route for one user's comments, merged into the `/users` router.
pub fn user_comments_router(state: CommentsState) -> Router {
    Router::new()
        .route("/{id}/comments", get(admin_user_comments))
        .with_state(state)
}

// --- Request/Response types ---

#[derive(Deserialize)]
struct AddCommentRequest {
    content: String,
}

#[derive(Deserialize)]
struct UpdateCommentRequest {
    content: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentListQuery {
    page: Option<String>,
    limit: Option<String>,
    approved: Option<String>,
    comment_user_email: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CommentResponse {
    id: String,
    content: String,
    approved: bool,
    post_id: String,
    author_id: String,
    created_at: String,
    updated_at: String,
}

impl From<&Comment> for CommentResponse {
    fn from(comment: &Comment) -> Self {
        Self {
            id: comment.uuid.clone(),
            content: comment.content.clone(),
            approved: comment.approved,
            post_id: comment.post_uuid.clone(),
            author_id: comment.author_uuid.clone(),
            created_at: comment.created_at.clone(),
            updated_at: comment.updated_at.clone(),
        }
    }
}

/// Moderation listing shape: the comment plus author and post context.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ModerationCommentResponse {
    id: String,
    content: String,
    approved: bool,
    created_at: String,
    author: CommentAuthor,
    post: CommentPost,
}

#[derive(Serialize)]
struct CommentAuthor {
    id: String,
    email: String,
    role: String,
}

#[derive(Serialize)]
struct CommentPost {
    id: String,
    title: String,
}

impl From<&Comment> for ModerationCommentResponse {
    fn from(comment: &Comment) -> Self {
        Self {
            id: comment.uuid.clone(),
            content: comment.content.clone(),
            approved: comment.approved,
            created_at: comment.created_at.clone(),
            author: CommentAuthor {
                id: comment.author_uuid.clone(),
                email: comment.author_email.clone(),
                role: comment.author_role.clone(),
            },
            post: CommentPost {
                id: comment.post_uuid.clone(),
                title: comment.post_title.clone(),
            },
        }
    }
}

// --- Helpers ---

async fn require_db_user(
    state: &CommentsState,
    user: &AuthenticatedUser,
) -> Result<crate::db::User, ApiError> {
    state
        .db
        .users()
        .get_by_uuid(&user.claims.id)
        .await
        .db_err("Failed to get user")?
        .ok_or_else(|| ApiError::unauthorized("User not authenticated"))
}

/// Paged listing of one author's comments, shared by the self-service and
/// admin routes.
async fn list_comments_of_author(
    state: &CommentsState,
    author_id: i64,
    query: &CommentListQuery,
) -> Result<Json<serde_json::Value>, ApiError> {
    let pagination = Pagination::from_query(query.page.as_deref(), query.limit.as_deref())?;

    let filter = CommentFilter {
        author_id: Some(author_id),
        approved: tristate(query.approved.as_deref()),
        ..Default::default()
    };

    let total = state
        .db
        .comments()
        .count(&filter)
        .await
        .db_err("Failed to count comments")?;
    let total_pages = pagination.ensure_in_bounds(total)?;

    let comments = state
        .db
        .comments()
        .list(&filter, pagination.limit, pagination.skip)
        .await
        .db_err("Failed to list comments")?;
    if comments.is_empty() {
        return Err(ApiError::not_found("No comments found for this user"));
    }

    Ok(Json(json!({
        "status": "success",
        "message": "Comments retrieved successfully",
        "totalPages": total_pages,
        "currentPage": pagination.page,
        "totalComments": total,
        "data": { "comments": comments.iter().map(CommentResponse::from).collect::<Vec<_>>() },
    })))
}

// --- Handlers ---

/// Comment on a published post. New comments await approval.
async fn add_comment(
    State(state): State<CommentsState>,
    ApiAuth(user): ApiAuth,
    Path(post_id): Path<String>,
    Json(payload): Json<AddCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_uuid(&post_id)?;

    if payload.content.is_empty() {
        return Err(ApiError::bad_request("Content is required"));
    }

    let author = require_db_user(&state, &user).await?;

    let post = state
        .db
        .posts()
        .get_published_by_uuid(&post_id)
        .await
        .db_err("Failed to get post")?
        .ok_or_else(|| ApiError::not_found("Post not found or not published"))?;

    let uuid = uuid::Uuid::new_v4().to_string();
    state
        .db
        .comments()
        .create(&uuid, post.id, author.id, &payload.content)
        .await
        .db_err("Failed to add comment")?;

    let comment = state
        .db
        .comments()
        .get_by_uuid(&uuid)
        .await
        .db_err("Failed to get created comment")?
        .ok_or_else(|| ApiError::internal("Created comment not found"))?;

    Ok((
        StatusCode::CREATED,
        super::envelope::success(
            "Comment added successfully",
            json!({ "comment": CommentResponse::from(&comment) }),
        ),
    ))
}

/// Approved comments of a published post. The approved filter is
/// unconditional here regardless of the caller's role.
async fn approved_comments_of_post(
    State(state): State<CommentsState>,
    ApiAuth(_user): ApiAuth,
    Path(post_id): Path<String>,
    Query(query): Query<CommentListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    validate_uuid(&post_id)?;
    let pagination = Pagination::from_query(query.page.as_deref(), query.limit.as_deref())?;

    let post = state
        .db
        .posts()
        .get_published_by_uuid(&post_id)
        .await
        .db_err("Failed to get post")?
        .ok_or_else(|| ApiError::not_found("Post not found or not published yet"))?;

    let filter = CommentFilter {
        post_id: Some(post.id),
        approved: Some(true),
        ..Default::default()
    };

    let total = state
        .db
        .comments()
        .count(&filter)
        .await
        .db_err("Failed to count comments")?;
    let total_pages = pagination.ensure_in_bounds(total)?;

    let comments = state
        .db
        .comments()
        .list(&filter, pagination.limit, pagination.skip)
        .await
        .db_err("Failed to list comments")?;
    if comments.is_empty() {
        return Err(ApiError::not_found("No comments found for this post"));
    }

    Ok(Json(json!({
        "status": "success",
        "message": "Comments retrieved successfully",
        "totalPages": total_pages,
        "currentPage": pagination.page,
        "totalComments": total,
        "data": { "comments": comments.iter().map(CommentResponse::from).collect::<Vec<_>>() },
    })))
}

/// Every comment of a post, for moderation. Admins and the post's author
/// only.
async fn all_comments_of_post(
    State(state): State<CommentsState>,
    ApiAuth(user): ApiAuth,
    Path(post_id): Path<String>,
    Query(query): Query<CommentListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    validate_uuid(&post_id)?;
    let pagination = Pagination::from_query(query.page.as_deref(), query.limit.as_deref())?;

    let post = state
        .db
        .posts()
        .get_published_by_uuid(&post_id)
        .await
        .db_err("Failed to get post")?
        .ok_or_else(|| ApiError::not_found("Post not found or not published"))?;

    let allowed = match user.claims.role {
        UserRole::Admin => true,
        UserRole::User => post.author_uuid == user.claims.id,
    };
    if !allowed {
        return Err(ApiError::forbidden(
            "Unauthorized to view comments of this post",
        ));
    }

    let filter = CommentFilter {
        post_id: Some(post.id),
        approved: tristate(query.approved.as_deref()),
        author_email: query
            .comment_user_email
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        ..Default::default()
    };

    let total = state
        .db
        .comments()
        .count(&filter)
        .await
        .db_err("Failed to count comments")?;
    let total_pages = pagination.ensure_in_bounds(total)?;

    let comments = state
        .db
        .comments()
        .list(&filter, pagination.limit, pagination.skip)
        .await
        .db_err("Failed to list comments")?;
    if comments.is_empty() {
        return Err(ApiError::not_found("No comments found"));
    }

    Ok(Json(json!({
        "status": "success",
        "message": "Comments retrieved successfully",
        "totalPages": total_pages,
        "currentPage": pagination.page,
        "totalComments": total,
        "data": {
            "comments": comments.iter().map(ModerationCommentResponse::from).collect::<Vec<_>>()
        },
    })))
}

/// The caller's own comments.
async fn list_my_comments(
    State(state): State<CommentsState>,
    ApiAuth(user): ApiAuth,
    Query(query): Query<CommentListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let author = require_db_user(&state, &user).await?;
    list_comments_of_author(&state, author.id, &query).await
}

/// One user's comments, for admins.
async fn admin_user_comments(
    State(state): State<CommentsState>,
    AdminAuth(_admin): AdminAuth,
    Path(user_id): Path<String>,
    Query(query): Query<CommentListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    validate_uuid(&user_id)?;

    let target = state
        .db
        .users()
        .get_by_uuid(&user_id)
        .await
        .db_err("Failed to get user")?
        .ok_or_else(|| ApiError::not_found("User Not Found"))?;
    list_comments_of_author(&state, target.id, &query).await
}

/// Single-comment read: approved, or the comment's author, or an admin.
async fn get_comment(
    State(state): State<CommentsState>,
    ApiAuth(user): ApiAuth,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    validate_uuid(&id)?;

    let comment = state
        .db
        .comments()
        .get_by_uuid(&id)
        .await
        .db_err("Failed to get comment")?
        .ok_or_else(|| ApiError::not_found("Comment not found"))?;

    if !comment.approved {
        let allowed = match user.claims.role {
            UserRole::Admin => true,
            UserRole::User => comment.author_uuid == user.claims.id,
        };
        if !allowed {
            return Err(ApiError::forbidden("Comment not approved yet"));
        }
    }

    Ok(super::envelope::success(
        "Comment retrieved successfully",
        json!({ "comment": CommentResponse::from(&comment) }),
    ))
}

/// Author-only edit; admins get no override here.
async fn update_comment(
    State(state): State<CommentsState>,
    ApiAuth(user): ApiAuth,
    Path(id): Path<String>,
    Json(payload): Json<UpdateCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_uuid(&id)?;

    if let Some(content) = payload.content.as_deref() {
        if content.is_empty() {
            return Err(ApiError::bad_request(
                "Content must be at least 1 character long",
            ));
        }
    }

    let comment = state
        .db
        .comments()
        .get_by_uuid(&id)
        .await
        .db_err("Failed to get comment")?
        .filter(|c| c.author_uuid == user.claims.id)
        .ok_or_else(|| ApiError::not_found("Comment not found or unauthorized"))?;

    if let Some(content) = payload.content.as_deref() {
        state
            .db
            .comments()
            .update_content(comment.id, content)
            .await
            .db_err("Failed to update comment")?;
    }

    let updated = state
        .db
        .comments()
        .get_by_uuid(&id)
        .await
        .db_err("Failed to get updated comment")?
        .ok_or_else(|| ApiError::internal("Updated comment not found"))?;

    Ok(super::envelope::success(
        "Comment updated successfully",
        json!({ "comment": CommentResponse::from(&updated) }),
    ))
}

/// Author-only delete; admins get no override here.
async fn delete_comment(
    State(state): State<CommentsState>,
    ApiAuth(user): ApiAuth,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    validate_uuid(&id)?;

    let comment = state
        .db
        .comments()
        .get_by_uuid(&id)
        .await
        .db_err("Failed to get comment")?
        .filter(|c| c.author_uuid == user.claims.id)
        .ok_or_else(|| ApiError::not_found("Comment not found or unauthorized"))?;

    state
        .db
        .comments()
        .delete(comment.id)
        .await
        .db_err("Failed to delete comment")?;

    Ok(super::envelope::success_empty("Comment deleted successfully"))
}

/// Admin-only approval; approving twice is an error.
async fn approve_comment(
    State(state): State<CommentsState>,
    AdminAuth(_admin): AdminAuth,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    validate_uuid(&id)?;

    let comment = state
        .db
        .comments()
        .get_by_uuid(&id)
        .await
        .db_err("Failed to get comment")?
        .ok_or_else(|| ApiError::not_found("Comment not found"))?;

    if comment.approved {
        return Err(ApiError::bad_request("Comment already approved"));
    }

    state
        .db
        .comments()
        .approve(comment.id)
        .await
        .db_err("Failed to approve comment")?;

    let approved = state
        .db
        .comments()
        .get_by_uuid(&id)
        .await
        .db_err("Failed to get approved comment")?
        .ok_or_else(|| ApiError::internal("Approved comment not found"))?;

    Ok(super::envelope::success(
        "Comment approved successfully",
        json!({ "comment": CommentResponse::from(&approved) }),
    ))
}
