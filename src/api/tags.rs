//! Tag endpoints. Names are lower-cased before storage or lookup, so
//! uniqueness is case-insensitive.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use super::error::{ApiError, ResultExt, validate_uuid};
use crate::auth::{AdminAuth, ApiAuth};
use crate::db::{Database, Post, Tag, UserRole};
use crate::impl_has_auth_state;
use crate::jwt::JwtConfig;
use crate::pagination::Pagination;
use crate::revocation::RevocationStore;

/// State for tag endpoints.
#[derive(Clone)]
pub struct TagsState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
    pub revocations: Arc<dyn RevocationStore>,
}

impl_has_auth_state!(TagsState);

pub fn router(state: TagsState) -> Router {
    Router::new()
        .route("/", get(list_tags).post(create_tag))
        .route(
            "/id/{id}",
            get(get_tag_by_id).put(update_tag).delete(delete_tag),
        )
        .route("/name/{name}", get(get_tag_by_name))
        .with_state(state)
}

// --- Request/Response types ---

#[derive(Deserialize)]
struct TagRequest {
    name: String,
}

#[derive(Deserialize)]
struct UpdateTagRequest {
    name: Option<String>,
}

#[derive(Deserialize)]
struct TagListQuery {
    page: Option<String>,
    limit: Option<String>,
    search: Option<String>,
}

#[derive(Serialize)]
pub struct TagResponse {
    pub id: String,
    pub name: String,
}

impl From<&Tag> for TagResponse {
    fn from(tag: &Tag) -> Self {
        Self {
            id: tag.uuid.clone(),
            name: tag.name.clone(),
        }
    }
}

/// Post subset embedded in single-tag reads.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TagPostResponse {
    id: String,
    title: String,
    content: String,
    published: bool,
    created_at: String,
    updated_at: String,
}

impl From<&Post> for TagPostResponse {
    fn from(post: &Post) -> Self {
        Self {
            id: post.uuid.clone(),
            title: post.title.clone(),
            content: post.content.clone(),
            published: post.published,
            created_at: post.created_at.clone(),
            updated_at: post.updated_at.clone(),
        }
    }
}

// --- Helpers ---

/// Single-tag read shape: the tag, its posts, and how many posts carry it.
/// USER callers see only published posts; admins see all of them.
async fn tag_detail(
    state: &TagsState,
    tag: &Tag,
    role: UserRole,
) -> Result<Json<serde_json::Value>, ApiError> {
    let published_only = match role {
        UserRole::User => true,
        UserRole::Admin => false,
    };

    let posts = state
        .db
        .posts()
        .list_by_tag(tag.id, published_only)
        .await
        .db_err("Failed to list tag posts")?;
    let used_in = posts.len();

    Ok(Json(json!({
        "status": "success",
        "message": "Tag retrieved successfully",
        "data": {
            "tag": {
                "id": tag.uuid,
                "name": tag.name,
                "posts": posts.iter().map(TagPostResponse::from).collect::<Vec<_>>(),
            },
            "usedIn": used_in,
        },
    })))
}

// --- Handlers ---

async fn list_tags(
    State(state): State<TagsState>,
    ApiAuth(_user): ApiAuth,
    Query(query): Query<TagListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let pagination = Pagination::from_query(query.page.as_deref(), query.limit.as_deref())?;
    let search = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let total = state
        .db
        .tags()
        .count(search)
        .await
        .db_err("Failed to count tags")?;
    let total_pages = pagination.ensure_in_bounds(total)?;

    let tags = state
        .db
        .tags()
        .list(search, pagination.limit, pagination.skip)
        .await
        .db_err("Failed to list tags")?;

    let tags: Vec<_> = tags
        .iter()
        .map(|t| {
            json!({
                "id": t.uuid,
                "name": t.name,
                "postCount": t.post_count,
            })
        })
        .collect();

    Ok(Json(json!({
        "status": "success",
        "message": "Tags retrieved successfully",
        "totalPages": total_pages,
        "currentPage": pagination.page,
        "totalTags": total,
        "data": { "tags": tags },
    })))
}

async fn get_tag_by_id(
    State(state): State<TagsState>,
    ApiAuth(user): ApiAuth,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    validate_uuid(&id)?;

    let tag = state
        .db
        .tags()
        .get_by_uuid(&id)
        .await
        .db_err("Failed to get tag")?
        .ok_or_else(|| ApiError::not_found("Tag not found"))?;

    tag_detail(&state, &tag, user.claims.role).await
}

async fn get_tag_by_name(
    State(state): State<TagsState>,
    ApiAuth(user): ApiAuth,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let normalized = name.to_lowercase();
    let tag = state
        .db
        .tags()
        .get_by_name(&normalized)
        .await
        .db_err("Failed to get tag")?
        .ok_or_else(|| ApiError::not_found("Tag not found"))?;

    tag_detail(&state, &tag, user.claims.role).await
}

async fn create_tag(
    State(state): State<TagsState>,
    AdminAuth(_admin): AdminAuth,
    Json(payload): Json<TagRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let name = payload.name.trim();
    super::validate::validate_tag_name(name)?;
    let normalized = name.to_lowercase();

    if state
        .db
        .tags()
        .get_by_name(&normalized)
        .await
        .db_err("Failed to check tag")?
        .is_some()
    {
        return Err(ApiError::bad_request("Tag already exists"));
    }

    let uuid = uuid::Uuid::new_v4().to_string();
    state
        .db
        .tags()
        .create(&uuid, &normalized)
        .await
        .db_err("Failed to create tag")?;

    Ok((
        StatusCode::CREATED,
        super::envelope::success(
            "Tag created successfully",
            json!({ "tag": { "id": uuid, "name": normalized } }),
        ),
    ))
}

async fn update_tag(
    State(state): State<TagsState>,
    AdminAuth(_admin): AdminAuth,
    Path(id): Path<String>,
    Json(payload): Json<UpdateTagRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_uuid(&id)?;

    let tag = state
        .db
        .tags()
        .get_by_uuid(&id)
        .await
        .db_err("Failed to get tag")?
        .ok_or_else(|| ApiError::not_found("Tag not found"))?;

    let normalized = match payload.name.as_deref().map(str::trim) {
        Some(name) => {
            super::validate::validate_tag_name(name)?;
            name.to_lowercase()
        }
        None => tag.name.clone(),
    };

    if let Some(existing) = state
        .db
        .tags()
        .get_by_name(&normalized)
        .await
        .db_err("Failed to check tag")?
    {
        if existing.id != tag.id {
            return Err(ApiError::bad_request("Tag with this name already exists"));
        }
    }

    state
        .db
        .tags()
        .rename(tag.id, &normalized)
        .await
        .db_err("Failed to update tag")?;

    Ok(super::envelope::success(
        "Tag updated successfully",
        json!({ "updatedTag": { "id": tag.uuid, "name": normalized } }),
    ))
}

/// Delete a tag, refused while any post still references it.
async fn delete_tag(
    State(state): State<TagsState>,
    AdminAuth(_admin): AdminAuth,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    validate_uuid(&id)?;

    let tag = state
        .db
        .tags()
        .get_by_uuid(&id)
        .await
        .db_err("Failed to get tag")?
        .ok_or_else(|| ApiError::not_found("Tag not found"))?;

    let used = state
        .db
        .posts()
        .count_by_tag(tag.id)
        .await
        .db_err("Failed to count tag posts")?;
    if used > 0 {
        return Err(ApiError::bad_request(
            "Cannot delete tag because it is associated with existing posts",
        ));
    }

    state
        .db
        .tags()
        .delete(tag.id)
        .await
        .db_err("Failed to delete tag")?;

    Ok(super::envelope::success_empty("Tag deleted successfully"))
}
