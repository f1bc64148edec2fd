//! User profile and account administration endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    middleware,
    response::IntoResponse,
    routing::{get, patch, put},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use super::error::{ApiError, ResultExt, validate_uuid};
use super::tags::TagResponse;
use super::validate::{validate_email, validate_password, validate_username};
use crate::auth::{AdminAuth, ApiAuth};
use crate::db::{CommentFilter, Database, User, UserRole};
use crate::impl_has_auth_state;
use crate::jwt::JwtConfig;
use crate::password::{hash_password, verify_password};
use crate::rate_limit::{RateLimitConfig, rate_limit_profile_update};
use crate::revocation::RevocationStore;

/// State for user endpoints.
#[derive(Clone)]
pub struct UsersState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
    pub revocations: Arc<dyn RevocationStore>,
    pub rate_limit: Arc<RateLimitConfig>,
}

impl_has_auth_state!(UsersState);

pub fn router(state: UsersState) -> Router {
    // The rate limit covers the profile update only, so the layer wraps the
    // PUT route before the unlimited GET is added to the same path.
    let me_routes = put(update_profile)
        .layer(middleware::from_fn_with_state(
            state.rate_limit.clone(),
            rate_limit_profile_update,
        ))
        .get(get_profile);

    Router::new()
        .route("/", get(list_users))
        .route("/me", me_routes)
        .route("/email", get(get_user_by_email))
        .route("/{id}", get(get_user_by_id).delete(delete_user))
        .route("/{id}/role", patch(update_role))
        .with_state(state)
}

// --- Request/Response types ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: UserRole,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.uuid.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role,
            created_at: user.created_at.clone(),
            updated_at: user.updated_at.clone(),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateProfileRequest {
    username: Option<String>,
    email: Option<String>,
    old_password: Option<String>,
    new_password: Option<String>,
}

#[derive(Deserialize)]
struct UpdateRoleRequest {
    role: String,
}

#[derive(Deserialize)]
struct EmailQuery {
    email: Option<String>,
}

/// Post subset embedded in profile reads, with its comments and tags.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProfilePost {
    id: String,
    title: String,
    content: String,
    category: String,
    published: bool,
    created_at: String,
    updated_at: String,
    comments: Vec<ProfileComment>,
    tags: Vec<TagResponse>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProfileComment {
    id: String,
    content: String,
    created_at: String,
    updated_at: String,
}

// --- Helpers ---

/// Full profile: the user plus their posts, each with comments and tags.
async fn load_profile(state: &UsersState, user: &User) -> Result<serde_json::Value, ApiError> {
    let posts = state
        .db
        .posts()
        .list_by_author(user.id)
        .await
        .db_err("Failed to list posts")?;

    let mut profile_posts = Vec::with_capacity(posts.len());
    for post in &posts {
        let tags = state
            .db
            .tags()
            .for_post(post.id)
            .await
            .db_err("Failed to load post tags")?;
        let comments = state
            .db
            .comments()
            .list(
                &CommentFilter {
                    post_id: Some(post.id),
                    ..Default::default()
                },
                -1, // all comments of the post
                0,
            )
            .await
            .db_err("Failed to load post comments")?;

        profile_posts.push(ProfilePost {
            id: post.uuid.clone(),
            title: post.title.clone(),
            content: post.content.clone(),
            category: post.category.clone(),
            published: post.published,
            created_at: post.created_at.clone(),
            updated_at: post.updated_at.clone(),
            comments: comments
                .iter()
                .map(|c| ProfileComment {
                    id: c.uuid.clone(),
                    content: c.content.clone(),
                    created_at: c.created_at.clone(),
                    updated_at: c.updated_at.clone(),
                })
                .collect(),
            tags: tags.iter().map(TagResponse::from).collect(),
        });
    }

    let mut profile = serde_json::to_value(UserResponse::from(user))
        .map_err(|e| ApiError::internal(format!("Failed to serialize user: {}", e)))?;
    profile["posts"] = serde_json::to_value(profile_posts)
        .map_err(|e| ApiError::internal(format!("Failed to serialize posts: {}", e)))?;
    Ok(profile)
}

// --- Handlers ---

async fn get_profile(
    State(state): State<UsersState>,
    ApiAuth(user): ApiAuth,
) -> Result<impl IntoResponse, ApiError> {
    let db_user = state
        .db
        .users()
        .get_by_uuid(&user.claims.id)
        .await
        .db_err("Failed to get user")?
        .ok_or_else(|| ApiError::not_found("User Not Found"))?;

    let profile = load_profile(&state, &db_user).await?;
    Ok(super::envelope::success(
        "User profile retrieved successfully",
        json!({ "user": profile }),
    ))
}

async fn get_user_by_id(
    State(state): State<UsersState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    validate_uuid(&id)?;

    let user = state
        .db
        .users()
        .get_by_uuid(&id)
        .await
        .db_err("Failed to get user")?
        .ok_or_else(|| ApiError::not_found("User Not Found"))?;

    let profile = load_profile(&state, &user).await?;
    Ok(super::envelope::success(
        "User profile retrieved successfully",
        json!({ "user": profile }),
    ))
}

async fn update_profile(
    State(state): State<UsersState>,
    ApiAuth(user): ApiAuth,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let db_user = state
        .db
        .users()
        .get_by_uuid(&user.claims.id)
        .await
        .db_err("Failed to get user")?
        .ok_or_else(|| ApiError::not_found("User Not Found"))?;

    let username = payload.username.as_deref().map(str::trim);
    let email = payload.email.as_deref().map(str::trim);

    if let Some(username) = username {
        validate_username(username)?;
        if let Some(existing) = state
            .db
            .users()
            .get_by_username(username)
            .await
            .db_err("Failed to check username")?
        {
            if existing.id != db_user.id {
                return Err(ApiError::bad_request("username is already in use"));
            }
        }
    }

    if let Some(email) = email {
        validate_email(email)?;
        if let Some(existing) = state
            .db
            .users()
            .get_by_email(email)
            .await
            .db_err("Failed to check email")?
        {
            if existing.id != db_user.id {
                return Err(ApiError::bad_request("Email is already in use"));
            }
        }
    }

    // The current password is required exactly when a new one is requested.
    let password_hash = match (&payload.old_password, &payload.new_password) {
        (Some(_), None) => {
            return Err(ApiError::bad_request(
                "New password is required when old password is provided",
            ));
        }
        (None, Some(_)) => {
            return Err(ApiError::bad_request(
                "Old password is required to set a new password",
            ));
        }
        (Some(old), Some(new)) => {
            if new == old {
                return Err(ApiError::bad_request(
                    "New password must be different from old password",
                ));
            }
            validate_password(new)?;
            if !verify_password(old, &db_user.password_hash) {
                return Err(ApiError::bad_request("Old password is incorrect"));
            }
            Some(
                hash_password(new)
                    .map_err(|e| ApiError::internal(format!("Failed to hash password: {}", e)))?,
            )
        }
        (None, None) => None,
    };

    state
        .db
        .users()
        .update_profile(db_user.id, username, email, password_hash.as_deref())
        .await
        .db_err("Failed to update user")?;

    let updated = state
        .db
        .users()
        .get_by_id(db_user.id)
        .await
        .db_err("Failed to get updated user")?
        .ok_or_else(|| ApiError::internal("Updated user not found"))?;

    Ok(super::envelope::success(
        "User profile updated successfully",
        json!({ "user": UserResponse::from(&updated) }),
    ))
}

async fn list_users(
    State(state): State<UsersState>,
    AdminAuth(_admin): AdminAuth,
) -> Result<impl IntoResponse, ApiError> {
    let users = state
        .db
        .users()
        .list_all()
        .await
        .db_err("Failed to list users")?;

    Ok(super::envelope::success(
        "All users retrieved successfully",
        json!({ "users": users.iter().map(UserResponse::from).collect::<Vec<_>>() }),
    ))
}

async fn get_user_by_email(
    State(state): State<UsersState>,
    AdminAuth(_admin): AdminAuth,
    Query(query): Query<EmailQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let email = query
        .email
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::bad_request("Email is required"))?;
    validate_email(email)?;

    let user = state
        .db
        .users()
        .get_by_email(email)
        .await
        .db_err("Failed to get user")?
        .ok_or_else(|| ApiError::not_found("User Not Found"))?;

    Ok(super::envelope::success(
        "user retrieved successfully",
        json!({ "user": UserResponse::from(&user) }),
    ))
}

/// Change a user's stored role. Already-issued tokens keep the role they
/// were minted with until they expire.
async fn update_role(
    State(state): State<UsersState>,
    AdminAuth(_admin): AdminAuth,
    Path(id): Path<String>,
    Json(payload): Json<UpdateRoleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_uuid(&id)?;

    let role = match payload.role.as_str() {
        "USER" => UserRole::User,
        "ADMIN" => UserRole::Admin,
        _ => return Err(ApiError::bad_request("This role is not allowed")),
    };

    let user = state
        .db
        .users()
        .get_by_uuid(&id)
        .await
        .db_err("Failed to get user")?
        .ok_or_else(|| ApiError::not_found("User Not Found"))?;

    state
        .db
        .users()
        .set_role(user.id, role)
        .await
        .db_err("Failed to update role")?;

    let updated = state
        .db
        .users()
        .get_by_id(user.id)
        .await
        .db_err("Failed to get updated user")?
        .ok_or_else(|| ApiError::internal("Updated user not found"))?;

    Ok(super::envelope::success(
        "user role updated successfully",
        json!({ "user": UserResponse::from(&updated) }),
    ))
}

/// Self-service account deletion (admins may delete other users). Admin
/// accounts cannot be deleted through this route by anyone.
async fn delete_user(
    State(state): State<UsersState>,
    ApiAuth(caller): ApiAuth,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    validate_uuid(&id)?;

    let is_self = caller.claims.id == id;
    let is_admin = match caller.claims.role {
        UserRole::Admin => true,
        UserRole::User => false,
    };
    if !is_self && !is_admin {
        return Err(ApiError::forbidden(
            "You are not authorized to delete this user",
        ));
    }

    let user = state
        .db
        .users()
        .get_by_uuid(&id)
        .await
        .db_err("Failed to get user")?
        .ok_or_else(|| ApiError::not_found("User Not Found"))?;

    if user.role == UserRole::Admin {
        return Err(ApiError::bad_request("You can't delete this user"));
    }

    state
        .db
        .users()
        .delete(user.id)
        .await
        .db_err("Failed to delete user")?;

    Ok(super::envelope::success_empty("user deleted successfully"))
}
