//! Registration, login, and logout.

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware,
    response::IntoResponse,
    routing::post,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::error;

use super::error::{ApiError, ResultExt};
use super::users::UserResponse;
use super::validate::{validate_email, validate_password, validate_username};
use crate::auth::{ApiAuth, bearer_token};
use crate::db::Database;
use crate::impl_has_auth_state;
use crate::jwt::JwtConfig;
use crate::password::{hash_password, verify_password};
use crate::rate_limit::{RateLimitConfig, rate_limit_login};
use crate::revocation::{RevocationStore, revocation_key};

#[derive(Clone)]
pub struct AuthState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
    pub revocations: Arc<dyn RevocationStore>,
    pub rate_limit: Arc<RateLimitConfig>,
}

impl_has_auth_state!(AuthState);

pub fn router(state: AuthState) -> Router {
    let login_router = Router::new()
        .route("/login", post(login))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(
            state.rate_limit.clone(),
            rate_limit_login,
        ));

    Router::new()
        .route("/register", post(register))
        .route("/logout", post(logout))
        .with_state(state)
        .merge(login_router)
}

// --- Request/Response types ---

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest {
    username: String,
    email: String,
    password: String,
    confirm_password: String,
}

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthData {
    user: UserResponse,
    access_token: String,
}

// --- Handlers ---

async fn register(
    State(state): State<AuthState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = payload.username.trim();
    let email = payload.email.trim();

    validate_username(username)?;
    validate_email(email)?;
    validate_password(&payload.password)?;
    if payload.confirm_password != payload.password {
        return Err(ApiError::bad_request("Passwords do not match"));
    }

    if state
        .db
        .users()
        .get_by_email(email)
        .await
        .db_err("Failed to check email")?
        .is_some()
    {
        return Err(ApiError::bad_request("User already exists"));
    }
    if state
        .db
        .users()
        .get_by_username(username)
        .await
        .db_err("Failed to check username")?
        .is_some()
    {
        return Err(ApiError::bad_request("username is already in use"));
    }

    let password_hash = hash_password(&payload.password)
        .map_err(|e| ApiError::internal(format!("Failed to hash password: {}", e)))?;

    let uuid = uuid::Uuid::new_v4().to_string();
    state
        .db
        .users()
        .create(&uuid, username, email, &password_hash)
        .await
        .db_err("Failed to create user")?;

    let user = state
        .db
        .users()
        .get_by_uuid(&uuid)
        .await
        .db_err("Failed to get created user")?
        .ok_or_else(|| ApiError::internal("Created user not found"))?;

    let minted = state
        .jwt
        .generate_token(&user.uuid, &user.email, user.role)
        .map_err(|e| {
            error!("Failed to generate token: {}", e);
            ApiError::internal("Failed to generate token")
        })?;

    Ok((
        StatusCode::CREATED,
        super::envelope::success(
            "User created successfully",
            AuthData {
                user: UserResponse::from(&user),
                access_token: minted.token,
            },
        ),
    ))
}

async fn login(
    State(state): State<AuthState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .db
        .users()
        .get_by_email(payload.email.trim())
        .await
        .db_err("Failed to get user")?
        .ok_or_else(|| ApiError::not_found("No user with this email"))?;

    if !verify_password(&payload.password, &user.password_hash) {
        return Err(ApiError::not_found("Incorrect Password"));
    }

    let minted = state
        .jwt
        .generate_token(&user.uuid, &user.email, user.role)
        .map_err(|e| {
            error!("Failed to generate token: {}", e);
            ApiError::internal("Failed to generate token")
        })?;

    Ok(super::envelope::success(
        "User logged in successfully",
        AuthData {
            user: UserResponse::from(&user),
            access_token: minted.token,
        },
    ))
}

/// Revoke the presented token until its natural expiry.
///
/// The `ApiAuth` extractor has already run, so an expired or already-revoked
/// token never reaches this handler a second time.
async fn logout(
    State(state): State<AuthState>,
    ApiAuth(user): ApiAuth,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let token = bearer_token(&headers).ok_or_else(|| ApiError::unauthorized("Token required"))?;

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|_| ApiError::internal("System time error"))?
        .as_secs();

    // Nothing to revoke once the token has expired on its own.
    let ttl = user.claims.exp.saturating_sub(now);
    if ttl == 0 {
        return Err(ApiError::bad_request("Invalid token"));
    }

    state
        .revocations
        .revoke(&revocation_key(token), ttl)
        .await
        .map_err(|e| {
            error!("Failed to revoke token: {}", e);
            ApiError::internal("Failed to revoke token")
        })?;

    Ok(super::envelope::success_empty("Logged out successfully"))
}
