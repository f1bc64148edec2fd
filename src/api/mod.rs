mod auth;
mod comments;
mod envelope;
mod error;
mod posts;
mod tags;
mod users;
mod validate;

use axum::Router;
use std::sync::Arc;

use crate::db::Database;
use crate::jwt::JwtConfig;
use crate::rate_limit::RateLimitConfig;
use crate::revocation::RevocationStore;

/// Create the API router.
pub fn create_api_router(
    db: Database,
    jwt: Arc<JwtConfig>,
    revocations: Arc<dyn RevocationStore>,
    rate_limit: Arc<RateLimitConfig>,
) -> Router {
    let auth_state = auth::AuthState {
        db: db.clone(),
        jwt: jwt.clone(),
        revocations: revocations.clone(),
        rate_limit: rate_limit.clone(),
    };

    let posts_state = posts::PostsState {
        db: db.clone(),
        jwt: jwt.clone(),
        revocations: revocations.clone(),
    };

    let comments_state = comments::CommentsState {
        db: db.clone(),
        jwt: jwt.clone(),
        revocations: revocations.clone(),
    };

    let tags_state = tags::TagsState {
        db: db.clone(),
        jwt: jwt.clone(),
        revocations: revocations.clone(),
    };

    let users_state = users::UsersState {
        db,
        jwt,
        revocations,
        rate_limit,
    };

    Router::new()
        .nest("/auth", auth::router(auth_state))
        .nest(
            "/posts",
            posts::router(posts_state)
                .merge(comments::post_comments_router(comments_state.clone())),
        )
        .nest(
            "/comments",
            comments::router(comments_state.clone()),
        )
        .nest("/tags", tags::router(tags_state))
        .nest(
            "/users",
            users::router(users_state).merge(comments::user_comments_router(comments_state)),
        )
}
