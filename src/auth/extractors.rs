//! Axum extractors for authentication and role gating.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};

use super::errors::{ApiAuthError, AuthErrorKind};
use super::state::HasAuthState;
use super::types::AuthenticatedUser;
use crate::db::UserRole;
use crate::revocation::{RevocationStore as _, revocation_key};

/// Extract the token from an `Authorization: Bearer <token>` header.
/// Any other scheme (or no header) is a missing credential.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    value.strip_prefix("Bearer ").map(str::trim).filter(|t| !t.is_empty())
}

/// Core verification shared by the extractors, in the contract's fixed
/// order: revocation lookup first, then signature/expiry, then decode.
async fn authenticate<S>(parts: &Parts, state: &S) -> Result<AuthenticatedUser, AuthErrorKind>
where
    S: HasAuthState + Send + Sync,
{
    let token = bearer_token(&parts.headers).ok_or(AuthErrorKind::MissingCredential)?;

    let revoked = state
        .revocations()
        .is_revoked(&revocation_key(token))
        .await
        .map_err(|e| {
            tracing::error!("Failed to check revocation store: {}", e);
            AuthErrorKind::StoreError
        })?;
    if revoked {
        return Err(AuthErrorKind::RevokedToken);
    }

    let claims = state
        .jwt()
        .validate_token(token)
        .map_err(|_| AuthErrorKind::InvalidToken)?;

    Ok(AuthenticatedUser { claims })
}

/// Extractor for endpoints that require authentication.
pub struct ApiAuth(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for ApiAuth
where
    S: HasAuthState + Send + Sync,
{
    type Rejection = ApiAuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        authenticate(parts, state)
            .await
            .map(ApiAuth)
            .map_err(ApiAuthError)
    }
}

/// Extractor for endpoints that require the ADMIN role.
///
/// Runs the verifier first, so an unauthenticated request fails with 401
/// before the role is ever evaluated. The role match is exhaustive; adding
/// a role forces this guard to be revisited.
pub struct AdminAuth(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for AdminAuth
where
    S: HasAuthState + Send + Sync,
{
    type Rejection = ApiAuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let ApiAuth(user) = ApiAuth::from_request_parts(parts, state).await?;

        match user.claims.role {
            UserRole::Admin => Ok(AdminAuth(user)),
            UserRole::User => Err(ApiAuthError(AuthErrorKind::Forbidden)),
        }
    }
}
