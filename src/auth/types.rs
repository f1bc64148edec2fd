//! Authentication user types.

use crate::jwt::Claims;

/// Identity context for one request, decoded from a verified token.
/// Immutable for the request's lifetime; reconstructed per request.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    /// JWT claims from the access token
    pub claims: Claims,
}
