//! JWT authentication with role-based access control.
//!
//! Every protected request passes the token verifier (revocation check, then
//! signature/expiry) before any handler logic; role-gated routes add the
//! admin guard on top. The verified identity is threaded to handlers as an
//! immutable extractor value, never a request-scoped mutation.

mod errors;
mod extractors;
mod ip;
mod state;
mod types;

pub use errors::{ApiAuthError, AuthErrorKind};
pub use extractors::{AdminAuth, ApiAuth, bearer_token};
pub use ip::extract_client_ip;
pub use state::HasAuthState;
pub use types::AuthenticatedUser;
