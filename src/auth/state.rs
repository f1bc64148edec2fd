//! Authentication state trait and macro.

use crate::jwt::JwtConfig;
use crate::revocation::RevocationStore;

/// Trait for state types that provide the verifier's collaborators.
pub trait HasAuthState {
    fn jwt(&self) -> &JwtConfig;
    fn revocations(&self) -> &dyn RevocationStore;
}

/// Macro to implement `HasAuthState` for state structs with the standard
/// fields.
///
/// The struct must have these fields:
/// - `jwt: Arc<JwtConfig>`
/// - `revocations: Arc<dyn RevocationStore>`
///
/// # Example
/// ```ignore
/// use crate::impl_has_auth_state;
///
/// #[derive(Clone)]
/// pub struct MyState {
///     pub db: Database,
///     pub jwt: Arc<JwtConfig>,
///     pub revocations: Arc<dyn RevocationStore>,
///     // ... other fields
/// }
///
/// impl_has_auth_state!(MyState);
/// ```
#[macro_export]
macro_rules! impl_has_auth_state {
    ($state_type:ty) => {
        impl $crate::auth::HasAuthState for $state_type {
            fn jwt(&self) -> &$crate::jwt::JwtConfig {
                &self.jwt
            }
            fn revocations(&self) -> &dyn $crate::revocation::RevocationStore {
                self.revocations.as_ref()
            }
        }
    };
}
