//! Auth provider abstraction
//!
//! The gate never owns identities: it asks the external auth provider who a
//! credential belongs to. Two implementations ship with the service:
//! [`jwt::JwtAuthProvider`] verifies access tokens locally with the provider's
//! signing secret, [`remote::RemoteAuthProvider`] asks the provider's REST API.

pub mod jwt;
pub mod remote;

pub use jwt::JwtAuthProvider;
pub use remote::RemoteAuthProvider;

use async_trait::async_trait;
use atlvs_core::models::Identity;
use atlvs_core::AppError;

/// What the provider says about an access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderSession {
    Valid(Identity),
    /// Well-formed but expired; a refresh may recover the session.
    Expired,
    /// Malformed, forged or revoked.
    Invalid,
}

/// Fresh tokens issued by a refresh. The HTTP layer re-issues them as cookies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotatedCredential {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: Option<i64>,
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Resolve an access token. Only transport or upstream failures are errors,
    /// and they must be reported as `AppError::Infrastructure`.
    async fn get_session(&self, access_token: &str) -> Result<ProviderSession, AppError>;

    /// Exchange a refresh token. `Ok(None)` when the provider rejects it or
    /// does not support rotation.
    async fn refresh(
        &self,
        refresh_token: &str,
    ) -> Result<Option<(Identity, RotatedCredential)>, AppError>;
}
