//! HS256 access token verification

use super::{AuthProvider, ProviderSession, RotatedCredential};
use async_trait::async_trait;
use atlvs_core::models::Identity;
use atlvs_core::AppError;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Claims carried by the provider's access tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub aud: String,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(default)]
    pub user_metadata: UserMetadata,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<bool>,
}

pub struct JwtAuthProvider {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtAuthProvider {
    pub fn new(secret: &str, audience: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[audience]);
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    fn verify(&self, token: &str) -> ProviderSession {
        let claims = match decode::<AccessTokenClaims>(token, &self.decoding_key, &self.validation)
        {
            Ok(data) => data.claims,
            Err(e) => {
                return match e.kind() {
                    ErrorKind::ExpiredSignature => ProviderSession::Expired,
                    _ => {
                        tracing::debug!(error = %e, "Rejected access token");
                        ProviderSession::Invalid
                    }
                };
            }
        };

        let Ok(user_id) = Uuid::parse_str(&claims.sub) else {
            tracing::debug!(sub = %claims.sub, "Access token subject is not a UUID");
            return ProviderSession::Invalid;
        };

        ProviderSession::Valid(Identity {
            id: user_id,
            email: claims.email.unwrap_or_default(),
            email_confirmed: claims.user_metadata.email_verified.unwrap_or(false),
        })
    }
}

#[async_trait]
impl AuthProvider for JwtAuthProvider {
    async fn get_session(&self, access_token: &str) -> Result<ProviderSession, AppError> {
        Ok(self.verify(access_token))
    }

    /// Local verification has no token endpoint to rotate against.
    async fn refresh(
        &self,
        _refresh_token: &str,
    ) -> Result<Option<(Identity, RotatedCredential)>, AppError> {
        Ok(None)
    }
}
