//! Session resolution
//!
//! "No session" is an outcome, not an error: missing, malformed, forged or
//! expired-and-unrefreshable credentials all resolve to [`SessionState::Anonymous`].
//! Only a failure to reach the auth provider is an error.

use crate::auth::{AuthProvider, ProviderSession, RotatedCredential};
use atlvs_core::models::Identity;
use atlvs_core::AppError;
use std::sync::Arc;

/// Raw credentials lifted off a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl Credentials {
    pub fn new(access_token: Option<String>, refresh_token: Option<String>) -> Self {
        let non_empty = |t: Option<String>| t.filter(|t| !t.trim().is_empty());
        Self {
            access_token: non_empty(access_token),
            refresh_token: non_empty(refresh_token),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Authenticated {
        identity: Identity,
        /// Set when the session was recovered through a refresh.
        rotated: Option<RotatedCredential>,
    },
    Anonymous,
}

impl SessionState {
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            SessionState::Authenticated { identity, .. } => Some(identity),
            SessionState::Anonymous => None,
        }
    }
}

#[derive(Clone)]
pub struct SessionResolver {
    provider: Arc<dyn AuthProvider>,
}

impl SessionResolver {
    pub fn new(provider: Arc<dyn AuthProvider>) -> Self {
        Self { provider }
    }

    /// A refresh is attempted only when the access token has expired or is
    /// missing. A rejected access token ends the session.
    pub async fn resolve(&self, credentials: &Credentials) -> Result<SessionState, AppError> {
        if let Some(token) = credentials.access_token.as_deref() {
            match self.provider.get_session(token).await? {
                ProviderSession::Valid(identity) => {
                    return Ok(SessionState::Authenticated {
                        identity,
                        rotated: None,
                    })
                }
                ProviderSession::Expired => {
                    tracing::debug!("Access token expired, attempting refresh");
                }
                ProviderSession::Invalid => {
                    tracing::debug!("Access token rejected");
                    return Ok(SessionState::Anonymous);
                }
            }
        }

        let Some(refresh_token) = credentials.refresh_token.as_deref() else {
            return Ok(SessionState::Anonymous);
        };

        match self.provider.refresh(refresh_token).await? {
            Some((identity, rotated)) => {
                tracing::info!(user_id = %identity.id, "Session refreshed");
                Ok(SessionState::Authenticated {
                    identity,
                    rotated: Some(rotated),
                })
            }
            None => Ok(SessionState::Anonymous),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use uuid::Uuid;

    struct ScriptedProvider {
        identity: Identity,
        fail: bool,
    }

    #[async_trait]
    impl AuthProvider for ScriptedProvider {
        async fn get_session(&self, access_token: &str) -> Result<ProviderSession, AppError> {
            if self.fail {
                return Err(AppError::Infrastructure("connection refused".into()));
            }
            Ok(match access_token {
                "valid" => ProviderSession::Valid(self.identity.clone()),
                "expired" => ProviderSession::Expired,
                _ => ProviderSession::Invalid,
            })
        }

        async fn refresh(
            &self,
            refresh_token: &str,
        ) -> Result<Option<(Identity, RotatedCredential)>, AppError> {
            Ok((refresh_token == "refresh").then(|| {
                (
                    self.identity.clone(),
                    RotatedCredential {
                        access_token: "valid".into(),
                        refresh_token: "refresh-2".into(),
                        expires_in: Some(3600),
                    },
                )
            }))
        }
    }

    fn resolver(fail: bool) -> (SessionResolver, Identity) {
        let identity = Identity::new(Uuid::new_v4(), "crew@example.com");
        let provider = ScriptedProvider {
            identity: identity.clone(),
            fail,
        };
        (SessionResolver::new(Arc::new(provider)), identity)
    }

    fn creds(access: Option<&str>, refresh: Option<&str>) -> Credentials {
        Credentials::new(access.map(String::from), refresh.map(String::from))
    }

    #[tokio::test]
    async fn test_valid_access_token_authenticates_without_rotation() {
        let (resolver, identity) = resolver(false);
        let state = resolver.resolve(&creds(Some("valid"), None)).await.unwrap();
        assert_eq!(
            state,
            SessionState::Authenticated {
                identity,
                rotated: None
            }
        );
    }

    #[tokio::test]
    async fn test_expired_token_is_refreshed_and_rotated() {
        let (resolver, identity) = resolver(false);
        let state = resolver
            .resolve(&creds(Some("expired"), Some("refresh")))
            .await
            .unwrap();
        match state {
            SessionState::Authenticated { identity: id, rotated } => {
                assert_eq!(id, identity);
                assert_eq!(rotated.unwrap().refresh_token, "refresh-2");
            }
            SessionState::Anonymous => panic!("expected refreshed session"),
        }
    }

    #[tokio::test]
    async fn test_missing_or_bad_credentials_are_anonymous() {
        let (resolver, _) = resolver(false);
        for c in [
            creds(None, None),
            creds(Some(""), Some("  ")),
            creds(Some("garbage"), None),
            creds(Some("expired"), None),
            creds(Some("expired"), Some("revoked")),
        ] {
            assert_eq!(resolver.resolve(&c).await.unwrap(), SessionState::Anonymous);
        }
    }

    #[tokio::test]
    async fn test_rejected_token_is_not_refreshed() {
        let (resolver, _) = resolver(false);
        let state = resolver
            .resolve(&creds(Some("forged"), Some("refresh")))
            .await
            .unwrap();
        assert_eq!(state, SessionState::Anonymous);
    }

    #[tokio::test]
    async fn test_refresh_cookie_alone_recovers_session() {
        let (resolver, identity) = resolver(false);
        let state = resolver.resolve(&creds(None, Some("refresh"))).await.unwrap();
        assert_eq!(state.identity(), Some(&identity));
    }

    #[tokio::test]
    async fn test_provider_failure_is_not_anonymous() {
        let (resolver, _) = resolver(true);
        let err = resolver.resolve(&creds(Some("valid"), None)).await.unwrap_err();
        assert!(err.is_infrastructure());
    }
}
