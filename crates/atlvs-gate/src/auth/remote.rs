//! Hosted auth REST API client
//!
//! `GET {auth_url}/auth/v1/user` resolves an access token and
//! `POST {auth_url}/auth/v1/token?grant_type=refresh_token` rotates a session.
//! Transport failures and 5xx answers are infrastructure errors, never a
//! silent "anonymous".

use super::{AuthProvider, ProviderSession, RotatedCredential};
use async_trait::async_trait;
use atlvs_core::models::Identity;
use atlvs_core::AppError;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
struct ProviderUser {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    email_confirmed_at: Option<DateTime<Utc>>,
}

impl From<ProviderUser> for Identity {
    fn from(user: ProviderUser) -> Self {
        Identity {
            id: user.id,
            email: user.email.unwrap_or_default(),
            email_confirmed: user.email_confirmed_at.is_some(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    user: ProviderUser,
}

#[derive(Clone)]
pub struct RemoteAuthProvider {
    client: reqwest::Client,
    base_url: String,
    anon_key: String,
}

impl RemoteAuthProvider {
    pub fn new(base_url: &str, anon_key: &str, timeout: Duration) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build auth HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
        })
    }

    fn transport_error(operation: &str, err: reqwest::Error) -> AppError {
        tracing::error!(error = %err, operation, "Auth provider request failed");
        AppError::Infrastructure(format!("auth provider {} failed: {}", operation, err))
    }

    fn upstream_error(operation: &str, status: StatusCode) -> AppError {
        tracing::error!(status = %status, operation, "Auth provider returned an error");
        AppError::Infrastructure(format!("auth provider {} returned {}", operation, status))
    }
}

#[async_trait]
impl AuthProvider for RemoteAuthProvider {
    #[tracing::instrument(skip(self, access_token), fields(auth.operation = "get_user"))]
    async fn get_session(&self, access_token: &str) -> Result<ProviderSession, AppError> {
        let response = self
            .client
            .get(format!("{}/auth/v1/user", self.base_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| Self::transport_error("get_user", e))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(Self::upstream_error("get_user", status));
        }
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(ProviderSession::Expired),
            s if s.is_success() => match response.json::<ProviderUser>().await {
                Ok(user) => Ok(ProviderSession::Valid(user.into())),
                Err(e) => {
                    tracing::warn!(error = %e, "Auth provider returned an unreadable user");
                    Ok(ProviderSession::Invalid)
                }
            },
            _ => Ok(ProviderSession::Invalid),
        }
    }

    #[tracing::instrument(skip(self, refresh_token), fields(auth.operation = "refresh"))]
    async fn refresh(
        &self,
        refresh_token: &str,
    ) -> Result<Option<(Identity, RotatedCredential)>, AppError> {
        let response = self
            .client
            .post(format!(
                "{}/auth/v1/token?grant_type=refresh_token",
                self.base_url
            ))
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({ "refresh_token": refresh_token }))
            .send()
            .await
            .map_err(|e| Self::transport_error("refresh", e))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(Self::upstream_error("refresh", status));
        }
        if !status.is_success() {
            tracing::debug!(status = %status, "Refresh token rejected");
            return Ok(None);
        }

        match response.json::<TokenResponse>().await {
            Ok(tokens) => {
                let rotated = RotatedCredential {
                    access_token: tokens.access_token,
                    refresh_token: tokens.refresh_token,
                    expires_in: tokens.expires_in,
                };
                Ok(Some((tokens.user.into(), rotated)))
            }
            Err(e) => {
                tracing::warn!(error = %e, "Auth provider returned an unreadable token response");
                Ok(None)
            }
        }
    }
}
