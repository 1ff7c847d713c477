//! Configuration module
//!
//! Service configuration loaded from the environment (and `.env` through
//! `dotenvy`) once at startup, validated, and passed explicitly to the gate and
//! the HTTP layer.

use std::env;
use std::str::FromStr;

use crate::constants::{DEFAULT_JWT_AUDIENCE, DEFAULT_REFRESH_COOKIE, DEFAULT_SESSION_COOKIE};
use crate::feature_flags::FeatureFlagRegistry;

// Common constants
const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const AUTH_TIMEOUT_SECS: u64 = 10;
const TRUSTED_PROXY_COUNT: usize = 1;

/// How sessions are validated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthProviderKind {
    /// Verify the provider-issued access token locally with the shared JWT secret.
    Jwt,
    /// Ask the hosted auth REST API for the session user.
    Remote,
}

impl FromStr for AuthProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "jwt" => Ok(AuthProviderKind::Jwt),
            "remote" => Ok(AuthProviderKind::Remote),
            other => Err(anyhow::anyhow!(
                "AUTH_PROVIDER must be 'jwt' or 'remote', got '{}'",
                other
            )),
        }
    }
}

/// Console log output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

/// Base configuration shared by every binary
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub environment: String,
    pub log_format: LogFormat,
    pub trusted_proxy_count: usize,
}

/// Tenant access gate configuration
#[derive(Clone, Debug)]
pub struct GateServiceConfig {
    pub base: BaseConfig,
    pub database_url: String,
    // Auth provider
    pub auth_provider: AuthProviderKind,
    pub auth_jwt_secret: Option<String>,
    pub auth_jwt_audience: String,
    pub auth_url: Option<String>,
    pub auth_anon_key: Option<String>,
    pub auth_timeout_seconds: u64,
    // Session cookies and redirects
    pub session_cookie_name: String,
    pub refresh_cookie_name: String,
    pub login_path: String,
    pub onboarding_path: String,
    // Entitlements and audit
    pub feature_flags: FeatureFlagRegistry,
    pub audit_enabled: bool,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<GateServiceConfig>);

impl Config {
    fn as_gate(&self) -> &GateServiceConfig {
        &self.0
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        is_production_name(&self.as_gate().base.environment)
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        let config = GateServiceConfig::from_lookup(|key| env::var(key).ok())?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.as_gate().validate()
    }

    pub fn server_port(&self) -> u16 {
        self.as_gate().base.server_port
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.as_gate().base.cors_origins
    }

    pub fn environment(&self) -> &str {
        &self.as_gate().base.environment
    }

    pub fn log_format(&self) -> LogFormat {
        self.as_gate().base.log_format
    }

    pub fn trusted_proxy_count(&self) -> usize {
        self.as_gate().base.trusted_proxy_count
    }

    pub fn db_max_connections(&self) -> u32 {
        self.as_gate().base.db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.as_gate().base.db_timeout_seconds
    }

    pub fn database_url(&self) -> &str {
        &self.as_gate().database_url
    }

    pub fn auth_provider(&self) -> AuthProviderKind {
        self.as_gate().auth_provider
    }

    pub fn auth_jwt_secret(&self) -> Option<&str> {
        self.as_gate().auth_jwt_secret.as_deref()
    }

    pub fn auth_jwt_audience(&self) -> &str {
        &self.as_gate().auth_jwt_audience
    }

    pub fn auth_url(&self) -> Option<&str> {
        self.as_gate().auth_url.as_deref()
    }

    pub fn auth_anon_key(&self) -> Option<&str> {
        self.as_gate().auth_anon_key.as_deref()
    }

    pub fn auth_timeout_seconds(&self) -> u64 {
        self.as_gate().auth_timeout_seconds
    }

    pub fn session_cookie_name(&self) -> &str {
        &self.as_gate().session_cookie_name
    }

    pub fn refresh_cookie_name(&self) -> &str {
        &self.as_gate().refresh_cookie_name
    }

    pub fn login_path(&self) -> &str {
        &self.as_gate().login_path
    }

    pub fn onboarding_path(&self) -> &str {
        &self.as_gate().onboarding_path
    }

    pub fn feature_flags(&self) -> &FeatureFlagRegistry {
        &self.as_gate().feature_flags
    }

    pub fn audit_enabled(&self) -> bool {
        self.as_gate().audit_enabled
    }
}

fn is_production_name(environment: &str) -> bool {
    let env = environment.to_lowercase();
    env == "production" || env == "prod"
}

fn parse_bool(value: Option<String>, default: bool) -> bool {
    value
        .map(|v| v.trim().to_lowercase())
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl GateServiceConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key lookup (the process environment in
    /// production, a map in tests).
    pub fn from_lookup<F>(var: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = var("ENVIRONMENT")
            .or_else(|| var("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let cors_origins_str = var("CORS_ORIGINS").unwrap_or_else(|| "*".to_string());
        if is_production_name(&environment) && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }
        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let log_format = match var("LOG_FORMAT").map(|s| s.to_lowercase()).as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Compact,
        };

        let base = BaseConfig {
            server_port: var("PORT")
                .unwrap_or_else(|| "4000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            cors_origins,
            db_max_connections: var("DB_MAX_CONNECTIONS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: var("DB_TIMEOUT_SECONDS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            environment,
            log_format,
            trusted_proxy_count: var("TRUSTED_PROXY_COUNT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(TRUSTED_PROXY_COUNT),
        };

        let auth_provider = var("AUTH_PROVIDER")
            .map(|s| s.parse::<AuthProviderKind>())
            .transpose()?
            .unwrap_or(AuthProviderKind::Jwt);

        let feature_flags = match var("FEATURE_FLAGS").filter(|s| !s.trim().is_empty()) {
            Some(spec) => FeatureFlagRegistry::parse(&spec)?,
            None => FeatureFlagRegistry::builtin(),
        };

        let config = GateServiceConfig {
            base,
            database_url: var("DATABASE_URL")
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL must be set"))?,
            auth_provider,
            auth_jwt_secret: var("AUTH_JWT_SECRET").filter(|s| !s.is_empty()),
            auth_jwt_audience: var("AUTH_JWT_AUDIENCE")
                .unwrap_or_else(|| DEFAULT_JWT_AUDIENCE.to_string()),
            auth_url: var("AUTH_URL")
                .filter(|s| !s.is_empty())
                .map(|s| s.trim_end_matches('/').to_string()),
            auth_anon_key: var("AUTH_ANON_KEY").filter(|s| !s.is_empty()),
            auth_timeout_seconds: var("AUTH_TIMEOUT_SECONDS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(AUTH_TIMEOUT_SECS),
            session_cookie_name: var("SESSION_COOKIE_NAME")
                .unwrap_or_else(|| DEFAULT_SESSION_COOKIE.to_string()),
            refresh_cookie_name: var("REFRESH_COOKIE_NAME")
                .unwrap_or_else(|| DEFAULT_REFRESH_COOKIE.to_string()),
            login_path: var("LOGIN_PATH").unwrap_or_else(|| "/login".to_string()),
            onboarding_path: var("ONBOARDING_PATH").unwrap_or_else(|| "/onboarding".to_string()),
            feature_flags,
            audit_enabled: parse_bool(var("AUDIT_ENABLED"), true),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !self.database_url.starts_with("postgresql://")
            && !self.database_url.starts_with("postgres://")
        {
            return Err(anyhow::anyhow!(
                "DATABASE_URL must be a valid PostgreSQL connection string"
            ));
        }

        match self.auth_provider {
            AuthProviderKind::Jwt => match self.auth_jwt_secret.as_deref() {
                Some(secret) if secret.len() >= 32 => {}
                Some(_) => {
                    return Err(anyhow::anyhow!(
                        "AUTH_JWT_SECRET must be at least 32 characters long"
                    ))
                }
                None => {
                    return Err(anyhow::anyhow!(
                        "AUTH_JWT_SECRET must be set when AUTH_PROVIDER=jwt"
                    ))
                }
            },
            AuthProviderKind::Remote => {
                if self.auth_url.is_none() || self.auth_anon_key.is_none() {
                    return Err(anyhow::anyhow!(
                        "AUTH_URL and AUTH_ANON_KEY must be set when AUTH_PROVIDER=remote"
                    ));
                }
            }
        }

        for (name, path) in [
            ("LOGIN_PATH", &self.login_path),
            ("ONBOARDING_PATH", &self.onboarding_path),
        ] {
            if !path.starts_with('/') || path.starts_with("//") {
                return Err(anyhow::anyhow!("{} must be an absolute local path", name));
            }
        }

        if self.session_cookie_name.is_empty() || self.refresh_cookie_name.is_empty() {
            return Err(anyhow::anyhow!("Session cookie names must not be empty"));
        }

        Ok(())
    }
}
