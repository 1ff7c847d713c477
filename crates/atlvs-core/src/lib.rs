//! ATLVS Core Library
//!
//! Domain models, error types, feature-flag configuration and service configuration
//! shared by every crate of the tenant access gate.

pub mod config;
pub mod constants;
pub mod error;
pub mod feature_flags;
pub mod models;

// Re-export commonly used types
pub use config::{AuthProviderKind, BaseConfig, Config, GateServiceConfig, LogFormat};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use feature_flags::{FeatureFlagDefinition, FeatureFlagRegistry, FlagScope};
