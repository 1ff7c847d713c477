//! ATLVS Infrastructure Library
//!
//! Shared infrastructure for the gate service:
//! - Telemetry initialization (console or JSON logs)
//! - Middleware (request ID, security headers)
//! - Client IP extraction behind trusted proxies

pub mod client_ip;
pub mod middleware;
pub mod telemetry;

pub use client_ip::extract_client_ip;
pub use middleware::{
    get_request_id, request_id_middleware, security_headers_middleware, RequestId,
    SecurityHeadersConfig,
};
pub use telemetry::init_telemetry;
