//! Gate wiring for the HTTP layer
//!
//! [`middleware`] runs the gate pipeline on every protected request and enforces
//! per-route policies; [`extractors`] hands its results to handlers;
//! [`credentials`] reads and re-issues session cookies.

pub mod credentials;
pub mod extractors;
pub mod middleware;

pub use extractors::{ClientIp, Granted, RequestContext};
pub use middleware::{api_gate_middleware, page_gate_middleware, require_policy, with_policy};
