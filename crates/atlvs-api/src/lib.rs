//! ATLVS API
//!
//! HTTP surface of the tenant access gate. Exposed as a library so integration
//! tests can build the router against in-memory stores.

pub mod api_doc;
pub mod auth;
pub mod error;
pub mod handlers;
pub mod setup;
pub mod state;
