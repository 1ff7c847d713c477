//! Handler-side access to what the gate middleware resolved.

use crate::error::HttpAppError;
use atlvs_core::AppError;
use atlvs_gate::{AccessGrant, GateContext};
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use std::convert::Infallible;
use std::net::IpAddr;

/// The caller's resolved context.
#[derive(Debug, Clone)]
pub struct RequestContext(pub GateContext);

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = HttpAppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<GateContext>()
            .cloned()
            .map(RequestContext)
            .ok_or_else(|| {
                HttpAppError(AppError::Unauthenticated(
                    "Missing gate context".to_string(),
                ))
            })
    }
}

/// The grant issued by the route's policy.
#[derive(Debug, Clone)]
pub struct Granted(pub AccessGrant);

impl<S> FromRequestParts<S> for Granted
where
    S: Send + Sync,
{
    type Rejection = HttpAppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AccessGrant>()
            .cloned()
            .map(Granted)
            .ok_or_else(|| {
                HttpAppError(AppError::Internal(
                    "Route has no policy attached".to_string(),
                ))
            })
    }
}

/// Client address as seen through the trusted proxies.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClientIp(pub Option<IpAddr>);

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<ClientIp>().copied().unwrap_or_default())
    }
}
