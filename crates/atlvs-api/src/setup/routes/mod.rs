//! Route configuration and setup.
//!
//! Domain route groups live in [domains](domains); health checks in [health](health).

mod domains;
mod health;

use crate::api_doc::ApiDoc;
use crate::auth::{api_gate_middleware, page_gate_middleware};
use crate::state::AppState;
use atlvs_core::Config;
use atlvs_infra::{request_id_middleware, security_headers_middleware, SecurityHeadersConfig};
use axum::{
    extract::State,
    http::{HeaderValue, Method},
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

/// Request bodies are small JSON documents.
const MAX_BODY_BYTES: usize = 64 * 1024;
const HTTP_CONCURRENCY_LIMIT: usize = 10_000;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router<()>, anyhow::Error> {
    let cors = setup_cors(config)?;

    let public_routes = Router::new()
        .route(
            "/health",
            get(|State(state): State<Arc<AppState>>| health::liveness_check(state)),
        )
        .route(
            "/health/ready",
            get(|State(state): State<Arc<AppState>>| health::readiness_check(state)),
        )
        .route("/api/openapi.json", get(|| async { Json(ApiDoc::openapi()) }));

    // Gate layers go on the routes only, so unknown paths stay plain 404s.
    let api_routes = domains::api_routes(&state).route_layer(
        axum::middleware::from_fn_with_state(state.clone(), api_gate_middleware),
    );
    let page_routes = domains::page_routes(&state).route_layer(
        axum::middleware::from_fn_with_state(state.clone(), page_gate_middleware),
    );

    let security_headers_config = SecurityHeadersConfig {
        is_production: config.is_production(),
    };

    let app = public_routes
        .merge(api_routes)
        .merge(page_routes)
        .layer(ConcurrencyLimitLayer::new(HTTP_CONCURRENCY_LIMIT))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(axum::middleware::from_fn_with_state(
            security_headers_config,
            security_headers_middleware,
        ))
        .with_state(state);

    Ok(app)
}

/// Setup CORS configuration
fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let methods = [Method::GET, Method::POST, Method::OPTIONS];
    let cors = if config.cors_origins().iter().any(|o| o == "*") {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any)
    } else {
        let origins = config
            .cors_origins()
            .iter()
            .map(|o| {
                o.parse::<HeaderValue>()
                    .map_err(|e| anyhow::anyhow!("Invalid CORS origin {}: {}", o, e))
            })
            .collect::<Result<Vec<_>, _>>()?;

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(Any)
    };
    Ok(cors)
}
