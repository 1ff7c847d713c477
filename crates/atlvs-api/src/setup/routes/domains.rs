//! Gated route groups. Each API route names its policy here.

use crate::auth::with_policy;
use crate::handlers;
use crate::state::AppState;
use atlvs_core::constants::API_PREFIX;
use atlvs_gate::RoutePolicy;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

fn api(path: &str) -> String {
    format!("{}{}", API_PREFIX, path)
}

/// JSON API. Context, navigation, entitlements and the organization switcher
/// only need a resolved context.
pub(super) fn api_routes(state: &Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route(&api("/context"), get(handlers::context::get_context))
        .route(&api("/navigation"), get(handlers::context::get_navigation))
        .route(&api("/entitlements"), get(handlers::context::get_entitlements))
        .route(
            &api("/organizations"),
            get(handlers::organizations::list_organizations),
        )
        .route(
            &api("/projects"),
            with_policy(
                get(handlers::projects::list_projects),
                state,
                RoutePolicy::new("projects.view"),
            )
            .merge(with_policy(
                post(handlers::projects::create_project),
                state,
                RoutePolicy::new("projects.create"),
            )),
        )
        // authorized in the handler, after the path organization is cross-checked
        .route(
            &api("/organizations/{org_id}/projects"),
            get(handlers::projects::list_organization_projects),
        )
        .route(
            &api("/billing"),
            with_policy(
                get(handlers::billing::get_billing_summary),
                state,
                RoutePolicy::new("billing.view"),
            ),
        )
        .route(
            &api("/audit-logs"),
            with_policy(
                get(handlers::audit_logs::list_audit_logs),
                state,
                RoutePolicy::new("audit_log.view"),
            ),
        )
}

/// Shell pages, one route per navigation section and its children.
pub(super) fn page_routes(state: &Arc<AppState>) -> Router<Arc<AppState>> {
    state
        .gate
        .navigation_tree()
        .sections()
        .iter()
        .fold(Router::new(), |router, section| {
            router
                .route(&section.href, get(handlers::pages::render_page))
                .route(
                    &format!("{}/{{child}}", section.href),
                    get(handlers::pages::render_page),
                )
        })
}
