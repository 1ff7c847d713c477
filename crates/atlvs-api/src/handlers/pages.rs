//! Shell pages
//!
//! The page itself is rendered by the frontend; the gate answers with the view
//! model it needs: which route matched, the data scope, the caller's context and
//! the navigation filtered for them.

use crate::auth::RequestContext;
use crate::error::HttpAppError;
use crate::state::AppState;
use atlvs_core::AppError;
use atlvs_gate::{DataScope, GateContext, NavSection, Narrowing};
use axum::{extract::State, http::Uri, Json};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct PageView {
    pub path: String,
    pub section: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<String>,
    pub title: String,
    pub scope: DataScope,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub narrowing: Option<Narrowing>,
    pub context: GateContext,
    pub navigation: Vec<NavSection>,
}

#[tracing::instrument(skip(state, ctx), fields(user_id = %ctx.user.id, organization_id = %ctx.org_id, path = %uri.path()))]
pub async fn render_page(
    State(state): State<Arc<AppState>>,
    RequestContext(ctx): RequestContext,
    uri: Uri,
) -> Result<Json<PageView>, HttpAppError> {
    let path = uri.path();
    let grant = state.gate.authorize_page(&ctx, path)?;
    let route = state
        .gate
        .navigation_tree()
        .route(path)
        .ok_or_else(|| AppError::NotFound(format!("No page at {}", path)))?;

    let title = route
        .item
        .map_or(&route.section.label, |item| &item.label)
        .clone();

    Ok(Json(PageView {
        path: path.to_string(),
        section: route.section.id.clone(),
        item: route.item.map(|item| item.id.clone()),
        title,
        scope: grant.scope(),
        narrowing: grant.narrowing(),
        navigation: state.gate.navigation(&ctx),
        context: ctx,
    }))
}
