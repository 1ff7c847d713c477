//! Gate middleware
//!
//! One pipeline for every protected route: credentials, session, membership,
//! entitlements. The resolved [`GateContext`] is placed in the request extensions.
//! Route policies are attached as data with [`with_policy`], which turns the
//! context into an [`atlvs_gate::AccessGrant`] or a `Forbidden`.

use crate::auth::credentials::{credentials_from_headers, requested_organization, rotated_cookies};
use crate::auth::extractors::ClientIp;
use crate::error::HttpAppError;
use crate::state::AppState;
use atlvs_core::constants::NEXT_QUERY_PARAM;
use atlvs_core::AppError;
use atlvs_gate::{ContextResolution, GateContext, RotatedCredential, RoutePolicy, SessionState};
use atlvs_infra::extract_client_ip;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap, Uri},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
    routing::MethodRouter,
};
use std::net::SocketAddr;
use std::sync::Arc;

enum GateOutcome {
    Anonymous,
    NoMembership(Option<RotatedCredential>),
    Resolved(Box<GateContext>, Option<RotatedCredential>),
}

async fn run_gate(state: &AppState, headers: &HeaderMap, uri: &Uri) -> Result<GateOutcome, AppError> {
    let config = &state.config;
    let credentials = credentials_from_headers(
        headers,
        config.session_cookie_name(),
        config.refresh_cookie_name(),
    );
    if credentials.is_empty() {
        return Ok(GateOutcome::Anonymous);
    }

    let (identity, rotated) = match state.gate.resolve_session(&credentials).await? {
        SessionState::Authenticated { identity, rotated } => (identity, rotated),
        SessionState::Anonymous => return Ok(GateOutcome::Anonymous),
    };

    // Request input is only looked at once the caller is known.
    let requested = requested_organization(headers, uri)?;

    match state.gate.resolve_context(&identity, requested).await? {
        ContextResolution::Resolved(ctx) => Ok(GateOutcome::Resolved(ctx, rotated)),
        ContextResolution::NoMembership => {
            tracing::debug!(user_id = %identity.id, "Authenticated user has no active membership");
            Ok(GateOutcome::NoMembership(rotated))
        }
    }
}

fn client_ip(state: &AppState, request: &Request) -> ClientIp {
    let socket = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0);
    ClientIp(extract_client_ip(
        request.headers(),
        socket.as_ref(),
        state.config.trusted_proxy_count(),
    ))
}

fn attach_rotated(state: &AppState, mut response: Response, rotated: Option<RotatedCredential>) -> Response {
    if let Some(rotated) = rotated {
        let config = &state.config;
        for cookie in rotated_cookies(
            &rotated,
            config.session_cookie_name(),
            config.refresh_cookie_name(),
            config.is_production(),
        ) {
            response.headers_mut().append(header::SET_COOKIE, cookie);
        }
    }
    response
}

async fn continue_with(
    state: &AppState,
    mut request: Request,
    next: Next,
    ctx: Box<GateContext>,
    rotated: Option<RotatedCredential>,
) -> Response {
    let ip = client_ip(state, &request);
    tracing::debug!(
        user_id = %ctx.user.id,
        organization_id = %ctx.org_id,
        role = %ctx.role,
        client_ip = ?ip.0,
        "Gate context resolved"
    );
    request.extensions_mut().insert(ip);
    request.extensions_mut().insert(*ctx);
    let response = next.run(request).await;
    attach_rotated(state, response, rotated)
}

/// Gate for JSON API routes: anonymous callers and callers without any
/// membership get `401`.
pub async fn api_gate_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let outcome = run_gate(&state, request.headers(), request.uri()).await;
    match outcome {
        Ok(GateOutcome::Resolved(ctx, rotated)) => {
            continue_with(&state, request, next, ctx, rotated).await
        }
        Ok(GateOutcome::Anonymous) => {
            HttpAppError(AppError::Unauthenticated("No valid session".to_string())).into_response()
        }
        Ok(GateOutcome::NoMembership(rotated)) => attach_rotated(
            &state,
            HttpAppError(AppError::Unauthenticated(
                "No active organization membership".to_string(),
            ))
            .into_response(),
            rotated,
        ),
        Err(e) => HttpAppError(e).into_response(),
    }
}

/// Gate for shell pages: anonymous callers are sent to the login page with the
/// original location in `next`, callers without a membership to onboarding.
pub async fn page_gate_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let outcome = run_gate(&state, request.headers(), request.uri()).await;
    match outcome {
        Ok(GateOutcome::Resolved(ctx, rotated)) => {
            continue_with(&state, request, next, ctx, rotated).await
        }
        Ok(GateOutcome::Anonymous) => {
            let original = request
                .uri()
                .path_and_query()
                .map_or("/", |pq| pq.as_str());
            let location = format!(
                "{}?{}={}",
                state.config.login_path(),
                NEXT_QUERY_PARAM,
                urlencoding::encode(original)
            );
            Redirect::to(&location).into_response()
        }
        Ok(GateOutcome::NoMembership(rotated)) => attach_rotated(
            &state,
            Redirect::to(state.config.onboarding_path()).into_response(),
            rotated,
        ),
        Err(e) => HttpAppError(e).into_response(),
    }
}

/// State of [`require_policy`]: the policy of one route.
#[derive(Clone)]
pub struct PolicyGuard {
    state: Arc<AppState>,
    policy: Arc<RoutePolicy>,
}

/// Authorize the resolved context against the route's policy and store the
/// resulting grant for the handler.
pub async fn require_policy(
    State(guard): State<PolicyGuard>,
    mut request: Request,
    next: Next,
) -> Response {
    let grant = match request.extensions().get::<GateContext>() {
        Some(ctx) => guard.state.gate.authorize(ctx, &guard.policy),
        None => Err(AppError::Internal(format!(
            "policy {} applied to a route outside the gate",
            guard.policy.action()
        ))),
    };

    match grant {
        Ok(grant) => {
            request.extensions_mut().insert(grant);
            next.run(request).await
        }
        Err(e) => HttpAppError(e).into_response(),
    }
}

/// Attach a route policy to a method router.
pub fn with_policy(
    route: MethodRouter<Arc<AppState>>,
    state: &Arc<AppState>,
    policy: RoutePolicy,
) -> MethodRouter<Arc<AppState>> {
    route.route_layer(axum::middleware::from_fn_with_state(
        PolicyGuard {
            state: state.clone(),
            policy: Arc::new(policy),
        },
        require_policy,
    ))
}
