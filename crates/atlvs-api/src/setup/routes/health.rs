//! Health check handlers.

use crate::state::AppState;
use axum::{http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;
use std::time::Duration;

/// Liveness probe - process is running.
pub async fn liveness_check(_state: Arc<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({ "status": "alive" })),
    )
}

/// Readiness probe - the database answers.
pub async fn readiness_check(state: Arc<AppState>) -> impl IntoResponse {
    const TIMEOUT: Duration = Duration::from_secs(5);

    let Some(pool) = state.pool.as_ref() else {
        return (
            StatusCode::OK,
            Json(serde_json::json!({ "status": "ready", "database": "not_configured" })),
        );
    };

    let mut response = serde_json::json!({
        "status": "ready",
        "database": "unknown"
    });

    let mut overall_ready = true;
    match tokio::time::timeout(TIMEOUT, sqlx::query("SELECT 1").execute(pool)).await {
        Ok(Ok(_)) => response["database"] = serde_json::json!("ready"),
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Database readiness check failed");
            response["database"] = serde_json::json!("not_ready");
            overall_ready = false;
        }
        Err(_) => {
            tracing::error!("Database readiness check timed out");
            response["database"] = serde_json::json!("timeout");
            overall_ready = false;
        }
    }

    let status_code = if overall_ready {
        StatusCode::OK
    } else {
        response["status"] = serde_json::json!("not_ready");
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(response))
}
