//! Read-only status API.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde_json::json;
use tracing::error;

use crate::error::DatabaseError;
use crate::profile::UserId;
use crate::store::Database;

/// Shared state for the status routes.
#[derive(Clone)]
pub struct StatusRouteState {
    pub store: Arc<dyn Database>,
}

/// GET /api/health
async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// GET /api/users/{id}/status
///
/// Profile (or null), subscription state and number of generated plans.
async fn user_status(
    State(state): State<StatusRouteState>,
    Path(user_id): Path<UserId>,
) -> Response {
    match load_status(state.store.as_ref(), user_id).await {
        Ok(body) => Json(body).into_response(),
        Err(e) => {
            error!(user_id, error = %e, "Status lookup failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

async fn load_status(
    store: &dyn Database,
    user_id: UserId,
) -> Result<serde_json::Value, DatabaseError> {
    let profile = store.get_profile(user_id).await?;
    let subscription = store.get_subscription(user_id).await?;
    let generations = store.list_generations(user_id, None).await?.len();
    let now = Utc::now();

    let subscription = subscription.map(|sub| {
        json!({
            "plan": sub.plan,
            "currency": sub.currency,
            "expires_at": sub.expires_at,
            "active": sub.is_active_at(now),
        })
    });

    Ok(json!({
        "user_id": user_id,
        "profile": profile,
        "subscription": subscription,
        "generations": generations,
    }))
}

/// Build the status REST routes.
pub fn status_routes(state: StatusRouteState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/users/{id}/status", get(user_status))
        .with_state(state)
}
