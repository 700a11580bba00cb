//! Whale alert endpoints.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use tracing::{error, info};

use crate::agent::types::WhaleAlert;
use crate::routes::{error_response, ErrorResponse};
use crate::server::AppState;
use crate::whales;

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<i64>,
}

/// GET /api/v1/alerts/recent
pub async fn recent_alerts(
    State(state): State<AppState>,
    Query(query): Query<RecentQuery>,
) -> Result<Json<Vec<WhaleAlert>>, (StatusCode, Json<ErrorResponse>)> {
    let limit = query.limit.unwrap_or(20).clamp(1, 100);
    let alerts = state.db.recent_whale_alerts(limit).await.map_err(|e| {
        error!("Failed to load alerts: {}", e);
        error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to load alerts")
    })?;
    Ok(Json(alerts))
}

/// POST /api/v1/alerts/simulate
///
/// Generates one mock alert from the watched-wallet roster and persists it,
/// same as a live feed event would be.
pub async fn simulate_alert(
    State(state): State<AppState>,
) -> Result<Json<WhaleAlert>, (StatusCode, Json<ErrorResponse>)> {
    let alert = whales::generate_mock_alert();
    state.db.insert_whale_alert(&alert).await.map_err(|e| {
        error!("Failed to store alert: {}", e);
        error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to store alert")
    })?;

    info!(
        "Simulated whale alert: {} {} {} on {}",
        alert.action_type, alert.amount, alert.token, alert.exchange
    );
    Ok(Json(alert))
}

pub fn create_routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/alerts/recent", get(recent_alerts))
        .route("/api/v1/alerts/simulate", post(simulate_alert))
}
