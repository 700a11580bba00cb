//! Agent run endpoint.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::post;
use axum::Router;
use serde::Deserialize;
use tracing::{error, warn};
use uuid::Uuid;

use crate::agent::types::{AgentError, RunOutcome, WalletRecord};
use crate::routes::{error_response, ErrorResponse};
use crate::server::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunAnalysisRequest {
    pub telegram_id: String,
    pub alert_id: Uuid,
}

/// POST /api/v1/analysis/run
///
/// Runs the full analysis pipeline for one stored alert against the
/// caller's custodial wallet and returns the report plus the run log.
pub async fn run_analysis(
    State(state): State<AppState>,
    Json(request): Json<RunAnalysisRequest>,
) -> Result<Json<RunOutcome>, (StatusCode, Json<ErrorResponse>)> {
    let user = state
        .db
        .get_or_create_user(&request.telegram_id, None)
        .await
        .map_err(|e| {
            error!("Failed to load user: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to load user")
        })?;

    let wallet = state
        .db
        .get_wallet_for_user(user.id)
        .await
        .map_err(|e| {
            error!("Failed to load wallet: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to load wallet")
        })?
        .ok_or_else(|| error_response(StatusCode::NOT_FOUND, "Create a wallet before running analysis"))?;

    let alert = state
        .db
        .get_whale_alert(request.alert_id)
        .await
        .map_err(|e| {
            error!("Failed to load alert: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to load alert")
        })?
        .ok_or_else(|| error_response(StatusCode::NOT_FOUND, "Unknown whale alert"))?;

    let record = WalletRecord {
        user_id: user.id,
        public_key: wallet.public_key,
        encrypted_private_key: wallet.encrypted_private_key,
    };

    let outcome = state.agent.analyze(&alert, &record).await.map_err(|e| {
        error!("Analysis run failed: {}", e);
        match e {
            AgentError::RateLimited(_) => error_response(StatusCode::TOO_MANY_REQUESTS, "Reasoning quota exhausted"),
            AgentError::Wallet(_) => error_response(StatusCode::BAD_GATEWAY, "Wallet balance unavailable"),
            other => error_response(StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
        }
    })?;

    if let Err(e) = state.db.mark_alert_analyzed(alert.id).await {
        warn!("Failed to mark alert {} analyzed: {}", alert.id, e);
    }

    Ok(Json(outcome))
}

pub fn create_routes() -> Router<AppState> {
    Router::new().route("/api/v1/analysis/run", post(run_analysis))
}
