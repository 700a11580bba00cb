//! Custodial wallet endpoints.
//!
//! Wallet keys are generated server-side and stored encrypted; the private
//! key never leaves the process except inside the ciphertext column.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::config::CONFIG;
use crate::routes::{error_response, ErrorResponse};
use crate::server::AppState;
use crate::wallet;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWalletRequest {
    pub telegram_id: String,
    pub username: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletResponse {
    pub public_key: String,
    pub address_short: String,
    pub explorer_url: String,
    pub created: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceQuery {
    pub telegram_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceResponse {
    pub public_key: String,
    pub sol_balance: f64,
    pub usdc_balance: Decimal,
}

/// POST /api/v1/wallet/create
///
/// Idempotent: returns the existing wallet when the user already has one.
pub async fn create_wallet(
    State(state): State<AppState>,
    Json(request): Json<CreateWalletRequest>,
) -> Result<Json<WalletResponse>, (StatusCode, Json<ErrorResponse>)> {
    let user = state
        .db
        .get_or_create_user(&request.telegram_id, request.username.as_deref())
        .await
        .map_err(|e| {
            error!("Failed to load user: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to load user")
        })?;

    if let Some(existing) = state.db.get_wallet_for_user(user.id).await.map_err(|e| {
        error!("Failed to load wallet: {}", e);
        error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to load wallet")
    })? {
        return Ok(Json(WalletResponse {
            address_short: wallet::format_address(&existing.public_key),
            explorer_url: wallet::explorer_url(&existing.public_key),
            public_key: existing.public_key,
            created: false,
        }));
    }

    let generated = wallet::generate_wallet();
    let encrypted = wallet::crypto::encrypt_private_key(&generated.private_key, &CONFIG.wallet_secret_key)
        .map_err(|e| {
            error!("Failed to encrypt wallet key: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to create wallet")
        })?;

    let record = state
        .db
        .create_wallet(user.id, &generated.public_key, &encrypted)
        .await
        .map_err(|e| {
            error!("Failed to store wallet: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to create wallet")
        })?;

    info!("Created wallet {} for user {}", wallet::format_address(&record.public_key), user.id);

    Ok(Json(WalletResponse {
        address_short: wallet::format_address(&record.public_key),
        explorer_url: wallet::explorer_url(&record.public_key),
        public_key: record.public_key,
        created: true,
    }))
}

/// GET /api/v1/wallet/balance
pub async fn get_balance(
    State(state): State<AppState>,
    Query(query): Query<BalanceQuery>,
) -> Result<Json<BalanceResponse>, (StatusCode, Json<ErrorResponse>)> {
    let user = state
        .db
        .get_or_create_user(&query.telegram_id, None)
        .await
        .map_err(|e| {
            error!("Failed to load user: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to load user")
        })?;

    let record = state
        .db
        .get_wallet_for_user(user.id)
        .await
        .map_err(|e| {
            error!("Failed to load wallet: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to load wallet")
        })?
        .ok_or_else(|| error_response(StatusCode::NOT_FOUND, "No wallet for this user"))?;

    let sol_balance = wallet::get_sol_balance(&state.rpc, &record.public_key)
        .await
        .map_err(|e| {
            error!("Failed to fetch SOL balance: {}", e);
            error_response(StatusCode::BAD_GATEWAY, "Failed to fetch SOL balance")
        })?;
    let usdc_balance = wallet::get_usdc_balance(&state.rpc, &record.public_key, &CONFIG.usdc_mint)
        .await
        .map_err(|e| {
            error!("Failed to fetch USDC balance: {}", e);
            error_response(StatusCode::BAD_GATEWAY, "Failed to fetch USDC balance")
        })?;

    Ok(Json(BalanceResponse {
        public_key: record.public_key,
        sol_balance,
        usdc_balance,
    }))
}

pub fn create_routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/wallet/create", post(create_wallet))
        .route("/api/v1/wallet/balance", get(get_balance))
}
