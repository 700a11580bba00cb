// # Routes Module
//
// HTTP route handlers organized by API domain:
// - `health`: health check endpoint
// - `oracle`: price feed and reliability endpoints
// - `wallet`: custodial wallet creation and balances
// - `alerts`: whale alert feed and simulation
// - `analysis`: agent run endpoint
// - `paid_data`: the paid data endpoints the agent purchases from

use axum::http::StatusCode;
use axum::response::Json;
use serde::Serialize;

pub mod alerts;
pub mod analysis;
pub mod health;
pub mod oracle;
pub mod paid_data;
pub mod wallet;

/// Error body shared by all handlers
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub(crate) fn error_response(
    status: StatusCode,
    message: impl Into<String>,
) -> (StatusCode, Json<ErrorResponse>) {
    (status, Json(ErrorResponse { error: message.into() }))
}
