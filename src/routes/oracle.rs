//! Price oracle endpoints.

use axum::extract::{Query, State};
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use serde::{Deserialize, Serialize};

use crate::oracle::{PriceSnapshot, Reliability};
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct PriceQuery {
    /// Asset pair, e.g. `SOL_USD`. Defaults to SOL.
    pub asset: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PriceResponse {
    #[serde(flatten)]
    pub snapshot: PriceSnapshot,
    pub reliability: Reliability,
}

/// GET /api/v1/oracle/price
///
/// Returns the current snapshot for the requested asset along with the
/// reliability assessment the agent would apply to it.
pub async fn get_price(
    State(state): State<AppState>,
    Query(query): Query<PriceQuery>,
) -> Json<PriceResponse> {
    let asset = query.asset.unwrap_or_else(|| "SOL_USD".to_string());
    let snapshot = state.oracle.get_price(&asset).await;
    let reliability = state.oracle.is_reliable(&snapshot);
    Json(PriceResponse { snapshot, reliability })
}

pub fn create_routes() -> Router<AppState> {
    Router::new().route("/api/v1/oracle/price", get(get_price))
}
