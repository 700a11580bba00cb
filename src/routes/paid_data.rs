//! Paid data endpoints the agent purchases from.
//!
//! Settlement is enforced by the purchaser before the fetch, not by these
//! handlers; they serve the payload to any caller. Deep-history and
//! sentiment payloads are synthesized, market-impact embeds a live oracle
//! snapshot so its numbers stay consistent with the rest of a run.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use chrono::{Duration, Utc};
use rand::Rng;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::routes::{error_response, ErrorResponse};
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct PaidQuery {
    pub address: Option<String>,
    pub action: Option<String>,
    pub token: Option<String>,
}

impl PaidQuery {
    fn address(&self) -> &str {
        self.address.as_deref().unwrap_or("Unknown")
    }

    fn action(&self) -> &str {
        self.action.as_deref().unwrap_or("deposit")
    }

    fn token(&self) -> &str {
        self.token.as_deref().unwrap_or("SOL")
    }
}

/// GET /api/paid/{endpoint}
pub async fn serve_paid_data(
    State(state): State<AppState>,
    Path(endpoint): Path<String>,
    Query(query): Query<PaidQuery>,
) -> Result<Json<Value>, (StatusCode, Json<ErrorResponse>)> {
    info!("Paid data request: {} for {}", endpoint, query.address());

    let payload = match endpoint.as_str() {
        "chain-history-analysis" => chain_history_payload(&query),
        "historical-patterns" => historical_patterns_payload(&query),
        "sentiment-analysis" => sentiment_payload(&query),
        "market-impact" => market_impact_payload(&state, &query).await,
        _ => return Err(error_response(StatusCode::NOT_FOUND, format!("Unknown data endpoint: {}", endpoint))),
    };

    Ok(Json(payload))
}

/// Deep chain history: 5-8 synthesized past movements whose price impact
/// leans with the current action, plus derived pattern stats.
fn chain_history_payload(query: &PaidQuery) -> Value {
    let mut rng = rand::thread_rng();
    let direction = if query.action() == "deposit" { 1.0 } else { -1.0 };

    let tx_count = rng.gen_range(5..=8);
    let mut transactions = Vec::with_capacity(tx_count);
    let mut months_ago = 0i64;
    for _ in 0..tx_count {
        months_ago += rng.gen_range(2..=5);
        let amount = rng.gen_range(15_000..55_000);
        let price_change = rng.gen_range(3.0..15.0) * direction;
        let timeframe_hours = rng.gen_range(24..=72);

        transactions.push(json!({
            "date": (Utc::now() - Duration::days(months_ago * 30)).format("%b %-d").to_string(),
            "action": query.action(),
            "amount": amount,
            "token": query.token(),
            "priceChange": format!("{:+.1}%", price_change),
            "timeframe": format!("{}h", timeframe_hours),
        }));
    }

    let profit_rate = rng.gen_range(55..80);
    json!({
        "endpoint": "chain-history-analysis",
        "whaleAddress": query.address(),
        "source": "Complete chain history archive",
        "data": {
            "historicalTransactions": transactions,
            "patterns": {
                "profitRate": format!("{}%", profit_rate),
                "typicalStrategy": if direction > 0.0 { "Accumulate before rallies" } else { "Distribute into strength" },
                "riskProfile": "Medium-High",
            },
        },
    })
}

fn historical_patterns_payload(query: &PaidQuery) -> Value {
    json!({
        "endpoint": "historical-patterns",
        "whaleAddress": query.address(),
        "data": {
            "recentTrades": [
                {
                    "timestamp": (Utc::now() - Duration::days(7)).to_rfc3339(),
                    "action": "deposit",
                    "amount": 45_000,
                    "exchange": "Binance",
                    "priceImpact": "+3.2%",
                    "outcome": "Price rallied 8% within 24h",
                },
                {
                    "timestamp": (Utc::now() - Duration::days(14)).to_rfc3339(),
                    "action": "withdrawal",
                    "amount": 32_000,
                    "exchange": "Coinbase",
                    "priceImpact": "-2.1%",
                    "outcome": "Price dropped 5% within 48h",
                },
                {
                    "timestamp": (Utc::now() - Duration::days(21)).to_rfc3339(),
                    "action": "deposit",
                    "amount": 28_000,
                    "exchange": "Kraken",
                    "priceImpact": "+1.8%",
                    "outcome": "Price consolidated, no major movement",
                },
            ],
            "patterns": {
                "averageHolding": "12 days",
                "profitRate": "68%",
                "typicalStrategy": "Buy dips, sell pumps",
                "riskProfile": "Medium-High",
            },
            "historicalAccuracy": "72%",
        },
    })
}

fn sentiment_payload(query: &PaidQuery) -> Value {
    json!({
        "endpoint": "sentiment-analysis",
        "whaleAddress": query.address(),
        "data": {
            "twitter": {
                "sentiment": "Bullish",
                "score": 68,
                "volume": "12.4K mentions",
                "trending": true,
            },
            "reddit": {
                "sentiment": "Mixed",
                "score": 52,
                "hotThreads": 3,
                "totalComments": 847,
            },
            "forums": {
                "sentiment": "Neutral",
                "score": 48,
                "discussions": 156,
            },
            "aggregate": {
                "overallSentiment": "Slightly Bullish",
                "confidenceLevel": "64%",
                "recommendation": "Monitor social buzz for confirmation",
            },
        },
    })
}

async fn market_impact_payload(state: &AppState, query: &PaidQuery) -> Value {
    let snapshot = state.oracle.get_price("SOL_USD").await;

    json!({
        "endpoint": "market-impact",
        "whaleAddress": query.address(),
        "oracleData": {
            "price": snapshot.price,
            "confidence": snapshot.confidence,
            "oracleCount": snapshot.oracle_count,
            "timestamp": snapshot.timestamp,
            "verified": true,
        },
        "data": {
            "liquidity": {
                "depth": "High",
                "bidDepth": "$12.4M within 2%",
                "askDepth": "$10.8M within 2%",
                "bidAskSpread": "0.08%",
            },
            "orderBook": {
                "topBidSize": 8_500,
                "topAskSize": 7_200,
                "imbalance": "Slight buy pressure",
            },
            "executionAnalysis": {
                "smallOrder": { "size": "5000 SOL", "estimatedSlippage": "0.12%", "impact": "Negligible" },
                "mediumOrder": { "size": "20000 SOL", "estimatedSlippage": "0.45%", "impact": "Low" },
                "largeOrder": { "size": "50000 SOL", "estimatedSlippage": "1.8%", "impact": "Moderate" },
            },
            "recommendation": {
                "bestExecution": "TWAP over 2-4 hours",
                "optimalSize": "15000-25000 SOL per trade",
                "riskLevel": "Medium",
            },
            "confidence": "81%",
        },
    })
}

pub fn create_routes() -> Router<AppState> {
    Router::new().route("/api/paid/{endpoint}", get(serve_paid_data))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(action: &str) -> PaidQuery {
        PaidQuery {
            address: Some("9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM".to_string()),
            action: Some(action.to_string()),
            token: Some("SOL".to_string()),
        }
    }

    #[test]
    fn chain_history_leans_with_the_action() {
        let deposit = chain_history_payload(&query("deposit"));
        for tx in deposit["data"]["historicalTransactions"].as_array().unwrap() {
            assert!(tx["priceChange"].as_str().unwrap().starts_with('+'));
        }

        let withdrawal = chain_history_payload(&query("withdrawal"));
        for tx in withdrawal["data"]["historicalTransactions"].as_array().unwrap() {
            assert!(tx["priceChange"].as_str().unwrap().starts_with('-'));
        }
    }

    #[test]
    fn payloads_echo_the_queried_address() {
        let q = query("deposit");
        for payload in [historical_patterns_payload(&q), sentiment_payload(&q)] {
            assert_eq!(payload["whaleAddress"], q.address.as_deref().unwrap());
        }
    }

    #[test]
    fn missing_query_fields_fall_back_to_defaults() {
        let q = PaidQuery { address: None, action: None, token: None };
        assert_eq!(q.address(), "Unknown");
        assert_eq!(q.action(), "deposit");
        assert_eq!(q.token(), "SOL");
    }
}
