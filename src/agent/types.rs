//! Shared types for the whale analysis agent.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::agent::catalog::CatalogEntry;

/// Error taxonomy for an analysis run.
///
/// `Configuration` is fatal at startup. `Upstream`, `RateLimited` and
/// `AiAnalysis` are recovered through deterministic fallbacks. `Purchase`
/// excludes a single catalog entry from the report without aborting the run.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("upstream unavailable: {0}")]
    Upstream(String),

    #[error("reasoning call rate limited: {0}")]
    RateLimited(String),

    #[error("reasoning call failed: {0}")]
    AiAnalysis(String),

    #[error("purchase of {endpoint} failed: {reason}")]
    Purchase { endpoint: String, reason: String },

    #[error("settlement failed: {0}")]
    Settlement(String),

    #[error("wallet error: {0}")]
    Wallet(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl AgentError {
    /// Quota and rate-limit failures are logged differently from other
    /// reasoning failures, but recover through the same fallback path.
    pub fn is_quota(&self) -> bool {
        matches!(self, AgentError::RateLimited(_))
    }
}

/// A tracked whale movement, the trigger for an analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhaleAlert {
    pub id: Uuid,
    pub wallet_address: String,
    pub action_type: WhaleAction,
    /// Moved amount in the alert's token units (SOL for the mock feed)
    pub amount: f64,
    pub token: String,
    pub exchange: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WhaleAction {
    Deposit,
    Withdrawal,
}

impl WhaleAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            WhaleAction::Deposit => "deposit",
            WhaleAction::Withdrawal => "withdrawal",
        }
    }
}

impl std::fmt::Display for WhaleAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Custodial wallet row as the agent sees it.
#[derive(Debug, Clone)]
pub struct WalletRecord {
    pub user_id: Uuid,
    pub public_key: String,
    pub encrypted_private_key: String,
}

/// Outcome of the selection phase. The entry order is the purchase order.
/// `declared_total_cost` is whatever the model claimed and is advisory only;
/// cost arithmetic in the report always comes from the catalog prices.
#[derive(Debug, Clone)]
pub struct SelectionDecision {
    pub entries: Vec<CatalogEntry>,
    pub rationale: String,
    pub declared_total_cost: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseStatus {
    Pending,
    Verified,
    Failed,
}

impl PurchaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseStatus::Pending => "pending",
            PurchaseStatus::Verified => "verified",
            PurchaseStatus::Failed => "failed",
        }
    }
}

/// Ledger entry for one executed (or attempted) catalog purchase.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub endpoint: String,
    pub amount: Decimal,
    /// Settlement transaction signature, present once the transfer confirmed
    pub signature: Option<String>,
    pub status: PurchaseStatus,
    pub payload_summary: Option<String>,
    pub oracle_price: Option<f64>,
    pub oracle_confidence: Option<f64>,
    pub created_at: DateTime<Utc>,
}

/// Oracle context echoed into the report for audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OracleContext {
    pub asset: String,
    pub price: f64,
    pub confidence: f64,
    pub oracle_count: u32,
    pub usd_impact: f64,
    pub timestamp: DateTime<Utc>,
}

/// Deterministic cost accounting for a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostBreakdown {
    /// Identifiers of entries with a successful purchase, in purchase order
    pub entries_used: Vec<String>,
    pub cost_per_entry: HashMap<String, Decimal>,
    pub total_data_cost: Decimal,
    pub service_fee: Decimal,
    pub total_charged: Decimal,
}

/// Final report returned to the caller. Prose fields come from the
/// reasoning call (or the fixed fallback template); all numeric cost fields
/// are computed locally.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub executive_summary: String,
    pub recommendations: Vec<String>,
    pub risk_score: f64,
    pub confidence_score: f64,
    pub trading_signals: Vec<String>,
    /// Raw purchased payloads keyed by catalog identifier
    pub payloads: HashMap<String, serde_json::Value>,
    pub oracle_data: Option<OracleContext>,
    pub cost_breakdown: CostBreakdown,
}

/// What an analysis run hands back to the caller: the report plus the
/// ordered, timestamped run log.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunOutcome {
    pub report: AnalysisReport,
    pub logs: Vec<String>,
}
