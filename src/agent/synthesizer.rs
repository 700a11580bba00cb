//! Final report synthesis.
//!
//! Cost accounting is computed locally from the successful-purchase list;
//! the reasoning call only ever contributes prose (summary,
//! recommendations, scores, signals). Synthesis never fails: a reasoning
//! failure, quota or otherwise, degrades to a fixed-template report built
//! from deterministic inputs so every run ends with a well-formed report.

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::agent::ai_client::{decode_json_block, AIClient};
use crate::agent::catalog::CatalogEntry;
use crate::agent::types::{AnalysisReport, CostBreakdown, OracleContext, WhaleAction, WhaleAlert};
use crate::oracle::PriceSnapshot;

pub struct Synthesizer {
    ai: Arc<AIClient>,
    service_fee: Decimal,
}

/// Prose fields the reasoning call is allowed to contribute.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesisFields {
    executive_summary: String,
    #[serde(default)]
    recommendations: Vec<String>,
    risk_score: f64,
    confidence_score: f64,
    #[serde(default)]
    trading_signals: Vec<String>,
}

impl Synthesizer {
    pub fn new(ai: Arc<AIClient>, service_fee: Decimal) -> Self {
        Self { ai, service_fee }
    }

    /// Build the final report. Returns the report and, when the reasoning
    /// call was skipped over, a degradation note for the run log.
    pub async fn synthesize(
        &self,
        context: &str,
        payloads: HashMap<String, Value>,
        purchased: &[CatalogEntry],
        alert: &WhaleAlert,
        snapshot: Option<&PriceSnapshot>,
    ) -> (AnalysisReport, Option<String>) {
        let cost_breakdown = build_cost_breakdown(purchased, self.service_fee);
        let oracle_data = oracle_context(alert, snapshot);

        let prompt = synthesis_prompt(context, &payloads, alert, snapshot);

        match self
            .ai
            .chat(
                "You are an expert crypto analyst synthesizing a whale transaction \
                 analysis from verified oracle data and purchased premium data. \
                 Reply with a JSON object only.",
                &prompt,
                true,
            )
            .await
            .and_then(|reply| decode_json_block::<SynthesisFields>(&reply))
        {
            Ok(fields) => {
                info!("Synthesis complete");
                let report = AnalysisReport {
                    executive_summary: fields.executive_summary,
                    recommendations: fields.recommendations,
                    risk_score: fields.risk_score.clamp(0.0, 10.0),
                    confidence_score: fields.confidence_score.clamp(0.0, 100.0),
                    trading_signals: fields.trading_signals,
                    payloads,
                    oracle_data,
                    cost_breakdown,
                };
                (report, None)
            }
            Err(e) => {
                let quota = e.is_quota();
                let note = if quota {
                    "Reasoning quota exceeded; using fallback analysis".to_string()
                } else {
                    format!("Synthesis failed ({}); using fallback analysis", e)
                };
                warn!("{}", note);

                let report =
                    fallback_report(alert, snapshot, payloads, oracle_data, cost_breakdown, quota);
                (report, Some(note))
            }
        }
    }
}

/// Deterministic cost accounting over the entries that actually settled.
/// Failed purchases never appear here and are never charged for.
pub fn build_cost_breakdown(purchased: &[CatalogEntry], service_fee: Decimal) -> CostBreakdown {
    let entries_used: Vec<String> = purchased.iter().map(|e| e.identifier.to_string()).collect();
    let cost_per_entry: HashMap<String, Decimal> = purchased
        .iter()
        .map(|e| (e.identifier.to_string(), e.unit_price))
        .collect();
    let total_data_cost: Decimal = purchased.iter().map(|e| e.unit_price).sum();

    CostBreakdown {
        entries_used,
        cost_per_entry,
        total_data_cost,
        service_fee,
        total_charged: total_data_cost + service_fee,
    }
}

fn oracle_context(alert: &WhaleAlert, snapshot: Option<&PriceSnapshot>) -> Option<OracleContext> {
    snapshot.map(|s| OracleContext {
        asset: s.asset.clone(),
        price: s.price,
        confidence: s.confidence,
        oracle_count: s.oracle_count,
        usd_impact: alert.amount * s.price,
        timestamp: s.timestamp,
    })
}

/// Fixed-shape report used when the reasoning call cannot contribute.
fn fallback_report(
    alert: &WhaleAlert,
    snapshot: Option<&PriceSnapshot>,
    payloads: HashMap<String, Value>,
    oracle_data: Option<OracleContext>,
    cost_breakdown: CostBreakdown,
    quota: bool,
) -> AnalysisReport {
    let usd_part = match snapshot {
        Some(s) => format!("(${:.0} USD, oracle-verified)", alert.amount * s.price),
        None => "(USD value unavailable)".to_string(),
    };
    let signal_hint = match alert.action_type {
        WhaleAction::Deposit => "potential bullish",
        WhaleAction::Withdrawal => "potential bearish",
    };
    let quota_suffix = if quota {
        " [AI analysis temporarily unavailable due to quota limits - using basic analysis]"
    } else {
        ""
    };

    AnalysisReport {
        executive_summary: format!(
            "Whale {} of {} {} {} detected. Available data suggests a {} signal.{}",
            alert.action_type, alert.amount, alert.token, usd_part, signal_hint, quota_suffix
        ),
        recommendations: vec![
            "Monitor for follow-up whale activity".to_string(),
            "Check order book depth before trading".to_string(),
            "Set appropriate stop losses".to_string(),
        ],
        risk_score: 6.0,
        confidence_score: 65.0,
        trading_signals: vec!["WATCH".to_string(), "WAIT_FOR_CONFIRMATION".to_string()],
        payloads,
        oracle_data,
        cost_breakdown,
    }
}

fn synthesis_prompt(
    context: &str,
    payloads: &HashMap<String, Value>,
    alert: &WhaleAlert,
    snapshot: Option<&PriceSnapshot>,
) -> String {
    let oracle_block = match snapshot {
        Some(s) => format!(
            "ORACLE DATA ({} nodes):\n- {} Price: ${:.2}\n- Confidence: {:.1}%\n- USD Impact: ${:.0}\n- Data Age: {}s",
            s.oracle_count,
            s.asset,
            s.price,
            s.confidence,
            alert.amount * s.price,
            s.staleness_seconds
        ),
        None => "ORACLE DATA: unavailable".to_string(),
    };

    format!(
        r#"WHALE TRANSACTION:
- Address: {address}
- Action: {action}
- Amount: {amount} {token}
- Exchange: {exchange}
- Time: {time}

{oracle_block}

PUBLIC CONTEXT:
{context}

PREMIUM DATA PURCHASED:
{payloads}

Provide a JSON analysis with:
{{
  "executiveSummary": "2-3 sentence overview referencing the oracle-verified USD impact and purchased data",
  "recommendations": ["Action 1", "Action 2", "Action 3"],
  "riskScore": 0-10,
  "confidenceScore": 0-100,
  "tradingSignals": ["SIGNAL 1", "SIGNAL 2"]
}}"#,
        address = alert.wallet_address,
        action = alert.action_type,
        amount = alert.amount,
        token = alert.token,
        exchange = alert.exchange,
        time = alert.timestamp,
        oracle_block = oracle_block,
        context = context,
        payloads = serde_json::to_string_pretty(payloads).unwrap_or_default(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::catalog;
    use chrono::Utc;
    use uuid::Uuid;

    fn fee() -> Decimal {
        Decimal::new(2, 2) // 0.02
    }

    fn alert() -> WhaleAlert {
        WhaleAlert {
            id: Uuid::new_v4(),
            wallet_address: "5tzFkiKscXHK5ZXCGbXZxdw7gTjjD1mBwuoFbhUvuAi9".to_string(),
            action_type: WhaleAction::Deposit,
            amount: 25_000.0,
            token: "SOL".to_string(),
            exchange: "Binance".to_string(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn cost_breakdown_invariants_hold() {
        let purchased: Vec<_> = catalog::catalog().to_vec();
        let breakdown = build_cost_breakdown(&purchased, fee());

        let sum: Decimal = breakdown.cost_per_entry.values().copied().sum();
        assert_eq!(breakdown.total_data_cost, sum);
        assert_eq!(breakdown.total_charged, breakdown.total_data_cost + fee());
        assert_eq!(breakdown.entries_used.len(), purchased.len());
    }

    #[test]
    fn failed_purchase_is_excluded_from_costs() {
        // Two entries were chosen but only one settled.
        let survived = vec![catalog::find("historical-patterns").unwrap().clone()];
        let breakdown = build_cost_breakdown(&survived, fee());

        assert_eq!(breakdown.entries_used, vec!["historical-patterns".to_string()]);
        assert_eq!(breakdown.total_data_cost, Decimal::new(13, 4));
        assert!(!breakdown.cost_per_entry.contains_key("chain-history-analysis"));
    }

    #[test]
    fn empty_purchase_list_costs_only_the_service_fee() {
        let breakdown = build_cost_breakdown(&[], fee());
        assert!(breakdown.entries_used.is_empty());
        assert_eq!(breakdown.total_data_cost, Decimal::ZERO);
        assert_eq!(breakdown.total_charged, fee());
    }

    #[test]
    fn fallback_report_is_well_formed() {
        let breakdown = build_cost_breakdown(&[], fee());
        let report = fallback_report(&alert(), None, HashMap::new(), None, breakdown, false);

        assert!((0.0..=10.0).contains(&report.risk_score));
        assert!((0.0..=100.0).contains(&report.confidence_score));
        assert!(!report.executive_summary.is_empty());
        assert!(!report.trading_signals.is_empty());
    }

    #[test]
    fn fallback_report_names_quota_exhaustion() {
        let breakdown = build_cost_breakdown(&[], fee());
        let report = fallback_report(&alert(), None, HashMap::new(), None, breakdown, true);
        assert!(report.executive_summary.contains("quota"));
    }

    #[test]
    fn deposit_and_withdrawal_read_differently() {
        let breakdown = build_cost_breakdown(&[], fee());
        let deposit = fallback_report(&alert(), None, HashMap::new(), None, breakdown.clone(), false);

        let mut out_alert = alert();
        out_alert.action_type = WhaleAction::Withdrawal;
        let withdrawal = fallback_report(&out_alert, None, HashMap::new(), None, breakdown, false);

        assert!(deposit.executive_summary.contains("bullish"));
        assert!(withdrawal.executive_summary.contains("bearish"));
    }
}
