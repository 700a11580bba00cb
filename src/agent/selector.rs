//! Budget-constrained catalog selection.
//!
//! The choice of which paid entries to buy is delegated to a reasoning
//! call, but the selector is the sole enforcer of the budget: identifiers
//! outside the catalog are dropped and entries are admitted in proposal
//! order only while the running total stays within
//! `balance - fee_reserve`. The model's own cost arithmetic is advisory
//! and only ever logged.

use std::sync::Arc;

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{info, warn};

use crate::agent::ai_client::{decode_json_block, AIClient};
use crate::agent::catalog::{self, CatalogEntry};
use crate::agent::types::{SelectionDecision, WhaleAlert};
use crate::oracle::{PriceSnapshot, Reliability};

pub struct Selector {
    ai: Arc<AIClient>,
    fee_reserve: Decimal,
}

/// Shape the reasoning call is instructed to reply with.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProposedSelection {
    endpoints: Vec<String>,
    reasoning: String,
    #[serde(default)]
    total_cost: f64,
}

impl Selector {
    pub fn new(ai: Arc<AIClient>, fee_reserve: Decimal) -> Self {
        Self { ai, fee_reserve }
    }

    /// Decide which catalog entries to purchase for this run.
    ///
    /// Never fails: reasoning-call or decode failures degrade to the fixed
    /// default entry, and an unaffordable budget degrades to an empty
    /// selection.
    pub async fn select(
        &self,
        context: &str,
        balance: Decimal,
        alert: &WhaleAlert,
        snapshot: &PriceSnapshot,
        volatility: f64,
        reliability: &Reliability,
    ) -> SelectionDecision {
        let spendable = balance - self.fee_reserve;
        if spendable <= Decimal::ZERO {
            info!("Balance {} below fee reserve {}, skipping purchases", balance, self.fee_reserve);
            return SelectionDecision {
                entries: Vec::new(),
                rationale: "Insufficient balance after fee reserve; no data purchased".to_string(),
                declared_total_cost: Decimal::ZERO,
            };
        }

        let prompt = decision_prompt(context, balance, spendable, alert, snapshot, volatility, reliability);

        let proposed = match self
            .ai
            .chat(
                "You are an autonomous analysis agent with financial decision-making power. \
                 You decide which premium data endpoints to purchase with USDC. \
                 Reply with a JSON object only.",
                &prompt,
                true,
            )
            .await
            .and_then(|reply| decode_json_block::<ProposedSelection>(&reply))
        {
            Ok(p) => p,
            Err(e) => {
                warn!("Selection reasoning failed ({}), defaulting to {}", e, catalog::default_entry().identifier);
                return fallback_decision(balance, self.fee_reserve);
            }
        };

        let entries = enforce_budget(&proposed.endpoints, balance, self.fee_reserve);
        let declared_total_cost =
            Decimal::from_f64(proposed.total_cost).unwrap_or(Decimal::ZERO);

        info!(
            "Selection: {} of {} proposed entries admitted (model claimed cost {})",
            entries.len(),
            proposed.endpoints.len(),
            declared_total_cost
        );

        SelectionDecision { entries, rationale: proposed.reasoning, declared_total_cost }
    }
}

/// Admit proposed identifiers in order: unknown identifiers are dropped and
/// the running total may never exceed `balance - reserve`. This check is
/// independent of anything the reasoning call claimed.
fn enforce_budget(proposed: &[String], balance: Decimal, reserve: Decimal) -> Vec<CatalogEntry> {
    let budget = balance - reserve;
    if budget <= Decimal::ZERO {
        return Vec::new();
    }

    let mut total = Decimal::ZERO;
    let mut chosen = Vec::new();

    for identifier in proposed {
        let Some(entry) = catalog::find(identifier) else {
            warn!("Proposed entry '{}' is not in the catalog, dropping", identifier);
            continue;
        };
        if chosen.iter().any(|e: &CatalogEntry| e.identifier == entry.identifier) {
            continue;
        }
        if total + entry.unit_price > budget {
            warn!("Entry '{}' would exceed the budget, dropping", identifier);
            continue;
        }
        total += entry.unit_price;
        chosen.push(entry.clone());
    }

    chosen
}

/// Deterministic fallback: exactly the fixed default entry, still subject
/// to the budget check.
fn fallback_decision(balance: Decimal, reserve: Decimal) -> SelectionDecision {
    let default = catalog::default_entry();
    let entries = enforce_budget(&[default.identifier.to_string()], balance, reserve);

    SelectionDecision {
        entries,
        rationale: format!("Reasoning unavailable; defaulting to {}", default.identifier),
        declared_total_cost: Decimal::ZERO,
    }
}

fn decision_prompt(
    context: &str,
    balance: Decimal,
    spendable: Decimal,
    alert: &WhaleAlert,
    snapshot: &PriceSnapshot,
    volatility: f64,
    reliability: &Reliability,
) -> String {
    let usd_impact = alert.amount * snapshot.price;

    let catalog_lines: String = catalog::catalog()
        .iter()
        .enumerate()
        .map(|(i, e)| {
            format!(
                "{}. {} ({} USDC) - {} [{:?} value]\n",
                i + 1,
                e.identifier,
                e.unit_price,
                e.description,
                e.value_tier
            )
        })
        .collect();

    format!(
        r#"ORACLE-VERIFIED DATA ({oracle_count} nodes):
- {asset} Price: ${price:.2}
- Oracle Confidence: {confidence:.1}%
- Oracle Reliable: {reliable}
- USD Impact: ${usd_impact:.0}
- Price Volatility: {volatility:.2}%

Whale Action: {action} {amount} {token} on {exchange}

Context: {context}

Available Budget: {balance:.4} USDC (must keep {reserve:.4} USDC for tx fees)

Available Endpoints:
{catalog_lines}
DECISION GUIDELINES:
- USD Impact > $1M + Volatility > 5%: consider all endpoints (high stakes)
- USD Impact > $500K: at least 2-3 endpoints, MUST include chain-history-analysis
- USD Impact < $100K: 1-2 endpoints sufficient
- Oracle Confidence < 90%: be conservative, prioritize chain-history-analysis + historical-patterns
- High Volatility (>5%): sentiment-analysis and market-impact gain value
- Low Volatility (<2%): chain-history-analysis alone is sufficient
- ALWAYS prefer chain-history-analysis; it provides the best historical context

RULES:
- You may purchase zero or more endpoints
- Total cost must be <= {spendable:.4} USDC
- Choose based on VALUE for this specific whale action

Respond with JSON only:
{{
  "endpoints": ["endpoint-a", "endpoint-b"],
  "reasoning": "Brief explanation of the choice",
  "totalCost": 0.0
}}"#,
        oracle_count = snapshot.oracle_count,
        asset = snapshot.asset,
        price = snapshot.price,
        confidence = snapshot.confidence,
        reliable = if reliability.reliable { "YES" } else { "NO" },
        usd_impact = usd_impact,
        volatility = volatility,
        action = alert.action_type,
        amount = alert.amount,
        token = alert.token,
        exchange = alert.exchange,
        context = context,
        balance = balance,
        reserve = balance - spendable,
        catalog_lines = catalog_lines,
        spendable = spendable,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use std::str::FromStr;

    fn all_identifiers() -> Vec<String> {
        catalog::catalog().iter().map(|e| e.identifier.to_string()).collect()
    }

    fn reserve() -> Decimal {
        Decimal::from_str("0.1").unwrap()
    }

    #[test]
    fn budget_is_never_exceeded_for_any_balance() {
        let mut rng = rand::thread_rng();
        let proposal = all_identifiers();

        for _ in 0..2000 {
            // Balances from 0 to 5 USDC with 6 decimals, the over-budget
            // proposal always asks for the whole catalog.
            let balance = Decimal::new(rng.gen_range(0..5_000_000), 6);
            let chosen = enforce_budget(&proposal, balance, reserve());

            let total: Decimal = chosen.iter().map(|e| e.unit_price).sum();
            assert!(
                total <= (balance - reserve()).max(Decimal::ZERO),
                "budget violated: total={} balance={}",
                total,
                balance
            );
        }
    }

    #[test]
    fn balance_below_reserve_selects_nothing() {
        let balance = Decimal::from_str("0.01").unwrap();
        assert!(enforce_budget(&all_identifiers(), balance, reserve()).is_empty());
    }

    #[test]
    fn unknown_identifiers_are_filtered_out() {
        let proposal = vec![
            "free-alpha-leak".to_string(),
            "sentiment-analysis".to_string(),
            "also-not-real".to_string(),
        ];
        let chosen = enforce_budget(&proposal, Decimal::ONE, reserve());
        assert_eq!(chosen.len(), 1);
        assert_eq!(chosen[0].identifier, "sentiment-analysis");
    }

    #[test]
    fn proposal_order_is_purchase_order() {
        let proposal = vec![
            "market-impact".to_string(),
            "chain-history-analysis".to_string(),
        ];
        let chosen = enforce_budget(&proposal, Decimal::ONE, reserve());
        let ids: Vec<_> = chosen.iter().map(|e| e.identifier).collect();
        assert_eq!(ids, vec!["market-impact", "chain-history-analysis"]);
    }

    #[test]
    fn duplicate_proposals_are_purchased_once() {
        let proposal = vec!["market-impact".to_string(), "market-impact".to_string()];
        let chosen = enforce_budget(&proposal, Decimal::ONE, reserve());
        assert_eq!(chosen.len(), 1);
    }

    #[test]
    fn malformed_reasoning_falls_back_to_the_default_entry() {
        // The decode path feeds the deterministic fallback.
        let decoded = decode_json_block::<ProposedSelection>("not json at all { oops");
        assert!(decoded.is_err());

        let decision = fallback_decision(Decimal::ONE, reserve());
        assert_eq!(decision.entries.len(), 1);
        assert_eq!(decision.entries[0].identifier, catalog::default_entry().identifier);
    }

    #[test]
    fn fallback_respects_the_budget_too() {
        let decision = fallback_decision(Decimal::from_str("0.05").unwrap(), reserve());
        assert!(decision.entries.is_empty());
    }
}
