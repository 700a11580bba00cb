//! The four-phase analysis pipeline.
//!
//! `GatherContext -> SelectEntries -> PurchaseLoop -> Synthesize`, strictly
//! linear. Context and selection have deterministic fallbacks for reasoning
//! failures; anything else raised in those phases aborts the run. Purchase
//! failures are caught per entry and the loop continues. Synthesis never
//! fails. The orchestrator owns the run log and returns it with the report
//! on every completed run.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::Value;
use solana_client::nonblocking::rpc_client::RpcClient;
use tracing::{info, warn};

use crate::agent::ai_client::AIClient;
use crate::agent::catalog::CatalogEntry;
use crate::agent::purchaser::DataPurchaser;
use crate::agent::selector::Selector;
use crate::agent::synthesizer::Synthesizer;
use crate::agent::types::{AgentError, RunOutcome, WalletRecord, WhaleAlert};
use crate::database::AnalysisLedger;
use crate::oracle::{OracleService, PriceSnapshot};
use crate::wallet;

const REFERENCE_ASSET: &str = "SOL_USD";

/// Ordered, timestamped log of one analysis run.
pub struct RunLog {
    lines: Vec<String>,
}

impl RunLog {
    fn new() -> Self {
        Self { lines: Vec::new() }
    }

    fn push(&mut self, message: impl Into<String>) {
        let message = message.into();
        info!("Agent: {}", message);
        self.lines.push(format!("{} {}", Utc::now().format("%H:%M:%S%.3f"), message));
    }

    fn into_lines(self) -> Vec<String> {
        self.lines
    }
}

/// The autonomous analysis agent. Constructed once per process with its
/// collaborators injected; `analyze` runs the pipeline for one alert.
pub struct WhaleAnalysisAgent {
    oracle: Arc<OracleService>,
    ai: Arc<AIClient>,
    selector: Selector,
    synthesizer: Synthesizer,
    purchaser: Arc<dyn DataPurchaser>,
    ledger: Arc<dyn AnalysisLedger>,
    rpc: Arc<RpcClient>,
    usdc_mint: String,
}

impl WhaleAnalysisAgent {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        oracle: Arc<OracleService>,
        ai: Arc<AIClient>,
        purchaser: Arc<dyn DataPurchaser>,
        ledger: Arc<dyn AnalysisLedger>,
        rpc: Arc<RpcClient>,
        usdc_mint: String,
        service_fee: Decimal,
        fee_reserve: Decimal,
    ) -> Self {
        Self {
            oracle,
            selector: Selector::new(Arc::clone(&ai), fee_reserve),
            synthesizer: Synthesizer::new(Arc::clone(&ai), service_fee),
            ai,
            purchaser,
            ledger,
            rpc,
            usdc_mint,
        }
    }

    /// Run the full pipeline for one whale alert against one custodial
    /// wallet. Returns the report and the run log.
    pub async fn analyze(
        &self,
        alert: &WhaleAlert,
        wallet: &WalletRecord,
    ) -> Result<RunOutcome, AgentError> {
        let mut log = RunLog::new();
        log.push("Starting autonomous whale analysis");

        // Phase 1: gather context. The price and volatility reads are
        // independent and issued concurrently; everything else in a run is
        // awaited sequentially.
        log.push("Phase 1: querying price oracle and gathering context");
        let (snapshot, volatility) = tokio::join!(
            self.oracle.get_price(REFERENCE_ASSET),
            self.oracle.get_volatility(REFERENCE_ASSET)
        );

        let usd_impact = alert.amount * snapshot.price;
        log.push(format!(
            "Oracle: {} = ${:.2} (confidence: {:.1}%, oracles: {})",
            snapshot.asset, snapshot.price, snapshot.confidence, snapshot.oracle_count
        ));
        log.push(format!("Whale movement USD value: ${:.0}", usd_impact));

        let priority = if volatility > 5.0 {
            "HIGH PRIORITY"
        } else if volatility > 2.0 {
            "MEDIUM"
        } else {
            "ROUTINE"
        };
        log.push(format!("Volatility: {:.2}% - marked {}", volatility, priority));

        // Snapshot recording is fire-and-forget; losing one is not worth
        // delaying the run for.
        {
            let ledger = Arc::clone(&self.ledger);
            let snap = snapshot.clone();
            tokio::spawn(async move {
                if let Err(e) = ledger.record_price_snapshot(&snap).await {
                    warn!("Failed to record price snapshot: {}", e);
                }
            });
        }

        let context = match self
            .ai
            .chat(
                "You are a crypto whale analyst with access to real-time oracle data. \
                 Answer in 2-3 factual sentences.",
                &context_prompt(alert, &snapshot, volatility, priority),
                false,
            )
            .await
        {
            Ok(text) => {
                log.push("Analysis context ready");
                text
            }
            Err(e) => {
                log.push(format!("Context gathering degraded ({})", e));
                "Unable to gather real-time context. Proceeding with historical data.".to_string()
            }
        };

        // Phase 2: cost-bounded selection over the catalog.
        log.push("Phase 2: cost-benefit analysis for data purchases");
        let balance = wallet::get_usdc_balance(&self.rpc, &wallet.public_key, &self.usdc_mint)
            .await
            .map_err(|e| AgentError::Wallet(e.to_string()))?;
        log.push(format!("User balance: {:.4} USDC", balance));

        let reliability = self.oracle.is_reliable(&snapshot);
        for warning in &reliability.warnings {
            log.push(format!("Oracle warning: {}", warning));
        }

        let decision = self
            .selector
            .select(&context, balance, alert, &snapshot, volatility, &reliability)
            .await;

        log.push(format!("Decision: {}", decision.rationale));
        if decision.entries.is_empty() {
            log.push("No entries selected (insufficient balance or low value)");
        } else {
            let ids: Vec<_> = decision.entries.iter().map(|e| e.identifier).collect();
            log.push(format!("Selected entries: {}", ids.join(", ")));
            // Advisory only; real costs are recomputed from catalog prices.
            log.push(format!("Model-claimed cost: {} USDC", decision.declared_total_cost));
        }

        // Phase 3: purchases, sequential, tolerant of per-entry failure.
        log.push("Phase 3: executing purchases");
        let (payloads, purchased) = run_purchase_loop(
            self.purchaser.as_ref(),
            &decision.entries,
            alert,
            wallet,
            Some(&snapshot),
            &mut log,
        )
        .await;

        // Phase 4: synthesis, infallible.
        log.push("Phase 4: synthesizing analysis report");
        let (report, degraded) = self
            .synthesizer
            .synthesize(&context, payloads, &purchased, alert, Some(&snapshot))
            .await;
        if let Some(note) = degraded {
            log.push(note);
        }

        if let Err(e) = self.ledger.record_report(wallet.user_id, alert.id, &report).await {
            log.push(format!("Failed to persist report ({}), continuing", e));
        }

        log.push(format!(
            "Total spent: {} USDC, service fee: {} USDC, total charged: {} USDC",
            report.cost_breakdown.total_data_cost,
            report.cost_breakdown.service_fee,
            report.cost_breakdown.total_charged
        ));
        log.push("Analysis complete");

        Ok(RunOutcome { report, logs: log.into_lines() })
    }
}

/// Execute purchases in selection order. A failed entry is logged and
/// skipped; its payload and cost simply never reach the report.
async fn run_purchase_loop(
    purchaser: &dyn DataPurchaser,
    entries: &[CatalogEntry],
    alert: &WhaleAlert,
    wallet: &WalletRecord,
    snapshot: Option<&PriceSnapshot>,
    log: &mut RunLog,
) -> (HashMap<String, Value>, Vec<CatalogEntry>) {
    let mut payloads = HashMap::new();
    let mut purchased = Vec::new();

    for entry in entries {
        log.push(format!("Purchasing {} for {} USDC", entry.identifier, entry.unit_price));
        match purchaser.purchase(entry, alert, wallet, snapshot).await {
            Ok(payload) => {
                payloads.insert(entry.identifier.to_string(), payload);
                purchased.push(entry.clone());
                log.push(format!("Received data from {}", entry.identifier));
            }
            Err(e) => {
                log.push(format!(
                    "Failed to purchase {} ({}), continuing without it",
                    entry.identifier, e
                ));
            }
        }
    }

    (payloads, purchased)
}

fn context_prompt(
    alert: &WhaleAlert,
    snapshot: &PriceSnapshot,
    volatility: f64,
    priority: &str,
) -> String {
    format!(
        r#"Analyze this whale movement:

Whale Address: {address}
Action: {action}
Amount: {amount} {token}
Exchange: {exchange}
Time: {time}

ORACLE DATA ({oracle_count} nodes):
- Current {asset} Price: ${price:.2}
- Oracle Confidence: {confidence:.1}%
- USD Impact: ${usd_impact:.0}
- Price Volatility: {volatility:.2}%
- Analysis Priority: {priority}

Cover: significance of the movement (use the oracle-verified USD value),
what it signals given current volatility, and key risks or opportunities."#,
        address = alert.wallet_address,
        action = alert.action_type,
        amount = alert.amount,
        token = alert.token,
        exchange = alert.exchange,
        time = alert.timestamp,
        oracle_count = snapshot.oracle_count,
        asset = snapshot.asset,
        price = snapshot.price,
        confidence = snapshot.confidence,
        usd_impact = alert.amount * snapshot.price,
        volatility = volatility,
        priority = priority,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::catalog;
    use crate::agent::types::WhaleAction;
    use async_trait::async_trait;
    use serde_json::json;
    use uuid::Uuid;

    /// Purchaser stub that fails for one configured identifier.
    struct FlakyPurchaser {
        failing: &'static str,
    }

    #[async_trait]
    impl DataPurchaser for FlakyPurchaser {
        async fn purchase(
            &self,
            entry: &CatalogEntry,
            _alert: &WhaleAlert,
            _wallet: &WalletRecord,
            _snapshot: Option<&PriceSnapshot>,
        ) -> Result<Value, AgentError> {
            if entry.identifier == self.failing {
                return Err(AgentError::Settlement("transfer rejected".to_string()));
            }
            Ok(json!({ "endpoint": entry.identifier }))
        }
    }

    fn alert() -> WhaleAlert {
        WhaleAlert {
            id: Uuid::new_v4(),
            wallet_address: "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM".to_string(),
            action_type: WhaleAction::Withdrawal,
            amount: 12_000.0,
            token: "SOL".to_string(),
            exchange: "Kraken".to_string(),
            timestamp: Utc::now(),
        }
    }

    fn wallet() -> WalletRecord {
        WalletRecord {
            user_id: Uuid::new_v4(),
            public_key: "test".to_string(),
            encrypted_private_key: String::new(),
        }
    }

    #[tokio::test]
    async fn purchase_loop_survives_a_failed_entry() {
        let purchaser = FlakyPurchaser { failing: "chain-history-analysis" };
        let entries = vec![
            catalog::find("chain-history-analysis").unwrap().clone(),
            catalog::find("historical-patterns").unwrap().clone(),
        ];
        let mut log = RunLog::new();

        let (payloads, purchased) =
            run_purchase_loop(&purchaser, &entries, &alert(), &wallet(), None, &mut log).await;

        assert_eq!(purchased.len(), 1);
        assert_eq!(purchased[0].identifier, "historical-patterns");
        assert!(payloads.contains_key("historical-patterns"));
        assert!(!payloads.contains_key("chain-history-analysis"));

        let lines = log.into_lines();
        assert!(lines.iter().any(|l| l.contains("continuing without it")));
    }

    #[tokio::test]
    async fn purchase_loop_with_no_entries_is_a_no_op() {
        let purchaser = FlakyPurchaser { failing: "none" };
        let mut log = RunLog::new();

        let (payloads, purchased) =
            run_purchase_loop(&purchaser, &[], &alert(), &wallet(), None, &mut log).await;

        assert!(payloads.is_empty());
        assert!(purchased.is_empty());
    }
}
