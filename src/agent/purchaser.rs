//! Purchase execution: USDC settlement followed by the paid data fetch.
//!
//! One entry at a time, always in selection order. Settlement for a given
//! custodial keypair is serialized behind a per-wallet lock so concurrent
//! runs against the same wallet cannot race transaction sequencing. A
//! settled transfer is never rolled back; if the data fetch afterwards
//! fails, the entry is reported as a failed purchase and the run moves on.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use reqwest::Client;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::Value;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signer::Signer;
use solana_sdk::transaction::Transaction;
use spl_associated_token_account::get_associated_token_address;
use spl_associated_token_account::instruction::create_associated_token_account_idempotent;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::agent::catalog::CatalogEntry;
use crate::agent::types::{AgentError, PurchaseRecord, PurchaseStatus, WalletRecord, WhaleAlert};
use crate::database::AnalysisLedger;
use crate::oracle::PriceSnapshot;
use crate::wallet::{self, crypto, USDC_DECIMALS};

/// Seam between the orchestrator's purchase loop and the settlement plus
/// fetch machinery; lets mock data sources swap in without touching the
/// orchestrator.
#[async_trait]
pub trait DataPurchaser: Send + Sync {
    async fn purchase(
        &self,
        entry: &CatalogEntry,
        alert: &WhaleAlert,
        wallet: &WalletRecord,
        snapshot: Option<&PriceSnapshot>,
    ) -> Result<Value, AgentError>;
}

pub struct UsdcPurchaseExecutor {
    rpc: Arc<RpcClient>,
    http: Client,
    ledger: Arc<dyn AnalysisLedger>,
    usdc_mint: Pubkey,
    recipient: Pubkey,
    data_api_base: String,
    wallet_secret: String,
    /// Per-wallet settlement locks, keyed by public key
    wallet_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl UsdcPurchaseExecutor {
    pub fn new(
        rpc: Arc<RpcClient>,
        ledger: Arc<dyn AnalysisLedger>,
        usdc_mint: &str,
        recipient: &str,
        data_api_base: String,
        wallet_secret: String,
    ) -> Result<Self, AgentError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Ok(Self {
            rpc,
            http,
            ledger,
            usdc_mint: Pubkey::from_str(usdc_mint)
                .map_err(|e| AgentError::Configuration(format!("invalid USDC mint: {}", e)))?,
            recipient: Pubkey::from_str(recipient)
                .map_err(|e| AgentError::Configuration(format!("invalid recipient wallet: {}", e)))?,
            data_api_base,
            wallet_secret,
            wallet_locks: DashMap::new(),
        })
    }

    fn lock_for(&self, public_key: &str) -> Arc<Mutex<()>> {
        self.wallet_locks
            .entry(public_key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Transfer `amount` USDC from the custodial wallet to the recipient
    /// and wait for confirmation. Returns the settlement signature.
    async fn settle(
        &self,
        wallet: &WalletRecord,
        amount: Decimal,
    ) -> Result<String, AgentError> {
        let private_key = crypto::decrypt_private_key(&wallet.encrypted_private_key, &self.wallet_secret)
            .map_err(|e| AgentError::Wallet(e.to_string()))?;
        let keypair = wallet::keypair_from_private_key(&private_key)
            .map_err(|e| AgentError::Wallet(e.to_string()))?;
        let owner = keypair.pubkey();

        let base_units = to_base_units(amount)
            .ok_or_else(|| AgentError::Settlement(format!("amount {} not representable", amount)))?;

        let source_ata = get_associated_token_address(&owner, &self.usdc_mint);
        let recipient_ata = get_associated_token_address(&self.recipient, &self.usdc_mint);

        let create_ata_ix = create_associated_token_account_idempotent(
            &owner,
            &self.recipient,
            &self.usdc_mint,
            &spl_token::id(),
        );
        let transfer_ix = spl_token::instruction::transfer(
            &spl_token::id(),
            &source_ata,
            &recipient_ata,
            &owner,
            &[],
            base_units,
        )
        .map_err(|e| AgentError::Settlement(e.to_string()))?;

        let blockhash = self
            .rpc
            .get_latest_blockhash()
            .await
            .map_err(|e| AgentError::Settlement(e.to_string()))?;

        let tx = Transaction::new_signed_with_payer(
            &[create_ata_ix, transfer_ix],
            Some(&owner),
            &[&keypair],
            blockhash,
        );

        let signature = self
            .rpc
            .send_and_confirm_transaction(&tx)
            .await
            .map_err(|e| AgentError::Settlement(e.to_string()))?;

        Ok(signature.to_string())
    }

    async fn fetch_payload(&self, entry: &CatalogEntry, alert: &WhaleAlert) -> Result<Value, AgentError> {
        let url = format!("{}/{}", self.data_api_base, entry.identifier);
        let response = self
            .http
            .get(&url)
            .query(&[
                ("address", alert.wallet_address.as_str()),
                ("action", alert.action_type.as_str()),
                ("token", alert.token.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AgentError::Purchase {
                endpoint: entry.identifier.to_string(),
                reason: format!("endpoint returned {}", response.status()),
            });
        }

        Ok(response.json().await?)
    }

    async fn record(&self, record: PurchaseRecord) {
        if let Err(e) = self.ledger.record_purchase(&record).await {
            warn!("Failed to record purchase of {}: {}", record.endpoint, e);
        }
    }

    async fn transition(
        &self,
        id: Uuid,
        status: PurchaseStatus,
        signature: Option<&str>,
        payload_summary: Option<&str>,
    ) {
        if let Err(e) = self
            .ledger
            .update_purchase_status(id, status, signature, payload_summary)
            .await
        {
            warn!("Failed to transition purchase {} to {}: {}", id, status.as_str(), e);
        }
    }
}

#[async_trait]
impl DataPurchaser for UsdcPurchaseExecutor {
    async fn purchase(
        &self,
        entry: &CatalogEntry,
        alert: &WhaleAlert,
        wallet: &WalletRecord,
        snapshot: Option<&PriceSnapshot>,
    ) -> Result<Value, AgentError> {
        info!("Purchasing {} for {} USDC", entry.identifier, entry.unit_price);

        let lock = self.lock_for(&wallet.public_key);
        let _guard = lock.lock().await;

        // Pending row first; the settlement outcome transitions it exactly
        // once to verified or failed.
        let record_id = Uuid::new_v4();
        self.record(PurchaseRecord {
            id: record_id,
            user_id: wallet.user_id,
            endpoint: entry.identifier.to_string(),
            amount: entry.unit_price,
            signature: None,
            status: PurchaseStatus::Pending,
            payload_summary: None,
            oracle_price: snapshot.map(|s| s.price),
            oracle_confidence: snapshot.map(|s| s.confidence),
            created_at: Utc::now(),
        })
        .await;

        let signature = match self.settle(wallet, entry.unit_price).await {
            Ok(signature) => signature,
            Err(e) => {
                self.transition(record_id, PurchaseStatus::Failed, None, None).await;
                return Err(e);
            }
        };
        info!("USDC payment confirmed: {}", signature);

        let payload = match self.fetch_payload(entry, alert).await {
            Ok(payload) => payload,
            Err(e) => {
                // The transfer settled but the fetch failed; the signature
                // stays on the failed row for audit.
                self.transition(record_id, PurchaseStatus::Failed, Some(signature.as_str()), None)
                    .await;
                return Err(e);
            }
        };

        let summary = summarize_payload(&payload);
        self.transition(
            record_id,
            PurchaseStatus::Verified,
            Some(signature.as_str()),
            Some(summary.as_str()),
        )
        .await;

        info!("Received data from {}", entry.identifier);
        Ok(payload)
    }
}

/// Convert a USDC amount to mint base units (6 decimals).
fn to_base_units(amount: Decimal) -> Option<u64> {
    (amount * Decimal::from(10u64.pow(USDC_DECIMALS))).round().to_u64()
}

/// Truncate the serialized payload to 160 characters for the ledger row.
/// The cut lands on a character boundary; payloads are opaque external
/// JSON and may carry multi-byte text.
fn summarize_payload(payload: &Value) -> String {
    let text = payload.to_string();
    match text.char_indices().nth(160) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::catalog;
    use crate::agent::types::{AnalysisReport, WhaleAction};
    use anyhow::Result;
    use std::sync::Mutex as StdMutex;

    #[test]
    fn converts_catalog_prices_to_base_units() {
        assert_eq!(to_base_units(Decimal::new(14, 4)), Some(1400)); // 0.0014 USDC
        assert_eq!(to_base_units(Decimal::new(12, 4)), Some(1200));
        assert_eq!(to_base_units(Decimal::ONE), Some(1_000_000));
        assert_eq!(to_base_units(Decimal::ZERO), Some(0));
    }

    #[test]
    fn negative_amounts_are_not_representable() {
        assert_eq!(to_base_units(Decimal::new(-1, 0)), None);
    }

    #[test]
    fn long_payloads_are_truncated_in_the_summary() {
        let payload = serde_json::json!({ "data": "x".repeat(500) });
        let summary = summarize_payload(&payload);
        assert!(summary.len() <= 163);
        assert!(summary.ends_with("..."));
    }

    #[test]
    fn truncation_respects_multibyte_character_boundaries() {
        // Serialized external payloads can put a multi-byte character
        // right at the cut point.
        let payload = serde_json::json!({ "note": "é".repeat(200) });
        let summary = summarize_payload(&payload);
        assert!(summary.ends_with("..."));
        assert_eq!(summary.chars().count(), 163);

        let short = serde_json::json!({ "note": "é" });
        assert_eq!(summarize_payload(&short), short.to_string());
    }

    /// Ledger stub that records the purchase lifecycle it observes.
    #[derive(Default)]
    struct RecordingLedger {
        events: StdMutex<Vec<(Uuid, PurchaseStatus)>>,
    }

    #[async_trait]
    impl AnalysisLedger for RecordingLedger {
        async fn record_purchase(&self, record: &PurchaseRecord) -> Result<()> {
            self.events.lock().unwrap().push((record.id, record.status));
            Ok(())
        }

        async fn update_purchase_status(
            &self,
            id: Uuid,
            status: PurchaseStatus,
            _signature: Option<&str>,
            _payload_summary: Option<&str>,
        ) -> Result<()> {
            self.events.lock().unwrap().push((id, status));
            Ok(())
        }

        async fn record_price_snapshot(&self, _snapshot: &PriceSnapshot) -> Result<()> {
            Ok(())
        }

        async fn record_report(
            &self,
            _user_id: Uuid,
            _whale_alert_id: Uuid,
            _report: &AnalysisReport,
        ) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn failed_settlement_transitions_the_pending_row_to_failed() {
        let ledger = Arc::new(RecordingLedger::default());
        let rpc = Arc::new(RpcClient::new("http://127.0.0.1:1".to_string()));
        let executor = UsdcPurchaseExecutor::new(
            rpc,
            Arc::clone(&ledger) as Arc<dyn AnalysisLedger>,
            "4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU",
            "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM",
            "http://127.0.0.1:1".to_string(),
            "secret".to_string(),
        )
        .unwrap();

        let alert = WhaleAlert {
            id: Uuid::new_v4(),
            wallet_address: "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM".to_string(),
            action_type: WhaleAction::Deposit,
            amount: 5_000.0,
            token: "SOL".to_string(),
            exchange: "Binance".to_string(),
            timestamp: Utc::now(),
        };
        // Undecryptable key fails settlement before any network call.
        let wallet = WalletRecord {
            user_id: Uuid::new_v4(),
            public_key: "5tzFkiKscXHK5ZXCGbXZxdw7gTjjD1mBwuoFbhUvuAi9".to_string(),
            encrypted_private_key: "not-a-ciphertext".to_string(),
        };
        let entry = catalog::find("sentiment-analysis").unwrap();

        let result = executor.purchase(entry, &alert, &wallet, None).await;
        assert!(result.is_err());

        let events = ledger.events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].1, PurchaseStatus::Pending);
        assert_eq!(events[1].1, PurchaseStatus::Failed);
        assert_eq!(events[0].0, events[1].0);
    }
}
