pub mod connection;
pub mod migrations;
pub mod models;

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use crate::agent::types::{AnalysisReport, PurchaseRecord, PurchaseStatus};
use crate::oracle::PriceSnapshot;

/// Audit-trail persistence used by the analysis agent.
///
/// Snapshot recording is fire-and-forget; purchase and report recording are
/// best-effort with logged failure, never retried. A purchase row is
/// inserted pending before settlement and transitioned to verified or
/// failed exactly once.
#[async_trait]
pub trait AnalysisLedger: Send + Sync {
    async fn record_purchase(&self, record: &PurchaseRecord) -> Result<()>;
    async fn update_purchase_status(
        &self,
        id: Uuid,
        status: PurchaseStatus,
        signature: Option<&str>,
        payload_summary: Option<&str>,
    ) -> Result<()>;
    async fn record_price_snapshot(&self, snapshot: &PriceSnapshot) -> Result<()>;
    async fn record_report(
        &self,
        user_id: Uuid,
        whale_alert_id: Uuid,
        report: &AnalysisReport,
    ) -> Result<()>;
}
