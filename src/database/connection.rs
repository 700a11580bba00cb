// Database Connection Management
//
// PostgreSQL connection pooling via tokio-postgres and deadpool, plus the
// query layer for users, wallets, alerts and the analysis audit ledger.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use tokio_postgres::NoTls;
use uuid::Uuid;

use crate::agent::types::{AnalysisReport, PurchaseRecord, PurchaseStatus, WhaleAlert};
use crate::config::DatabaseConfig;
use crate::database::models::{FromRow, User, Wallet};
use crate::database::AnalysisLedger;
use crate::oracle::PriceSnapshot;

pub struct DatabaseConnection {
    pool: Pool,
}

impl DatabaseConnection {
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let mut pg_config = tokio_postgres::Config::new();
        pg_config
            .host(&config.host)
            .port(config.port)
            .user(&config.user)
            .password(&config.password)
            .dbname(&config.dbname);

        let manager = Manager::from_config(
            pg_config,
            NoTls,
            ManagerConfig { recycling_method: RecyclingMethod::Fast },
        );
        let pool = Pool::builder(manager)
            .max_size(config.max_size)
            .build()
            .context("Failed to build database pool")?;

        // Fail fast on bad credentials instead of at first query
        pool.get().await.context("Failed to connect to database")?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    // ------------------------------------------------------------------
    // Users & wallets
    // ------------------------------------------------------------------

    pub async fn get_or_create_user(&self, telegram_id: &str, username: Option<&str>) -> Result<User> {
        let client = self.pool.get().await?;

        if let Some(row) = client
            .query_opt("SELECT * FROM users WHERE telegram_id = $1", &[&telegram_id])
            .await?
        {
            return Ok(User::from_row(&row)?);
        }

        let row = client
            .query_one(
                "INSERT INTO users (id, telegram_id, username) VALUES ($1, $2, $3) RETURNING *",
                &[&Uuid::new_v4(), &telegram_id, &username],
            )
            .await
            .context("Failed to create user")?;

        Ok(User::from_row(&row)?)
    }

    pub async fn get_wallet_for_user(&self, user_id: Uuid) -> Result<Option<Wallet>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt("SELECT * FROM wallets WHERE user_id = $1", &[&user_id])
            .await?;
        Ok(row.map(|r| Wallet::from_row(&r)).transpose()?)
    }

    pub async fn create_wallet(
        &self,
        user_id: Uuid,
        public_key: &str,
        encrypted_private_key: &str,
    ) -> Result<Wallet> {
        let client = self.pool.get().await?;
        let row = client
            .query_one(
                "INSERT INTO wallets (id, user_id, public_key, encrypted_private_key) \
                 VALUES ($1, $2, $3, $4) RETURNING *",
                &[&Uuid::new_v4(), &user_id, &public_key, &encrypted_private_key],
            )
            .await
            .context("Failed to create wallet")?;
        Ok(Wallet::from_row(&row)?)
    }

    // ------------------------------------------------------------------
    // Whale alerts
    // ------------------------------------------------------------------

    pub async fn insert_whale_alert(&self, alert: &WhaleAlert) -> Result<()> {
        let client = self.pool.get().await?;
        client
            .execute(
                "INSERT INTO whale_alerts \
                 (id, wallet_address, action_type, amount, token, exchange, occurred_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
                &[
                    &alert.id,
                    &alert.wallet_address,
                    &alert.action_type.as_str(),
                    &alert.amount,
                    &alert.token,
                    &alert.exchange,
                    &alert.timestamp,
                ],
            )
            .await
            .context("Failed to insert whale alert")?;
        Ok(())
    }

    pub async fn get_whale_alert(&self, id: Uuid) -> Result<Option<WhaleAlert>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt("SELECT * FROM whale_alerts WHERE id = $1", &[&id])
            .await?;
        Ok(row.map(|r| WhaleAlert::from_row(&r)).transpose()?)
    }

    pub async fn recent_whale_alerts(&self, limit: i64) -> Result<Vec<WhaleAlert>> {
        let client = self.pool.get().await?;
        let rows = client
            .query(
                "SELECT * FROM whale_alerts ORDER BY created_at DESC LIMIT $1",
                &[&limit],
            )
            .await?;
        rows.iter()
            .map(|r| WhaleAlert::from_row(r).map_err(Into::into))
            .collect()
    }

    pub async fn mark_alert_analyzed(&self, id: Uuid) -> Result<()> {
        let client = self.pool.get().await?;
        client
            .execute("UPDATE whale_alerts SET analyzed = TRUE WHERE id = $1", &[&id])
            .await
            .context("Failed to mark alert analyzed")?;
        Ok(())
    }
}

#[async_trait]
impl AnalysisLedger for DatabaseConnection {
    async fn record_purchase(&self, record: &PurchaseRecord) -> Result<()> {
        let client = self.pool.get().await?;
        client
            .execute(
                "INSERT INTO payments \
                 (id, user_id, endpoint, amount, signature, status, payload_summary, \
                  oracle_price, oracle_confidence, created_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
                &[
                    &record.id,
                    &record.user_id,
                    &record.endpoint,
                    &record.amount,
                    &record.signature,
                    &record.status.as_str(),
                    &record.payload_summary,
                    &record.oracle_price,
                    &record.oracle_confidence,
                    &record.created_at,
                ],
            )
            .await
            .context("Failed to record purchase")?;
        Ok(())
    }

    async fn update_purchase_status(
        &self,
        id: Uuid,
        status: PurchaseStatus,
        signature: Option<&str>,
        payload_summary: Option<&str>,
    ) -> Result<()> {
        let client = self.pool.get().await?;
        client
            .execute(
                "UPDATE payments SET status = $2, \
                 signature = COALESCE($3, signature), \
                 payload_summary = COALESCE($4, payload_summary) \
                 WHERE id = $1",
                &[&id, &status.as_str(), &signature, &payload_summary],
            )
            .await
            .context("Failed to update purchase status")?;
        Ok(())
    }

    async fn record_price_snapshot(&self, snapshot: &PriceSnapshot) -> Result<()> {
        let client = self.pool.get().await?;
        client
            .execute(
                "INSERT INTO price_snapshots \
                 (id, asset, price, confidence, oracle_count, variance, created_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
                &[
                    &Uuid::new_v4(),
                    &snapshot.asset,
                    &snapshot.price,
                    &snapshot.confidence,
                    &(snapshot.oracle_count as i32),
                    &snapshot.variance,
                    &snapshot.timestamp,
                ],
            )
            .await
            .context("Failed to record price snapshot")?;
        Ok(())
    }

    async fn record_report(
        &self,
        user_id: Uuid,
        whale_alert_id: Uuid,
        report: &AnalysisReport,
    ) -> Result<()> {
        let client = self.pool.get().await?;
        let body = serde_json::to_value(report)?;
        client
            .execute(
                "INSERT INTO analysis_reports \
                 (id, user_id, whale_alert_id, report, total_charged, created_at) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
                &[
                    &Uuid::new_v4(),
                    &user_id,
                    &whale_alert_id,
                    &body,
                    &report.cost_breakdown.total_charged,
                    &Utc::now(),
                ],
            )
            .await
            .context("Failed to record analysis report")?;
        Ok(())
    }
}
