//! Database Migrations
//!
//! Embedded, idempotent schema setup run at startup.

use anyhow::Result;
use deadpool_postgres::Pool;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id UUID PRIMARY KEY,
    telegram_id TEXT UNIQUE NOT NULL,
    username TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE IF NOT EXISTS wallets (
    id UUID PRIMARY KEY,
    user_id UUID NOT NULL REFERENCES users(id),
    public_key TEXT UNIQUE NOT NULL,
    encrypted_private_key TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE IF NOT EXISTS whale_alerts (
    id UUID PRIMARY KEY,
    wallet_address TEXT NOT NULL,
    action_type TEXT NOT NULL,
    amount DOUBLE PRECISION NOT NULL,
    token TEXT NOT NULL,
    exchange TEXT NOT NULL,
    analyzed BOOLEAN NOT NULL DEFAULT FALSE,
    occurred_at TIMESTAMPTZ NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE IF NOT EXISTS payments (
    id UUID PRIMARY KEY,
    user_id UUID NOT NULL,
    endpoint TEXT NOT NULL,
    amount NUMERIC NOT NULL,
    signature TEXT,
    status TEXT NOT NULL,
    payload_summary TEXT,
    oracle_price DOUBLE PRECISION,
    oracle_confidence DOUBLE PRECISION,
    created_at TIMESTAMPTZ NOT NULL
);

CREATE TABLE IF NOT EXISTS price_snapshots (
    id UUID PRIMARY KEY,
    asset TEXT NOT NULL,
    price DOUBLE PRECISION NOT NULL,
    confidence DOUBLE PRECISION NOT NULL,
    oracle_count INT NOT NULL,
    variance DOUBLE PRECISION NOT NULL,
    created_at TIMESTAMPTZ NOT NULL
);

CREATE TABLE IF NOT EXISTS analysis_reports (
    id UUID PRIMARY KEY,
    user_id UUID NOT NULL,
    whale_alert_id UUID NOT NULL,
    report JSONB NOT NULL,
    total_charged NUMERIC NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX IF NOT EXISTS idx_whale_alerts_created ON whale_alerts (created_at DESC);
CREATE INDEX IF NOT EXISTS idx_payments_user ON payments (user_id);
"#;

/// Run all pending migrations
pub async fn run_migrations(pool: &Pool) -> Result<()> {
    tracing::info!("Running database migrations...");

    let client = pool.get().await?;
    client.batch_execute(SCHEMA).await?;

    tracing::info!("Database migrations completed successfully");
    Ok(())
}
