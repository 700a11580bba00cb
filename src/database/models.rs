// Database Models
//
// Tokio-postgres compatible models for the whale tracker entities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_postgres::Row;
use uuid::Uuid;

use crate::agent::types::{WhaleAction, WhaleAlert};

/// Trait for converting from a tokio-postgres Row
pub trait FromRow {
    fn from_row(row: &Row) -> Result<Self, tokio_postgres::Error>
    where
        Self: Sized;
}

/// Chat user owning a custodial wallet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub telegram_id: String,
    pub username: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl FromRow for User {
    fn from_row(row: &Row) -> Result<Self, tokio_postgres::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            telegram_id: row.try_get("telegram_id")?,
            username: row.try_get("username")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// Custodial wallet with the encrypted signing key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wallet {
    pub id: Uuid,
    pub user_id: Uuid,
    pub public_key: String,
    #[serde(skip_serializing)]
    pub encrypted_private_key: String,
    pub created_at: DateTime<Utc>,
}

impl FromRow for Wallet {
    fn from_row(row: &Row) -> Result<Self, tokio_postgres::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            public_key: row.try_get("public_key")?,
            encrypted_private_key: row.try_get("encrypted_private_key")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl FromRow for WhaleAlert {
    fn from_row(row: &Row) -> Result<Self, tokio_postgres::Error> {
        let action: String = row.try_get("action_type")?;
        Ok(Self {
            id: row.try_get("id")?,
            wallet_address: row.try_get("wallet_address")?,
            action_type: if action == "withdrawal" {
                WhaleAction::Withdrawal
            } else {
                WhaleAction::Deposit
            },
            amount: row.try_get("amount")?,
            token: row.try_get("token")?,
            exchange: row.try_get("exchange")?,
            timestamp: row.try_get("occurred_at")?,
        })
    }
}
