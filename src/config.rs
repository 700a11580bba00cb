//! Configuration module for environment variables and application settings

use std::env;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use once_cell::sync::Lazy;
use rust_decimal::Decimal;

/// Global application configuration loaded from environment variables
pub static CONFIG: Lazy<Config> = Lazy::new(|| {
    Config::from_env().expect("Failed to load configuration from environment")
});

#[derive(Debug, Clone)]
pub struct Config {
    /// OpenAI API key for the agent's reasoning calls
    pub openai_api_key: String,

    /// Chat model used for reasoning calls
    pub openai_model: String,

    /// Solana RPC endpoint
    pub solana_rpc_url: String,

    /// Settlement stablecoin mint (devnet USDC by default)
    pub usdc_mint: String,

    /// Wallet that receives paid-data settlements
    pub recipient_wallet: String,

    /// Secret used to encrypt custodial private keys at rest
    pub wallet_secret_key: String,

    /// Base URL of the paid data endpoints
    pub data_api_base: String,

    /// Agent economics
    pub agent: AgentConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Server configuration
    pub server: ServerConfig,
}

#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Flat fee charged on top of data costs, in USDC
    pub service_fee: Decimal,
    /// USDC kept back for transaction fees, never spendable on data
    pub fee_reserve: Decimal,
    /// Oracle cache validity window in seconds
    pub price_cache_ttl_secs: u64,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub dbname: String,
    pub max_size: usize,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            openai_api_key: env::var("OPENAI_API_KEY")
                .map_err(|_| anyhow!("OPENAI_API_KEY environment variable is required"))?,

            openai_model: env::var("OPENAI_MODEL")
                .unwrap_or_else(|_| "gpt-4-turbo-preview".to_string()),

            solana_rpc_url: env::var("SOLANA_RPC_URL")
                .unwrap_or_else(|_| "https://api.devnet.solana.com".to_string()),

            usdc_mint: env::var("USDC_MINT_ADDRESS")
                .unwrap_or_else(|_| "4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU".to_string()),

            recipient_wallet: env::var("RECIPIENT_WALLET")
                .map_err(|_| anyhow!("RECIPIENT_WALLET environment variable is required"))?,

            wallet_secret_key: env::var("WALLET_SECRET_KEY")
                .map_err(|_| anyhow!("WALLET_SECRET_KEY environment variable is required"))?,

            data_api_base: env::var("DATA_API_BASE")
                .unwrap_or_else(|_| "http://localhost:3000/api/paid".to_string()),

            agent: AgentConfig {
                service_fee: parse_decimal_env("AGENT_SERVICE_FEE", "0.02")?,
                fee_reserve: parse_decimal_env("AGENT_FEE_RESERVE", "0.1")?,
                price_cache_ttl_secs: env::var("PRICE_CACHE_TTL_SECS")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()
                    .unwrap_or(30),
            },

            database: DatabaseConfig {
                host: env::var("DB_HOST").unwrap_or_else(|_| "localhost".to_string()),
                port: env::var("DB_PORT")
                    .unwrap_or_else(|_| "5432".to_string())
                    .parse()
                    .unwrap_or(5432),
                user: env::var("DB_USER").unwrap_or_else(|_| "postgres".to_string()),
                password: env::var("DB_PASSWORD").unwrap_or_else(|_| "postgres".to_string()),
                dbname: env::var("DB_NAME").unwrap_or_else(|_| "whalewatch".to_string()),
                max_size: env::var("DB_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .unwrap_or(10),
            },

            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("PORT")
                    .or_else(|_| env::var("SERVER_PORT"))
                    .unwrap_or_else(|_| "3000".to_string())
                    .parse()
                    .unwrap_or(3000),
            },
        })
    }
}

fn parse_decimal_env(key: &str, default: &str) -> Result<Decimal> {
    let raw = env::var(key).unwrap_or_else(|_| default.to_string());
    Decimal::from_str(&raw).map_err(|e| anyhow!("{} is not a valid decimal: {}", key, e))
}
