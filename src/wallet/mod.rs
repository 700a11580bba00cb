//! Custodial wallet utilities: key generation, balance reads and
//! display helpers.

pub mod crypto;

use anyhow::{anyhow, Result};
use rust_decimal::Decimal;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Keypair;
use solana_sdk::signer::Signer;
use spl_associated_token_account::get_associated_token_address;
use std::str::FromStr;
use tracing::debug;

pub const USDC_DECIMALS: u32 = 6;
const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// A freshly generated keypair in wire form.
pub struct GeneratedWallet {
    pub public_key: String,
    /// bs58-encoded 64-byte secret key; encrypted before it is stored
    pub private_key: String,
}

pub fn generate_wallet() -> GeneratedWallet {
    let keypair = Keypair::new();
    GeneratedWallet {
        public_key: keypair.pubkey().to_string(),
        private_key: bs58::encode(keypair.to_bytes()).into_string(),
    }
}

pub fn keypair_from_private_key(private_key: &str) -> Result<Keypair> {
    let secret = bs58::decode(private_key)
        .into_vec()
        .map_err(|e| anyhow!("invalid private key encoding: {}", e))?;
    Keypair::from_bytes(&secret).map_err(|e| anyhow!("invalid private key: {}", e))
}

/// SOL balance in whole SOL.
pub async fn get_sol_balance(rpc: &RpcClient, public_key: &str) -> Result<f64> {
    let pubkey = Pubkey::from_str(public_key)?;
    let lamports = rpc.get_balance(&pubkey).await?;
    Ok(lamports as f64 / LAMPORTS_PER_SOL as f64)
}

/// USDC balance in whole USDC. A missing token account reads as zero.
pub async fn get_usdc_balance(rpc: &RpcClient, public_key: &str, mint: &str) -> Result<Decimal> {
    let owner = Pubkey::from_str(public_key)?;
    let mint = Pubkey::from_str(mint)?;
    let ata = get_associated_token_address(&owner, &mint);

    match rpc.get_token_account_balance(&ata).await {
        Ok(balance) => {
            let base_units: i64 = balance
                .amount
                .parse()
                .map_err(|e| anyhow!("invalid token amount: {}", e))?;
            Ok(Decimal::new(base_units, USDC_DECIMALS))
        }
        Err(e) => {
            debug!("No token account for {} ({}), treating as zero", public_key, e);
            Ok(Decimal::ZERO)
        }
    }
}

/// First 8 + last 4 characters, for chat-sized display.
pub fn format_address(address: &str) -> String {
    if address.len() < 12 {
        return address.to_string();
    }
    format!("{}...{}", &address[..8], &address[address.len() - 4..])
}

pub fn explorer_url(address: &str) -> String {
    format!("https://solscan.io/address/{}?cluster=devnet", address)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_wallet_round_trips_through_bs58() {
        let wallet = generate_wallet();
        let keypair = keypair_from_private_key(&wallet.private_key).unwrap();
        assert_eq!(keypair.pubkey().to_string(), wallet.public_key);
    }

    #[test]
    fn format_address_truncates_long_addresses() {
        let addr = "5tzFkiKscXHK5ZXCGbXZxdw7gTjjD1mBwuoFbhUvuAi9";
        let shown = format_address(addr);
        assert!(shown.starts_with("5tzFkiKs"));
        assert!(shown.ends_with("uAi9"));
        assert_eq!(format_address("short"), "short");
    }
}
