//! Whale movement feed.
//!
//! Alerts are synthesized from a fixed roster of known large wallets until a
//! real on-chain monitor is wired in. Generated alerts go through the same
//! persistence and analysis path a live feed would use.

use chrono::Utc;
use rand::seq::SliceRandom;
use rand::Rng;
use uuid::Uuid;

use crate::agent::types::{WhaleAction, WhaleAlert};

/// Known high-balance wallets watched by the feed.
pub const WHALE_ADDRESSES: [&str; 10] = [
    "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM",
    "5tzFkiKscXHK5ZXCGbXZxdw7gTjjD1mBwuoFbhUvuAi9",
    "3LKy8xYJkXZ3XuL5cVJbQW9dRmYVnx5hWvT4pJc2vNDp",
    "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU",
    "GThUX1Atko4tqhN2NaiTazWSeFWMuiUvfFnyJyUghFMJ",
    "4Nd1mBQtrMJVYVfKf2PJy9NZUZdTAsp7D4xWLs4gDB4T",
    "EhYXq3ANp5nAerUpbSgd7VK2RRcxK1zNuSQ755G5Mtxx",
    "B1aLzaNMeFVAyQ6f3XbbUyKcH2YPHu2fqiEagmiF23VR",
    "6dMH3u76qZ7XG4bVboVRnBHR2FyrxRqSsXprkBBYjNSf",
    "2ojv9BAiHUrvsm9gxDe7fJSzbNZSJcxZvf8dqmWGHG8S",
];

const EXCHANGES: [&str; 5] = ["Binance", "Coinbase", "Kraken", "OKX", "Bybit"];

/// Produce a plausible whale alert for simulation and demos.
pub fn generate_mock_alert() -> WhaleAlert {
    let mut rng = rand::thread_rng();

    let action_type = if rng.gen_bool(0.5) { WhaleAction::Deposit } else { WhaleAction::Withdrawal };
    let amount = rng.gen_range(1_000.0..50_000.0_f64).round();

    WhaleAlert {
        id: Uuid::new_v4(),
        wallet_address: WHALE_ADDRESSES.choose(&mut rng).copied().unwrap_or(WHALE_ADDRESSES[0]).to_string(),
        action_type,
        amount,
        token: "SOL".to_string(),
        exchange: EXCHANGES.choose(&mut rng).copied().unwrap_or(EXCHANGES[0]).to_string(),
        timestamp: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_alerts_stay_in_the_advertised_ranges() {
        for _ in 0..100 {
            let alert = generate_mock_alert();
            assert!((1_000.0..=50_000.0).contains(&alert.amount));
            assert_eq!(alert.token, "SOL");
            assert!(WHALE_ADDRESSES.contains(&alert.wallet_address.as_str()));
            assert!(EXCHANGES.contains(&alert.exchange.as_str()));
        }
    }
}
