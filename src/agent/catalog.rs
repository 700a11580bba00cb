//! The paid data catalog: purchasable endpoints with fixed USDC prices.
//!
//! The catalog is immutable and defined at process start. Prices are in
//! USDC units; the settlement mint uses 6 decimals.

use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueTier {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    /// Endpoint path segment, doubles as the entry identifier
    pub identifier: &'static str,
    pub unit_price: Decimal,
    pub description: &'static str,
    pub value_tier: ValueTier,
}

static CATALOG: Lazy<Vec<CatalogEntry>> = Lazy::new(|| {
    vec![
        CatalogEntry {
            identifier: "chain-history-analysis",
            unit_price: Decimal::new(14, 4), // 0.0014 USDC
            description: "Complete chain-history analysis of the whale's past activity",
            value_tier: ValueTier::High,
        },
        CatalogEntry {
            identifier: "historical-patterns",
            unit_price: Decimal::new(13, 4), // 0.0013 USDC
            description: "Historical whale behavior patterns and outcomes",
            value_tier: ValueTier::High,
        },
        CatalogEntry {
            identifier: "sentiment-analysis",
            unit_price: Decimal::new(12, 4), // 0.0012 USDC
            description: "Social sentiment from Twitter, Reddit and crypto forums",
            value_tier: ValueTier::Medium,
        },
        CatalogEntry {
            identifier: "market-impact",
            unit_price: Decimal::new(12, 4), // 0.0012 USDC
            description: "Liquidity analysis and execution impact",
            value_tier: ValueTier::Medium,
        },
    ]
});

/// The full catalog, in presentation order.
pub fn catalog() -> &'static [CatalogEntry] {
    &CATALOG
}

/// Look up an entry by identifier.
pub fn find(identifier: &str) -> Option<&'static CatalogEntry> {
    CATALOG.iter().find(|e| e.identifier == identifier)
}

/// The fixed default entry used whenever the reasoning call fails or its
/// output cannot be decoded. Always the first catalog entry, never
/// re-derived at runtime.
pub fn default_entry() -> &'static CatalogEntry {
    &CATALOG[0]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn catalog_has_four_unique_entries() {
        let ids: HashSet<_> = catalog().iter().map(|e| e.identifier).collect();
        assert_eq!(catalog().len(), 4);
        assert_eq!(ids.len(), 4);
    }

    #[test]
    fn default_entry_is_the_high_value_chain_history() {
        let entry = default_entry();
        assert_eq!(entry.identifier, "chain-history-analysis");
        assert_eq!(entry.value_tier, ValueTier::High);
        assert!(find(entry.identifier).is_some());
    }

    #[test]
    fn prices_are_positive_and_exact() {
        for entry in catalog() {
            assert!(entry.unit_price > Decimal::ZERO);
        }
        assert_eq!(find("historical-patterns").unwrap().unit_price, Decimal::new(13, 4));
    }
}
