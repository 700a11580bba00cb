pub mod price_feed;

pub use price_feed::{OracleService, PriceSnapshot, Reliability};
