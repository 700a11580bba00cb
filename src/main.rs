//! # WhaleWatch Server
//!
//! Backend for a whale-tracking bot: watches large wallet movements,
//! maintains custodial wallets, and runs an autonomous analysis agent that
//! buys premium data with USDC micro-payments and synthesizes a trading
//! report for each alert.
//!
//! ## Architecture
//! - `server`: HTTP server setup and shared state
//! - `config`: environment variable configuration
//! - `agent`: the four-phase analysis agent
//! - `oracle`: cached price reference provider
//! - `wallet`: custodial key management and balance reads
//! - `whales`: whale movement feed
//! - `database`: PostgreSQL pool, migrations and the audit ledger
//! - `routes`: HTTP route handlers organized by functionality
//!
//! ## Running the Server
//! ```bash
//! cargo run
//! ```
//!
//! The server starts on `http://0.0.0.0:3000` by default; `curl
//! localhost:3000/ping` verifies it is up.

mod agent;
mod config;
mod database;
mod oracle;
mod routes;
mod server;
mod wallet;
mod whales;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .compact(),
        )
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    tracing::info!("Starting WhaleWatch server...");
    tracing::info!("Package: {} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    server::start().await;
}
