//! # Server Module
//!
//! HTTP server setup and route configuration.

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use solana_client::nonblocking::rpc_client::RpcClient;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};

use crate::agent::{AIClient, UsdcPurchaseExecutor, WhaleAnalysisAgent};
use crate::config::CONFIG;
use crate::database::connection::DatabaseConnection;
use crate::database::migrations;
use crate::oracle::OracleService;
use crate::routes;
use crate::routes::health::ping;

/// Application state shared across all route handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub oracle: Arc<OracleService>,
    pub agent: Arc<WhaleAnalysisAgent>,
    pub rpc: Arc<RpcClient>,
}

/// Starts the whale-analysis HTTP server.
///
/// Wires up the database pool, price oracle, reasoning client and the
/// analysis agent, then serves the API until the process is terminated.
pub async fn start() {
    let db = match DatabaseConnection::new(&CONFIG.database).await {
        Ok(db) => Arc::new(db),
        Err(e) => {
            tracing::error!("Failed to connect to database: {}", e);
            panic!("Cannot start server without a database");
        }
    };

    if let Err(e) = migrations::run_migrations(db.pool()).await {
        tracing::error!("Failed to run migrations: {}", e);
        panic!("Cannot start server with an unmigrated database");
    }

    let rpc = Arc::new(RpcClient::new(CONFIG.solana_rpc_url.clone()));
    let oracle = Arc::new(OracleService::new(CONFIG.agent.price_cache_ttl_secs));
    let ai = Arc::new(AIClient::new(
        CONFIG.openai_api_key.clone(),
        CONFIG.openai_model.clone(),
    ));

    let purchaser = match UsdcPurchaseExecutor::new(
        Arc::clone(&rpc),
        db.clone(),
        &CONFIG.usdc_mint,
        &CONFIG.recipient_wallet,
        CONFIG.data_api_base.clone(),
        CONFIG.wallet_secret_key.clone(),
    ) {
        Ok(executor) => Arc::new(executor),
        Err(e) => {
            tracing::error!("Failed to initialize purchase executor: {}", e);
            panic!("Cannot start server with invalid settlement configuration");
        }
    };

    let agent = Arc::new(WhaleAnalysisAgent::new(
        Arc::clone(&oracle),
        Arc::clone(&ai),
        purchaser,
        db.clone(),
        Arc::clone(&rpc),
        CONFIG.usdc_mint.clone(),
        CONFIG.agent.service_fee,
        CONFIG.agent.fee_reserve,
    ));

    let app_state = AppState { db, oracle, agent, rpc };

    let app = Router::new()
        .route("/ping", get(ping)) // Health check endpoint
        .merge(routes::oracle::create_routes())
        .merge(routes::wallet::create_routes())
        .merge(routes::alerts::create_routes())
        .merge(routes::analysis::create_routes())
        .merge(routes::paid_data::create_routes())
        .layer(
            ServiceBuilder::new().layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods([
                        axum::http::Method::GET,
                        axum::http::Method::POST,
                        axum::http::Method::OPTIONS,
                    ])
                    .allow_headers([
                        axum::http::header::ORIGIN,
                        axum::http::header::CONTENT_TYPE,
                        axum::http::header::ACCEPT,
                    ]),
            ),
        )
        .with_state(app_state);

    let addr = format!("{}:{}", CONFIG.server.host, CONFIG.server.port);
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            panic!("Cannot start server");
        }
    };

    tracing::info!("Server listening on {}", addr);

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
    }
}
