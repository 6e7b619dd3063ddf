/// Axum HTTP server setup and routing

use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers::*;
use crate::ledger::Ledger;

pub fn create_router(ledger: Arc<Ledger>) -> Router {
    // Configure CORS to allow requests from wallet frontend/tests
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(health_check))

        // Transaction endpoints
        .route("/api/txs/utxoForAddresses", post(utxo_for_addresses))
        .route("/api/txs/utxoSumForAddresses", post(utxo_sum_for_addresses))
        .route("/api/txs/history", post(history))
        .route("/api/txs/pending", post(pending))
        .route("/api/txs/signed", post(submit_signed))

        // Address endpoints
        .route("/api/addresses/filterUsed", post(filter_used))

        // Shared state
        .with_state(ledger)

        // Middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn run_server(ledger: Arc<Ledger>, host: String, port: u16) -> anyhow::Result<()> {
    let app = create_router(ledger);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    log::info!("Indexer mock server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Serve `ledger` on an ephemeral localhost port in the background.
///
/// Returns the base URL to hand to a client.
pub async fn spawn(ledger: Arc<Ledger>) -> anyhow::Result<(String, tokio::task::JoinHandle<()>)> {
    let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
    let addr = listener.local_addr()?;
    let app = create_router(ledger);

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            log::error!("Indexer mock server stopped: {}", e);
        }
    });

    Ok((format!("http://{}", addr), handle))
}
