/// Indexer Mock Server
///
/// A lightweight in-memory stand-in for the wallet indexer API.
/// Designed for local development against the sync runner.

use anyhow::{Context, Result};
use std::env;
use std::sync::Arc;

use indexer_mock::{run_server, Ledger};

#[derive(Debug)]
struct Config {
    page_size: usize,
    server_host: String,
    server_port: u16,
}

impl Config {
    fn from_env() -> Result<Self> {
        dotenv::dotenv().ok(); // Load .env file if present

        let page_size = env::var("TRANSACTIONS_LIMIT")
            .unwrap_or_else(|_| "20".to_string())
            .parse()
            .context("Invalid TRANSACTIONS_LIMIT")?;

        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .context("Invalid SERVER_PORT")?;

        Ok(Self {
            page_size,
            server_host,
            server_port,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Starting Indexer Mock Server...");

    let config = Config::from_env().context("Failed to load configuration")?;

    log::info!("History page size: {}", config.page_size);
    log::info!("Server will listen on {}:{}", config.server_host, config.server_port);

    let ledger = Arc::new(Ledger::new(config.page_size));

    run_server(ledger, config.server_host, config.server_port)
        .await
        .context("Server error")?;

    Ok(())
}
