/// Sync configuration from environment variables
///
/// Controls the indexer endpoint, its request limits and where wallets live
/// on disk. Defaults target a local indexer on mainnet settings.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::WalletError;

pub const DEFAULT_ADDRESSES_LIMIT: usize = 50;
pub const DEFAULT_TRANSACTIONS_LIMIT: usize = 20;
/// Upper bound on addresses derived per discovery round
pub const MAX_DISCOVERY_BATCH_SIZE: u32 = 1_000;

#[derive(Clone, Debug)]
pub struct SyncConfig {
    /// Indexer API base URL
    pub indexer_url: String,
    /// Network label stored in wallet metadata
    pub network: String,
    /// Max addresses per indexer request
    pub addresses_limit: usize,
    /// Page size of the transaction history endpoint
    pub transactions_limit: usize,
    /// Root directory for wallet files
    pub data_dir: PathBuf,
    /// Wallet refreshed by the runner binary
    pub wallet_name: String,
    /// Seconds between refresh ticks in the runner
    pub refresh_interval_secs: u64,
    /// Addresses derived per discovery round during restoration
    pub discovery_batch_size: u32,
    /// Account used for all derivations
    pub account_index: u32,
}

impl SyncConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `INDEXER_URL`: indexer endpoint (default `http://localhost:8080`)
    /// - `WALLET_NETWORK`: "mainnet" (default) or "testnet"
    /// - `ADDRESSES_LIMIT`, `TRANSACTIONS_LIMIT`: server-side request limits
    /// - `WALLET_DATA_DIR`: wallet root directory (default `./wallets`)
    /// - `WALLET_NAME`: wallet refreshed by the runner (default `default`)
    /// - `REFRESH_INTERVAL_SECS`: runner tick (default 20)
    /// - `DISCOVERY_BATCH_SIZE`: restoration batch (default: addresses limit)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let network = env::var("WALLET_NETWORK")
            .unwrap_or_else(|_| defaults.network.clone())
            .to_lowercase();
        match network.as_str() {
            "mainnet" => log::info!("Using MAINNET network"),
            "testnet" => log::info!("Using TESTNET network"),
            other => log::warn!("Unknown network '{}', keeping it as a label", other),
        }

        let indexer_url = env::var("INDEXER_URL").unwrap_or_else(|_| defaults.indexer_url.clone());
        log::info!("Indexer URL: {}", indexer_url);

        let addresses_limit = parse_var("ADDRESSES_LIMIT", defaults.addresses_limit);
        let batch_default = u32::try_from(addresses_limit)
            .unwrap_or(u32::MAX)
            .min(MAX_DISCOVERY_BATCH_SIZE);

        Self {
            indexer_url,
            network,
            addresses_limit,
            transactions_limit: parse_var("TRANSACTIONS_LIMIT", defaults.transactions_limit),
            data_dir: env::var("WALLET_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            wallet_name: env::var("WALLET_NAME").unwrap_or(defaults.wallet_name),
            refresh_interval_secs: parse_var(
                "REFRESH_INTERVAL_SECS",
                defaults.refresh_interval_secs,
            ),
            discovery_batch_size: parse_var("DISCOVERY_BATCH_SIZE", batch_default),
            account_index: defaults.account_index,
        }
    }

    /// Reject limits the sync algorithm cannot work with
    pub fn validate(&self) -> Result<(), WalletError> {
        if self.addresses_limit == 0 {
            return Err(WalletError::Config("addresses_limit must be positive".into()));
        }
        if self.transactions_limit == 0 {
            return Err(WalletError::Config("transactions_limit must be positive".into()));
        }
        if self.discovery_batch_size == 0 || self.discovery_batch_size > MAX_DISCOVERY_BATCH_SIZE {
            return Err(WalletError::Config(format!(
                "discovery_batch_size must be in 1..={}",
                MAX_DISCOVERY_BATCH_SIZE
            )));
        }
        Ok(())
    }
}

fn parse_var<T: FromStr + std::fmt::Display + Copy>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            log::warn!("Invalid {}='{}', using default {}", name, raw, default);
            default
        }),
        Err(_) => default,
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            indexer_url: "http://localhost:8080".to_string(),
            network: "mainnet".to_string(),
            addresses_limit: DEFAULT_ADDRESSES_LIMIT,
            transactions_limit: DEFAULT_TRANSACTIONS_LIMIT,
            data_dir: PathBuf::from("./wallets"),
            wallet_name: "default".to_string(),
            refresh_interval_secs: 20,
            discovery_batch_size: DEFAULT_ADDRESSES_LIMIT as u32,
            account_index: 0,
        }
    }
}
