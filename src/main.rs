use std::sync::Arc;
use std::time::Duration;

use wallet_sync::{FileStore, HttpIndexer, SyncConfig, WalletError, WalletManager, WatchOnly};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Initialize logger (set RUST_LOG=debug for verbose output, RUST_LOG=info for normal)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = SyncConfig::from_env();
    config.validate()?;

    let store = Arc::new(FileStore::open_existing(&config.data_dir, &config.wallet_name)?);
    let indexer = Arc::new(HttpIndexer::new(config.indexer_url.clone()));
    let interval = Duration::from_secs(config.refresh_interval_secs.max(1));
    let name = config.wallet_name.clone();

    // The runner holds no keys: it only refreshes an already persisted address book
    let manager = WalletManager::new(name.clone(), config, store, indexer, Arc::new(WatchOnly))?;

    log::info!("Refreshing wallet '{}' every {:?}", name, interval);

    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match manager.refresh().await {
                    Ok(report) => log::info!(
                        "Refresh done: balance {}, {} merged, watermark {:?}",
                        report.balance,
                        report.history.merged,
                        report.history.last_block_number
                    ),
                    Err(WalletError::SyncInProgress(_)) => {
                        log::debug!("Previous refresh still running, skipping tick");
                    }
                    Err(e) => log::warn!("Refresh failed, retrying next tick: {}", e),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                log::info!("Shutting down");
                break;
            }
        }
    }

    Ok(())
}
