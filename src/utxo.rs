//! UTXO and balance queries over address chunks

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::try_join_all;
use rust_decimal::Decimal;

use crate::error::{IndexerError, WalletError};
use crate::indexer::IndexerService;
use crate::types::{AddressRecord, Utxo};

/// Fetches unspent outputs of the wallet, `addresses_limit` addresses per request
pub struct UtxoFetcher {
    indexer: Arc<dyn IndexerService>,
    addresses_limit: usize,
}

impl UtxoFetcher {
    pub fn new(indexer: Arc<dyn IndexerService>, addresses_limit: usize) -> Self {
        Self {
            indexer,
            addresses_limit,
        }
    }

    /// All UTXOs owned by `addresses`. Order is not significant.
    pub async fn fetch_utxos(&self, addresses: &[AddressRecord]) -> Result<Vec<Utxo>, WalletError> {
        let owners: HashMap<&str, &AddressRecord> =
            addresses.iter().map(|r| (r.address.as_str(), r)).collect();
        let plain: Vec<String> = addresses.iter().map(|r| r.address.clone()).collect();

        let queries = plain
            .chunks(self.addresses_limit.max(1))
            .map(|chunk| self.indexer.utxos_for_addresses(chunk));
        let chunks = try_join_all(queries).await.map_err(|e| {
            log::error!("UTXO query failed: {}", e);
            WalletError::balance(e)
        })?;

        let mut utxos = Vec::new();
        for remote in chunks.into_iter().flatten() {
            let owner = owners.get(remote.receiver.as_str()).ok_or_else(|| {
                WalletError::balance(IndexerError::Decode(format!(
                    "UTXO {}:{} belongs to unrequested address {}",
                    remote.tx_hash, remote.tx_index, remote.receiver
                )))
            })?;
            utxos.push(Utxo {
                tx_id: remote.tx_hash,
                output_index: remote.tx_index,
                owner: remote.receiver,
                value: remote.amount,
                path: owner.path(),
            });
        }

        log::debug!("Fetched {} UTXO(s) for {} address(es)", utxos.len(), addresses.len());
        Ok(utxos)
    }
}

/// Sums per-chunk UTXO totals into the wallet balance
pub struct BalanceAggregator {
    indexer: Arc<dyn IndexerService>,
    addresses_limit: usize,
}

impl BalanceAggregator {
    pub fn new(indexer: Arc<dyn IndexerService>, addresses_limit: usize) -> Self {
        Self {
            indexer,
            addresses_limit,
        }
    }

    /// Exact total of all UTXOs owned by `addresses`.
    ///
    /// A failing chunk fails the whole call; a partial balance is never returned.
    pub async fn compute_balance(&self, addresses: &[String]) -> Result<Decimal, WalletError> {
        let queries = addresses
            .chunks(self.addresses_limit.max(1))
            .map(|chunk| self.indexer.utxo_sum_for_addresses(chunk));

        let sums = try_join_all(queries).await.map_err(|e| {
            log::error!("Balance query failed: {}", e);
            WalletError::balance(e)
        })?;

        let total = sums
            .into_iter()
            .map(|sum| sum.unwrap_or(Decimal::ZERO))
            .try_fold(Decimal::ZERO, |acc, sum| acc.checked_add(sum))
            .ok_or_else(|| WalletError::balance(WalletError::Internal("balance overflow".into())))?;

        log::debug!("Balance of {} address(es): {}", addresses.len(), total);
        Ok(total)
    }
}
