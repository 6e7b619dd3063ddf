/// Address book
///
/// Append-only list of the wallet's addresses, persisted under
/// `ADDRESSES_KEY`. Indices per (account, chain) are contiguous from 0.

use std::collections::{HashMap, HashSet};
use std::ops::Range;
use std::sync::Arc;

use futures::future::try_join_all;

use crate::config::MAX_DISCOVERY_BATCH_SIZE;
use crate::error::{KeyError, WalletError};
use crate::indexer::IndexerService;
use crate::keys::KeyDeriver;
use crate::storage::{WalletStore, ADDRESSES_KEY};
use crate::types::{AddressRecord, Chain};

/// `from..from + count`, refusing ranges past the last child index
fn index_range(from: u32, count: u32) -> Result<Range<u32>, WalletError> {
    let end = from.checked_add(count).ok_or_else(|| {
        WalletError::InvalidInput(format!("address index range {} + {} overflows", from, count))
    })?;
    Ok(from..end)
}

pub struct AddressBook {
    store: Arc<dyn WalletStore>,
    deriver: Arc<dyn KeyDeriver>,
    indexer: Arc<dyn IndexerService>,
    account: u32,
    addresses_limit: usize,
}

impl AddressBook {
    pub fn new(
        store: Arc<dyn WalletStore>,
        deriver: Arc<dyn KeyDeriver>,
        indexer: Arc<dyn IndexerService>,
        account: u32,
        addresses_limit: usize,
    ) -> Self {
        Self {
            store,
            deriver,
            indexer,
            account,
            addresses_limit,
        }
    }

    /// Every known address, in allocation order
    pub fn all(&self) -> Result<Vec<AddressRecord>, WalletError> {
        let records: Vec<AddressRecord> = match self.store.get_value(ADDRESSES_KEY)? {
            Some(value) => serde_json::from_value(value).map_err(crate::error::StorageError::from)?,
            None => Vec::new(),
        };
        Ok(records)
    }

    /// Plain address strings of the whole wallet
    pub fn addresses(&self) -> Result<Vec<String>, WalletError> {
        Ok(self.all()?.into_iter().map(|r| r.address).collect())
    }

    pub fn address_set(&self) -> Result<HashSet<String>, WalletError> {
        Ok(self.all()?.into_iter().map(|r| r.address).collect())
    }

    pub fn lookup_table(&self) -> Result<HashMap<String, AddressRecord>, WalletError> {
        Ok(self
            .all()?
            .into_iter()
            .map(|r| (r.address.clone(), r))
            .collect())
    }

    fn save(&self, records: &[AddressRecord]) -> Result<(), WalletError> {
        let value = serde_json::to_value(records).map_err(crate::error::StorageError::from)?;
        self.store.set_value(ADDRESSES_KEY, value)?;
        Ok(())
    }

    fn next_index(&self, records: &[AddressRecord], chain: Chain) -> u32 {
        records
            .iter()
            .filter(|r| r.account == self.account && r.chain == chain)
            .count() as u32
    }

    fn derive_range(&self, chain: Chain, from: u32, count: u32) -> Result<Vec<AddressRecord>, WalletError> {
        let derived = self.deriver.derive(self.account, chain, index_range(from, count)?)?;
        if derived.len() != count as usize {
            return Err(KeyError::Derivation {
                chain,
                index: from,
                reason: format!("expected {} addresses, got {}", count, derived.len()),
            }
            .into());
        }
        Ok(derived
            .into_iter()
            .zip(from..)
            .map(|(address, index)| AddressRecord {
                address,
                account: self.account,
                chain,
                index,
            })
            .collect())
    }

    /// Allocate, persist and return the next address on `chain`
    pub fn create_next(&self, chain: Chain) -> Result<AddressRecord, WalletError> {
        let mut records = self.all()?;
        let index = self.next_index(&records, chain);

        let record = self
            .derive_range(chain, index, 1)?
            .pop()
            .ok_or_else(|| WalletError::Internal("derivation returned no address".into()))?;

        records.push(record.clone());
        self.save(&records)?;

        log::info!("New {} address #{}: {}", chain, index, record.address);
        Ok(record)
    }

    /// Scan `chain` in batches until a batch has no used address.
    ///
    /// Returns every address below 1 + the highest used index. Nothing is
    /// persisted here.
    pub async fn discover(&self, chain: Chain, batch_size: u32) -> Result<Vec<AddressRecord>, WalletError> {
        if batch_size == 0 || batch_size > MAX_DISCOVERY_BATCH_SIZE {
            return Err(WalletError::InvalidInput(format!(
                "discovery batch size must be in 1..={}, got {}",
                MAX_DISCOVERY_BATCH_SIZE, batch_size
            )));
        }

        let mut discovered: Vec<AddressRecord> = Vec::new();
        let mut frontier = 0u32;

        loop {
            let window = index_range(frontier, batch_size).map_err(WalletError::discovery)?;
            let batch = self
                .derive_range(chain, frontier, batch_size)
                .map_err(WalletError::discovery)?;

            let used = self.used_among(&batch).await.map_err(WalletError::discovery)?;

            let highest_used = batch
                .iter()
                .filter(|r| used.contains(&r.address))
                .map(|r| r.index)
                .max();

            let Some(highest_used) = highest_used else {
                log::debug!(
                    "No used {} address in [{}, {}), discovery done",
                    chain,
                    window.start,
                    window.end
                );
                break;
            };

            let next_frontier = highest_used + 1;
            discovered.extend(batch.into_iter().filter(|r| r.index < next_frontier));
            log::debug!("Discovery frontier {} -> {}", frontier, next_frontier);
            frontier = next_frontier;
        }

        log::info!("Discovered {} used {} address(es)", discovered.len(), chain);
        Ok(discovered)
    }

    async fn used_among(&self, batch: &[AddressRecord]) -> Result<HashSet<String>, WalletError> {
        let addresses: Vec<String> = batch.iter().map(|r| r.address.clone()).collect();
        let queries = addresses
            .chunks(self.addresses_limit.max(1))
            .map(|chunk| self.indexer.addresses_in_use(chunk));
        let used = try_join_all(queries).await?;
        Ok(used.into_iter().flatten().collect())
    }

    /// Restoration bootstrap: discover, persist in one write, and make sure
    /// the wallet ends up with at least one address
    pub async fn restore(&self, chain: Chain, batch_size: u32) -> Result<Vec<AddressRecord>, WalletError> {
        let existing = self.all()?;
        if self.next_index(&existing, chain) > 0 {
            return Err(WalletError::InvalidInput(format!(
                "wallet already has {} addresses; restore needs an empty address book",
                chain
            )));
        }

        let discovered = self.discover(chain, batch_size).await?;
        if discovered.is_empty() {
            log::info!("No history found, allocating a fresh {} address", chain);
            let record = self.create_next(chain).map_err(WalletError::discovery)?;
            return Ok(vec![record]);
        }

        let mut records = existing;
        records.extend(discovered.iter().cloned());
        self.save(&records).map_err(WalletError::discovery)?;
        Ok(discovered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_range_rejects_overflow() {
        assert_eq!(index_range(3, 4).unwrap(), 3..7);
        assert_eq!(index_range(u32::MAX - 1, 1).unwrap(), u32::MAX - 1..u32::MAX);
        assert!(matches!(index_range(u32::MAX - 1, 2), Err(WalletError::InvalidInput(_))));
        assert!(matches!(index_range(u32::MAX, 1), Err(WalletError::InvalidInput(_))));
    }
}
