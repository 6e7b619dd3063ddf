/// Wallet Manager - Orchestration Layer
///
/// Owns one wallet's components and coordinates the periodic refresh.
/// Only one sync cycle may run per wallet at a time; the guard also keeps
/// the address book read-only while a cycle is in flight.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::Mutex;

use crate::address_book::AddressBook;
use crate::config::SyncConfig;
use crate::error::{StorageError, WalletError};
use crate::history::{HistorySyncReport, TxHistorySync};
use crate::indexer::IndexerService;
use crate::keys::{KeyDeriver, TransactionSigner};
use crate::spend;
use crate::storage::{WalletStore, BALANCE_KEY, METADATA_KEY};
use crate::types::{AddressRecord, Chain, Metadata, TxRecord, Utxo};
use crate::utxo::{BalanceAggregator, UtxoFetcher};

/// Outcome of one refresh
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshReport {
    /// Pending records rewritten
    pub pending: usize,
    pub history: HistorySyncReport,
    pub balance: Decimal,
}

pub struct WalletManager {
    name: String,
    config: SyncConfig,
    store: Arc<dyn WalletStore>,
    indexer: Arc<dyn IndexerService>,
    signer: Option<Arc<dyn TransactionSigner>>,
    address_book: AddressBook,
    utxo_fetcher: UtxoFetcher,
    balances: BalanceAggregator,
    history: TxHistorySync,
    sync_guard: Mutex<()>,
}

impl WalletManager {
    // ============================================================================
    // Constructor
    // ============================================================================

    pub fn new(
        name: impl Into<String>,
        config: SyncConfig,
        store: Arc<dyn WalletStore>,
        indexer: Arc<dyn IndexerService>,
        deriver: Arc<dyn KeyDeriver>,
    ) -> Result<Self, WalletError> {
        config.validate()?;

        let address_book = AddressBook::new(
            store.clone(),
            deriver,
            indexer.clone(),
            config.account_index,
            config.addresses_limit,
        );
        let utxo_fetcher = UtxoFetcher::new(indexer.clone(), config.addresses_limit);
        let balances = BalanceAggregator::new(indexer.clone(), config.addresses_limit);
        let history = TxHistorySync::new(
            indexer.clone(),
            store.clone(),
            config.addresses_limit,
            config.transactions_limit,
        );

        Ok(Self {
            name: name.into(),
            config,
            store,
            indexer,
            signer: None,
            address_book,
            utxo_fetcher,
            balances,
            history,
            sync_guard: Mutex::new(()),
        })
    }

    /// Attach the signing capability needed by `estimate_fee` and `send`
    pub fn with_signer(mut self, signer: Arc<dyn TransactionSigner>) -> Self {
        self.signer = Some(signer);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn address_book(&self) -> &AddressBook {
        &self.address_book
    }

    // ============================================================================
    // Wallet lifecycle
    // ============================================================================

    fn save_metadata(&self) -> Result<Metadata, WalletError> {
        let metadata = Metadata {
            name: self.name.clone(),
            created_at: Utc::now(),
            network: self.config.network.clone(),
        };
        let value = serde_json::to_value(&metadata).map_err(StorageError::from)?;
        self.store.set_value(METADATA_KEY, value)?;
        Ok(metadata)
    }

    pub fn metadata(&self) -> Result<Option<Metadata>, WalletError> {
        match self.store.get_value(METADATA_KEY)? {
            Some(value) => Ok(Some(
                serde_json::from_value(value).map_err(StorageError::from)?,
            )),
            None => Ok(None),
        }
    }

    /// Set up a brand new wallet with a single receive address
    pub fn create(&self) -> Result<AddressRecord, WalletError> {
        if self.metadata()?.is_some() {
            return Err(WalletError::InvalidInput(format!(
                "wallet {} already exists",
                self.name
            )));
        }
        let address = self.address_book.create_next(Chain::External)?;
        self.save_metadata()?;
        log::info!("Created wallet {}", self.name);
        Ok(address)
    }

    /// Rebuild the address book of a restored wallet from on-chain usage
    pub async fn restore(&self) -> Result<Vec<AddressRecord>, WalletError> {
        if self.metadata()?.is_some() {
            return Err(WalletError::InvalidInput(format!(
                "wallet {} already exists",
                self.name
            )));
        }
        let addresses = self
            .address_book
            .restore(Chain::External, self.config.discovery_batch_size)
            .await?;
        self.save_metadata()?;
        log::info!("Restored wallet {} with {} address(es)", self.name, addresses.len());
        Ok(addresses)
    }

    // ============================================================================
    // Addresses
    // ============================================================================

    /// Allocate a new address; refused while a sync cycle is running
    pub fn new_address(&self, chain: Chain) -> Result<AddressRecord, WalletError> {
        let _guard = self
            .sync_guard
            .try_lock()
            .map_err(|_| WalletError::SyncInProgress(self.name.clone()))?;
        self.address_book.create_next(chain)
    }

    pub fn addresses(&self) -> Result<Vec<AddressRecord>, WalletError> {
        self.address_book.all()
    }

    // ============================================================================
    // Refresh
    // ============================================================================

    /// One full sync cycle: pending refresh, history sync, balance.
    ///
    /// A pending-refresh failure does not stop the history sync; it is
    /// reported once the rest of the cycle has run.
    pub async fn refresh(&self) -> Result<RefreshReport, WalletError> {
        let _guard = self
            .sync_guard
            .try_lock()
            .map_err(|_| WalletError::SyncInProgress(self.name.clone()))?;

        let records = self.address_book.all().map_err(WalletError::history)?;
        if records.is_empty() {
            return Err(WalletError::WalletNotFound(self.name.clone()));
        }
        let addresses: Vec<String> = records.into_iter().map(|r| r.address).collect();
        let wallet: HashSet<String> = addresses.iter().cloned().collect();

        log::info!("Refreshing wallet {} ({} addresses)", self.name, addresses.len());

        let pending = self.history.refresh_pending(&addresses, &wallet).await;
        let history = self.history.sync_history(&addresses, &wallet).await?;

        let balance = self.balances.compute_balance(&addresses).await?;
        let value = serde_json::to_value(balance).map_err(|e| WalletError::balance(StorageError::from(e)))?;
        self.store
            .set_value(BALANCE_KEY, value)
            .map_err(WalletError::balance)?;

        let pending = pending?;

        Ok(RefreshReport {
            pending,
            history,
            balance,
        })
    }

    // ============================================================================
    // Queries
    // ============================================================================

    /// All known transactions, newest first
    pub fn transactions(&self) -> Result<Vec<TxRecord>, WalletError> {
        Ok(self.store.all_transactions()?)
    }

    pub fn transaction_count(&self) -> Result<usize, WalletError> {
        Ok(self.store.all_transactions()?.len())
    }

    pub fn pending_transactions(&self) -> Result<Vec<TxRecord>, WalletError> {
        Ok(self.store.pending_transactions()?)
    }

    pub fn last_block_number(&self) -> Result<Option<u64>, WalletError> {
        self.history.last_block_number()
    }

    /// Fresh balance straight from the indexer
    pub async fn balance(&self) -> Result<Decimal, WalletError> {
        let addresses = self.address_book.addresses().map_err(WalletError::balance)?;
        self.balances.compute_balance(&addresses).await
    }

    /// Balance computed by the last successful refresh
    pub fn cached_balance(&self) -> Result<Option<Decimal>, WalletError> {
        match self.store.get_value(BALANCE_KEY)? {
            Some(value) => Ok(Some(
                serde_json::from_value(value).map_err(StorageError::from)?,
            )),
            None => Ok(None),
        }
    }

    pub async fn utxos(&self) -> Result<Vec<Utxo>, WalletError> {
        let addresses = self.address_book.all().map_err(WalletError::balance)?;
        self.utxo_fetcher.fetch_utxos(&addresses).await
    }

    // ============================================================================
    // Spending
    // ============================================================================

    fn signer(&self) -> Result<&dyn TransactionSigner, WalletError> {
        self.signer
            .as_deref()
            .ok_or_else(|| WalletError::Config("no transaction signer configured".into()))
    }

    pub async fn estimate_fee(&self, receiver: &str, amount: Decimal) -> Result<Decimal, WalletError> {
        spend::estimate_fee(
            &self.address_book,
            &self.utxo_fetcher,
            self.signer()?,
            receiver,
            amount,
        )
        .await
    }

    pub async fn send(&self, receiver: &str, amount: Decimal) -> Result<String, WalletError> {
        spend::send_payment(
            &self.address_book,
            &self.utxo_fetcher,
            self.signer()?,
            self.indexer.as_ref(),
            receiver,
            amount,
        )
        .await
    }
}
