//! wallet-sync: transaction history and balance accounting for UTXO light wallets
//!
//! Keeps a wallet's local transaction ledger in step with a remote indexer,
//! classifies every transaction relative to the wallet's addresses and sums
//! the wallet's unspent outputs into an exact decimal balance.
//!
//! # Architecture
//!
//! - **AddressBook**: append-only address set, restoration discovery
//! - **UtxoFetcher / BalanceAggregator**: chunked UTXO and balance queries
//! - **TxHistorySync**: pending refresh and cursor-paginated history merge
//! - **SpendClassifier**: direction and net amount of a transaction
//! - **WalletManager**: refresh orchestration behind a per-wallet guard
//!
//! Key derivation, signing, the indexer and storage are injected through the
//! `KeyDeriver`, `TransactionSigner`, `IndexerService` and `WalletStore` traits.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use wallet_sync::{FileStore, HttpIndexer, SyncConfig, WalletManager, WatchOnly};
//!
//! let config = SyncConfig::from_env();
//! let store = Arc::new(FileStore::open(&config.data_dir, &config.wallet_name)?);
//! let indexer = Arc::new(HttpIndexer::new(config.indexer_url.clone()));
//! let manager = WalletManager::new("main", config, store, indexer, Arc::new(WatchOnly))?;
//!
//! let report = manager.refresh().await?;
//! println!("balance: {}", report.balance);
//! ```

pub mod address_book;
pub mod classify;
pub mod config;
pub mod error;
pub mod history;
pub mod indexer;
pub mod keys;
pub mod manager;
pub mod spend;
pub mod storage;
pub mod types;
pub mod utxo;

pub use address_book::AddressBook;
pub use classify::{classify, Classification};
pub use config::SyncConfig;
pub use error::{ClassifyError, IndexerError, KeyError, SignError, StorageError, WalletError};
pub use history::{HistorySyncReport, TxHistorySync};
pub use indexer::{HttpIndexer, IndexerService, RawTransaction, RemoteUtxo};
pub use keys::{KeyDeriver, SignedTransaction, SpendInput, SpendOutput, TransactionSigner, WatchOnly};
pub use manager::{RefreshReport, WalletManager};
pub use storage::{FileStore, MemoryStore, WalletStore};
pub use types::{AddressRecord, Chain, DerivationPath, Metadata, TxCondition, TxIo, TxRecord, Utxo};
pub use utxo::{BalanceAggregator, UtxoFetcher};

// Common result type
pub type Result<T> = std::result::Result<T, WalletError>;
