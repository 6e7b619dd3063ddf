//! Remote indexer boundary
//!
//! - `IndexerService` trait consumed by the sync components
//! - Raw wire types and their conversion into the ledger model
//! - `HttpIndexer` JSON client

mod http;

pub use http::HttpIndexer;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::IndexerError;
use crate::types::{TxCondition, TxIo};

/// Queries the wallet needs from the indexer.
///
/// Every address slice passed in is at most `addresses_limit` long.
#[async_trait]
pub trait IndexerService: Send + Sync {
    async fn utxos_for_addresses(&self, addresses: &[String])
        -> Result<Vec<RemoteUtxo>, IndexerError>;

    /// Sum of the addresses' unspent outputs; `None` when they have none
    async fn utxo_sum_for_addresses(&self, addresses: &[String])
        -> Result<Option<Decimal>, IndexerError>;

    /// At most one page of transactions touching `addresses` with
    /// `timestamp >= date_from`, skipping up to and including `after_tx_id`.
    ///
    /// The indexer serves pages newest first. Callers must not rely on the
    /// order: the next cursor is the page's maximum `(timestamp, hash)`.
    async fn transaction_history(
        &self,
        addresses: &[String],
        date_from: DateTime<Utc>,
        after_tx_id: Option<&str>,
    ) -> Result<Vec<RawTransaction>, IndexerError>;

    async fn pending_transactions(&self, addresses: &[String])
        -> Result<Vec<RawTransaction>, IndexerError>;

    /// Subset of `addresses` that appear in any transaction
    async fn addresses_in_use(&self, addresses: &[String]) -> Result<Vec<String>, IndexerError>;

    /// Broadcast a signed transaction, returning its id
    async fn submit_transaction(&self, encoded: &[u8]) -> Result<String, IndexerError>;
}

/// Unspent output as reported by the indexer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteUtxo {
    pub utxo_id: String,
    pub tx_hash: String,
    pub tx_index: u32,
    pub receiver: String,
    pub amount: Decimal,
}

/// Transaction as reported by the indexer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTransaction {
    pub hash: String,
    pub block_num: Option<u64>,
    pub inputs_address: Vec<String>,
    pub inputs_amount: Vec<Decimal>,
    pub outputs_address: Vec<String>,
    pub outputs_amount: Vec<Decimal>,
    #[serde(default)]
    pub time: Option<DateTime<Utc>>,
    pub created_time: DateTime<Utc>,
    pub last_update: DateTime<Utc>,
    pub tx_state: String,
}

impl RawTransaction {
    /// Confirmation time, or creation time for transactions not yet in a block
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.time.unwrap_or(self.created_time)
    }

    pub fn condition(&self) -> TxCondition {
        TxCondition::from_state(&self.tx_state)
    }

    pub fn inputs(&self) -> Result<Vec<TxIo>, IndexerError> {
        zip_side(&self.hash, "inputs", &self.inputs_address, &self.inputs_amount)
    }

    pub fn outputs(&self) -> Result<Vec<TxIo>, IndexerError> {
        zip_side(&self.hash, "outputs", &self.outputs_address, &self.outputs_amount)
    }
}

fn zip_side(
    hash: &str,
    side: &str,
    addresses: &[String],
    amounts: &[Decimal],
) -> Result<Vec<TxIo>, IndexerError> {
    if addresses.len() != amounts.len() {
        return Err(IndexerError::Decode(format!(
            "transaction {} has {} {} addresses but {} amounts",
            hash,
            addresses.len(),
            side,
            amounts.len()
        )));
    }
    Ok(addresses
        .iter()
        .zip(amounts)
        .map(|(address, amount)| TxIo::new(address.clone(), *amount))
        .collect())
}
