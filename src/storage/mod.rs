//! Storage and persistence layer
//!
//! - `WalletStore` boundary (scalar values + transaction table)
//! - In-memory and file system implementations
//! - Well-known scalar keys

mod file_system;
mod memory;

pub use file_system::FileStore;
pub use memory::MemoryStore;

use std::collections::HashMap;

use serde_json::Value;

use crate::error::StorageError;
use crate::types::{TxCondition, TxRecord};

pub const ADDRESSES_KEY: &str = "addresses";
pub const LAST_BLOCK_NUMBER_KEY: &str = "last_block_number";
pub const METADATA_KEY: &str = "metadata";
pub const BALANCE_KEY: &str = "balance";

/// Persistence boundary of one wallet.
///
/// `upsert_transactions` is all-or-nothing: when it fails none of the batch
/// is visible to later reads.
pub trait WalletStore: Send + Sync {
    fn get_value(&self, key: &str) -> Result<Option<Value>, StorageError>;

    fn set_value(&self, key: &str, value: Value) -> Result<(), StorageError>;

    /// Insert or replace records by id, honouring `TxRecord::may_replace`
    fn upsert_transactions(&self, records: Vec<TxRecord>) -> Result<(), StorageError>;

    /// Most recent confirmed record by timestamp
    fn most_recent_confirmed(&self) -> Result<Option<TxRecord>, StorageError>;

    /// All records, newest first
    fn all_transactions(&self) -> Result<Vec<TxRecord>, StorageError>;

    fn pending_transactions(&self) -> Result<Vec<TxRecord>, StorageError>;
}

/// Apply a batch to an id-keyed table, returning how many rows changed
pub(crate) fn merge_into(table: &mut HashMap<String, TxRecord>, records: Vec<TxRecord>) -> usize {
    let mut changed = 0;
    for record in records {
        match table.get(&record.id) {
            Some(existing) if !record.may_replace(existing) => {
                log::trace!("Keeping confirmed record {}", existing.id);
            }
            Some(existing) if existing == &record => {}
            _ => {
                table.insert(record.id.clone(), record);
                changed += 1;
            }
        }
    }
    changed
}

pub(crate) fn newest_first(table: &HashMap<String, TxRecord>) -> Vec<TxRecord> {
    let mut records: Vec<TxRecord> = table.values().cloned().collect();
    records.sort_by(|a, b| b.recency_key().cmp(&a.recency_key()));
    records
}

pub(crate) fn most_recent_confirmed_in(table: &HashMap<String, TxRecord>) -> Option<TxRecord> {
    table
        .values()
        .filter(|r| r.is_confirmed())
        .max_by(|a, b| a.recency_key().cmp(&b.recency_key()))
        .cloned()
}

pub(crate) fn pending_in(table: &HashMap<String, TxRecord>) -> Vec<TxRecord> {
    newest_first(table)
        .into_iter()
        .filter(|r| r.condition == TxCondition::Pending)
        .collect()
}
