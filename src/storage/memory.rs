use std::collections::HashMap;
use std::sync::RwLock;

use serde_json::Value;

use super::{merge_into, most_recent_confirmed_in, newest_first, pending_in, WalletStore};
use crate::error::StorageError;
use crate::types::TxRecord;

/// Volatile store, used by tests and short-lived processes
#[derive(Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, Value>>,
    transactions: RwLock<HashMap<String, TxRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WalletStore for MemoryStore {
    fn get_value(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let values = self.values.read().map_err(|_| StorageError::Poisoned)?;
        Ok(values.get(key).cloned())
    }

    fn set_value(&self, key: &str, value: Value) -> Result<(), StorageError> {
        let mut values = self.values.write().map_err(|_| StorageError::Poisoned)?;
        values.insert(key.to_string(), value);
        Ok(())
    }

    fn upsert_transactions(&self, records: Vec<TxRecord>) -> Result<(), StorageError> {
        let mut table = self
            .transactions
            .write()
            .map_err(|_| StorageError::Poisoned)?;
        let changed = merge_into(&mut table, records);
        log::trace!("Memory store: {} transaction row(s) changed", changed);
        Ok(())
    }

    fn most_recent_confirmed(&self) -> Result<Option<TxRecord>, StorageError> {
        let table = self.transactions.read().map_err(|_| StorageError::Poisoned)?;
        Ok(most_recent_confirmed_in(&table))
    }

    fn all_transactions(&self) -> Result<Vec<TxRecord>, StorageError> {
        let table = self.transactions.read().map_err(|_| StorageError::Poisoned)?;
        Ok(newest_first(&table))
    }

    fn pending_transactions(&self) -> Result<Vec<TxRecord>, StorageError> {
        let table = self.transactions.read().map_err(|_| StorageError::Poisoned)?;
        Ok(pending_in(&table))
    }
}
