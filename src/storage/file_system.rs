use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::{merge_into, most_recent_confirmed_in, newest_first, pending_in, WalletStore};
use crate::error::StorageError;
use crate::types::TxRecord;

const TRANSACTIONS_FILE: &str = "transactions.json";
const VALUES_FILE: &str = "values.json";

/// JSON files under `<base>/<wallet name>/`
pub struct FileStore {
    wallet_dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Open (creating if needed) the directory of wallet `name` under `base_path`
    pub fn open(base_path: &Path, name: &str) -> Result<Self, StorageError> {
        let wallet_dir = base_path.join(name);
        fs::create_dir_all(&wallet_dir)?;
        Ok(Self {
            wallet_dir,
            write_lock: Mutex::new(()),
        })
    }

    /// Open an existing wallet directory without creating it
    pub fn open_existing(base_path: &Path, name: &str) -> Result<Self, StorageError> {
        let wallet_dir = base_path.join(name);
        if !wallet_dir.is_dir() {
            return Err(StorageError::DirectoryNotFound(
                wallet_dir.display().to_string(),
            ));
        }
        Ok(Self {
            wallet_dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn wallet_exists(base_path: &Path, name: &str) -> bool {
        base_path.join(name).is_dir()
    }

    /// List all wallet names in the storage directory
    pub fn list_wallets(base_path: &Path) -> Result<Vec<String>, StorageError> {
        if !base_path.exists() {
            return Ok(Vec::new());
        }

        let mut wallets = Vec::new();
        for entry in fs::read_dir(base_path)? {
            let path = entry?.path();
            if path.is_dir() {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    wallets.push(name.to_string());
                }
            }
        }
        wallets.sort();
        Ok(wallets)
    }

    /// Delete a wallet and all its associated data from disk
    pub fn delete_wallet(base_path: &Path, name: &str) -> Result<(), StorageError> {
        let wallet_dir = base_path.join(name);
        if !wallet_dir.exists() {
            return Err(StorageError::DirectoryNotFound(
                wallet_dir.display().to_string(),
            ));
        }
        log::warn!("Deleting wallet directory: {:?}", wallet_dir);
        fs::remove_dir_all(&wallet_dir)?;
        Ok(())
    }

    pub fn wallet_dir(&self) -> &Path {
        &self.wallet_dir
    }

    fn read_json<T: DeserializeOwned + Default>(&self, file: &str) -> Result<T, StorageError> {
        let path = self.wallet_dir.join(file);
        if !path.exists() {
            return Ok(T::default());
        }
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Write through a sibling temp file so readers never see a torn file
    fn write_json<T: Serialize>(&self, file: &str, data: &T) -> Result<(), StorageError> {
        let path = self.wallet_dir.join(file);
        let tmp = self.wallet_dir.join(format!("{}.tmp", file));
        let json = serde_json::to_string_pretty(data)?;
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn load_table(&self) -> Result<HashMap<String, TxRecord>, StorageError> {
        let rows: Vec<TxRecord> = self.read_json(TRANSACTIONS_FILE)?;
        Ok(rows.into_iter().map(|r| (r.id.clone(), r)).collect())
    }
}

impl WalletStore for FileStore {
    fn get_value(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let mut values: HashMap<String, Value> = self.read_json(VALUES_FILE)?;
        Ok(values.remove(key))
    }

    fn set_value(&self, key: &str, value: Value) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().map_err(|_| StorageError::Poisoned)?;
        let mut values: HashMap<String, Value> = self.read_json(VALUES_FILE)?;
        values.insert(key.to_string(), value);
        self.write_json(VALUES_FILE, &values)
    }

    fn upsert_transactions(&self, records: Vec<TxRecord>) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().map_err(|_| StorageError::Poisoned)?;
        let mut table = self.load_table()?;
        let changed = merge_into(&mut table, records);
        if changed == 0 {
            return Ok(());
        }
        self.write_json(TRANSACTIONS_FILE, &newest_first(&table))?;
        log::debug!(
            "Persisted {} changed transaction(s) to {:?}",
            changed,
            self.wallet_dir
        );
        Ok(())
    }

    fn most_recent_confirmed(&self) -> Result<Option<TxRecord>, StorageError> {
        Ok(most_recent_confirmed_in(&self.load_table()?))
    }

    fn all_transactions(&self) -> Result<Vec<TxRecord>, StorageError> {
        Ok(newest_first(&self.load_table()?))
    }

    fn pending_transactions(&self) -> Result<Vec<TxRecord>, StorageError> {
        Ok(pending_in(&self.load_table()?))
    }
}
