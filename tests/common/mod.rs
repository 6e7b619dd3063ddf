//! Common test utilities for wallet-sync integration tests
//!
//! This module provides shared test infrastructure including:
//! - A scripted in-process indexer with call recording and failure injection
//! - A deterministic key deriver and a fake signer
//! - Builders for raw indexer transactions

#![allow(dead_code)]

use std::collections::HashSet;
use std::ops::Range;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use wallet_sync::{
    Chain, IndexerError, IndexerService, KeyDeriver, KeyError, MemoryStore, RawTransaction,
    RemoteUtxo, SignError, SignedTransaction, SpendInput, SpendOutput, SyncConfig,
    TransactionSigner, WalletManager, WalletStore,
};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

/// Deterministic timestamp `secs` after a fixed base
pub fn ts(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
}

pub fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub fn address_set(items: &[&str]) -> HashSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Address the test deriver produces for `(chain, index)`
pub fn derived(chain: Chain, index: u32) -> String {
    format!("addr-{}-{}", chain.as_u32(), index)
}

// ============================================================================
// Transaction builders
// ============================================================================

fn side(items: &[(&str, &str)]) -> (Vec<String>, Vec<Decimal>) {
    items
        .iter()
        .map(|(address, amount)| (address.to_string(), dec(amount)))
        .unzip()
}

/// Confirmed transaction at `secs` in block `block`
pub fn confirmed(
    hash: &str,
    block: u64,
    secs: i64,
    inputs: &[(&str, &str)],
    outputs: &[(&str, &str)],
) -> RawTransaction {
    let (inputs_address, inputs_amount) = side(inputs);
    let (outputs_address, outputs_amount) = side(outputs);
    RawTransaction {
        hash: hash.to_string(),
        block_num: Some(block),
        inputs_address,
        inputs_amount,
        outputs_address,
        outputs_amount,
        time: Some(ts(secs)),
        created_time: ts(secs),
        last_update: ts(secs),
        tx_state: "Successful".to_string(),
    }
}

/// Pending transaction created at `secs`
pub fn pending(
    hash: &str,
    secs: i64,
    inputs: &[(&str, &str)],
    outputs: &[(&str, &str)],
) -> RawTransaction {
    let (inputs_address, inputs_amount) = side(inputs);
    let (outputs_address, outputs_amount) = side(outputs);
    RawTransaction {
        hash: hash.to_string(),
        block_num: None,
        inputs_address,
        inputs_amount,
        outputs_address,
        outputs_amount,
        time: None,
        created_time: ts(secs),
        last_update: ts(secs),
        tx_state: "Pending".to_string(),
    }
}

pub fn utxo(receiver: &str, tx_hash: &str, index: u32, amount: &str) -> RemoteUtxo {
    RemoteUtxo {
        utxo_id: format!("{}{}", tx_hash, index),
        tx_hash: tx_hash.to_string(),
        tx_index: index,
        receiver: receiver.to_string(),
        amount: dec(amount),
    }
}

fn touches(tx: &RawTransaction, addresses: &[String]) -> bool {
    tx.inputs_address
        .iter()
        .chain(tx.outputs_address.iter())
        .any(|a| addresses.contains(a))
}

// ============================================================================
// Scripted indexer
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryCall {
    pub addresses: Vec<String>,
    pub date_from: DateTime<Utc>,
    pub after: Option<String>,
}

/// Failure switches; a chunk fails when it contains the named address
#[derive(Debug, Clone, Default)]
pub struct Failures {
    pub history_for: Option<String>,
    pub utxos_for: Option<String>,
    pub sums_for: Option<String>,
    pub pending: bool,
    pub filter_used: bool,
    pub submit: bool,
}

#[derive(Default)]
struct Recorded {
    history: Vec<HistoryCall>,
    utxo_chunks: Vec<usize>,
    sum_chunks: Vec<usize>,
    filter_used_chunks: Vec<usize>,
    pending_chunks: Vec<usize>,
    submitted: Vec<Vec<u8>>,
}

/// In-process `IndexerService` backed by plain vectors
pub struct MockIndexer {
    page_size: usize,
    transactions: Mutex<Vec<RawTransaction>>,
    utxos: Mutex<Vec<RemoteUtxo>>,
    used: Mutex<HashSet<String>>,
    failures: Mutex<Failures>,
    recorded: Mutex<Recorded>,
    pending_delay: Mutex<Option<Duration>>,
    submissions: AtomicUsize,
}

impl MockIndexer {
    pub fn new(page_size: usize) -> Arc<Self> {
        Arc::new(Self {
            page_size,
            transactions: Mutex::new(Vec::new()),
            utxos: Mutex::new(Vec::new()),
            used: Mutex::new(HashSet::new()),
            failures: Mutex::new(Failures::default()),
            recorded: Mutex::new(Recorded::default()),
            pending_delay: Mutex::new(None),
            submissions: AtomicUsize::new(0),
        })
    }

    /// Add or replace (by hash) a transaction
    pub fn put(&self, tx: RawTransaction) {
        let mut txs = self.transactions.lock().unwrap();
        txs.retain(|t| t.hash != tx.hash);
        txs.push(tx);
    }

    /// Forget a transaction, as if the indexer dropped it
    pub fn remove(&self, hash: &str) {
        self.transactions.lock().unwrap().retain(|t| t.hash != hash);
    }

    pub fn add_utxo(&self, utxo: RemoteUtxo) {
        self.utxos.lock().unwrap().push(utxo);
    }

    pub fn mark_used(&self, address: &str) {
        self.used.lock().unwrap().insert(address.to_string());
    }

    pub fn fail(&self, update: impl FnOnce(&mut Failures)) {
        update(&mut self.failures.lock().unwrap());
    }

    pub fn heal(&self) {
        *self.failures.lock().unwrap() = Failures::default();
    }

    pub fn delay_pending(&self, delay: Duration) {
        *self.pending_delay.lock().unwrap() = Some(delay);
    }

    pub fn history_calls(&self) -> Vec<HistoryCall> {
        self.recorded.lock().unwrap().history.clone()
    }

    pub fn utxo_chunks(&self) -> Vec<usize> {
        self.recorded.lock().unwrap().utxo_chunks.clone()
    }

    pub fn sum_chunks(&self) -> Vec<usize> {
        self.recorded.lock().unwrap().sum_chunks.clone()
    }

    pub fn filter_used_chunks(&self) -> Vec<usize> {
        self.recorded.lock().unwrap().filter_used_chunks.clone()
    }

    pub fn pending_chunks(&self) -> Vec<usize> {
        self.recorded.lock().unwrap().pending_chunks.clone()
    }

    pub fn submitted(&self) -> Vec<Vec<u8>> {
        self.recorded.lock().unwrap().submitted.clone()
    }

    fn unavailable(endpoint: &str) -> IndexerError {
        IndexerError::Status {
            status: 503,
            body: format!("{} unavailable", endpoint),
        }
    }

    fn fails_for(target: &Option<String>, addresses: &[String]) -> bool {
        target.as_ref().map_or(false, |a| addresses.contains(a))
    }
}

#[async_trait]
impl IndexerService for MockIndexer {
    async fn utxos_for_addresses(
        &self,
        addresses: &[String],
    ) -> Result<Vec<RemoteUtxo>, IndexerError> {
        self.recorded.lock().unwrap().utxo_chunks.push(addresses.len());
        if Self::fails_for(&self.failures.lock().unwrap().utxos_for, addresses) {
            return Err(Self::unavailable("utxoForAddresses"));
        }
        Ok(self
            .utxos
            .lock()
            .unwrap()
            .iter()
            .filter(|u| addresses.contains(&u.receiver))
            .cloned()
            .collect())
    }

    async fn utxo_sum_for_addresses(
        &self,
        addresses: &[String],
    ) -> Result<Option<Decimal>, IndexerError> {
        self.recorded.lock().unwrap().sum_chunks.push(addresses.len());
        if Self::fails_for(&self.failures.lock().unwrap().sums_for, addresses) {
            return Err(Self::unavailable("utxoSumForAddresses"));
        }
        let owned: Vec<Decimal> = self
            .utxos
            .lock()
            .unwrap()
            .iter()
            .filter(|u| addresses.contains(&u.receiver))
            .map(|u| u.amount)
            .collect();
        if owned.is_empty() {
            return Ok(None);
        }
        Ok(Some(owned.into_iter().sum()))
    }

    async fn transaction_history(
        &self,
        addresses: &[String],
        date_from: DateTime<Utc>,
        after_tx_id: Option<&str>,
    ) -> Result<Vec<RawTransaction>, IndexerError> {
        self.recorded.lock().unwrap().history.push(HistoryCall {
            addresses: addresses.to_vec(),
            date_from,
            after: after_tx_id.map(str::to_string),
        });
        if Self::fails_for(&self.failures.lock().unwrap().history_for, addresses) {
            return Err(Self::unavailable("history"));
        }

        let txs = self.transactions.lock().unwrap();
        let mut matching: Vec<&RawTransaction> = txs
            .iter()
            .filter(|t| touches(t, addresses))
            .filter(|t| t.timestamp() >= date_from)
            .collect();
        matching.sort_by(|a, b| (a.timestamp(), &a.hash).cmp(&(b.timestamp(), &b.hash)));

        let start = after_tx_id
            .and_then(|hash| matching.iter().position(|t| t.hash == hash))
            .map(|i| i + 1)
            .unwrap_or(0);

        // Served newest first, like the real indexer
        let mut page: Vec<RawTransaction> = matching
            .into_iter()
            .skip(start)
            .take(self.page_size)
            .cloned()
            .collect();
        page.reverse();
        Ok(page)
    }

    async fn pending_transactions(
        &self,
        addresses: &[String],
    ) -> Result<Vec<RawTransaction>, IndexerError> {
        self.recorded.lock().unwrap().pending_chunks.push(addresses.len());
        let delay = *self.pending_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failures.lock().unwrap().pending {
            return Err(Self::unavailable("pending"));
        }
        Ok(self
            .transactions
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.tx_state == "Pending")
            .filter(|t| touches(t, addresses))
            .cloned()
            .collect())
    }

    async fn addresses_in_use(&self, addresses: &[String]) -> Result<Vec<String>, IndexerError> {
        self.recorded
            .lock()
            .unwrap()
            .filter_used_chunks
            .push(addresses.len());
        if self.failures.lock().unwrap().filter_used {
            return Err(Self::unavailable("filterUsed"));
        }
        let used = self.used.lock().unwrap();
        Ok(addresses
            .iter()
            .filter(|a| used.contains(*a))
            .cloned()
            .collect())
    }

    async fn submit_transaction(&self, encoded: &[u8]) -> Result<String, IndexerError> {
        if self.failures.lock().unwrap().submit {
            return Err(Self::unavailable("signed"));
        }
        self.recorded.lock().unwrap().submitted.push(encoded.to_vec());
        let n = self.submissions.fetch_add(1, Ordering::SeqCst);
        Ok(format!("tx-{}", n))
    }
}

// ============================================================================
// Keys
// ============================================================================

/// Derives `addr-<chain>-<index>`; optionally fails at or past an index
#[derive(Default)]
pub struct TestDeriver {
    fail_from: Option<u32>,
    highest: Mutex<Option<u32>>,
}

impl TestDeriver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_from(index: u32) -> Arc<Self> {
        Arc::new(Self {
            fail_from: Some(index),
            highest: Mutex::new(None),
        })
    }

    /// Highest index ever requested
    pub fn highest_derived(&self) -> Option<u32> {
        *self.highest.lock().unwrap()
    }
}

impl KeyDeriver for TestDeriver {
    fn derive(&self, _account: u32, chain: Chain, indices: Range<u32>) -> Result<Vec<String>, KeyError> {
        if let Some(last) = indices.clone().last() {
            let mut highest = self.highest.lock().unwrap();
            *highest = Some(highest.map_or(last, |h| h.max(last)));
        }
        if let Some(fail_from) = self.fail_from {
            if indices.end > fail_from {
                return Err(KeyError::Derivation {
                    chain,
                    index: fail_from,
                    reason: "test deriver refuses".to_string(),
                });
            }
        }
        Ok(indices.map(|i| derived(chain, i)).collect())
    }
}

/// Signer charging a flat fee; encodes the receiver list
pub struct FakeSigner {
    pub fee: Decimal,
}

impl TransactionSigner for FakeSigner {
    fn sign(
        &self,
        inputs: &[SpendInput],
        outputs: &[SpendOutput],
        change_address: &str,
    ) -> Result<SignedTransaction, SignError> {
        let available: Decimal = inputs.iter().map(|i| i.value).sum();
        let wanted: Decimal = outputs.iter().map(|o| o.value).sum::<Decimal>() + self.fee;
        if available < wanted {
            return Err(SignError::NotEnoughInput);
        }
        let receivers: Vec<&str> = outputs.iter().map(|o| o.address.as_str()).collect();
        Ok(SignedTransaction {
            encoded: format!("{}|{}", receivers.join(","), change_address).into_bytes(),
            fee: self.fee,
        })
    }
}

// ============================================================================
// Wiring
// ============================================================================

pub fn test_config(addresses_limit: usize, transactions_limit: usize) -> SyncConfig {
    SyncConfig {
        addresses_limit,
        transactions_limit,
        discovery_batch_size: 3,
        ..SyncConfig::default()
    }
}

/// Manager over a fresh memory store
pub fn memory_manager(
    config: SyncConfig,
    indexer: Arc<MockIndexer>,
    deriver: Arc<TestDeriver>,
) -> (WalletManager, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let manager = WalletManager::new(
        "test-wallet",
        config,
        store.clone() as Arc<dyn WalletStore>,
        indexer as Arc<dyn IndexerService>,
        deriver as Arc<dyn KeyDeriver>,
    )
    .unwrap();
    (manager, store)
}
