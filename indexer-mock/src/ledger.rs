/// In-memory ledger behind the mock indexer
///
/// Tests seed it with transactions and UTXOs, then point a client at the
/// server. Request counters let tests assert on chunking and paging.

use std::collections::HashSet;
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::types::*;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestCounts {
    pub utxos: usize,
    pub utxo_sums: usize,
    pub history: usize,
    pub pending: usize,
    pub filter_used: usize,
    pub submitted: usize,
}

#[derive(Default)]
struct State {
    transactions: Vec<TxResponse>,
    utxos: Vec<UtxoResponse>,
    submitted: Vec<String>,
    counts: RequestCounts,
    failing: bool,
}

pub struct Ledger {
    page_size: usize,
    state: Mutex<State>,
}

impl Ledger {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size,
            state: Mutex::new(State::default()),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, State>> {
        self.state.lock().map_err(|_| anyhow!("ledger lock poisoned"))
    }

    /// Add or replace (by hash) a transaction
    pub fn put_transaction(&self, tx: TxResponse) -> Result<()> {
        let mut state = self.lock()?;
        state.transactions.retain(|t| t.hash != tx.hash);
        state.transactions.push(tx);
        Ok(())
    }

    pub fn add_utxo(&self, utxo: UtxoResponse) -> Result<()> {
        self.lock()?.utxos.push(utxo);
        Ok(())
    }

    /// Make every API endpoint answer 503 until switched back
    pub fn set_failing(&self, failing: bool) -> Result<()> {
        self.lock()?.failing = failing;
        Ok(())
    }

    pub fn is_failing(&self) -> bool {
        self.lock().map(|s| s.failing).unwrap_or(true)
    }

    pub fn counts(&self) -> RequestCounts {
        self.lock().map(|s| s.counts).unwrap_or_default()
    }

    pub fn submitted(&self) -> Vec<String> {
        self.lock().map(|s| s.submitted.clone()).unwrap_or_default()
    }

    pub fn utxos_for(&self, addresses: &[String]) -> Result<Vec<UtxoResponse>> {
        let mut state = self.lock()?;
        state.counts.utxos += 1;
        let wanted: HashSet<&String> = addresses.iter().collect();
        Ok(state
            .utxos
            .iter()
            .filter(|u| wanted.contains(&u.receiver))
            .cloned()
            .collect())
    }

    pub fn utxo_sum_for(&self, addresses: &[String]) -> Result<Option<Decimal>> {
        let mut state = self.lock()?;
        state.counts.utxo_sums += 1;
        let wanted: HashSet<&String> = addresses.iter().collect();
        let owned: Vec<Decimal> = state
            .utxos
            .iter()
            .filter(|u| wanted.contains(&u.receiver))
            .map(|u| u.amount)
            .collect();
        if owned.is_empty() {
            return Ok(None);
        }
        Ok(Some(owned.into_iter().sum()))
    }

    /// One page of history, returned newest first.
    ///
    /// The page holds the oldest matches strictly after `(date_from, tx_hash)`
    /// when a hash is given, so the newest record of a page is the cursor for
    /// the next one.
    pub fn history_page(
        &self,
        addresses: &[String],
        date_from: DateTime<Utc>,
        tx_hash: Option<&str>,
    ) -> Result<Vec<TxResponse>> {
        let mut state = self.lock()?;
        state.counts.history += 1;

        let mut matching: Vec<&TxResponse> = state
            .transactions
            .iter()
            .filter(|t| addresses.iter().any(|a| t.touches(a)))
            .filter(|t| t.timestamp() >= date_from)
            .collect();
        matching.sort_by(|a, b| (a.timestamp(), &a.hash).cmp(&(b.timestamp(), &b.hash)));

        let start = match tx_hash {
            Some(hash) => matching
                .iter()
                .position(|t| t.hash == hash)
                .map(|i| i + 1)
                .unwrap_or(0),
            None => 0,
        };

        let mut page: Vec<TxResponse> = matching
            .into_iter()
            .skip(start)
            .take(self.page_size)
            .cloned()
            .collect();
        page.reverse();
        Ok(page)
    }

    pub fn pending_for(&self, addresses: &[String]) -> Result<Vec<TxResponse>> {
        let mut state = self.lock()?;
        state.counts.pending += 1;
        Ok(state
            .transactions
            .iter()
            .filter(|t| t.tx_state == "Pending")
            .filter(|t| addresses.iter().any(|a| t.touches(a)))
            .cloned()
            .collect())
    }

    pub fn filter_used(&self, addresses: &[String]) -> Result<Vec<String>> {
        let mut state = self.lock()?;
        state.counts.filter_used += 1;
        Ok(addresses
            .iter()
            .filter(|a| state.transactions.iter().any(|t| t.touches(a)))
            .cloned()
            .collect())
    }

    pub fn submit(&self, signed_tx: String) -> Result<String> {
        let mut state = self.lock()?;
        state.counts.submitted += 1;
        let id = format!("submitted-{}", state.submitted.len());
        state.submitted.push(signed_tx);
        Ok(id)
    }
}
