/// Transaction history synchronization
///
/// Two sub-cycles share the same chunking and classification:
///
/// - pending refresh: re-reads every pending transaction of the wallet and
///   settles stored pending rows the indexer stopped reporting, so their
///   outcome is picked up even behind the history cursor
/// - history sync: pages forward from the newest confirmed record, per
///   address chunk, and merges everything in one store call

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::try_join_all;

use crate::classify::classify;
use crate::error::WalletError;
use crate::indexer::{IndexerService, RawTransaction};
use crate::storage::{WalletStore, LAST_BLOCK_NUMBER_KEY};
use crate::types::{TxCondition, TxRecord};

pub struct TxHistorySync {
    indexer: Arc<dyn IndexerService>,
    store: Arc<dyn WalletStore>,
    addresses_limit: usize,
    transactions_limit: usize,
}

/// Outcome of one history sync cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistorySyncReport {
    /// Page requests issued across all chunks
    pub pages: usize,
    /// Raw transactions received, duplicates included
    pub fetched: usize,
    /// Distinct records handed to the store
    pub merged: usize,
    /// Watermark after the cycle
    pub last_block_number: Option<u64>,
}

/// Pagination position inside one chunk
#[derive(Debug, Clone, PartialEq, Eq)]
struct Cursor {
    date_from: DateTime<Utc>,
    last_seen_id: Option<String>,
}

struct ChunkHistory {
    transactions: Vec<RawTransaction>,
    pages: usize,
}

impl TxHistorySync {
    pub fn new(
        indexer: Arc<dyn IndexerService>,
        store: Arc<dyn WalletStore>,
        addresses_limit: usize,
        transactions_limit: usize,
    ) -> Self {
        Self {
            indexer,
            store,
            addresses_limit,
            transactions_limit,
        }
    }

    /// Persisted watermark, if any block was ever observed
    pub fn last_block_number(&self) -> Result<Option<u64>, WalletError> {
        let value = self.store.get_value(LAST_BLOCK_NUMBER_KEY)?;
        Ok(value.and_then(|v| v.as_u64()))
    }

    /// Re-read pending transactions of `addresses` and overwrite them by id
    pub async fn refresh_pending(
        &self,
        addresses: &[String],
        wallet: &HashSet<String>,
    ) -> Result<usize, WalletError> {
        self.refresh_pending_inner(addresses, wallet)
            .await
            .map_err(|e| {
                log::error!("Pending refresh failed: {}", e);
                WalletError::pending(e)
            })
    }

    async fn refresh_pending_inner(
        &self,
        addresses: &[String],
        wallet: &HashSet<String>,
    ) -> Result<usize, WalletError> {
        let queries = addresses
            .chunks(self.addresses_limit.max(1))
            .map(|chunk| self.indexer.pending_transactions(chunk));
        let raw: Vec<RawTransaction> = try_join_all(queries).await?.into_iter().flatten().collect();

        let mut records = dedup_by_id(to_records(&raw, wallet)?);

        let reported: HashSet<&str> = records.iter().map(|r| r.id.as_str()).collect();
        let stale: Vec<TxRecord> = self
            .store
            .pending_transactions()?
            .into_iter()
            .filter(|r| !reported.contains(r.id.as_str()))
            .collect();
        if !stale.is_empty() {
            let resolved = self.resolve_stale(stale, wallet).await?;
            records.extend(resolved);
        }

        let count = records.len();
        self.store.upsert_transactions(records)?;

        log::debug!("Refreshed {} pending transaction(s)", count);
        Ok(count)
    }

    /// Settle stored pending rows the indexer no longer reports as pending.
    ///
    /// Their history is re-read from the oldest stale timestamp so rows
    /// behind the history cursor still get their final state. A row the
    /// indexer no longer knows at all is marked failed.
    async fn resolve_stale(
        &self,
        stale: Vec<TxRecord>,
        wallet: &HashSet<String>,
    ) -> Result<Vec<TxRecord>, WalletError> {
        let date_from = stale
            .iter()
            .map(|r| r.timestamp)
            .min()
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

        let mut touched: Vec<String> = stale
            .iter()
            .flat_map(|r| r.inputs.iter().chain(r.outputs.iter()))
            .map(|io| io.address.clone())
            .filter(|address| wallet.contains(address))
            .collect();
        touched.sort();
        touched.dedup();

        let queries = touched
            .chunks(self.addresses_limit.max(1))
            .map(|chunk| self.fetch_chunk(chunk, date_from));
        let raw: Vec<RawTransaction> = try_join_all(queries)
            .await?
            .into_iter()
            .flat_map(|c| c.transactions)
            .collect();

        let stale_ids: HashSet<&str> = stale.iter().map(|r| r.id.as_str()).collect();
        let wanted: Vec<RawTransaction> = raw
            .into_iter()
            .filter(|tx| stale_ids.contains(tx.hash.as_str()))
            .collect();
        let mut found: HashMap<String, TxRecord> = dedup_by_id(to_records(&wanted, wallet)?)
            .into_iter()
            .map(|r| (r.id.clone(), r))
            .collect();

        let now = Utc::now();
        Ok(stale
            .into_iter()
            .map(|row| match found.remove(&row.id) {
                Some(record) => {
                    log::debug!("Pending {} resolved as {:?}", record.id, record.condition);
                    record
                }
                None => {
                    log::warn!("Pending {} vanished from the indexer, marking failed", row.id);
                    TxRecord {
                        condition: TxCondition::Failed,
                        last_update: now,
                        ..row
                    }
                }
            })
            .collect())
    }

    /// Run one incremental history cycle for the whole wallet
    pub async fn sync_history(
        &self,
        addresses: &[String],
        wallet: &HashSet<String>,
    ) -> Result<HistorySyncReport, WalletError> {
        self.sync_history_inner(addresses, wallet)
            .await
            .map_err(|e| {
                log::error!("History sync failed: {}", e);
                WalletError::history(e)
            })
    }

    async fn sync_history_inner(
        &self,
        addresses: &[String],
        wallet: &HashSet<String>,
    ) -> Result<HistorySyncReport, WalletError> {
        let date_from = self
            .store
            .most_recent_confirmed()?
            .map(|tx| tx.timestamp)
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        log::debug!("History cursor starts at {}", date_from);

        let queries = addresses
            .chunks(self.addresses_limit.max(1))
            .map(|chunk| self.fetch_chunk(chunk, date_from));
        let chunks = try_join_all(queries).await?;

        let pages: usize = chunks.iter().map(|c| c.pages).sum();
        let raw: Vec<RawTransaction> = chunks.into_iter().flat_map(|c| c.transactions).collect();
        let fetched = raw.len();

        let records = to_records(&raw, wallet)?;

        let last_block_number = self.bump_watermark(&records)?;

        let records = dedup_by_id(records);
        let merged = records.len();
        if merged > 0 {
            self.store.upsert_transactions(records)?;
        }

        log::info!(
            "History sync: {} page(s), {} fetched, {} merged, watermark {:?}",
            pages,
            fetched,
            merged,
            last_block_number
        );

        Ok(HistorySyncReport {
            pages,
            fetched,
            merged,
            last_block_number,
        })
    }

    /// Page through one chunk until a short page comes back.
    ///
    /// Pages run strictly one after another; each cursor comes from the
    /// previous page. The result keeps fetch order, page 1 first.
    async fn fetch_chunk(
        &self,
        chunk: &[String],
        date_from: DateTime<Utc>,
    ) -> Result<ChunkHistory, WalletError> {
        let mut cursor = Cursor {
            date_from,
            last_seen_id: None,
        };
        let mut transactions = Vec::new();
        let mut pages = 0;

        loop {
            let page = self
                .indexer
                .transaction_history(chunk, cursor.date_from, cursor.last_seen_id.as_deref())
                .await?;
            pages += 1;

            let full = page.len() >= self.transactions_limit;
            let next = page
                .iter()
                .max_by(|a, b| (a.timestamp(), &a.hash).cmp(&(b.timestamp(), &b.hash)))
                .map(|newest| Cursor {
                    date_from: newest.timestamp(),
                    last_seen_id: Some(newest.hash.clone()),
                });
            transactions.extend(page);

            let next = match next {
                Some(next) if full => next,
                _ => break,
            };
            if next == cursor {
                return Err(WalletError::Internal(format!(
                    "history cursor stuck at {:?} after {} page(s)",
                    next.last_seen_id, pages
                )));
            }
            log::trace!("Chunk page {} full, continuing after {:?}", pages, next.last_seen_id);
            cursor = next;
        }

        Ok(ChunkHistory {
            transactions,
            pages,
        })
    }

    /// Persist the highest block seen this cycle if it beats the stored one
    fn bump_watermark(&self, records: &[TxRecord]) -> Result<Option<u64>, WalletError> {
        let stored = self.last_block_number()?;
        let observed = records.iter().filter_map(|r| r.block_number).max();

        match (observed, stored) {
            (Some(observed), Some(stored)) if observed <= stored => Ok(Some(stored)),
            (Some(observed), _) => {
                self.store
                    .set_value(LAST_BLOCK_NUMBER_KEY, serde_json::Value::from(observed))?;
                log::debug!("Watermark {:?} -> {}", stored, observed);
                Ok(Some(observed))
            }
            (None, stored) => Ok(stored),
        }
    }
}

/// Classify raw transactions against the full wallet address set
pub fn to_records(
    raw: &[RawTransaction],
    wallet: &HashSet<String>,
) -> Result<Vec<TxRecord>, WalletError> {
    raw.iter().map(|tx| to_record(tx, wallet)).collect()
}

pub fn to_record(raw: &RawTransaction, wallet: &HashSet<String>) -> Result<TxRecord, WalletError> {
    let inputs = raw.inputs()?;
    let outputs = raw.outputs()?;
    let classification = classify(&inputs, &outputs, wallet)?;

    Ok(TxRecord {
        id: raw.hash.clone(),
        block_number: raw.block_num,
        inputs,
        outputs,
        timestamp: raw.timestamp(),
        last_update: raw.last_update,
        condition: raw.condition(),
        is_outgoing: classification.is_outgoing,
        net_amount: classification.net_amount,
    })
}

/// A transaction touching several chunks arrives once per chunk; keep the last copy
fn dedup_by_id(records: Vec<TxRecord>) -> Vec<TxRecord> {
    let mut order = Vec::new();
    let mut by_id: HashMap<String, TxRecord> = HashMap::new();
    for record in records {
        if !by_id.contains_key(&record.id) {
            order.push(record.id.clone());
        }
        by_id.insert(record.id.clone(), record);
    }
    order
        .into_iter()
        .filter_map(|id| by_id.remove(&id))
        .collect()
}
