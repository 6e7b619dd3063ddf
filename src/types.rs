//! Data model shared by the sync and accounting components

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Derivation chain of an address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    /// Receive addresses
    External,
    /// Change addresses
    Internal,
}

impl Chain {
    /// Chain number as used in `m/purpose'/coin'/account'/chain/index`
    pub fn as_u32(self) -> u32 {
        match self {
            Chain::External => 0,
            Chain::Internal => 1,
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Chain::External => write!(f, "external"),
            Chain::Internal => write!(f, "internal"),
        }
    }
}

/// Position of an address in the wallet's derivation tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DerivationPath {
    pub account: u32,
    pub chain: Chain,
    pub index: u32,
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}'/{}/{}", self.account, self.chain.as_u32(), self.index)
    }
}

/// A wallet address together with its derivation metadata.
///
/// Records are created once and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressRecord {
    pub address: String,
    pub account: u32,
    pub chain: Chain,
    pub index: u32,
}

impl AddressRecord {
    pub fn path(&self) -> DerivationPath {
        DerivationPath {
            account: self.account,
            chain: self.chain,
            index: self.index,
        }
    }
}

/// Unspent output owned by one of the wallet's addresses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    pub tx_id: String,
    pub output_index: u32,
    pub owner: String,
    pub value: Decimal,
    pub path: DerivationPath,
}

/// One side of a transaction: an address and the amount it sent or received
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxIo {
    pub address: String,
    pub amount: Decimal,
}

impl TxIo {
    pub fn new(address: impl Into<String>, amount: Decimal) -> Self {
        Self {
            address: address.into(),
            amount,
        }
    }
}

/// Ledger state of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxCondition {
    Pending,
    InBlock,
    Failed,
}

impl TxCondition {
    /// Map the indexer's `tx_state` string
    pub fn from_state(state: &str) -> Self {
        match state {
            "Successful" => TxCondition::InBlock,
            "Pending" => TxCondition::Pending,
            _ => TxCondition::Failed,
        }
    }
}

/// A persisted, classified transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxRecord {
    pub id: String,
    pub block_number: Option<u64>,
    pub inputs: Vec<TxIo>,
    pub outputs: Vec<TxIo>,
    pub timestamp: DateTime<Utc>,
    pub last_update: DateTime<Utc>,
    pub condition: TxCondition,
    pub is_outgoing: bool,
    pub net_amount: Decimal,
}

impl TxRecord {
    /// Whether `self` may overwrite `existing` in the transaction table.
    ///
    /// Records that made it into a block are frozen.
    pub fn may_replace(&self, existing: &TxRecord) -> bool {
        existing.condition != TxCondition::InBlock
    }

    pub fn is_confirmed(&self) -> bool {
        self.condition == TxCondition::InBlock
    }

    /// Recency ordering key: timestamp first, id breaks ties
    pub fn recency_key(&self) -> (DateTime<Utc>, &str) {
        (self.timestamp, self.id.as_str())
    }
}

/// Wallet metadata stored next to the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub network: String,
}
