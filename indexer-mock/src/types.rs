/// Indexer API request and response types
///
/// These types match the indexer's JSON format so clients can consume them transparently.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Body of every address-list endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressesRequest {
    pub addresses: Vec<String>,
}

/// Body of POST /api/txs/history
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRequest {
    pub addresses: Vec<String>,
    pub date_from: DateTime<Utc>,
    #[serde(default)]
    pub tx_hash: Option<String>,
}

/// Body of POST /api/txs/signed
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedTxRequest {
    pub signed_tx: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub id: String,
}

/// UTXO entry from /api/txs/utxoForAddresses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UtxoResponse {
    pub utxo_id: String,
    pub tx_hash: String,
    pub tx_index: u32,
    pub receiver: String,
    pub amount: Decimal,
}

/// Response of /api/txs/utxoSumForAddresses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UtxoSumResponse {
    pub sum: Option<Decimal>,
}

/// Transaction entry from /api/txs/history and /api/txs/pending
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TxResponse {
    pub hash: String,
    pub block_num: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_block_num: Option<u64>,
    pub inputs_address: Vec<String>,
    pub inputs_amount: Vec<Decimal>,
    pub outputs_address: Vec<String>,
    pub outputs_amount: Vec<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
    pub created_time: DateTime<Utc>,
    pub last_update: DateTime<Utc>,
    pub tx_state: String,
}

impl TxResponse {
    /// Time the history endpoint filters and orders on
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.time.unwrap_or(self.created_time)
    }

    pub fn touches(&self, address: &str) -> bool {
        self.inputs_address.iter().any(|a| a == address)
            || self.outputs_address.iter().any(|a| a == address)
    }
}
