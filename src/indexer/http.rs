use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{IndexerService, RawTransaction, RemoteUtxo};
use crate::error::IndexerError;

/// JSON client for the indexer's REST API
#[derive(Clone)]
pub struct HttpIndexer {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Serialize)]
struct AddressesRequest<'a> {
    addresses: &'a [String],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HistoryRequest<'a> {
    addresses: &'a [String],
    date_from: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tx_hash: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignedTxRequest {
    signed_tx: String,
}

#[derive(Deserialize)]
struct UtxoSumResponse {
    sum: Option<Decimal>,
}

#[derive(Deserialize)]
struct SubmitResponse {
    id: String,
}

impl HttpIndexer {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, IndexerError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        log::trace!("POST {}", url);

        let response = self.client.post(&url).json(body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::debug!("Indexer {} answered {}: {}", path, status, body);
            return Err(IndexerError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| IndexerError::Decode(format!("{}: {}", path, e)))
    }
}

#[async_trait]
impl IndexerService for HttpIndexer {
    async fn utxos_for_addresses(
        &self,
        addresses: &[String],
    ) -> Result<Vec<RemoteUtxo>, IndexerError> {
        self.post("/api/txs/utxoForAddresses", &AddressesRequest { addresses })
            .await
    }

    async fn utxo_sum_for_addresses(
        &self,
        addresses: &[String],
    ) -> Result<Option<Decimal>, IndexerError> {
        let response: UtxoSumResponse = self
            .post("/api/txs/utxoSumForAddresses", &AddressesRequest { addresses })
            .await?;
        Ok(response.sum)
    }

    async fn transaction_history(
        &self,
        addresses: &[String],
        date_from: DateTime<Utc>,
        after_tx_id: Option<&str>,
    ) -> Result<Vec<RawTransaction>, IndexerError> {
        let request = HistoryRequest {
            addresses,
            date_from,
            tx_hash: after_tx_id,
        };
        self.post("/api/txs/history", &request).await
    }

    async fn pending_transactions(
        &self,
        addresses: &[String],
    ) -> Result<Vec<RawTransaction>, IndexerError> {
        self.post("/api/txs/pending", &AddressesRequest { addresses })
            .await
    }

    async fn addresses_in_use(&self, addresses: &[String]) -> Result<Vec<String>, IndexerError> {
        self.post("/api/addresses/filterUsed", &AddressesRequest { addresses })
            .await
    }

    async fn submit_transaction(&self, encoded: &[u8]) -> Result<String, IndexerError> {
        let request = SignedTxRequest {
            signed_tx: hex::encode(encoded),
        };
        let response: SubmitResponse = self.post("/api/txs/signed", &request).await?;
        log::info!("Transaction submitted: {}", response.id);
        Ok(response.id)
    }
}
