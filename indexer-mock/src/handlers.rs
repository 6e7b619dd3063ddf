/// Axum HTTP handlers for the indexer API endpoints

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use crate::ledger::Ledger;
use crate::types::*;

/// Shared application state
pub type AppState = Arc<Ledger>;

/// Custom error type for handlers
pub enum ApiError {
    Unavailable,
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "indexer unavailable".to_string(),
            ),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, message).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err.to_string())
    }
}

fn ensure_up(ledger: &Ledger) -> Result<(), ApiError> {
    if ledger.is_failing() {
        return Err(ApiError::Unavailable);
    }
    Ok(())
}

/// POST /api/txs/utxoForAddresses
pub async fn utxo_for_addresses(
    State(ledger): State<AppState>,
    Json(req): Json<AddressesRequest>,
) -> Result<Json<Vec<UtxoResponse>>, ApiError> {
    ensure_up(&ledger)?;
    Ok(Json(ledger.utxos_for(&req.addresses)?))
}

/// POST /api/txs/utxoSumForAddresses
pub async fn utxo_sum_for_addresses(
    State(ledger): State<AppState>,
    Json(req): Json<AddressesRequest>,
) -> Result<Json<UtxoSumResponse>, ApiError> {
    ensure_up(&ledger)?;
    let sum = ledger.utxo_sum_for(&req.addresses)?;
    Ok(Json(UtxoSumResponse { sum }))
}

/// POST /api/txs/history
/// Returns at most one page, newest first
pub async fn history(
    State(ledger): State<AppState>,
    Json(req): Json<HistoryRequest>,
) -> Result<Json<Vec<TxResponse>>, ApiError> {
    ensure_up(&ledger)?;
    let page = ledger.history_page(&req.addresses, req.date_from, req.tx_hash.as_deref())?;
    log::debug!(
        "History page for {} address(es) from {}: {} tx(s)",
        req.addresses.len(),
        req.date_from,
        page.len()
    );
    Ok(Json(page))
}

/// POST /api/txs/pending
pub async fn pending(
    State(ledger): State<AppState>,
    Json(req): Json<AddressesRequest>,
) -> Result<Json<Vec<TxResponse>>, ApiError> {
    ensure_up(&ledger)?;
    Ok(Json(ledger.pending_for(&req.addresses)?))
}

/// POST /api/addresses/filterUsed
pub async fn filter_used(
    State(ledger): State<AppState>,
    Json(req): Json<AddressesRequest>,
) -> Result<Json<Vec<String>>, ApiError> {
    ensure_up(&ledger)?;
    Ok(Json(ledger.filter_used(&req.addresses)?))
}

/// POST /api/txs/signed
/// Accepts a hex-encoded signed transaction
pub async fn submit_signed(
    State(ledger): State<AppState>,
    Json(req): Json<SignedTxRequest>,
) -> Result<Json<SubmitResponse>, ApiError> {
    ensure_up(&ledger)?;
    if req.signed_tx.is_empty() || req.signed_tx.len() % 2 != 0 {
        return Err(ApiError::BadRequest("signedTx must be non-empty hex".into()));
    }
    let id = ledger.submit(req.signed_tx)?;
    log::info!("Accepted signed transaction {}", id);
    Ok(Json(SubmitResponse { id }))
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> &'static str {
    "OK"
}
