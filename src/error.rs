use thiserror::Error;

/// Errors surfaced to callers of the wallet.
///
/// Transport and storage failures never escape raw; every sync stage wraps
/// them into one of the typed kinds below.
#[derive(Error, Debug)]
pub enum WalletError {
    #[error("Address discovery failed: {0}")]
    DiscoveryFailure(#[source] Box<WalletError>),

    #[error("Balance fetch failed: {0}")]
    BalanceFetchFailure(#[source] Box<WalletError>),

    #[error("Transaction history sync failed: {0}")]
    HistorySyncFailure(#[source] Box<WalletError>),

    #[error("Pending transaction refresh failed: {0}")]
    PendingRefreshFailure(#[source] Box<WalletError>),

    #[error("A sync cycle is already running for wallet {0}")]
    SyncInProgress(String),

    #[error("Wallet not found: {0}")]
    WalletNotFound(String),

    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Indexer error: {0}")]
    Indexer(#[from] IndexerError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Key derivation error: {0}")]
    Key(#[from] KeyError),

    #[error("Signing error: {0}")]
    Signing(#[from] SignError),

    #[error("Classification error: {0}")]
    Classify(#[from] ClassifyError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl WalletError {
    pub(crate) fn discovery(err: impl Into<WalletError>) -> Self {
        WalletError::DiscoveryFailure(Box::new(err.into()))
    }

    pub(crate) fn balance(err: impl Into<WalletError>) -> Self {
        WalletError::BalanceFetchFailure(Box::new(err.into()))
    }

    pub(crate) fn history(err: impl Into<WalletError>) -> Self {
        WalletError::HistorySyncFailure(Box::new(err.into()))
    }

    pub(crate) fn pending(err: impl Into<WalletError>) -> Self {
        WalletError::PendingRefreshFailure(Box::new(err.into()))
    }
}

#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Indexer returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed indexer response: {0}")]
    Decode(String),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Wallet directory not found: {0}")]
    DirectoryNotFound(String),

    #[error("Storage lock poisoned")]
    Poisoned,
}

#[derive(Error, Debug)]
pub enum KeyError {
    #[error("No key material available to derive addresses")]
    Unavailable,

    #[error("Derivation failed at {chain} index {index}: {reason}")]
    Derivation {
        chain: crate::types::Chain,
        index: u32,
        reason: String,
    },
}

/// Failures reported by the signing capability.
///
/// Callers branch on the variant, never on the message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignError {
    #[error("Inputs do not cover outputs and fee")]
    NotEnoughInput,

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Key derivation failed: {0}")]
    Derivation(String),

    #[error("{0}")]
    Other(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassifyError {
    #[error("Amount overflow while summing transaction {0}")]
    Overflow(&'static str),
}
