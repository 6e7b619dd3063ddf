//! Key capabilities the wallet consumes but does not implement.
//!
//! Address derivation and transaction signing live in an external crypto
//! module; the sync core only sees these two traits.

use crate::error::{KeyError, SignError};
use crate::types::{Chain, DerivationPath};
use rust_decimal::Decimal;
use std::ops::Range;

/// Derives addresses for an account
pub trait KeyDeriver: Send + Sync {
    /// Derive the addresses at `indices` on `chain`, in index order
    fn derive(&self, account: u32, chain: Chain, indices: Range<u32>)
        -> Result<Vec<String>, KeyError>;
}

/// Spendable input handed to the signer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpendInput {
    pub tx_id: String,
    pub output_index: u32,
    pub address: String,
    pub value: Decimal,
    pub path: DerivationPath,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpendOutput {
    pub address: String,
    pub value: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub encoded: Vec<u8>,
    pub fee: Decimal,
}

/// Builds, balances and signs a transaction
pub trait TransactionSigner: Send + Sync {
    fn sign(
        &self,
        inputs: &[SpendInput],
        outputs: &[SpendOutput],
        change_address: &str,
    ) -> Result<SignedTransaction, SignError>;
}

/// Deriver for processes that hold no key material.
///
/// Refreshing a persisted wallet never derives; allocating does and fails.
pub struct WatchOnly;

impl KeyDeriver for WatchOnly {
    fn derive(&self, _: u32, _: Chain, _: Range<u32>) -> Result<Vec<String>, KeyError> {
        Err(KeyError::Unavailable)
    }
}
