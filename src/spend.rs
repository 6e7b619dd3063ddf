//! Fee estimation and sending

use rust_decimal::Decimal;

use crate::address_book::AddressBook;
use crate::error::{SignError, WalletError};
use crate::indexer::IndexerService;
use crate::keys::{SignedTransaction, SpendInput, SpendOutput, TransactionSigner};
use crate::types::Chain;
use crate::utxo::UtxoFetcher;

/// Everything the signer needs for one payment
#[derive(Debug, Clone)]
pub struct SpendPlan {
    pub inputs: Vec<SpendInput>,
    pub outputs: Vec<SpendOutput>,
    pub change_address: String,
}

/// Offer every UTXO of the wallet as input; the signer picks and balances
pub async fn plan_payment(
    book: &AddressBook,
    fetcher: &UtxoFetcher,
    receiver: &str,
    amount: Decimal,
) -> Result<SpendPlan, WalletError> {
    if amount <= Decimal::ZERO {
        return Err(WalletError::InvalidInput(format!(
            "amount must be positive, got {}",
            amount
        )));
    }
    if receiver.trim().is_empty() {
        return Err(WalletError::InvalidInput("receiver address is empty".into()));
    }

    let addresses = book.all()?;
    let change_address = addresses
        .iter()
        .find(|r| r.chain == Chain::External)
        .or_else(|| addresses.first())
        .map(|r| r.address.clone())
        .ok_or_else(|| WalletError::InvalidInput("wallet has no addresses".into()))?;

    let utxos = fetcher.fetch_utxos(&addresses).await?;
    if utxos.is_empty() {
        return Err(WalletError::InsufficientFunds(
            "No UTXOs available to spend".to_string(),
        ));
    }

    let inputs = utxos
        .into_iter()
        .map(|u| SpendInput {
            tx_id: u.tx_id,
            output_index: u.output_index,
            address: u.owner,
            value: u.value,
            path: u.path,
        })
        .collect();

    Ok(SpendPlan {
        inputs,
        outputs: vec![SpendOutput {
            address: receiver.to_string(),
            value: amount,
        }],
        change_address,
    })
}

fn sign_plan(signer: &dyn TransactionSigner, plan: &SpendPlan) -> Result<SignedTransaction, WalletError> {
    signer
        .sign(&plan.inputs, &plan.outputs, &plan.change_address)
        .map_err(|e| match e {
            SignError::NotEnoughInput => {
                let available: Decimal = plan.inputs.iter().map(|i| i.value).sum();
                WalletError::InsufficientFunds(format!(
                    "available {} does not cover the payment and its fee",
                    available
                ))
            }
            other => WalletError::Signing(other),
        })
}

/// Fee the signer would charge for paying `amount` to `receiver`
pub async fn estimate_fee(
    book: &AddressBook,
    fetcher: &UtxoFetcher,
    signer: &dyn TransactionSigner,
    receiver: &str,
    amount: Decimal,
) -> Result<Decimal, WalletError> {
    let plan = plan_payment(book, fetcher, receiver, amount).await?;
    let signed = sign_plan(signer, &plan)?;
    log::debug!("Estimated fee for {} to {}: {}", amount, receiver, signed.fee);
    Ok(signed.fee)
}

/// Sign and broadcast a payment, returning the transaction id
pub async fn send_payment(
    book: &AddressBook,
    fetcher: &UtxoFetcher,
    signer: &dyn TransactionSigner,
    indexer: &dyn IndexerService,
    receiver: &str,
    amount: Decimal,
) -> Result<String, WalletError> {
    log::info!("Sending {} to {}", amount, receiver);

    let plan = plan_payment(book, fetcher, receiver, amount).await?;
    let signed = sign_plan(signer, &plan)?;
    let tx_id = indexer.submit_transaction(&signed.encoded).await?;

    log::info!("Payment sent - txid: {}, fee: {}", tx_id, signed.fee);
    Ok(tx_id)
}
