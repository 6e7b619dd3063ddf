//! Spend classification: direction and net amount of a transaction
//! relative to the wallet's address set.

use crate::error::ClassifyError;
use crate::types::TxIo;
use rust_decimal::Decimal;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub is_outgoing: bool,
    pub net_amount: Decimal,
}

/// Sum of wallet-owned amounts on one side of a transaction
struct OwnedSum {
    total: Decimal,
    count: usize,
}

fn owned_sum(
    side: &[TxIo],
    wallet: &HashSet<String>,
    label: &'static str,
) -> Result<OwnedSum, ClassifyError> {
    side.iter()
        .filter(|io| wallet.contains(&io.address))
        .try_fold(
            OwnedSum {
                total: Decimal::ZERO,
                count: 0,
            },
            |acc, io| {
                let total = acc
                    .total
                    .checked_add(io.amount)
                    .ok_or(ClassifyError::Overflow(label))?;
                Ok(OwnedSum {
                    total,
                    count: acc.count + 1,
                })
            },
        )
}

/// Classify a transaction against the complete wallet address set.
///
/// Ties go to outgoing, so a self-transaction that returns every coin
/// to the wallet reports `is_outgoing = true` with a zero net amount.
pub fn classify(
    inputs: &[TxIo],
    outputs: &[TxIo],
    wallet: &HashSet<String>,
) -> Result<Classification, ClassifyError> {
    let outgoing = owned_sum(inputs, wallet, "inputs")?;
    let incoming = owned_sum(outputs, wallet, "outputs")?;

    let is_self = outgoing.count == inputs.len() && incoming.count == outputs.len();
    let is_outgoing = outgoing.total >= incoming.total;

    let net_amount = if is_outgoing || is_self {
        outgoing.total.checked_sub(incoming.total)
    } else {
        incoming.total.checked_sub(outgoing.total)
    }
    .ok_or(ClassifyError::Overflow("net amount"))?;

    Ok(Classification {
        is_outgoing,
        net_amount,
    })
}
