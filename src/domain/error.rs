use thiserror::Error;

use super::Cents;

/// Failures of the pure split/settlement engine.
///
/// `InvalidAmount`, `InvalidSplit`, `SplitMismatch` and `InvalidSettlement` are
/// caller-input errors and are raised before anything is written.
/// `Reconciliation` is a data-integrity fault in the ledger being reduced.
/// `AmountOutOfRange` means a running balance no longer fits in `Cents`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("Invalid amount: {0} (must be positive)")]
    InvalidAmount(Cents),

    #[error("Invalid split: {0}")]
    InvalidSplit(String),

    #[error("Split does not add up: expected {expected}, got {actual}")]
    SplitMismatch { expected: i64, actual: i64 },

    #[error("Invalid settlement: {0}")]
    InvalidSettlement(String),

    #[error("Amount out of range: balances would overflow")]
    AmountOutOfRange,

    #[error("Ledger does not reconcile: debtors owe {owed}, creditors are owed {receivable}")]
    Reconciliation { owed: Cents, receivable: Cents },
}
