use thiserror::Error;

use crate::domain::{Cents, LedgerError};
use crate::storage::StoreError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("User already exists: {0}")]
    UserAlreadyExists(String),

    #[error("Group not found: {0}")]
    GroupNotFound(String),

    #[error("Group already exists: {0}")]
    GroupAlreadyExists(String),

    #[error("Expense not found: {0}")]
    ExpenseNotFound(String),

    #[error("{user} is not a member of group {group}")]
    NotAMember { user: String, group: String },

    #[error("{user} is already a member of group {group}")]
    AlreadyMember { user: String, group: String },

    #[error(
        "{user} still has unsettled balances with {counterparties} member(s) of group {group} (net {balance} cents)"
    )]
    OutstandingBalance {
        user: String,
        group: String,
        balance: Cents,
        counterparties: usize,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Ledger store error: {0}")]
    Store(#[from] StoreError),
}
