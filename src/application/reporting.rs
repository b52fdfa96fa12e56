use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use uuid::Uuid;

use crate::domain::{Cents, Expense, GroupId, SplitType, User, UserId, format_cents};

// Amounts leave the engine as fixed two-digit decimal strings, never floats.
fn as_decimal<S: Serializer>(cents: &Cents, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_cents(*cents))
}

/// One payment of a group's settle-up plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionView {
    pub from_user_id: UserId,
    pub from_user_name: String,
    pub to_user_id: UserId,
    pub to_user_name: String,
    #[serde(rename = "amount", serialize_with = "as_decimal")]
    pub amount_cents: Cents,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupBalances {
    pub group_id: GroupId,
    pub group_name: String,
    pub transactions: Vec<TransactionView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterpartyView {
    pub user_id: UserId,
    pub user_name: String,
    #[serde(rename = "amount", serialize_with = "as_decimal")]
    pub amount_cents: Cents,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserBalances {
    pub user_id: UserId,
    pub user_name: String,
    pub owes: Vec<CounterpartyView>,
    pub owed_by: Vec<CounterpartyView>,
    #[serde(serialize_with = "as_decimal")]
    pub net_balance: Cents,
}

impl UserBalances {
    pub fn total_owing(&self) -> Cents {
        self.owes.iter().map(|c| c.amount_cents).sum()
    }

    pub fn total_owed(&self) -> Cents {
        self.owed_by.iter().map(|c| c.amount_cents).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationView {
    pub user_id: UserId,
    pub user_name: String,
    #[serde(rename = "amountOwed", serialize_with = "as_decimal")]
    pub amount_cents: Cents,
}

/// An expense with its per-participant shares resolved.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseDetails {
    pub id: Uuid,
    pub group_id: GroupId,
    pub description: String,
    #[serde(rename = "totalAmount", serialize_with = "as_decimal")]
    pub total_cents: Cents,
    pub paid_by: UserId,
    pub paid_by_name: String,
    pub split_type: SplitType,
    pub splits: Vec<AllocationView>,
    pub created_at: DateTime<Utc>,
}

impl ExpenseDetails {
    pub(crate) fn new(expense: &Expense, paid_by_name: String, splits: Vec<AllocationView>) -> Self {
        Self {
            id: expense.id,
            group_id: expense.group_id,
            description: expense.description.clone(),
            total_cents: expense.total_cents,
            paid_by: expense.paid_by,
            paid_by_name,
            split_type: expense.split.split_type(),
            splits,
            created_at: expense.created_at,
        }
    }
}

/// Group overview for `group show`.
#[derive(Debug, Clone)]
pub struct GroupInfo {
    pub group_id: GroupId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub members: Vec<User>,
    pub expense_count: usize,
    pub settlement_count: usize,
    pub total_spent: Cents,
}
