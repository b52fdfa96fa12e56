use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Cents, GroupId, LedgerError, UserId};

pub type SettlementId = Uuid;

/// A recorded payment from one group member to another that reduces what
/// `from_user` owes `to_user`. Settlements are immutable once recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub id: SettlementId,
    pub group_id: GroupId,
    pub from_user: UserId,
    pub to_user: UserId,
    /// Amount in cents (always positive)
    pub amount_cents: Cents,
    pub created_at: DateTime<Utc>,
}

impl Settlement {
    pub fn new(
        group_id: GroupId,
        from_user: UserId,
        to_user: UserId,
        amount_cents: Cents,
    ) -> Result<Self, LedgerError> {
        if amount_cents <= 0 {
            return Err(LedgerError::InvalidAmount(amount_cents));
        }
        if from_user == to_user {
            return Err(LedgerError::InvalidSettlement(
                "cannot settle with yourself".to_string(),
            ));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            group_id,
            from_user,
            to_user,
            amount_cents,
            created_at: Utc::now(),
        })
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}
