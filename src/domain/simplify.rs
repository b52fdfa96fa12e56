use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap};

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use super::{Cents, LedgerError, NetBalances, UserId};

/// A payment that settles (part of) a debt. Produced by [`simplify`], never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub from_user: UserId,
    pub to_user: UserId,
    pub amount_cents: Cents,
}

/// Heap entry: largest magnitude first, lowest user id on ties.
#[derive(Debug, PartialEq, Eq)]
struct Party {
    magnitude: Cents,
    user_id: UserId,
}

impl Ord for Party {
    fn cmp(&self, other: &Self) -> Ordering {
        self.magnitude
            .cmp(&other.magnitude)
            .then_with(|| other.user_id.cmp(&self.user_id))
    }
}

impl PartialOrd for Party {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Reduce pairwise balances to a minimal list of payments.
pub fn simplify(balances: &NetBalances) -> Result<Vec<Transaction>, LedgerError> {
    simplify_positions(&balances.net_positions()?)
}

/// Settle per-user net positions (positive = owed money, negative = owes).
///
/// The largest debtor pays the largest creditor until everyone is square.
/// This emits at most `n - 1` transactions for `n` users with a non-zero
/// position, and each debtor pays exactly what they owe. Positions that do
/// not sum to zero are rejected rather than partially settled, and so are
/// positions whose totals do not fit in `Cents`.
pub fn simplify_positions(
    positions: &BTreeMap<UserId, Cents>,
) -> Result<Vec<Transaction>, LedgerError> {
    let mut debtors = BinaryHeap::new();
    let mut creditors = BinaryHeap::new();
    let mut owed: Cents = 0;
    let mut receivable: Cents = 0;

    for (&user_id, &net) in positions {
        match net.cmp(&0) {
            Ordering::Less => {
                let magnitude = net.checked_neg().ok_or(LedgerError::AmountOutOfRange)?;
                owed = owed
                    .checked_add(magnitude)
                    .ok_or(LedgerError::AmountOutOfRange)?;
                debtors.push(Party { magnitude, user_id });
            }
            Ordering::Greater => {
                receivable = receivable
                    .checked_add(net)
                    .ok_or(LedgerError::AmountOutOfRange)?;
                creditors.push(Party {
                    magnitude: net,
                    user_id,
                });
            }
            Ordering::Equal => {}
        }
    }

    if owed != receivable {
        error!(owed, receivable, "net positions do not reconcile");
        return Err(LedgerError::Reconciliation { owed, receivable });
    }

    let mut transactions = Vec::with_capacity(debtors.len() + creditors.len());

    while let (Some(debtor), Some(creditor)) = (debtors.pop(), creditors.pop()) {
        let amount_cents = debtor.magnitude.min(creditor.magnitude);
        debug!(
            from = %debtor.user_id,
            to = %creditor.user_id,
            amount_cents,
            "settling"
        );
        transactions.push(Transaction {
            from_user: debtor.user_id,
            to_user: creditor.user_id,
            amount_cents,
        });

        if debtor.magnitude > amount_cents {
            debtors.push(Party {
                magnitude: debtor.magnitude - amount_cents,
                user_id: debtor.user_id,
            });
        }
        if creditor.magnitude > amount_cents {
            creditors.push(Party {
                magnitude: creditor.magnitude - amount_cents,
                user_id: creditor.user_id,
            });
        }
    }

    Ok(transactions)
}
