use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::{Cents, Expense, GroupId, LedgerError, Settlement, UserId};

/// Unordered pair of users, stored with `low < high` so every debt between
/// the same two people lands on the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserPair {
    pub low: UserId,
    pub high: UserId,
}

impl UserPair {
    /// Normalise `(a, b)` and return the sign that turns an "a owes b" amount
    /// into a "low owes high" amount.
    pub fn oriented(a: UserId, b: UserId) -> (Self, i64) {
        if a <= b {
            (UserPair { low: a, high: b }, 1)
        } else {
            (UserPair { low: b, high: a }, -1)
        }
    }
}

/// Signed net balances per user pair. A positive value means `low` owes `high`.
///
/// Zero balances are never stored, so two ledgers that net out the same way
/// compare equal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetBalances {
    pairs: BTreeMap<UserPair, Cents>,
}

impl NetBalances {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `debtor` owes `creditor` another `amount_cents`.
    /// A negative amount reduces the debt.
    ///
    /// Fails with `AmountOutOfRange`, leaving the balances untouched, when the
    /// pair's balance would no longer fit in `Cents`.
    pub fn add_debt(
        &mut self,
        debtor: UserId,
        creditor: UserId,
        amount_cents: Cents,
    ) -> Result<(), LedgerError> {
        if debtor == creditor || amount_cents == 0 {
            return Ok(());
        }
        let (pair, sign) = UserPair::oriented(debtor, creditor);
        let current = self.pairs.get(&pair).copied().unwrap_or(0);
        let updated = amount_cents
            .checked_mul(sign)
            .and_then(|delta| current.checked_add(delta))
            .ok_or(LedgerError::AmountOutOfRange)?;
        if updated == 0 {
            self.pairs.remove(&pair);
        } else {
            self.pairs.insert(pair, updated);
        }
        Ok(())
    }

    /// The payer is owed every other participant's allocated share.
    pub fn apply_expense(&mut self, expense: &Expense) -> Result<(), LedgerError> {
        for allocation in expense.allocations()? {
            self.add_debt(allocation.user_id, expense.paid_by, allocation.amount_cents)?;
        }
        Ok(())
    }

    pub fn apply_settlement(&mut self, settlement: &Settlement) -> Result<(), LedgerError> {
        let repaid = settlement
            .amount_cents
            .checked_neg()
            .ok_or(LedgerError::AmountOutOfRange)?;
        self.add_debt(settlement.from_user, settlement.to_user, repaid)
    }

    /// How much `a` owes `b`; negative when `b` owes `a`.
    pub fn balance(&self, a: UserId, b: UserId) -> Cents {
        let (pair, sign) = UserPair::oriented(a, b);
        sign * self.pairs.get(&pair).copied().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (UserPair, Cents)> + '_ {
        self.pairs.iter().map(|(pair, amount)| (*pair, *amount))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn users(&self) -> BTreeSet<UserId> {
        self.pairs
            .keys()
            .flat_map(|pair| [pair.low, pair.high])
            .collect()
    }

    /// Every counterparty of `user_id` with what `user_id` owes them
    /// (negative when the counterparty owes `user_id`).
    pub fn counterparties(&self, user_id: UserId) -> Vec<(UserId, Cents)> {
        self.pairs
            .iter()
            .filter_map(|(pair, amount)| {
                if pair.low == user_id {
                    Some((pair.high, *amount))
                } else if pair.high == user_id {
                    Some((pair.low, -amount))
                } else {
                    None
                }
            })
            .collect()
    }

    /// Collapse pairwise balances into one figure per user:
    /// positive means the user is owed money, negative means they owe.
    pub fn net_positions(&self) -> Result<BTreeMap<UserId, Cents>, LedgerError> {
        let mut positions: BTreeMap<UserId, Cents> = BTreeMap::new();
        for (pair, amount) in &self.pairs {
            let low = positions.entry(pair.low).or_insert(0);
            *low = low.checked_sub(*amount).ok_or(LedgerError::AmountOutOfRange)?;
            let high = positions.entry(pair.high).or_insert(0);
            *high = high.checked_add(*amount).ok_or(LedgerError::AmountOutOfRange)?;
        }
        Ok(positions)
    }
}

/// Fold a group's expenses and settlements into net balances.
/// The result does not depend on the order of either list.
pub fn aggregate(
    expenses: &[Expense],
    settlements: &[Settlement],
) -> Result<NetBalances, LedgerError> {
    let mut balances = NetBalances::new();
    for expense in expenses {
        balances.apply_expense(expense)?;
    }
    for settlement in settlements {
        balances.apply_settlement(settlement)?;
    }
    Ok(balances)
}

/// Aggregate a mixed list of events into one set of balances per group.
pub fn aggregate_by_group(
    expenses: &[Expense],
    settlements: &[Settlement],
) -> Result<BTreeMap<GroupId, NetBalances>, LedgerError> {
    let mut groups: BTreeMap<GroupId, NetBalances> = BTreeMap::new();
    for expense in expenses {
        groups
            .entry(expense.group_id)
            .or_default()
            .apply_expense(expense)?;
    }
    for settlement in settlements {
        groups
            .entry(settlement.group_id)
            .or_default()
            .apply_settlement(settlement)?;
    }
    Ok(groups)
}
