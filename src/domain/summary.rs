use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{Cents, LedgerError, NetBalances, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counterparty {
    pub user_id: UserId,
    pub amount_cents: Cents,
}

/// Where one user stands across every group they belong to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSummary {
    pub user_id: UserId,
    /// People this user owes, largest debt first
    pub owes: Vec<Counterparty>,
    /// People who owe this user, largest first
    pub owed_by: Vec<Counterparty>,
    /// `sum(owed_by) - sum(owes)`
    pub net_balance: Cents,
}

impl BalanceSummary {
    pub fn total_owing(&self) -> Cents {
        self.owes.iter().map(|c| c.amount_cents).sum()
    }

    pub fn total_owed(&self) -> Cents {
        self.owed_by.iter().map(|c| c.amount_cents).sum()
    }

    pub fn is_settled(&self) -> bool {
        self.owes.is_empty() && self.owed_by.is_empty()
    }
}

/// Summarise `user_id`'s position over the balances of all their groups.
/// Debts to the same counterparty in different groups are netted.
pub fn summarize<'a, I>(user_id: UserId, groups: I) -> Result<BalanceSummary, LedgerError>
where
    I: IntoIterator<Item = &'a NetBalances>,
{
    let mut per_counterparty: BTreeMap<UserId, Cents> = BTreeMap::new();
    for balances in groups {
        for (other, owed) in balances.counterparties(user_id) {
            let entry = per_counterparty.entry(other).or_insert(0);
            *entry = entry.checked_add(owed).ok_or(LedgerError::AmountOutOfRange)?;
        }
    }

    let mut owes = Vec::new();
    let mut owed_by = Vec::new();
    for (other, owed) in per_counterparty {
        if owed > 0 {
            owes.push(Counterparty {
                user_id: other,
                amount_cents: owed,
            });
        } else if owed < 0 {
            owed_by.push(Counterparty {
                user_id: other,
                amount_cents: owed.checked_neg().ok_or(LedgerError::AmountOutOfRange)?,
            });
        }
    }

    // BTreeMap iteration already ordered ties by id; the sort is stable.
    owes.sort_by(|a, b| b.amount_cents.cmp(&a.amount_cents));
    owed_by.sort_by(|a, b| b.amount_cents.cmp(&a.amount_cents));

    let total = |entries: &[Counterparty]| {
        entries
            .iter()
            .try_fold(0, |sum: Cents, c| sum.checked_add(c.amount_cents))
            .ok_or(LedgerError::AmountOutOfRange)
    };
    let net_balance = total(&owed_by)?
        .checked_sub(total(&owes)?)
        .ok_or(LedgerError::AmountOutOfRange)?;

    Ok(BalanceSummary {
        user_id,
        owes,
        owed_by,
        net_balance,
    })
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::domain::simplify;

    fn user(n: u128) -> UserId {
        Uuid::from_u128(n)
    }

    #[test]
    fn test_summary_lists_sorted_by_amount() {
        let (me, b, c, d) = (user(1), user(2), user(3), user(4));
        let mut balances = NetBalances::new();
        balances.add_debt(me, b, 1000).unwrap();
        balances.add_debt(me, c, 2500).unwrap();
        balances.add_debt(d, me, 400).unwrap();

        let summary = summarize(me, [&balances]).unwrap();

        assert_eq!(
            summary.owes,
            vec![
                Counterparty { user_id: c, amount_cents: 2500 },
                Counterparty { user_id: b, amount_cents: 1000 },
            ]
        );
        assert_eq!(
            summary.owed_by,
            vec![Counterparty { user_id: d, amount_cents: 400 }]
        );
        assert_eq!(summary.total_owing(), 3500);
        assert_eq!(summary.total_owed(), 400);
        assert_eq!(summary.net_balance, -3100);
    }

    #[test]
    fn test_summary_nets_across_groups() {
        let (me, b) = (user(1), user(2));
        let mut trip = NetBalances::new();
        trip.add_debt(me, b, 1000).unwrap();
        let mut flat = NetBalances::new();
        flat.add_debt(b, me, 400).unwrap();

        let summary = summarize(me, [&trip, &flat]).unwrap();

        assert_eq!(
            summary.owes,
            vec![Counterparty { user_id: b, amount_cents: 600 }]
        );
        assert!(summary.owed_by.is_empty());
        assert_eq!(summary.net_balance, -600);
    }

    #[test]
    fn test_summary_for_uninvolved_user_is_settled() {
        let mut balances = NetBalances::new();
        balances.add_debt(user(1), user(2), 1000).unwrap();

        let summary = summarize(user(9), [&balances]).unwrap();

        assert!(summary.is_settled());
        assert_eq!(summary.net_balance, 0);
    }

    #[test]
    fn test_summary_matches_simplified_payments_for_one_group() {
        let (a, b, c) = (user(1), user(2), user(3));
        let mut balances = NetBalances::new();
        balances.add_debt(a, b, 3000).unwrap();
        balances.add_debt(b, c, 1000).unwrap();
        balances.add_debt(c, a, 500).unwrap();

        let transactions = simplify(&balances).unwrap();

        for user_id in [a, b, c] {
            let incoming: Cents = transactions
                .iter()
                .filter(|t| t.to_user == user_id)
                .map(|t| t.amount_cents)
                .sum();
            let outgoing: Cents = transactions
                .iter()
                .filter(|t| t.from_user == user_id)
                .map(|t| t.amount_cents)
                .sum();
            assert_eq!(
                summarize(user_id, [&balances]).unwrap().net_balance,
                incoming - outgoing
            );
        }
    }

    #[test]
    fn test_summary_reports_totals_out_of_range() {
        let (me, b, c) = (user(1), user(2), user(3));
        let mut trip = NetBalances::new();
        trip.add_debt(b, me, Cents::MAX / 2 + 10).unwrap();
        trip.add_debt(c, me, Cents::MAX / 2 + 10).unwrap();

        assert_eq!(summarize(me, [&trip]), Err(LedgerError::AmountOutOfRange));
    }
}
