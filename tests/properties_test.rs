use std::collections::BTreeMap;

use divvy::domain::{
    Expense, ExactShare, FULL_PERCENTAGE, NetBalances, PercentageShare, Settlement, SplitRule,
    UserId, aggregate, allocate, simplify_positions,
};
use proptest::prelude::*;
use uuid::Uuid;

fn user(n: usize) -> UserId {
    Uuid::from_u128(n as u128 + 1)
}

fn users(count: usize) -> Vec<UserId> {
    (0..count).map(user).collect()
}

/// Net positions for `amounts`, with the last user absorbing the difference
/// so the whole set sums to zero.
fn balanced_positions(amounts: &[i64]) -> BTreeMap<UserId, i64> {
    let mut positions: BTreeMap<UserId, i64> = amounts
        .iter()
        .enumerate()
        .map(|(i, amount)| (user(i), *amount))
        .collect();
    let residual: i64 = amounts.iter().sum();
    positions.insert(user(amounts.len()), -residual);
    positions
}

proptest! {
    #[test]
    fn prop_equal_split_conserves_total(total in 1i64..10_000_000, count in 1usize..40) {
        let rule = SplitRule::Equal { participants: users(count) };
        let allocations = allocate(total, &rule).unwrap();

        prop_assert_eq!(allocations.len(), count);
        prop_assert_eq!(allocations.iter().map(|a| a.amount_cents).sum::<i64>(), total);

        let min = allocations.iter().map(|a| a.amount_cents).min().unwrap();
        let max = allocations.iter().map(|a| a.amount_cents).max().unwrap();
        prop_assert!(max - min <= 1);
    }

    #[test]
    fn prop_exact_split_is_returned_unchanged(amounts in prop::collection::vec(0i64..100_000, 1..12)) {
        let total: i64 = amounts.iter().sum();
        prop_assume!(total > 0);

        let shares: Vec<ExactShare> = amounts
            .iter()
            .enumerate()
            .map(|(i, amount)| ExactShare { user_id: user(i), amount_cents: *amount })
            .collect();
        let allocations = allocate(total, &SplitRule::Exact { shares }).unwrap();

        let allocated: Vec<i64> = allocations.iter().map(|a| a.amount_cents).collect();
        prop_assert_eq!(allocated, amounts);
    }

    #[test]
    fn prop_percentage_split_conserves_total(
        total in 1i64..10_000_000,
        cuts in prop::collection::vec(0i64..=FULL_PERCENTAGE, 0..12),
    ) {
        // Sorted cut points carve 100% into random, possibly zero, shares.
        let mut bounds = cuts.clone();
        bounds.push(0);
        bounds.push(FULL_PERCENTAGE);
        bounds.sort_unstable();
        let shares: Vec<PercentageShare> = bounds
            .windows(2)
            .enumerate()
            .map(|(i, w)| PercentageShare { user_id: user(i), basis_points: w[1] - w[0] })
            .collect();
        prop_assert_eq!(shares.iter().map(|s| s.basis_points).sum::<i64>(), FULL_PERCENTAGE);

        let allocations = allocate(total, &SplitRule::Percentage { shares: shares.clone() }).unwrap();

        prop_assert_eq!(allocations.len(), shares.len());
        prop_assert_eq!(allocations.iter().map(|a| a.amount_cents).sum::<i64>(), total);
        for (allocation, share) in allocations.iter().zip(&shares) {
            let floor = total * share.basis_points / FULL_PERCENTAGE;
            if share.basis_points == 0 {
                prop_assert_eq!(allocation.amount_cents, 0);
            } else {
                prop_assert!(allocation.amount_cents - floor <= 1);
                prop_assert!(allocation.amount_cents >= floor);
            }
        }
    }

    #[test]
    fn prop_simplify_settles_every_position(amounts in prop::collection::vec(-50_000i64..50_000, 1..15)) {
        let positions = balanced_positions(&amounts);
        let transactions = simplify_positions(&positions).unwrap();

        let nonzero = positions.values().filter(|v| **v != 0).count();
        prop_assert!(transactions.len() <= nonzero.saturating_sub(1));

        let mut paid: BTreeMap<UserId, i64> = BTreeMap::new();
        for t in &transactions {
            prop_assert!(t.amount_cents > 0);
            prop_assert_ne!(t.from_user, t.to_user);
            *paid.entry(t.from_user).or_insert(0) -= t.amount_cents;
            *paid.entry(t.to_user).or_insert(0) += t.amount_cents;
        }

        // Paying the plan brings every position to zero.
        for (user_id, position) in &positions {
            let received = paid.get(user_id).copied().unwrap_or(0);
            prop_assert_eq!(position - received, 0);
        }
    }

    #[test]
    fn prop_aggregation_ignores_record_order(
        totals in prop::collection::vec(1i64..50_000, 1..10),
        payers in prop::collection::vec(0usize..4, 10),
        settlements in prop::collection::vec((0usize..4, 0usize..4, 1i64..20_000), 0..6),
        seed in any::<u64>(),
    ) {
        let group = Uuid::from_u128(99);
        let members = users(4);

        let expenses: Vec<Expense> = totals
            .iter()
            .zip(&payers)
            .map(|(total, payer)| {
                Expense::new(
                    group,
                    "shared",
                    *total,
                    members[*payer],
                    SplitRule::Equal { participants: members.clone() },
                )
            })
            .collect();
        let settlements: Vec<Settlement> = settlements
            .iter()
            .filter(|(from, to, _)| from != to)
            .map(|(from, to, amount)| {
                Settlement::new(group, members[*from], members[*to], *amount).unwrap()
            })
            .collect();

        let forward = aggregate(&expenses, &settlements).unwrap();

        // Deterministic shuffle driven by the seed
        let mut shuffled_expenses = expenses.clone();
        let mut shuffled_settlements = settlements.clone();
        shuffled_expenses.reverse();
        let len = shuffled_settlements.len();
        if len > 1 {
            shuffled_settlements.rotate_left(seed as usize % len);
        }
        if !shuffled_expenses.is_empty() {
            let n = shuffled_expenses.len();
            shuffled_expenses.rotate_right(seed as usize % n);
        }

        let shuffled = aggregate(&shuffled_expenses, &shuffled_settlements).unwrap();
        prop_assert_eq!(&forward, &shuffled);

        let residual: i64 = forward.net_positions().unwrap().values().sum();
        prop_assert_eq!(residual, 0);
    }

    #[test]
    fn prop_net_balances_are_antisymmetric(
        debts in prop::collection::vec((0usize..5, 0usize..5, -10_000i64..10_000), 0..30),
    ) {
        let mut balances = NetBalances::new();
        for (debtor, creditor, amount) in &debts {
            balances.add_debt(user(*debtor), user(*creditor), *amount).unwrap();
        }

        for a in 0..5 {
            for b in 0..5 {
                prop_assert_eq!(balances.balance(user(a), user(b)), -balances.balance(user(b), user(a)));
            }
        }
        prop_assert!(balances.iter().all(|(_, amount)| amount != 0));
    }
}
