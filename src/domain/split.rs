use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
    BasisPoints, Cents, ExactShare, FULL_PERCENTAGE, LedgerError, PercentageShare, SplitRule,
    UserId,
};

/// One participant's share of an expense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub user_id: UserId,
    pub amount_cents: Cents,
}

/// Divide `total_cents` between the participants of `rule`.
///
/// The returned allocations follow the rule's participant order and always
/// sum to exactly `total_cents`. Cents that cannot be divided evenly go one
/// each to the earliest participants.
pub fn allocate(total_cents: Cents, rule: &SplitRule) -> Result<Vec<Allocation>, LedgerError> {
    if total_cents <= 0 {
        return Err(LedgerError::InvalidAmount(total_cents));
    }
    ensure_distinct_participants(&rule.participants())?;

    match rule {
        SplitRule::Equal { participants } => Ok(allocate_equal(total_cents, participants)),
        SplitRule::Exact { shares } => allocate_exact(total_cents, shares),
        SplitRule::Percentage { shares } => allocate_percentage(total_cents, shares),
    }
}

fn ensure_distinct_participants(participants: &[UserId]) -> Result<(), LedgerError> {
    if participants.is_empty() {
        return Err(LedgerError::InvalidSplit(
            "at least one participant is required".to_string(),
        ));
    }

    let mut seen = HashSet::with_capacity(participants.len());
    for user_id in participants {
        if !seen.insert(user_id) {
            return Err(LedgerError::InvalidSplit(format!(
                "participant {} appears more than once",
                user_id
            )));
        }
    }
    Ok(())
}

fn allocate_equal(total_cents: Cents, participants: &[UserId]) -> Vec<Allocation> {
    let count = participants.len() as i64;
    let base = total_cents / count;
    let remainder = total_cents % count;

    debug!(total_cents, count, base, remainder, "equal split");

    participants
        .iter()
        .enumerate()
        .map(|(i, &user_id)| Allocation {
            user_id,
            amount_cents: base + if (i as i64) < remainder { 1 } else { 0 },
        })
        .collect()
}

fn allocate_exact(total_cents: Cents, shares: &[ExactShare]) -> Result<Vec<Allocation>, LedgerError> {
    let mut sum: Cents = 0;
    for share in shares {
        if share.amount_cents < 0 {
            return Err(LedgerError::InvalidSplit(format!(
                "negative amount for participant {}",
                share.user_id
            )));
        }
        sum = sum.checked_add(share.amount_cents).ok_or_else(|| {
            LedgerError::InvalidSplit("split amounts are out of range".to_string())
        })?;
    }

    if sum != total_cents {
        return Err(LedgerError::SplitMismatch {
            expected: total_cents,
            actual: sum,
        });
    }

    Ok(shares
        .iter()
        .map(|share| Allocation {
            user_id: share.user_id,
            amount_cents: share.amount_cents,
        })
        .collect())
}

fn allocate_percentage(
    total_cents: Cents,
    shares: &[PercentageShare],
) -> Result<Vec<Allocation>, LedgerError> {
    let mut sum: BasisPoints = 0;
    for share in shares {
        if share.basis_points < 0 {
            return Err(LedgerError::InvalidSplit(format!(
                "negative percentage for participant {}",
                share.user_id
            )));
        }
        sum = sum.saturating_add(share.basis_points);
    }

    if sum != FULL_PERCENTAGE {
        return Err(LedgerError::SplitMismatch {
            expected: FULL_PERCENTAGE,
            actual: sum,
        });
    }

    // Floor every share; the shortfall is less than the number of non-zero shares.
    let mut allocations: Vec<Allocation> = shares
        .iter()
        .map(|share| Allocation {
            user_id: share.user_id,
            amount_cents: (i128::from(total_cents) * i128::from(share.basis_points)
                / i128::from(FULL_PERCENTAGE)) as Cents,
        })
        .collect();

    let floored: Cents = allocations.iter().map(|a| a.amount_cents).sum();
    let mut remainder = total_cents - floored;

    debug!(total_cents, floored, remainder, "percentage split");

    // A 0% participant never receives a leftover cent.
    for (allocation, share) in allocations.iter_mut().zip(shares) {
        if remainder == 0 {
            break;
        }
        if share.basis_points > 0 {
            allocation.amount_cents += 1;
            remainder -= 1;
        }
    }

    Ok(allocations)
}
