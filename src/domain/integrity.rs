use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::Serialize;
use uuid::Uuid;

use super::{
    Cents, Expense, Group, GroupId, LedgerError, NetBalances, Settlement, User, format_cents,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntegrityIssue {
    /// A record points at a group that does not exist
    UnknownGroup { record_id: Uuid, group_id: GroupId },
    /// A record points at a user that does not exist
    UnknownUser { record_id: Uuid, user_id: Uuid },
    /// An expense that no longer allocates (bad split or amount)
    InvalidExpense { expense_id: Uuid, error: String },
    /// Allocations that do not add up to the expense total
    AllocationNotConserved {
        expense_id: Uuid,
        total_cents: Cents,
        allocated_cents: Cents,
    },
    /// A settlement that could never have been recorded
    InvalidSettlement { settlement_id: Uuid, error: String },
    /// Net positions of a group that do not sum to zero
    GroupNotBalanced { group_id: GroupId, residual_cents: Cents },
    /// A group whose balances no longer fit in `Cents`
    GroupOutOfRange { group_id: GroupId },
}

impl fmt::Display for IntegrityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegrityIssue::UnknownGroup { record_id, group_id } => {
                write!(f, "{} references unknown group {}", record_id, group_id)
            }
            IntegrityIssue::UnknownUser { record_id, user_id } => {
                write!(f, "{} references unknown user {}", record_id, user_id)
            }
            IntegrityIssue::InvalidExpense { expense_id, error } => {
                write!(f, "expense {} does not allocate: {}", expense_id, error)
            }
            IntegrityIssue::InvalidSettlement {
                settlement_id,
                error,
            } => write!(f, "settlement {} is invalid: {}", settlement_id, error),
            IntegrityIssue::AllocationNotConserved {
                expense_id,
                total_cents,
                allocated_cents,
            } => write!(
                f,
                "expense {} allocates {} of {}",
                expense_id,
                format_cents(*allocated_cents),
                format_cents(*total_cents)
            ),
            IntegrityIssue::GroupNotBalanced {
                group_id,
                residual_cents,
            } => write!(
                f,
                "group {} net positions are off by {}",
                group_id,
                format_cents(*residual_cents)
            ),
            IntegrityIssue::GroupOutOfRange { group_id } => {
                write!(f, "group {} balances are out of range", group_id)
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IntegrityReport {
    pub user_count: usize,
    pub group_count: usize,
    pub expense_count: usize,
    pub settlement_count: usize,
    pub issues: Vec<IntegrityIssue>,
}

impl IntegrityReport {
    pub fn is_ok(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Re-derive everything from the raw records and report what does not hold.
pub fn build_integrity_report(
    users: &[User],
    groups: &[Group],
    expenses: &[Expense],
    settlements: &[Settlement],
) -> IntegrityReport {
    let user_ids: HashSet<Uuid> = users.iter().map(|u| u.id).collect();
    let group_ids: HashSet<GroupId> = groups.iter().map(|g| g.id).collect();
    let mut issues = Vec::new();
    let mut per_group: BTreeMap<GroupId, NetBalances> = BTreeMap::new();

    for expense in expenses {
        if !group_ids.contains(&expense.group_id) {
            issues.push(IntegrityIssue::UnknownGroup {
                record_id: expense.id,
                group_id: expense.group_id,
            });
        }
        let referenced = std::iter::once(expense.paid_by).chain(expense.split.participants());
        for user_id in referenced {
            if !user_ids.contains(&user_id) {
                issues.push(IntegrityIssue::UnknownUser {
                    record_id: expense.id,
                    user_id,
                });
            }
        }

        if expense.total_cents <= 0 {
            issues.push(IntegrityIssue::InvalidExpense {
                expense_id: expense.id,
                error: LedgerError::InvalidAmount(expense.total_cents).to_string(),
            });
            continue;
        }

        let allocations = match expense.allocations() {
            Ok(allocations) => allocations,
            Err(e) => {
                issues.push(IntegrityIssue::InvalidExpense {
                    expense_id: expense.id,
                    error: e.to_string(),
                });
                continue;
            }
        };

        let allocated_cents: i128 = allocations
            .iter()
            .map(|a| i128::from(a.amount_cents))
            .sum();
        if allocated_cents != i128::from(expense.total_cents) {
            issues.push(IntegrityIssue::AllocationNotConserved {
                expense_id: expense.id,
                total_cents: expense.total_cents,
                allocated_cents: clamp_cents(allocated_cents),
            });
        }
        let balances = per_group.entry(expense.group_id).or_default();
        for allocation in allocations {
            if let Err(e) =
                balances.add_debt(allocation.user_id, expense.paid_by, allocation.amount_cents)
            {
                issues.push(IntegrityIssue::InvalidExpense {
                    expense_id: expense.id,
                    error: e.to_string(),
                });
                break;
            }
        }
    }

    for settlement in settlements {
        if !group_ids.contains(&settlement.group_id) {
            issues.push(IntegrityIssue::UnknownGroup {
                record_id: settlement.id,
                group_id: settlement.group_id,
            });
        }
        for user_id in [settlement.from_user, settlement.to_user] {
            if !user_ids.contains(&user_id) {
                issues.push(IntegrityIssue::UnknownUser {
                    record_id: settlement.id,
                    user_id,
                });
            }
        }

        let invalid = if settlement.amount_cents <= 0 {
            Some(LedgerError::InvalidAmount(settlement.amount_cents))
        } else if settlement.from_user == settlement.to_user {
            Some(LedgerError::InvalidSettlement(
                "cannot settle with yourself".to_string(),
            ))
        } else {
            per_group
                .entry(settlement.group_id)
                .or_default()
                .apply_settlement(settlement)
                .err()
        };
        if let Some(e) = invalid {
            issues.push(IntegrityIssue::InvalidSettlement {
                settlement_id: settlement.id,
                error: e.to_string(),
            });
        }
    }

    for (group_id, balances) in &per_group {
        let Ok(positions) = balances.net_positions() else {
            issues.push(IntegrityIssue::GroupOutOfRange {
                group_id: *group_id,
            });
            continue;
        };
        let residual: i128 = positions.values().map(|v| i128::from(*v)).sum();
        if residual != 0 {
            issues.push(IntegrityIssue::GroupNotBalanced {
                group_id: *group_id,
                residual_cents: clamp_cents(residual),
            });
        }
    }

    IntegrityReport {
        user_count: users.len(),
        group_count: groups.len(),
        expense_count: expenses.len(),
        settlement_count: settlements.len(),
        issues,
    }
}

fn clamp_cents(value: i128) -> Cents {
    Cents::try_from(value).unwrap_or(if value < 0 { Cents::MIN } else { Cents::MAX })
}
