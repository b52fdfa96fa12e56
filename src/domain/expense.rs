use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Allocation, BasisPoints, Cents, GroupId, LedgerError, UserId, allocate};

pub type ExpenseId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitType {
    /// Everyone pays the same share
    Equal,
    /// Every participant's share is given in money
    Exact,
    /// Every participant's share is given as a percentage of the total
    Percentage,
}

impl SplitType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SplitType::Equal => "equal",
            SplitType::Exact => "exact",
            SplitType::Percentage => "percentage",
        }
    }
}

impl std::str::FromStr for SplitType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "equal" => Ok(SplitType::Equal),
            "exact" => Ok(SplitType::Exact),
            "percentage" | "percent" => Ok(SplitType::Percentage),
            other => Err(LedgerError::InvalidSplit(format!(
                "unknown split type '{}'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for SplitType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExactShare {
    pub user_id: UserId,
    pub amount_cents: Cents,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PercentageShare {
    pub user_id: UserId,
    pub basis_points: BasisPoints,
}

/// How an expense total is divided between its participants.
/// Participant order matters: remainder cents go to the earliest participants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SplitRule {
    Equal { participants: Vec<UserId> },
    Exact { shares: Vec<ExactShare> },
    Percentage { shares: Vec<PercentageShare> },
}

/// Loosely typed per-participant input, as it arrives from a form or a CSV row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SplitInput {
    pub user_id: UserId,
    pub amount_cents: Option<Cents>,
    pub basis_points: Option<BasisPoints>,
}

impl SplitInput {
    pub fn participant(user_id: UserId) -> Self {
        Self {
            user_id,
            ..Default::default()
        }
    }

    pub fn amount(user_id: UserId, amount_cents: Cents) -> Self {
        Self {
            user_id,
            amount_cents: Some(amount_cents),
            basis_points: None,
        }
    }

    pub fn percentage(user_id: UserId, basis_points: BasisPoints) -> Self {
        Self {
            user_id,
            amount_cents: None,
            basis_points: Some(basis_points),
        }
    }
}

impl SplitRule {
    /// Build a typed rule from raw inputs, rejecting payloads that do not
    /// match the split type.
    pub fn from_inputs(split_type: SplitType, inputs: &[SplitInput]) -> Result<Self, LedgerError> {
        let mismatch = |input: &SplitInput, what: &str| {
            LedgerError::InvalidSplit(format!(
                "{} split {} (participant {})",
                split_type, what, input.user_id
            ))
        };

        match split_type {
            SplitType::Equal => {
                let mut participants = Vec::with_capacity(inputs.len());
                for input in inputs {
                    if input.amount_cents.is_some() || input.basis_points.is_some() {
                        return Err(mismatch(input, "does not take amounts or percentages"));
                    }
                    participants.push(input.user_id);
                }
                Ok(SplitRule::Equal { participants })
            }
            SplitType::Exact => {
                let mut shares = Vec::with_capacity(inputs.len());
                for input in inputs {
                    match (input.amount_cents, input.basis_points) {
                        (Some(amount_cents), None) => shares.push(ExactShare {
                            user_id: input.user_id,
                            amount_cents,
                        }),
                        _ => return Err(mismatch(input, "requires an amount for every participant")),
                    }
                }
                Ok(SplitRule::Exact { shares })
            }
            SplitType::Percentage => {
                let mut shares = Vec::with_capacity(inputs.len());
                for input in inputs {
                    match (input.amount_cents, input.basis_points) {
                        (None, Some(basis_points)) => shares.push(PercentageShare {
                            user_id: input.user_id,
                            basis_points,
                        }),
                        _ => {
                            return Err(mismatch(
                                input,
                                "requires a percentage for every participant",
                            ));
                        }
                    }
                }
                Ok(SplitRule::Percentage { shares })
            }
        }
    }

    pub fn split_type(&self) -> SplitType {
        match self {
            SplitRule::Equal { .. } => SplitType::Equal,
            SplitRule::Exact { .. } => SplitType::Exact,
            SplitRule::Percentage { .. } => SplitType::Percentage,
        }
    }

    /// Participants in split order.
    pub fn participants(&self) -> Vec<UserId> {
        match self {
            SplitRule::Equal { participants } => participants.clone(),
            SplitRule::Exact { shares } => shares.iter().map(|s| s.user_id).collect(),
            SplitRule::Percentage { shares } => shares.iter().map(|s| s.user_id).collect(),
        }
    }
}

/// A shared expense paid by one user on behalf of the split participants.
/// Expenses are immutable once recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: ExpenseId,
    pub group_id: GroupId,
    pub description: String,
    /// Total in cents (always positive once recorded)
    pub total_cents: Cents,
    pub paid_by: UserId,
    pub split: SplitRule,
    pub created_at: DateTime<Utc>,
}

impl Expense {
    pub fn new(
        group_id: GroupId,
        description: impl Into<String>,
        total_cents: Cents,
        paid_by: UserId,
        split: SplitRule,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            group_id,
            description: description.into(),
            total_cents,
            paid_by,
            split,
            created_at: Utc::now(),
        }
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Per-participant owed amounts; these always sum to `total_cents`.
    pub fn allocations(&self) -> Result<Vec<Allocation>, LedgerError> {
        allocate(self.total_cents, &self.split)
    }
}
