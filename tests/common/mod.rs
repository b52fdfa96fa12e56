// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use divvy::application::{ExpenseDetails, NewExpense, ShareInput, SplitService};
use divvy::domain::{Cents, SplitType};

/// Helper to create an empty in-memory service
pub fn test_service() -> SplitService {
    SplitService::in_memory()
}

/// Helper to parse a date string into DateTime<Utc>
pub fn parse_date(date_str: &str) -> DateTime<Utc> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        .and_utc()
}

/// Test fixture: alice, bob and carol sharing a "Trip" group
pub struct TripFixture;

impl TripFixture {
    pub const GROUP: &'static str = "Trip";

    pub fn create(service: &SplitService) -> Result<()> {
        for name in ["alice", "bob", "carol"] {
            service.create_user(name, Some(format!("{}@example.com", name)))?;
        }
        service.create_group(
            Self::GROUP,
            "alice",
            Some("Weekend away".to_string()),
            &["bob".to_string(), "carol".to_string()],
        )?;
        Ok(())
    }

    /// Service with the trip already set up
    pub fn service() -> Result<SplitService> {
        let service = test_service();
        Self::create(&service)?;
        Ok(service)
    }
}

/// An equal split among every group member
pub fn equal_expense(description: &str, total_cents: Cents, paid_by: &str) -> NewExpense {
    NewExpense {
        description: description.to_string(),
        total_cents,
        paid_by: paid_by.to_string(),
        split_type: SplitType::Equal,
        shares: Vec::new(),
        created_at: None,
    }
}

pub fn exact_expense(
    description: &str,
    total_cents: Cents,
    paid_by: &str,
    shares: &[(&str, Cents)],
) -> NewExpense {
    NewExpense {
        description: description.to_string(),
        total_cents,
        paid_by: paid_by.to_string(),
        split_type: SplitType::Exact,
        shares: shares
            .iter()
            .map(|(user, cents)| ShareInput::amount(*user, *cents))
            .collect(),
        created_at: None,
    }
}

pub fn percentage_expense(
    description: &str,
    total_cents: Cents,
    paid_by: &str,
    shares: &[(&str, i64)],
) -> NewExpense {
    NewExpense {
        description: description.to_string(),
        total_cents,
        paid_by: paid_by.to_string(),
        split_type: SplitType::Percentage,
        shares: shares
            .iter()
            .map(|(user, bp)| ShareInput::percentage(*user, *bp))
            .collect(),
        created_at: None,
    }
}

/// Look up one participant's share of an expense
pub fn share_of(details: &ExpenseDetails, user: &str) -> Option<Cents> {
    details
        .splits
        .iter()
        .find(|s| s.user_name == user)
        .map(|s| s.amount_cents)
}
