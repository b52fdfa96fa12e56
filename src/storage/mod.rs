mod memory;

pub use memory::*;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{Expense, Group, GroupId, Settlement, User, UserId};

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: &str = "1";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Ledger store lock was poisoned by a panicking writer")]
    Poisoned,

    #[error("Record already exists: {0}")]
    Duplicate(Uuid),

    #[error("Record not found: {0}")]
    NotFound(Uuid),
}

/// Point-in-time copy of one group's events.
#[derive(Debug, Clone, Default)]
pub struct GroupSnapshot {
    pub expenses: Vec<Expense>,
    pub settlements: Vec<Settlement>,
}

/// Point-in-time copy of the whole ledger, also the on-disk JSON format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub users: Vec<User>,
    pub groups: Vec<Group>,
    pub expenses: Vec<Expense>,
    pub settlements: Vec<Settlement>,
}

impl LedgerSnapshot {
    pub fn empty() -> Self {
        Self {
            version: SNAPSHOT_VERSION.to_string(),
            exported_at: Utc::now(),
            users: Vec::new(),
            groups: Vec::new(),
            expenses: Vec::new(),
            settlements: Vec::new(),
        }
    }
}

/// Source of users, groups and the append-only expense/settlement log.
///
/// Reads used for balance computation go through the snapshot methods, which
/// must return a consistent view even while writers are active.
pub trait LedgerStore: Send + Sync {
    fn save_user(&self, user: &User) -> Result<(), StoreError>;
    fn get_user(&self, id: UserId) -> Result<Option<User>, StoreError>;
    fn get_user_by_name(&self, name: &str) -> Result<Option<User>, StoreError>;
    fn list_users(&self) -> Result<Vec<User>, StoreError>;

    fn save_group(&self, group: &Group) -> Result<(), StoreError>;
    fn update_group(&self, group: &Group) -> Result<(), StoreError>;
    fn get_group_by_name(&self, name: &str) -> Result<Option<Group>, StoreError>;
    fn list_groups(&self) -> Result<Vec<Group>, StoreError>;

    fn append_expense(&self, expense: &Expense) -> Result<(), StoreError>;
    fn append_settlement(&self, settlement: &Settlement) -> Result<(), StoreError>;

    fn snapshot_group(&self, group_id: GroupId) -> Result<GroupSnapshot, StoreError>;
    fn snapshot_all(&self) -> Result<LedgerSnapshot, StoreError>;
}
