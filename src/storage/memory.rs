use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use tracing::debug;

use super::{GroupSnapshot, LedgerSnapshot, LedgerStore, SNAPSHOT_VERSION, StoreError};
use crate::domain::{Expense, Group, GroupId, Settlement, User, UserId};

#[derive(Debug, Default)]
struct LedgerData {
    users: Vec<User>,
    groups: Vec<Group>,
    expenses: Vec<Expense>,
    settlements: Vec<Settlement>,
}

/// Ledger store held in process memory. Records keep insertion order.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    data: RwLock<LedgerData>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a previously exported snapshot as the initial state.
    pub fn from_snapshot(snapshot: LedgerSnapshot) -> Self {
        debug!(
            users = snapshot.users.len(),
            groups = snapshot.groups.len(),
            expenses = snapshot.expenses.len(),
            settlements = snapshot.settlements.len(),
            "loading ledger snapshot"
        );
        Self {
            data: RwLock::new(LedgerData {
                users: snapshot.users,
                groups: snapshot.groups,
                expenses: snapshot.expenses,
                settlements: snapshot.settlements,
            }),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, LedgerData>, StoreError> {
        self.data.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, LedgerData>, StoreError> {
        self.data.write().map_err(|_| StoreError::Poisoned)
    }
}

impl LedgerStore for InMemoryLedger {
    fn save_user(&self, user: &User) -> Result<(), StoreError> {
        let mut data = self.write()?;
        if data.users.iter().any(|u| u.id == user.id) {
            return Err(StoreError::Duplicate(user.id));
        }
        data.users.push(user.clone());
        Ok(())
    }

    fn get_user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.read()?.users.iter().find(|u| u.id == id).cloned())
    }

    fn get_user_by_name(&self, name: &str) -> Result<Option<User>, StoreError> {
        Ok(self.read()?.users.iter().find(|u| u.name == name).cloned())
    }

    fn list_users(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.read()?.users.clone())
    }

    fn save_group(&self, group: &Group) -> Result<(), StoreError> {
        let mut data = self.write()?;
        if data.groups.iter().any(|g| g.id == group.id) {
            return Err(StoreError::Duplicate(group.id));
        }
        data.groups.push(group.clone());
        Ok(())
    }

    fn update_group(&self, group: &Group) -> Result<(), StoreError> {
        let mut data = self.write()?;
        let slot = data
            .groups
            .iter_mut()
            .find(|g| g.id == group.id)
            .ok_or(StoreError::NotFound(group.id))?;
        *slot = group.clone();
        Ok(())
    }

    fn get_group_by_name(&self, name: &str) -> Result<Option<Group>, StoreError> {
        Ok(self.read()?.groups.iter().find(|g| g.name == name).cloned())
    }

    fn list_groups(&self) -> Result<Vec<Group>, StoreError> {
        Ok(self.read()?.groups.clone())
    }

    fn append_expense(&self, expense: &Expense) -> Result<(), StoreError> {
        let mut data = self.write()?;
        if data.expenses.iter().any(|e| e.id == expense.id) {
            return Err(StoreError::Duplicate(expense.id));
        }
        data.expenses.push(expense.clone());
        Ok(())
    }

    fn append_settlement(&self, settlement: &Settlement) -> Result<(), StoreError> {
        let mut data = self.write()?;
        if data.settlements.iter().any(|s| s.id == settlement.id) {
            return Err(StoreError::Duplicate(settlement.id));
        }
        data.settlements.push(settlement.clone());
        Ok(())
    }

    fn snapshot_group(&self, group_id: GroupId) -> Result<GroupSnapshot, StoreError> {
        let data = self.read()?;
        Ok(GroupSnapshot {
            expenses: data
                .expenses
                .iter()
                .filter(|e| e.group_id == group_id)
                .cloned()
                .collect(),
            settlements: data
                .settlements
                .iter()
                .filter(|s| s.group_id == group_id)
                .cloned()
                .collect(),
        })
    }

    fn snapshot_all(&self) -> Result<LedgerSnapshot, StoreError> {
        let data = self.read()?;
        Ok(LedgerSnapshot {
            version: SNAPSHOT_VERSION.to_string(),
            exported_at: Utc::now(),
            users: data.users.clone(),
            groups: data.groups.clone(),
            expenses: data.expenses.clone(),
            settlements: data.settlements.clone(),
        })
    }
}
