use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::info;

use crate::domain::{
    BasisPoints, Cents, Expense, ExpenseId, Group, IntegrityReport, LedgerError, NetBalances,
    Settlement, SplitInput, SplitRule, SplitType, User, UserId, aggregate, aggregate_by_group,
    build_integrity_report, format_cents, simplify, summarize,
};
use crate::storage::{InMemoryLedger, LedgerSnapshot, LedgerStore};

use super::{
    AllocationView, AppError, CounterpartyView, ExpenseDetails, GroupBalances, GroupInfo,
    TransactionView, UserBalances,
};

/// Application service providing high-level operations on the shared ledger.
/// This is the primary interface for any client (CLI, API, TUI, etc.).
pub struct SplitService<S = InMemoryLedger> {
    store: S,
}

/// One participant of a new expense, by user name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShareInput {
    pub user: String,
    pub amount_cents: Option<Cents>,
    pub basis_points: Option<BasisPoints>,
}

impl ShareInput {
    pub fn participant(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            ..Default::default()
        }
    }

    pub fn amount(user: impl Into<String>, amount_cents: Cents) -> Self {
        Self {
            user: user.into(),
            amount_cents: Some(amount_cents),
            basis_points: None,
        }
    }

    pub fn percentage(user: impl Into<String>, basis_points: BasisPoints) -> Self {
        Self {
            user: user.into(),
            amount_cents: None,
            basis_points: Some(basis_points),
        }
    }
}

/// Input for recording an expense
#[derive(Debug, Clone)]
pub struct NewExpense {
    pub description: String,
    pub total_cents: Cents,
    pub paid_by: String,
    pub split_type: SplitType,
    /// Empty means "every group member" for an equal split
    pub shares: Vec<ShareInput>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Result of recording a settlement
pub struct SettlementResult {
    pub settlement: Settlement,
    pub from_user_name: String,
    pub to_user_name: String,
}

impl SplitService<InMemoryLedger> {
    /// A service over an empty in-memory ledger.
    pub fn in_memory() -> Self {
        Self::new(InMemoryLedger::new())
    }

    /// A service over a previously exported ledger.
    pub fn from_snapshot(snapshot: LedgerSnapshot) -> Self {
        Self::new(InMemoryLedger::from_snapshot(snapshot))
    }
}

impl<S: LedgerStore> SplitService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Consistent copy of every record, suitable for saving to disk.
    pub fn export_snapshot(&self) -> Result<LedgerSnapshot, AppError> {
        Ok(self.store.snapshot_all()?)
    }

    // ========================
    // User operations
    // ========================

    pub fn create_user(&self, name: &str, email: Option<String>) -> Result<User, AppError> {
        let name = required(name, "User name")?;
        if self.store.get_user_by_name(name)?.is_some() {
            return Err(AppError::UserAlreadyExists(name.to_string()));
        }

        let mut user = User::new(name);
        if let Some(email) = email {
            user = user.with_email(email);
        }

        self.store.save_user(&user)?;
        info!(user = %user.name, id = %user.id, "created user");
        Ok(user)
    }

    pub fn get_user(&self, name: &str) -> Result<User, AppError> {
        self.store
            .get_user_by_name(name.trim())?
            .ok_or_else(|| AppError::UserNotFound(name.to_string()))
    }

    pub fn list_users(&self) -> Result<Vec<User>, AppError> {
        Ok(self.store.list_users()?)
    }

    // ========================
    // Group operations
    // ========================

    /// Create a group. The creator is always a member; `members` are added after.
    pub fn create_group(
        &self,
        name: &str,
        created_by: &str,
        description: Option<String>,
        members: &[String],
    ) -> Result<Group, AppError> {
        let name = required(name, "Group name")?;
        if self.store.get_group_by_name(name)?.is_some() {
            return Err(AppError::GroupAlreadyExists(name.to_string()));
        }

        let creator = self.get_user(created_by)?;
        let mut group = Group::new(name, creator.id);
        if let Some(desc) = description {
            group = group.with_description(desc);
        }
        for member in members {
            let user = self.get_user(member)?;
            group.add_member(user.id);
        }

        self.store.save_group(&group)?;
        info!(group = %group.name, members = group.members.len(), "created group");
        Ok(group)
    }

    pub fn get_group(&self, name: &str) -> Result<Group, AppError> {
        self.store
            .get_group_by_name(name.trim())?
            .ok_or_else(|| AppError::GroupNotFound(name.to_string()))
    }

    pub fn list_groups(&self) -> Result<Vec<Group>, AppError> {
        Ok(self.store.list_groups()?)
    }

    pub fn get_group_info(&self, name: &str) -> Result<GroupInfo, AppError> {
        let group = self.get_group(name)?;
        let snapshot = self.store.snapshot_group(group.id)?;

        let mut members = Vec::with_capacity(group.members.len());
        for id in &group.members {
            if let Some(user) = self.store.get_user(*id)? {
                members.push(user);
            }
        }

        let total_spent = snapshot
            .expenses
            .iter()
            .try_fold(0, |sum: Cents, e| sum.checked_add(e.total_cents))
            .ok_or(LedgerError::AmountOutOfRange)?;

        Ok(GroupInfo {
            group_id: group.id,
            name: group.name,
            description: group.description,
            created_at: group.created_at,
            members,
            expense_count: snapshot.expenses.len(),
            settlement_count: snapshot.settlements.len(),
            total_spent,
        })
    }

    pub fn add_member(&self, group_name: &str, user_name: &str) -> Result<Group, AppError> {
        let mut group = self.get_group(group_name)?;
        let user = self.get_user(user_name)?;

        if !group.add_member(user.id) {
            return Err(AppError::AlreadyMember {
                user: user.name,
                group: group.name,
            });
        }

        self.store.update_group(&group)?;
        info!(group = %group.name, user = %user.name, "added member");
        Ok(group)
    }

    /// Remove a member. Only allowed once they are square with every other
    /// member of the group.
    pub fn remove_member(&self, group_name: &str, user_name: &str) -> Result<Group, AppError> {
        let mut group = self.get_group(group_name)?;
        let user = self.get_user(user_name)?;

        if !group.is_member(user.id) {
            return Err(AppError::NotAMember {
                user: user.name,
                group: group.name,
            });
        }

        // A zero net position can still hide debts in both directions.
        let balances = self.net_balances_for(&group)?;
        let open = balances.counterparties(user.id);
        if !open.is_empty() {
            let balance = balances
                .net_positions()?
                .get(&user.id)
                .copied()
                .unwrap_or(0);
            return Err(AppError::OutstandingBalance {
                user: user.name,
                group: group.name,
                balance,
                counterparties: open.len(),
            });
        }

        group.remove_member(user.id);
        self.store.update_group(&group)?;
        info!(group = %group.name, user = %user.name, "removed member");
        Ok(group)
    }

    // ========================
    // Expense operations
    // ========================

    /// Validate and record an expense. Nothing is written unless the split
    /// allocates exactly.
    pub fn record_expense(
        &self,
        group_name: &str,
        new_expense: NewExpense,
    ) -> Result<ExpenseDetails, AppError> {
        let (expense, details) = self.prepare_expense(group_name, new_expense)?;

        self.store.append_expense(&expense)?;
        info!(
            group = %group_name,
            expense = %expense.id,
            total = %format_cents(expense.total_cents),
            split = %expense.split.split_type(),
            "recorded expense"
        );
        Ok(details)
    }

    /// Run every validation of `record_expense` and return the resulting
    /// shares without writing anything.
    pub fn preview_expense(
        &self,
        group_name: &str,
        new_expense: NewExpense,
    ) -> Result<ExpenseDetails, AppError> {
        Ok(self.prepare_expense(group_name, new_expense)?.1)
    }

    fn prepare_expense(
        &self,
        group_name: &str,
        new_expense: NewExpense,
    ) -> Result<(Expense, ExpenseDetails), AppError> {
        let description = required(&new_expense.description, "Description")?;
        if new_expense.total_cents <= 0 {
            return Err(LedgerError::InvalidAmount(new_expense.total_cents).into());
        }

        let group = self.get_group(group_name)?;
        let payer = self.get_user(&new_expense.paid_by)?;
        self.require_member(&group, &payer)?;

        let inputs: Vec<SplitInput> = if new_expense.shares.is_empty()
            && new_expense.split_type == SplitType::Equal
        {
            group
                .members
                .iter()
                .map(|id| SplitInput::participant(*id))
                .collect()
        } else {
            let mut inputs = Vec::with_capacity(new_expense.shares.len());
            for share in &new_expense.shares {
                let user = self.get_user(&share.user)?;
                self.require_member(&group, &user)?;
                inputs.push(SplitInput {
                    user_id: user.id,
                    amount_cents: share.amount_cents,
                    basis_points: share.basis_points,
                });
            }
            inputs
        };

        let split = SplitRule::from_inputs(new_expense.split_type, &inputs)?;
        let mut expense = Expense::new(
            group.id,
            description,
            new_expense.total_cents,
            payer.id,
            split,
        );
        if let Some(created_at) = new_expense.created_at {
            expense = expense.with_created_at(created_at);
        }

        // Allocation is the validation step; it must succeed before any write.
        let details = self.expense_details(&expense, &self.user_names()?)?;

        // The group's totals and settle-up plan must stay within range.
        let snapshot = self.store.snapshot_group(group.id)?;
        snapshot
            .expenses
            .iter()
            .try_fold(expense.total_cents, |sum: Cents, e| sum.checked_add(e.total_cents))
            .ok_or(LedgerError::AmountOutOfRange)?;
        let mut balances = aggregate(&snapshot.expenses, &snapshot.settlements)?;
        balances.apply_expense(&expense)?;
        simplify(&balances)?;
        Ok((expense, details))
    }

    /// Expenses of a group, newest first. `page` is zero-based.
    pub fn list_expenses(
        &self,
        group_name: &str,
        page: usize,
        size: usize,
    ) -> Result<Vec<ExpenseDetails>, AppError> {
        if size == 0 {
            return Err(AppError::InvalidInput(
                "Page size must be at least 1".to_string(),
            ));
        }

        let group = self.get_group(group_name)?;
        let mut expenses = self.store.snapshot_group(group.id)?.expenses;
        expenses.reverse();
        expenses.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let names = self.user_names()?;
        expenses
            .iter()
            .skip(page.saturating_mul(size))
            .take(size)
            .map(|expense| self.expense_details(expense, &names))
            .collect()
    }

    pub fn get_expense(
        &self,
        group_name: &str,
        expense_id: ExpenseId,
    ) -> Result<ExpenseDetails, AppError> {
        let group = self.get_group(group_name)?;
        let expense = self
            .store
            .snapshot_group(group.id)?
            .expenses
            .into_iter()
            .find(|e| e.id == expense_id)
            .ok_or_else(|| AppError::ExpenseNotFound(expense_id.to_string()))?;

        self.expense_details(&expense, &self.user_names()?)
    }

    // ========================
    // Settlement operations
    // ========================

    pub fn record_settlement(
        &self,
        group_name: &str,
        from_user_name: &str,
        to_user_name: &str,
        amount_cents: Cents,
    ) -> Result<SettlementResult, AppError> {
        let group = self.get_group(group_name)?;
        let from_user = self.get_user(from_user_name)?;
        let to_user = self.get_user(to_user_name)?;
        self.require_member(&group, &from_user)?;
        self.require_member(&group, &to_user)?;

        let settlement = Settlement::new(group.id, from_user.id, to_user.id, amount_cents)?;
        let mut balances = self.net_balances_for(&group)?;
        balances.apply_settlement(&settlement)?;
        simplify(&balances)?;

        self.store.append_settlement(&settlement)?;
        info!(
            group = %group.name,
            from = %from_user.name,
            to = %to_user.name,
            amount = %format_cents(amount_cents),
            "recorded settlement"
        );

        Ok(SettlementResult {
            settlement,
            from_user_name: from_user.name,
            to_user_name: to_user.name,
        })
    }

    pub fn list_settlements(&self, group_name: &str) -> Result<Vec<Settlement>, AppError> {
        let group = self.get_group(group_name)?;
        Ok(self.store.snapshot_group(group.id)?.settlements)
    }

    // ========================
    // Balance operations
    // ========================

    /// Pairwise net balances of one group.
    pub fn group_net_balances(&self, group_name: &str) -> Result<NetBalances, AppError> {
        let group = self.get_group(group_name)?;
        self.net_balances_for(&group)
    }

    /// The minimal settle-up plan for a group.
    pub fn group_balances(&self, group_name: &str) -> Result<GroupBalances, AppError> {
        let group = self.get_group(group_name)?;
        let balances = self.net_balances_for(&group)?;
        let transactions = simplify(&balances)?;
        let names = self.user_names()?;

        Ok(GroupBalances {
            group_id: group.id,
            group_name: group.name,
            transactions: transactions
                .into_iter()
                .map(|t| TransactionView {
                    from_user_id: t.from_user,
                    from_user_name: display_name(&names, t.from_user),
                    to_user_id: t.to_user,
                    to_user_name: display_name(&names, t.to_user),
                    amount_cents: t.amount_cents,
                })
                .collect(),
        })
    }

    /// A user's position across every group, netted per counterparty.
    pub fn user_balances(&self, user_name: &str) -> Result<UserBalances, AppError> {
        let user = self.get_user(user_name)?;
        let snapshot = self.store.snapshot_all()?;
        let groups = aggregate_by_group(&snapshot.expenses, &snapshot.settlements)?;
        let summary = summarize(user.id, groups.values())?;
        let names: HashMap<UserId, String> =
            snapshot.users.into_iter().map(|u| (u.id, u.name)).collect();

        let view = |entries: Vec<crate::domain::Counterparty>| -> Vec<CounterpartyView> {
            entries
                .into_iter()
                .map(|c| CounterpartyView {
                    user_id: c.user_id,
                    user_name: display_name(&names, c.user_id),
                    amount_cents: c.amount_cents,
                })
                .collect()
        };

        Ok(UserBalances {
            user_id: user.id,
            user_name: user.name,
            owes: view(summary.owes),
            owed_by: view(summary.owed_by),
            net_balance: summary.net_balance,
        })
    }

    // ========================
    // Integrity operations
    // ========================

    /// Re-derive every allocation and balance and report inconsistencies.
    pub fn check_integrity(&self) -> Result<IntegrityReport, AppError> {
        let snapshot = self.store.snapshot_all()?;
        Ok(build_integrity_report(
            &snapshot.users,
            &snapshot.groups,
            &snapshot.expenses,
            &snapshot.settlements,
        ))
    }

    // ========================
    // Helpers
    // ========================

    fn net_balances_for(&self, group: &Group) -> Result<NetBalances, AppError> {
        let snapshot = self.store.snapshot_group(group.id)?;
        Ok(aggregate(&snapshot.expenses, &snapshot.settlements)?)
    }

    fn require_member(&self, group: &Group, user: &User) -> Result<(), AppError> {
        if group.is_member(user.id) {
            Ok(())
        } else {
            Err(AppError::NotAMember {
                user: user.name.clone(),
                group: group.name.clone(),
            })
        }
    }

    fn user_names(&self) -> Result<HashMap<UserId, String>, AppError> {
        Ok(self
            .store
            .list_users()?
            .into_iter()
            .map(|u| (u.id, u.name))
            .collect())
    }

    fn expense_details(
        &self,
        expense: &Expense,
        names: &HashMap<UserId, String>,
    ) -> Result<ExpenseDetails, AppError> {
        let splits = expense
            .allocations()?
            .into_iter()
            .map(|a| AllocationView {
                user_id: a.user_id,
                user_name: display_name(names, a.user_id),
                amount_cents: a.amount_cents,
            })
            .collect();

        Ok(ExpenseDetails::new(
            expense,
            display_name(names, expense.paid_by),
            splits,
        ))
    }
}

fn required<'a>(value: &'a str, field: &str) -> Result<&'a str, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidInput(format!("{} is required", field)));
    }
    Ok(trimmed)
}

fn display_name(names: &HashMap<UserId, String>, id: UserId) -> String {
    names.get(&id).cloned().unwrap_or_else(|| id.to_string())
}
