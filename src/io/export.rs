use anyhow::Result;
use std::io::Write;

use crate::application::SplitService;
use crate::domain::format_cents;
use crate::storage::{LedgerSnapshot, LedgerStore};

/// Exporter for turning ledger data and derived balances into files
pub struct Exporter<'a, S> {
    service: &'a SplitService<S>,
}

impl<'a, S: LedgerStore> Exporter<'a, S> {
    pub fn new(service: &'a SplitService<S>) -> Self {
        Self { service }
    }

    /// Export a group's settle-up plan to CSV
    pub fn export_transactions_csv<W: Write>(&self, group: &str, writer: W) -> Result<usize> {
        let balances = self.service.group_balances(group)?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(["group", "from", "to", "amount"])?;

        for transaction in &balances.transactions {
            csv_writer.write_record([
                balances.group_name.as_str(),
                transaction.from_user_name.as_str(),
                transaction.to_user_name.as_str(),
                format_cents(transaction.amount_cents).as_str(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(balances.transactions.len())
    }

    /// Export a user's cross-group summary to CSV
    pub fn export_summary_csv<W: Write>(&self, user: &str, writer: W) -> Result<usize> {
        let summary = self.service.user_balances(user)?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(["direction", "counterparty", "amount"])?;

        let rows = summary
            .owes
            .iter()
            .map(|c| ("owes", c))
            .chain(summary.owed_by.iter().map(|c| ("owed_by", c)));

        let mut count = 0;
        for (direction, counterparty) in rows {
            csv_writer.write_record([
                direction,
                counterparty.user_name.as_str(),
                format_cents(counterparty.amount_cents).as_str(),
            ])?;
            count += 1;
        }
        csv_writer.write_record(["net", "", format_cents(summary.net_balance).as_str()])?;

        csv_writer.flush()?;
        Ok(count)
    }

    /// Export every expense of a group to CSV, one row per participant share
    pub fn export_expenses_csv<W: Write>(&self, group: &str, writer: W) -> Result<usize> {
        let expenses = self.service.list_expenses(group, 0, usize::MAX)?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "expense_id",
            "date",
            "description",
            "paid_by",
            "total",
            "split_type",
            "participant",
            "amount_owed",
        ])?;

        for expense in &expenses {
            for split in &expense.splits {
                csv_writer.write_record([
                    expense.id.to_string(),
                    expense.created_at.to_rfc3339(),
                    expense.description.clone(),
                    expense.paid_by_name.clone(),
                    format_cents(expense.total_cents),
                    expense.split_type.to_string(),
                    split.user_name.clone(),
                    format_cents(split.amount_cents),
                ])?;
            }
        }

        csv_writer.flush()?;
        Ok(expenses.len())
    }

    /// Export the whole ledger as a JSON snapshot
    pub fn export_full_json<W: Write>(&self, writer: W) -> Result<LedgerSnapshot> {
        let snapshot = self.service.export_snapshot()?;
        write_snapshot(&snapshot, writer)?;
        Ok(snapshot)
    }
}

/// Write a ledger snapshot as pretty-printed JSON.
pub fn write_snapshot<W: Write>(snapshot: &LedgerSnapshot, mut writer: W) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, snapshot)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}
