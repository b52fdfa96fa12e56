use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use std::io::Read;
use tracing::{debug, warn};

use crate::application::{NewExpense, ShareInput, SplitService};
use crate::domain::{SplitType, parse_cents, parse_percentage};
use crate::storage::{LedgerSnapshot, LedgerStore, SNAPSHOT_VERSION};

/// Result of an import operation
#[derive(Debug, Clone, Default)]
pub struct ImportResult {
    pub imported: usize,
    pub skipped: usize,
    pub errors: Vec<ImportError>,
}

/// Error that occurred during import
#[derive(Debug, Clone)]
pub struct ImportError {
    pub line: usize,
    pub field: Option<String>,
    pub error: String,
}

/// Options for import operations
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Validate every row but record nothing
    pub dry_run: bool,
}

/// Importer for loading expenses into a group
pub struct Importer<'a, S> {
    service: &'a SplitService<S>,
}

impl<'a, S: LedgerStore> Importer<'a, S> {
    pub fn new(service: &'a SplitService<S>) -> Self {
        Self { service }
    }

    /// Import expenses from CSV with the columns
    /// `date,description,paid_by,amount,split_type,shares`.
    ///
    /// A bad row is reported and skipped; the rest of the batch still goes in.
    pub fn import_expenses_csv<R: Read>(
        &self,
        group: &str,
        reader: R,
        options: ImportOptions,
    ) -> Result<ImportResult> {
        // Fail fast on an unknown group rather than once per row.
        self.service.get_group(group)?;

        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut result = ImportResult::default();

        for (line_num, record) in csv_reader.records().enumerate() {
            let line = line_num + 2; // header is line 1

            let record = match record {
                Ok(r) => r,
                Err(e) => {
                    result.reject(line, None, format!("CSV parse error: {}", e));
                    continue;
                }
            };

            if record.iter().all(|field| field.trim().is_empty()) {
                result.skipped += 1;
                continue;
            }

            let new_expense = match parse_expense_row(&record) {
                Ok(expense) => expense,
                Err((field, error)) => {
                    result.reject(line, Some(field), error);
                    continue;
                }
            };

            let outcome = if options.dry_run {
                self.service.preview_expense(group, new_expense)
            } else {
                self.service.record_expense(group, new_expense)
            };

            match outcome {
                Ok(details) => {
                    debug!(line, expense = %details.id, "imported expense row");
                    result.imported += 1;
                }
                Err(e) => result.reject(line, None, e.to_string()),
            }
        }

        Ok(result)
    }
}

impl ImportResult {
    fn reject(&mut self, line: usize, field: Option<&str>, error: String) {
        warn!(line, field = field.unwrap_or("-"), %error, "rejected import row");
        self.errors.push(ImportError {
            line,
            field: field.map(str::to_string),
            error,
        });
    }
}

type RowError = (&'static str, String);

fn parse_expense_row(record: &csv::StringRecord) -> Result<NewExpense, RowError> {
    let field = |index: usize| record.get(index).unwrap_or("").trim();

    let created_at = match field(0) {
        "" => None,
        date => Some(parse_timestamp(date).map_err(|e| ("date", e.to_string()))?),
    };

    let total_cents =
        parse_cents(field(3)).map_err(|e| ("amount", format!("Invalid amount: {}", e)))?;

    let split_type: SplitType = match field(4) {
        "" => SplitType::Equal,
        raw => raw
            .parse::<SplitType>()
            .map_err(|e| ("split_type", e.to_string()))?,
    };

    let shares = parse_shares(field(5), split_type).map_err(|e| ("shares", e))?;

    Ok(NewExpense {
        description: field(1).to_string(),
        total_cents,
        paid_by: field(2).to_string(),
        split_type,
        shares,
        created_at,
    })
}

/// Parse a `name[:value];name[:value]` share list.
///
/// Values are money for exact splits and percentages for percentage splits.
/// A value on an equal split is kept as an amount so the split rule rejects it.
pub fn parse_shares(raw: &str, split_type: SplitType) -> Result<Vec<ShareInput>, String> {
    let mut shares = Vec::new();

    for entry in raw.split(';').map(str::trim).filter(|e| !e.is_empty()) {
        let (name, value) = match entry.split_once(':') {
            Some((name, value)) => (name.trim(), Some(value.trim())),
            None => (entry, None),
        };
        if name.is_empty() {
            return Err(format!("Missing participant name in '{}'", entry));
        }

        let share = match (split_type, value) {
            (_, None) => ShareInput::participant(name),
            (SplitType::Percentage, Some(v)) => {
                let bp = parse_percentage(v).map_err(|e| format!("{}: {}", name, e))?;
                ShareInput::percentage(name, bp)
            }
            (SplitType::Exact | SplitType::Equal, Some(v)) => {
                let cents = parse_cents(v).map_err(|e| format!("{}: {}", name, e))?;
                ShareInput::amount(name, cents)
            }
        };
        shares.push(share);
    }

    Ok(shares)
}

/// Read a ledger snapshot written by `write_snapshot`.
pub fn read_snapshot<R: Read>(reader: R) -> Result<LedgerSnapshot> {
    let snapshot: LedgerSnapshot = serde_json::from_reader(reader)?;
    if snapshot.version != SNAPSHOT_VERSION {
        anyhow::bail!(
            "Unsupported snapshot version '{}' (expected '{}')",
            snapshot.version,
            SNAPSHOT_VERSION
        );
    }
    Ok(snapshot)
}

/// Accepts RFC 3339 timestamps or plain `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(dt) = date.and_hms_opt(0, 0, 0) {
            return Ok(dt.and_utc());
        }
    }

    anyhow::bail!("Invalid timestamp format: {}", s)
}
