mod common;

use anyhow::Result;
use common::{TripFixture, equal_expense, exact_expense, share_of};
use divvy::application::SplitService;
use divvy::domain::{IntegrityIssue, Settlement};
use divvy::io::{Exporter, ImportOptions, Importer, read_snapshot, write_snapshot};
use std::fs::File;
use std::io::{BufReader, Cursor};
use tempfile::TempDir;
use uuid::Uuid;

const EXPENSES_CSV: &str = "\
date,description,paid_by,amount,split_type,shares
2024-05-01,Hotel,alice,100.00,equal,
2024-05-02,Dinner,bob,60.00,exact,alice:20;bob:20;carol:20
2024-05-03,Groceries,carol,200,percentage,alice:50;bob:30%;carol:20
";

#[test]
fn test_import_expenses_csv() -> Result<()> {
    let service = TripFixture::service()?;

    let result = Importer::new(&service).import_expenses_csv(
        "Trip",
        Cursor::new(EXPENSES_CSV),
        ImportOptions::default(),
    )?;

    assert_eq!(result.imported, 3);
    assert!(result.errors.is_empty(), "{:?}", result.errors);

    let expenses = service.list_expenses("Trip", 0, 10)?;
    assert_eq!(expenses.len(), 3);
    assert_eq!(expenses[0].description, "Groceries");
    assert_eq!(share_of(&expenses[0], "bob"), Some(6000));
    assert_eq!(expenses[2].description, "Hotel");
    assert_eq!(share_of(&expenses[2], "alice"), Some(3334));
    assert_eq!(
        expenses[2].created_at.date_naive().to_string(),
        "2024-05-01"
    );

    Ok(())
}

#[test]
fn test_import_reports_bad_rows_and_keeps_going() -> Result<()> {
    let service = TripFixture::service()?;
    let csv = "\
date,description,paid_by,amount,split_type,shares
2024-05-01,Hotel,alice,abc,equal,
2024-05-02,Dinner,bob,60.00,exact,alice:20;bob:20;carol:19
yesterday,Taxi,bob,10,equal,
2024-05-03,Fuel,zoe,10,equal,
2024-05-04,Boat,alice,10,equal,alice:5
2024-05-05,Museum,carol,30,equal,
";

    let result = Importer::new(&service).import_expenses_csv(
        "Trip",
        Cursor::new(csv),
        ImportOptions::default(),
    )?;

    assert_eq!(result.imported, 1);
    let lines: Vec<_> = result.errors.iter().map(|e| e.line).collect();
    assert_eq!(lines, vec![2, 3, 4, 5, 6]);
    assert_eq!(result.errors[0].field.as_deref(), Some("amount"));
    assert_eq!(result.errors[2].field.as_deref(), Some("date"));

    let expenses = service.list_expenses("Trip", 0, 10)?;
    assert_eq!(expenses.len(), 1);
    assert_eq!(expenses[0].description, "Museum");

    Ok(())
}

#[test]
fn test_import_dry_run_records_nothing() -> Result<()> {
    let service = TripFixture::service()?;

    let result = Importer::new(&service).import_expenses_csv(
        "Trip",
        Cursor::new(EXPENSES_CSV),
        ImportOptions { dry_run: true },
    )?;

    assert_eq!(result.imported, 3);
    assert!(service.list_expenses("Trip", 0, 10)?.is_empty());

    Ok(())
}

#[test]
fn test_import_into_unknown_group_fails() -> Result<()> {
    let service = TripFixture::service()?;
    let result = Importer::new(&service).import_expenses_csv(
        "Nowhere",
        Cursor::new(EXPENSES_CSV),
        ImportOptions::default(),
    );
    assert!(result.is_err());
    Ok(())
}

#[test]
fn test_export_transactions_csv() -> Result<()> {
    let service = TripFixture::service()?;
    service.record_expense("Trip", exact_expense("Tickets", 5000, "bob", &[("alice", 5000)]))?;
    service.record_expense("Trip", exact_expense("Dinner", 5000, "carol", &[("bob", 5000)]))?;

    let mut out = Vec::new();
    let count = Exporter::new(&service).export_transactions_csv("Trip", &mut out)?;

    assert_eq!(count, 1);
    let text = String::from_utf8(out)?;
    assert_eq!(text, "group,from,to,amount\nTrip,alice,carol,50.00\n");

    Ok(())
}

#[test]
fn test_export_summary_csv() -> Result<()> {
    let service = TripFixture::service()?;
    service.record_expense("Trip", equal_expense("Fuel", 6000, "alice"))?;

    let mut out = Vec::new();
    let count = Exporter::new(&service).export_summary_csv("bob", &mut out)?;

    assert_eq!(count, 1);
    let text = String::from_utf8(out)?;
    assert_eq!(
        text,
        "direction,counterparty,amount\nowes,alice,20.00\nnet,,-20.00\n"
    );

    Ok(())
}

#[test]
fn test_export_expenses_csv_has_row_per_share() -> Result<()> {
    let service = TripFixture::service()?;
    service.record_expense("Trip", equal_expense("Hotel", 10000, "alice"))?;

    let mut out = Vec::new();
    let count = Exporter::new(&service).export_expenses_csv("Trip", &mut out)?;
    assert_eq!(count, 1);

    let mut reader = csv::Reader::from_reader(out.as_slice());
    let rows = reader.records().collect::<Result<Vec<_>, csv::Error>>()?;
    assert_eq!(rows.len(), 3);
    let owed: Vec<_> = rows.iter().map(|r| r[7].to_string()).collect();
    assert_eq!(owed, vec!["33.34", "33.33", "33.33"]);
    assert_eq!(&rows[0][6], "alice");

    Ok(())
}

#[test]
fn test_full_snapshot_round_trip() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("ledger.json");

    let service = TripFixture::service()?;
    service.record_expense("Trip", equal_expense("Hotel", 10000, "alice"))?;
    service.record_settlement("Trip", "bob", "alice", 3333)?;

    let exported = Exporter::new(&service).export_full_json(File::create(&path)?)?;
    assert_eq!(exported.expenses.len(), 1);

    let snapshot = read_snapshot(BufReader::new(File::open(&path)?))?;
    let restored = SplitService::from_snapshot(snapshot);

    assert_eq!(restored.list_users()?.len(), 3);
    assert_eq!(
        restored.group_net_balances("Trip")?,
        service.group_net_balances("Trip")?
    );
    assert_eq!(
        restored.group_balances("Trip")?.transactions,
        service.group_balances("Trip")?.transactions
    );
    assert!(restored.check_integrity()?.is_ok());

    Ok(())
}

#[test]
fn test_integrity_check_flags_tampered_settlements() -> Result<()> {
    let service = TripFixture::service()?;
    service.record_expense("Trip", equal_expense("Hotel", 9000, "alice"))?;
    service.record_settlement("Trip", "bob", "alice", 1000)?;

    let mut snapshot = service.export_snapshot()?;
    let recorded = snapshot.settlements[0].clone();
    let negative = Settlement {
        id: Uuid::new_v4(),
        amount_cents: -5000,
        ..recorded.clone()
    };
    let to_self = Settlement {
        id: Uuid::new_v4(),
        to_user: recorded.from_user,
        ..recorded
    };
    snapshot.settlements.push(negative.clone());
    snapshot.settlements.push(to_self.clone());

    let mut out = Vec::new();
    write_snapshot(&snapshot, &mut out)?;
    let restored = SplitService::from_snapshot(read_snapshot(out.as_slice())?);
    let report = restored.check_integrity()?;

    assert!(!report.is_ok());
    let mut flagged: Vec<Uuid> = report
        .issues
        .iter()
        .filter_map(|issue| match issue {
            IntegrityIssue::InvalidSettlement { settlement_id, .. } => Some(*settlement_id),
            _ => None,
        })
        .collect();
    flagged.sort();
    let mut expected = vec![negative.id, to_self.id];
    expected.sort();
    assert_eq!(flagged, expected);

    Ok(())
}

#[test]
fn test_read_snapshot_rejects_unknown_version() -> Result<()> {
    let service = TripFixture::service()?;
    let mut snapshot = service.export_snapshot()?;
    snapshot.version = "99".to_string();

    let mut out = Vec::new();
    write_snapshot(&snapshot, &mut out)?;

    assert!(read_snapshot(out.as_slice()).is_err());
    Ok(())
}
