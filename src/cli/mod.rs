use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

use crate::application::{ExpenseDetails, NewExpense, SplitService};
use crate::domain::{SplitType, format_cents, parse_cents};
use crate::io::{
    Exporter, ImportOptions, ImportResult, Importer, parse_shares, read_snapshot, write_snapshot,
};
use crate::storage::LedgerSnapshot;

/// Divvy - shared expense splitting
#[derive(Parser)]
#[command(name = "divvy")]
#[command(about = "Split shared expenses within groups and work out who pays whom")]
#[command(version)]
pub struct Cli {
    /// Ledger file path
    #[arg(short, long, env = "DIVVY_LEDGER", default_value = "divvy.json")]
    pub ledger: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new ledger file
    Init,

    /// User management commands
    #[command(subcommand)]
    User(UserCommands),

    /// Group management commands
    #[command(subcommand)]
    Group(GroupCommands),

    /// Expense commands
    #[command(subcommand)]
    Expense(ExpenseCommands),

    /// Record a payment from one member to another
    Settle {
        /// Amount paid (e.g., "25.00" or "25")
        amount: String,

        /// Group name
        #[arg(short, long)]
        group: String,

        /// Member who paid
        #[arg(long)]
        from: String,

        /// Member who received the money
        #[arg(long)]
        to: String,
    },

    /// Show who owes whom, for a group or for a user across groups
    Balances {
        /// Group name (settle-up plan)
        #[arg(short, long, conflicts_with = "user")]
        group: Option<String>,

        /// User name (summary across all groups)
        #[arg(short, long)]
        user: Option<String>,

        /// Output format: table, json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Verify ledger integrity
    Check {
        /// Output format: table, json
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Export data to CSV or JSON
    Export {
        /// What to export: transactions, summary, expenses, full
        export_type: String,

        /// Group name (transactions, expenses)
        #[arg(short, long)]
        group: Option<String>,

        /// User name (summary)
        #[arg(short, long)]
        user: Option<String>,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Import data from CSV or JSON
    Import {
        /// What to import: expenses, full
        import_type: String,

        /// Group name (expenses)
        #[arg(short, long)]
        group: Option<String>,

        /// Input file (stdin if omitted)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Validate without importing
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// Register a new user
    Add {
        /// User name (must be unique)
        name: String,

        /// Email address
        #[arg(short, long)]
        email: Option<String>,
    },

    /// List all users
    List {
        /// Output format: table, json
        #[arg(long, default_value = "table")]
        format: String,
    },
}

#[derive(Subcommand)]
pub enum GroupCommands {
    /// Create a new group
    Create {
        /// Group name (must be unique)
        name: String,

        /// Creator of the group (becomes the first member)
        #[arg(long = "by")]
        created_by: String,

        /// Other members, comma separated
        #[arg(short, long, value_delimiter = ',')]
        members: Vec<String>,

        /// Description
        #[arg(short, long)]
        description: Option<String>,
    },

    /// List all groups
    List,

    /// Show group details
    Show {
        /// Group name
        name: String,
    },

    /// Add a user to a group
    AddMember {
        /// Group name
        group: String,

        /// User name
        user: String,
    },

    /// Remove a user from a group (only once they are settled up)
    RemoveMember {
        /// Group name
        group: String,

        /// User name
        user: String,
    },
}

#[derive(Subcommand)]
pub enum ExpenseCommands {
    /// Record a shared expense
    Add {
        /// Total amount (e.g., "100.00" or "100")
        amount: String,

        /// Group name
        #[arg(short, long)]
        group: String,

        /// Member who paid
        #[arg(short, long)]
        paid_by: String,

        /// What the expense was for
        #[arg(short, long)]
        description: String,

        /// Split type: equal, exact, percentage
        #[arg(short, long, default_value = "equal")]
        split: String,

        /// Shares as "name[:value];..." (amounts for exact, percentages for
        /// percentage). Omit on an equal split to include every member.
        #[arg(long, default_value = "")]
        shares: String,

        /// Date of the expense (YYYY-MM-DD, defaults to now)
        #[arg(long)]
        date: Option<String>,

        /// Show the resulting shares without recording anything
        #[arg(long)]
        dry_run: bool,
    },

    /// List expenses of a group, newest first
    List {
        /// Group name
        #[arg(short, long)]
        group: String,

        /// Page number, starting at 0
        #[arg(long, default_value = "0")]
        page: usize,

        /// Expenses per page
        #[arg(long, default_value = "20")]
        size: usize,

        /// Output format: table, json
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Show one expense with its shares
    Show {
        /// Expense ID
        id: String,

        /// Group name
        #[arg(short, long)]
        group: String,

        /// Output format: table, json
        #[arg(long, default_value = "table")]
        format: String,
    },
}

impl Cli {
    pub fn run(self) -> Result<()> {
        debug!(ledger = %self.ledger.display(), "running command");

        match self.command {
            Commands::Init => {
                if self.ledger.exists() {
                    anyhow::bail!("Ledger already exists: {}", self.ledger.display());
                }
                save_snapshot(&self.ledger, &LedgerSnapshot::empty())?;
                println!("Ledger initialized: {}", self.ledger.display());
            }

            Commands::User(user_cmd) => {
                let service = load_service(&self.ledger)?;
                if run_user_command(&service, user_cmd)? {
                    save_service(&self.ledger, &service)?;
                }
            }

            Commands::Group(group_cmd) => {
                let service = load_service(&self.ledger)?;
                if run_group_command(&service, group_cmd)? {
                    save_service(&self.ledger, &service)?;
                }
            }

            Commands::Expense(expense_cmd) => {
                let service = load_service(&self.ledger)?;
                if run_expense_command(&service, expense_cmd)? {
                    save_service(&self.ledger, &service)?;
                }
            }

            Commands::Settle {
                amount,
                group,
                from,
                to,
            } => {
                let service = load_service(&self.ledger)?;
                let amount_cents =
                    parse_cents(&amount).context("Invalid amount format. Use '25.00' or '25'")?;

                let result = service.record_settlement(&group, &from, &to, amount_cents)?;
                save_service(&self.ledger, &service)?;

                println!(
                    "Recorded settlement: {} {} -> {} ({})",
                    format_cents(result.settlement.amount_cents),
                    result.from_user_name,
                    result.to_user_name,
                    result.settlement.id
                );
            }

            Commands::Balances {
                group,
                user,
                format,
            } => {
                let service = load_service(&self.ledger)?;
                match (group, user) {
                    (Some(group), _) => run_group_balances(&service, &group, &format)?,
                    (None, Some(user)) => run_user_balances(&service, &user, &format)?,
                    (None, None) => anyhow::bail!("Pass either --group or --user"),
                }
            }

            Commands::Check { format } => {
                let service = load_service(&self.ledger)?;
                run_check_command(&service, &format)?;
            }

            Commands::Export {
                export_type,
                group,
                user,
                output,
            } => {
                let service = load_service(&self.ledger)?;
                run_export_command(
                    &service,
                    &export_type,
                    group.as_deref(),
                    user.as_deref(),
                    output.as_deref(),
                )?;
            }

            Commands::Import {
                import_type,
                group,
                input,
                dry_run,
            } => {
                run_import_command(
                    &self.ledger,
                    &import_type,
                    group.as_deref(),
                    input.as_deref(),
                    dry_run,
                )?;
            }
        }

        Ok(())
    }
}

// ========================
// Ledger file handling
// ========================

fn load_service(path: &Path) -> Result<SplitService> {
    if !path.exists() {
        anyhow::bail!(
            "Ledger not found: {}. Run 'divvy init' first.",
            path.display()
        );
    }
    let file =
        File::open(path).with_context(|| format!("Failed to open ledger: {}", path.display()))?;
    let snapshot = read_snapshot(BufReader::new(file))
        .with_context(|| format!("Failed to read ledger: {}", path.display()))?;
    Ok(SplitService::from_snapshot(snapshot))
}

fn save_service(path: &Path, service: &SplitService) -> Result<()> {
    save_snapshot(path, &service.export_snapshot()?)
}

fn save_snapshot(path: &Path, snapshot: &LedgerSnapshot) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to write ledger: {}", path.display()))?;
    write_snapshot(snapshot, BufWriter::new(file))?;
    debug!(ledger = %path.display(), "saved ledger");
    Ok(())
}

// ========================
// Subcommands
// ========================

/// Returns whether the ledger changed.
fn run_user_command(service: &SplitService, cmd: UserCommands) -> Result<bool> {
    match cmd {
        UserCommands::Add { name, email } => {
            let user = service.create_user(&name, email)?;
            println!("Created user: {} ({})", user.name, user.id);
            Ok(true)
        }

        UserCommands::List { format } => {
            let users = service.list_users()?;
            if format == "json" {
                println!("{}", serde_json::to_string_pretty(&users)?);
            } else if users.is_empty() {
                println!("No users found.");
            } else {
                println!("{:<20} {:<30} {:<12}", "NAME", "EMAIL", "JOINED");
                println!("{}", "-".repeat(64));
                for user in users {
                    println!(
                        "{:<20} {:<30} {:<12}",
                        truncate(&user.name, 20),
                        truncate(user.email.as_deref().unwrap_or(""), 30),
                        user.created_at.format("%Y-%m-%d")
                    );
                }
            }
            Ok(false)
        }
    }
}

fn run_group_command(service: &SplitService, cmd: GroupCommands) -> Result<bool> {
    match cmd {
        GroupCommands::Create {
            name,
            created_by,
            members,
            description,
        } => {
            let group = service.create_group(&name, &created_by, description, &members)?;
            println!(
                "Created group: {} ({} members)",
                group.name,
                group.members.len()
            );
            Ok(true)
        }

        GroupCommands::List => {
            let groups = service.list_groups()?;
            if groups.is_empty() {
                println!("No groups found.");
            } else {
                println!("{:<20} {:>8} {:<12}", "NAME", "MEMBERS", "CREATED");
                println!("{}", "-".repeat(42));
                for group in groups {
                    println!(
                        "{:<20} {:>8} {:<12}",
                        truncate(&group.name, 20),
                        group.members.len(),
                        group.created_at.format("%Y-%m-%d")
                    );
                }
            }
            Ok(false)
        }

        GroupCommands::Show { name } => {
            let info = service.get_group_info(&name)?;

            println!("Group: {}", info.name);
            println!("  ID:          {}", info.group_id);
            if let Some(desc) = &info.description {
                println!("  Description: {}", desc);
            }
            println!(
                "  Created:     {}",
                info.created_at.format("%Y-%m-%d %H:%M:%S")
            );
            println!("  Expenses:    {}", info.expense_count);
            println!("  Settlements: {}", info.settlement_count);
            println!("  Total spent: {}", format_cents(info.total_spent));
            println!();
            println!("  Members:");
            for member in &info.members {
                println!("    - {}", member.name);
            }
            Ok(false)
        }

        GroupCommands::AddMember { group, user } => {
            service.add_member(&group, &user)?;
            println!("Added {} to {}", user, group);
            Ok(true)
        }

        GroupCommands::RemoveMember { group, user } => {
            service.remove_member(&group, &user)?;
            println!("Removed {} from {}", user, group);
            Ok(true)
        }
    }
}

fn run_expense_command(service: &SplitService, cmd: ExpenseCommands) -> Result<bool> {
    match cmd {
        ExpenseCommands::Add {
            amount,
            group,
            paid_by,
            description,
            split,
            shares,
            date,
            dry_run,
        } => {
            let total_cents =
                parse_cents(&amount).context("Invalid amount format. Use '100.00' or '100'")?;
            let split_type: SplitType = split.parse().map_err(|e| {
                anyhow::anyhow!(
                    "Invalid split type '{}'. Valid types: equal, exact, percentage. Error: {}",
                    split,
                    e
                )
            })?;
            let shares = parse_shares(&shares, split_type)
                .map_err(|e| anyhow::anyhow!("Invalid shares: {}", e))?;
            let created_at = date
                .map(|d| {
                    parse_date(&d)
                        .with_context(|| format!("Invalid date format '{}'. Use YYYY-MM-DD", d))
                })
                .transpose()?;

            let new_expense = NewExpense {
                description,
                total_cents,
                paid_by,
                split_type,
                shares,
                created_at,
            };

            if dry_run {
                let details = service.preview_expense(&group, new_expense)?;
                println!("Preview (nothing recorded):");
                print_expense(&details);
                Ok(false)
            } else {
                let details = service.record_expense(&group, new_expense)?;
                println!(
                    "Recorded expense: {} {} paid by {} ({})",
                    format_cents(details.total_cents),
                    details.description,
                    details.paid_by_name,
                    details.id
                );
                Ok(true)
            }
        }

        ExpenseCommands::List {
            group,
            page,
            size,
            format,
        } => {
            let expenses = service.list_expenses(&group, page, size)?;
            if format == "json" {
                println!("{}", serde_json::to_string_pretty(&expenses)?);
            } else if expenses.is_empty() {
                println!("No expenses found.");
            } else {
                println!(
                    "{:<12} {:>10} {:<15} {:<10} DESCRIPTION",
                    "DATE", "AMOUNT", "PAID BY", "SPLIT"
                );
                println!("{}", "-".repeat(70));
                for expense in &expenses {
                    println!(
                        "{:<12} {:>10} {:<15} {:<10} {}",
                        expense.created_at.format("%Y-%m-%d"),
                        format_cents(expense.total_cents),
                        truncate(&expense.paid_by_name, 15),
                        expense.split_type,
                        truncate(&expense.description, 30)
                    );
                }
            }
            Ok(false)
        }

        ExpenseCommands::Show { id, group, format } => {
            let expense_id =
                Uuid::parse_str(&id).context("Invalid expense ID format (expected UUID)")?;
            let details = service.get_expense(&group, expense_id)?;
            if format == "json" {
                println!("{}", serde_json::to_string_pretty(&details)?);
            } else {
                print_expense(&details);
            }
            Ok(false)
        }
    }
}

fn print_expense(details: &ExpenseDetails) {
    println!("Expense: {}", details.id);
    println!("  Description: {}", details.description);
    println!(
        "  Date:        {}",
        details.created_at.format("%Y-%m-%d %H:%M:%S")
    );
    println!("  Amount:      {}", format_cents(details.total_cents));
    println!("  Paid by:     {}", details.paid_by_name);
    println!("  Split:       {}", details.split_type);
    println!();
    println!("  Shares:");
    for split in &details.splits {
        println!(
            "    {:<20} {:>12}",
            truncate(&split.user_name, 20),
            format_cents(split.amount_cents)
        );
    }
}

fn run_group_balances(service: &SplitService, group: &str, format: &str) -> Result<()> {
    let balances = service.group_balances(group)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&balances)?);
        }
        "csv" => {
            println!("from,to,amount");
            for t in &balances.transactions {
                println!(
                    "{},{},{}",
                    t.from_user_name,
                    t.to_user_name,
                    format_cents(t.amount_cents)
                );
            }
        }
        _ => {
            println!("Settle-up plan for {}", balances.group_name);
            println!();
            if balances.transactions.is_empty() {
                println!("Everyone is settled up.");
            } else {
                println!("{:<20} {:<20} {:>12}", "FROM", "TO", "AMOUNT");
                println!("{}", "-".repeat(54));
                for t in &balances.transactions {
                    println!(
                        "{:<20} {:<20} {:>12}",
                        truncate(&t.from_user_name, 20),
                        truncate(&t.to_user_name, 20),
                        format_cents(t.amount_cents)
                    );
                }
            }
        }
    }
    Ok(())
}

fn run_user_balances(service: &SplitService, user: &str, format: &str) -> Result<()> {
    let summary = service.user_balances(user)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        "csv" => {
            println!("direction,counterparty,amount");
            for c in &summary.owes {
                println!("owes,{},{}", c.user_name, format_cents(c.amount_cents));
            }
            for c in &summary.owed_by {
                println!("owed_by,{},{}", c.user_name, format_cents(c.amount_cents));
            }
            println!("net,,{}", format_cents(summary.net_balance));
        }
        _ => {
            println!("Balances for {}", summary.user_name);
            println!();
            if summary.owes.is_empty() && summary.owed_by.is_empty() {
                println!("Nothing owed either way.");
            }
            if !summary.owes.is_empty() {
                println!("Owes:");
                for c in &summary.owes {
                    println!(
                        "  {:<20} {:>12}",
                        truncate(&c.user_name, 20),
                        format_cents(c.amount_cents)
                    );
                }
            }
            if !summary.owed_by.is_empty() {
                println!("Owed by:");
                for c in &summary.owed_by {
                    println!(
                        "  {:<20} {:>12}",
                        truncate(&c.user_name, 20),
                        format_cents(c.amount_cents)
                    );
                }
            }
            println!("{}", "-".repeat(35));
            println!("  {:<20} {:>12}", "Net:", format_cents(summary.net_balance));
        }
    }
    Ok(())
}

fn run_check_command(service: &SplitService, format: &str) -> Result<()> {
    let report = service.check_integrity()?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Checking ledger integrity...\n");
        println!("Users:       {}", report.user_count);
        println!("Groups:      {}", report.group_count);
        println!("Expenses:    {}", report.expense_count);
        println!("Settlements: {}", report.settlement_count);
        println!();

        if report.is_ok() {
            println!("Ledger is consistent.");
        } else {
            println!("Issues found:");
            for issue in &report.issues {
                println!("  - {}", issue);
            }
        }
    }

    if !report.is_ok() {
        anyhow::bail!("Ledger integrity check failed");
    }
    Ok(())
}

fn run_export_command(
    service: &SplitService,
    export_type: &str,
    group: Option<&str>,
    user: Option<&str>,
    output: Option<&Path>,
) -> Result<()> {
    use std::io::{Write, stdout};

    let exporter = Exporter::new(service);

    let writer: Box<dyn Write> = match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(stdout()),
    };

    match export_type {
        "transactions" => {
            let group = required_arg(group, export_type, "group")?;
            let count = exporter.export_transactions_csv(group, writer)?;
            if output.is_some() {
                eprintln!("Exported {} transactions", count);
            }
        }
        "summary" => {
            let user = required_arg(user, export_type, "user")?;
            let count = exporter.export_summary_csv(user, writer)?;
            if output.is_some() {
                eprintln!("Exported {} counterparties", count);
            }
        }
        "expenses" => {
            let group = required_arg(group, export_type, "group")?;
            let count = exporter.export_expenses_csv(group, writer)?;
            if output.is_some() {
                eprintln!("Exported {} expenses", count);
            }
        }
        "full" => {
            let snapshot = exporter.export_full_json(writer)?;
            if output.is_some() {
                eprintln!(
                    "Exported full ledger: {} users, {} groups, {} expenses, {} settlements",
                    snapshot.users.len(),
                    snapshot.groups.len(),
                    snapshot.expenses.len(),
                    snapshot.settlements.len()
                );
            }
        }
        _ => {
            anyhow::bail!(
                "Invalid export type '{}'. Valid types: transactions, summary, expenses, full",
                export_type
            );
        }
    }

    Ok(())
}

fn run_import_command(
    ledger: &Path,
    import_type: &str,
    group: Option<&str>,
    input: Option<&Path>,
    dry_run: bool,
) -> Result<()> {
    use std::io::{Read, stdin};

    let reader: Box<dyn Read> = match input {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open input file: {}", path.display()))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(stdin()),
    };

    let result = match import_type {
        "expenses" => {
            let group = required_arg(group, import_type, "group")?;
            let service = load_service(ledger)?;
            let result = Importer::new(&service).import_expenses_csv(
                group,
                reader,
                ImportOptions { dry_run },
            )?;
            if !dry_run && result.imported > 0 {
                save_service(ledger, &service)?;
            }
            result
        }
        "full" => {
            // Replaces the ledger wholesale, but only with a consistent one.
            let snapshot = read_snapshot(reader)?;
            let service = SplitService::from_snapshot(snapshot);
            let report = service.check_integrity()?;
            if !report.is_ok() {
                for issue in &report.issues {
                    eprintln!("  - {}", issue);
                }
                anyhow::bail!("Refusing to import an inconsistent ledger");
            }
            if !dry_run {
                save_service(ledger, &service)?;
            }
            ImportResult {
                imported: report.user_count
                    + report.group_count
                    + report.expense_count
                    + report.settlement_count,
                ..Default::default()
            }
        }
        _ => {
            anyhow::bail!(
                "Invalid import type '{}'. Valid types: expenses, full",
                import_type
            );
        }
    };

    if dry_run {
        println!("Validation complete (nothing imported)");
    } else {
        println!("Import complete");
    }
    println!("  Imported: {}", result.imported);
    println!("  Skipped:  {}", result.skipped);
    println!("  Errors:   {}", result.errors.len());

    if !result.errors.is_empty() {
        println!("\nErrors:");
        for error in result.errors.iter().take(10) {
            println!(
                "  Line {}: {}",
                error.line,
                error
                    .field
                    .as_ref()
                    .map(|f| format!("{}: ", f))
                    .unwrap_or_default()
                    + &error.error
            );
        }
        if result.errors.len() > 10 {
            println!("  ... and {} more errors", result.errors.len() - 10);
        }
    }

    Ok(())
}

// ========================
// Helpers
// ========================

fn required_arg<'a>(value: Option<&'a str>, command: &str, flag: &str) -> Result<&'a str> {
    value.ok_or_else(|| anyhow::anyhow!("'{}' needs --{}", command, flag))
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

fn parse_date(date_str: &str) -> Result<DateTime<Utc>> {
    use chrono::NaiveDate;

    let naive_date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .context("Date must be in YYYY-MM-DD format")?;

    let naive_datetime = naive_date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| anyhow::anyhow!("Invalid date"))?;

    Ok(naive_datetime.and_utc())
}
