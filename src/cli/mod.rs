use std::net::SocketAddr;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};

use crate::application::{LedgerService, MetricsFilter, RecordFilter, RecordView};
use crate::domain::{MovementKind, Quantity};
use crate::http::{self, AppState, ServerConfig};

/// Quartermaster - asset movement ledger
#[derive(Parser)]
#[command(name = "quartermaster")]
#[command(about = "Track purchases, transfers, assignments and expenditures of assets across bases")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, env = "QUARTERMASTER_DB", default_value = "quartermaster.db")]
    pub database: String,

    /// Operator name recorded on new movements
    #[arg(short, long, env = "QUARTERMASTER_USER", global = true)]
    pub user: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Manage bases
    #[command(subcommand)]
    Base(ReferenceCommands),

    /// Manage asset types
    #[command(subcommand, name = "asset-type")]
    AssetType(ReferenceCommands),

    /// Record a purchase of new stock at a base
    Purchase {
        /// Number of units
        quantity: Quantity,

        /// Receiving base name
        #[arg(long)]
        base: String,

        /// Asset type name
        #[arg(long)]
        asset_type: String,

        /// Date of the purchase (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,
    },

    /// Record a transfer of stock between two bases
    Transfer {
        /// Number of units
        quantity: Quantity,

        /// Source base name
        #[arg(long)]
        from: String,

        /// Destination base name
        #[arg(long)]
        to: String,

        /// Asset type name
        #[arg(long)]
        asset_type: String,

        /// Date of the transfer (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,
    },

    /// Record an assignment of stock to personnel
    Assign {
        /// Number of units
        quantity: Quantity,

        /// Name of the person receiving the assets
        #[arg(long)]
        personnel: String,

        /// Base name
        #[arg(long)]
        base: String,

        /// Asset type name
        #[arg(long)]
        asset_type: String,

        /// Date of the assignment (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,
    },

    /// Record an expenditure (consumption or loss) of stock
    Expend {
        /// Number of units
        quantity: Quantity,

        /// Base name
        #[arg(long)]
        base: String,

        /// Asset type name
        #[arg(long)]
        asset_type: String,

        /// Why the stock was expended
        #[arg(short, long)]
        reason: Option<String>,

        /// Date of the expenditure (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,
    },

    /// List purchases
    Purchases(ListArgs),

    /// List transfers
    Transfers {
        /// Filter by source base name
        #[arg(long)]
        from: Option<String>,

        /// Filter by destination base name
        #[arg(long)]
        to: Option<String>,

        #[command(flatten)]
        list: ListArgs,
    },

    /// List assignments
    Assignments(ListArgs),

    /// List expenditures
    Expenditures(ListArgs),

    /// Show dashboard metrics
    Dashboard {
        /// Filter by base name (omit for all bases)
        #[arg(long)]
        base: Option<String>,

        /// Filter by asset type name (omit for all types)
        #[arg(long)]
        asset_type: Option<String>,

        /// Window start (YYYY-MM-DD, inclusive)
        #[arg(long)]
        from_date: Option<String>,

        /// Window end (YYYY-MM-DD, inclusive)
        #[arg(long)]
        to_date: Option<String>,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the transaction log
    Log {
        /// Maximum number of entries to show
        #[arg(short, long, default_value = "20")]
        limit: u32,
    },

    /// Serve the REST API
    Serve {
        /// Address to listen on
        #[arg(long, env = "QUARTERMASTER_ADDR", default_value = "127.0.0.1:8000")]
        addr: SocketAddr,

        /// Allowed CORS origin (repeatable; any origin when omitted)
        #[arg(long = "cors-origin")]
        cors_origins: Vec<String>,
    },
}

#[derive(Subcommand)]
pub enum ReferenceCommands {
    /// Add a new entry
    Add {
        /// Unique name
        name: String,
    },

    /// List all entries
    List,
}

#[derive(Args)]
pub struct ListArgs {
    /// Filter by base name
    #[arg(long)]
    pub base: Option<String>,

    /// Filter by asset type name
    #[arg(long)]
    pub asset_type: Option<String>,

    /// Filter from date (YYYY-MM-DD)
    #[arg(long)]
    pub from_date: Option<String>,

    /// Filter to date (YYYY-MM-DD)
    #[arg(long)]
    pub to_date: Option<String>,

    /// Maximum number of records to show
    #[arg(short, long)]
    pub limit: Option<u32>,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        if matches!(self.command, Commands::Init) {
            LedgerService::init(&self.database).await?;
            println!("Database initialized: {}", self.database);
            return Ok(());
        }

        let service = LedgerService::connect(&self.database).await?;
        let user = self.user;

        match self.command {
            Commands::Init => unreachable!("handled above"),

            Commands::Base(cmd) => run_base_command(&service, cmd).await?,

            Commands::AssetType(cmd) => run_asset_type_command(&service, cmd).await?,

            Commands::Purchase {
                quantity,
                base,
                asset_type,
                date,
            } => {
                let base = service.get_base(&base).await?;
                let asset_type = service.get_asset_type(&asset_type).await?;
                let record = service
                    .create_purchase(base.id, asset_type.id, quantity, record_date(date)?, user)
                    .await?;
                println!(
                    "Recorded purchase: {} x {} at {} ({})",
                    record.quantity, asset_type.name, base.name, record.id
                );
            }

            Commands::Transfer {
                quantity,
                from,
                to,
                asset_type,
                date,
            } => {
                let from = service.get_base(&from).await?;
                let to = service.get_base(&to).await?;
                let asset_type = service.get_asset_type(&asset_type).await?;
                let record = service
                    .create_transfer(
                        from.id,
                        to.id,
                        asset_type.id,
                        quantity,
                        record_date(date)?,
                        user,
                    )
                    .await?;
                println!(
                    "Recorded transfer: {} x {} {} -> {} ({})",
                    record.quantity, asset_type.name, from.name, to.name, record.id
                );
            }

            Commands::Assign {
                quantity,
                personnel,
                base,
                asset_type,
                date,
            } => {
                let base = service.get_base(&base).await?;
                let asset_type = service.get_asset_type(&asset_type).await?;
                let record = service
                    .create_assignment(
                        personnel.clone(),
                        base.id,
                        asset_type.id,
                        quantity,
                        record_date(date)?,
                        user,
                    )
                    .await?;
                println!(
                    "Recorded assignment: {} x {} to {} at {} ({})",
                    record.quantity,
                    asset_type.name,
                    personnel.trim(),
                    base.name,
                    record.id
                );
            }

            Commands::Expend {
                quantity,
                base,
                asset_type,
                reason,
                date,
            } => {
                let base = service.get_base(&base).await?;
                let asset_type = service.get_asset_type(&asset_type).await?;
                let record = service
                    .create_expenditure(
                        base.id,
                        asset_type.id,
                        quantity,
                        record_date(date)?,
                        reason,
                        user,
                    )
                    .await?;
                println!(
                    "Recorded expenditure: {} x {} at {} ({})",
                    record.quantity, asset_type.name, base.name, record.id
                );
            }

            Commands::Purchases(args) => {
                run_list_command(&service, MovementKind::Purchase, args, None, None).await?
            }

            Commands::Transfers { from, to, list } => {
                run_list_command(&service, MovementKind::Transfer, list, from, to).await?
            }

            Commands::Assignments(args) => {
                run_list_command(&service, MovementKind::Assignment, args, None, None).await?
            }

            Commands::Expenditures(args) => {
                run_list_command(&service, MovementKind::Expenditure, args, None, None).await?
            }

            Commands::Dashboard {
                base,
                asset_type,
                from_date,
                to_date,
                json,
            } => {
                run_dashboard_command(&service, base, asset_type, from_date, to_date, json).await?
            }

            Commands::Log { limit } => run_log_command(&service, limit).await?,

            Commands::Serve { addr, cors_origins } => {
                let state = AppState::new(service, user);
                let config = ServerConfig {
                    addr,
                    allowed_origins: cors_origins,
                };
                println!("Serving ledger API on http://{}", addr);
                http::serve(state, config).await?;
            }
        }

        Ok(())
    }
}

async fn run_base_command(service: &LedgerService, cmd: ReferenceCommands) -> Result<()> {
    match cmd {
        ReferenceCommands::Add { name } => {
            let base = service.create_base(&name).await?;
            println!("Created base: {} (id {})", base.name, base.id);
        }
        ReferenceCommands::List => {
            let bases = service.list_bases().await?;
            print_reference_table(bases.into_iter().map(|b| (b.id, b.name)).collect(), "bases");
        }
    }
    Ok(())
}

async fn run_asset_type_command(service: &LedgerService, cmd: ReferenceCommands) -> Result<()> {
    match cmd {
        ReferenceCommands::Add { name } => {
            let asset_type = service.create_asset_type(&name).await?;
            println!("Created asset type: {} (id {})", asset_type.name, asset_type.id);
        }
        ReferenceCommands::List => {
            let types = service.list_asset_types().await?;
            print_reference_table(
                types.into_iter().map(|t| (t.id, t.name)).collect(),
                "asset types",
            );
        }
    }
    Ok(())
}

fn print_reference_table(entries: Vec<(i64, String)>, label: &str) {
    if entries.is_empty() {
        println!("No {} found.", label);
        return;
    }
    println!("{:<6} NAME", "ID");
    println!("{}", "-".repeat(32));
    for (id, name) in entries {
        println!("{:<6} {}", id, name);
    }
}

async fn run_list_command(
    service: &LedgerService,
    kind: MovementKind,
    args: ListArgs,
    from: Option<String>,
    to: Option<String>,
) -> Result<()> {
    let filter = RecordFilter {
        base: resolve_base(service, args.base).await?,
        from_base: resolve_base(service, from).await?,
        to_base: resolve_base(service, to).await?,
        asset_type: resolve_asset_type(service, args.asset_type).await?,
        date_from: parse_optional_date(args.from_date).context("Invalid from-date")?,
        date_to: parse_optional_date(args.to_date).context("Invalid to-date")?,
        limit: args.limit.map(|l| l as usize),
    };

    let records = service.list_records(kind, filter).await?;
    if records.is_empty() {
        println!("No {}s found.", kind);
        return Ok(());
    }

    match kind {
        MovementKind::Purchase => println!(
            "{:<12} {:>8} {:<15} {:<15} BY",
            "DATE", "QTY", "BASE", "ASSET TYPE"
        ),
        MovementKind::Transfer => println!(
            "{:<12} {:>8} {:<15} {:<15} {:<15} BY",
            "DATE", "QTY", "FROM", "TO", "ASSET TYPE"
        ),
        MovementKind::Assignment => println!(
            "{:<12} {:>8} {:<20} {:<15} {:<15} BY",
            "DATE", "QTY", "PERSONNEL", "BASE", "ASSET TYPE"
        ),
        MovementKind::Expenditure => println!(
            "{:<12} {:>8} {:<15} {:<15} REASON",
            "DATE", "QTY", "BASE", "ASSET TYPE"
        ),
    }
    println!("{}", "-".repeat(80));

    for record in &records {
        println!("{}", format_record_row(record));
    }
    Ok(())
}

fn format_record_row(record: &RecordView) -> String {
    match record {
        RecordView::Purchase(p) => format!(
            "{:<12} {:>8} {:<15} {:<15} {}",
            p.date,
            p.quantity,
            truncate(&p.base_name, 15),
            truncate(&p.asset_type_name, 15),
            p.created_by.as_deref().unwrap_or("")
        ),
        RecordView::Transfer(t) => format!(
            "{:<12} {:>8} {:<15} {:<15} {:<15} {}",
            t.date,
            t.quantity,
            truncate(&t.from_base_name, 15),
            truncate(&t.to_base_name, 15),
            truncate(&t.asset_type_name, 15),
            t.created_by.as_deref().unwrap_or("")
        ),
        RecordView::Assignment(a) => format!(
            "{:<12} {:>8} {:<20} {:<15} {:<15} {}",
            a.date,
            a.quantity,
            truncate(&a.personnel_name, 20),
            truncate(&a.base_name, 15),
            truncate(&a.asset_type_name, 15),
            a.created_by.as_deref().unwrap_or("")
        ),
        RecordView::Expenditure(e) => format!(
            "{:<12} {:>8} {:<15} {:<15} {}",
            e.date,
            e.quantity,
            truncate(&e.base_name, 15),
            truncate(&e.asset_type_name, 15),
            truncate(&e.reason, 30)
        ),
    }
}

async fn run_dashboard_command(
    service: &LedgerService,
    base: Option<String>,
    asset_type: Option<String>,
    from_date: Option<String>,
    to_date: Option<String>,
    json: bool,
) -> Result<()> {
    let filter = MetricsFilter {
        base: resolve_base(service, base.clone()).await?,
        asset_type: resolve_asset_type(service, asset_type.clone()).await?,
        date_from: parse_optional_date(from_date).context("Invalid from-date")?,
        date_to: parse_optional_date(to_date).context("Invalid to-date")?,
    };

    let metrics = service.compute_metrics(filter.clone()).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&metrics)?);
        return Ok(());
    }

    let window = match (filter.date_from, filter.date_to) {
        (None, None) => "all time".to_string(),
        (from, to) => format!(
            "{} to {}",
            from.map(|d| d.to_string()).unwrap_or_else(|| "beginning".into()),
            to.map(|d| d.to_string()).unwrap_or_else(|| "today".into())
        ),
    };

    println!(
        "Dashboard: {} / {} ({})",
        base.as_deref().unwrap_or("all bases"),
        asset_type.as_deref().unwrap_or("all asset types"),
        window
    );
    println!();
    println!("  Opening balance: {:>10}", metrics.opening_balance);
    println!("  Net movement:    {:>10}", metrics.net_movement);
    println!("  Assigned:        {:>10}", metrics.assigned);
    println!("  Expended:        {:>10}", metrics.expended);
    println!("  Closing balance: {:>10}", metrics.closing_balance);
    Ok(())
}

async fn run_log_command(service: &LedgerService, limit: u32) -> Result<()> {
    let entries = service.list_audit_log(Some(limit as usize)).await?;
    if entries.is_empty() {
        println!("No log entries found.");
        return Ok(());
    }

    println!("{:<20} {:<10} {:<15} DETAILS", "TIMESTAMP", "ACTION", "USER");
    println!("{}", "-".repeat(80));
    for entry in entries {
        println!(
            "{:<20} {:<10} {:<15} {}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            entry.action,
            truncate(entry.user.as_deref().unwrap_or("-"), 15),
            truncate(&entry.details.to_string(), 60)
        );
    }
    Ok(())
}

async fn resolve_base(service: &LedgerService, name: Option<String>) -> Result<Option<i64>> {
    match name {
        Some(name) => Ok(Some(service.get_base(&name).await?.id)),
        None => Ok(None),
    }
}

async fn resolve_asset_type(service: &LedgerService, name: Option<String>) -> Result<Option<i64>> {
    match name {
        Some(name) => Ok(Some(service.get_asset_type(&name).await?.id)),
        None => Ok(None),
    }
}

/// Parse a record date, defaulting to today.
fn record_date(date: Option<String>) -> Result<NaiveDate> {
    match date {
        Some(date_str) => parse_date(&date_str)
            .with_context(|| format!("Invalid date format '{}'. Use YYYY-MM-DD", date_str)),
        None => Ok(Utc::now().date_naive()),
    }
}

fn parse_optional_date(date: Option<String>) -> Result<Option<NaiveDate>> {
    date.map(|s| parse_date(&s)).transpose()
}

fn parse_date(date_str: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d")
        .context("Date must be in YYYY-MM-DD format")
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
