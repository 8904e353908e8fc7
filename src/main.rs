use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use performance_attribution::{
    create_batch, get_batch_summary, load_revenue_centers, run_analysis, setup_database,
    AnalysisConfig, FsDocumentStore, Period, SourcePaths, ValidationKind,
};
use rusqlite::Connection;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "mpa", version, about = "Monthly performance attribution batch runner")]
struct Cli {
    /// SQLite database holding batches and results
    #[arg(long, env = "MPA_DB", default_value = "mpa.db", global = true)]
    db: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register a batch from five local documents and run it
    Run {
        /// Analysis month, e.g. November2025 or 2025-11
        #[arg(long)]
        month: String,

        /// Revenue-by-project workbook (directory of sheets or .csv)
        #[arg(long)]
        revenue: String,

        #[arg(long)]
        compensation: String,

        /// Time-entry export
        #[arg(long)]
        hours: String,

        /// Expense export
        #[arg(long)]
        expenses: String,

        /// Income statement workbook
        #[arg(long)]
        ledger: String,

        /// JSON configuration overriding the built-in tables
        #[arg(long, env = "MPA_CONFIG")]
        config: Option<PathBuf>,

        /// Directory relative document paths are resolved against
        #[arg(long, default_value = ".")]
        root: PathBuf,

        /// Print the processing result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print a stored batch
    Show {
        #[arg(long)]
        batch: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let conn = Connection::open(&cli.db)
        .with_context(|| format!("Failed to open database {}", cli.db.display()))?;
    setup_database(&conn).context("Failed to set up database")?;

    match cli.command {
        Command::Run {
            month,
            revenue,
            compensation,
            hours,
            expenses,
            ledger,
            config,
            root,
            json,
        } => {
            let period = Period::parse(&month)?;
            let config = match config {
                Some(path) => AnalysisConfig::from_file(&path)
                    .with_context(|| format!("Failed to load config {}", path.display()))?,
                None => AnalysisConfig::default(),
            };
            let paths = SourcePaths::new(&revenue, &compensation, &hours, &expenses, &ledger);
            run_batch(&conn, period, &paths, &config, root, json)
        }
        Command::Show { batch } => show_batch(&conn, &batch),
    }
}

fn run_batch(
    conn: &Connection,
    period: Period,
    paths: &SourcePaths,
    config: &AnalysisConfig,
    root: PathBuf,
    json: bool,
) -> Result<()> {
    let batch_id = create_batch(conn, period, paths)?;
    let store = FsDocumentStore::new(root);

    let result = run_analysis(conn, &store, &batch_id, config)
        .with_context(|| format!("Batch {} failed", batch_id))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!("📊 Monthly Performance Analysis - {}", period);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    for line in &result.logs {
        println!("  {}", line);
    }

    let s = &result.summary;
    println!("\n💰 Summary (batch {})", result.batch_id);
    println!("  Revenue:        ${:>14.2}", s.total_revenue);
    println!("  Labor cost:     ${:>14.2}", s.total_labor_cost);
    println!("  Expense cost:   ${:>14.2}", s.total_expense_cost);
    println!("  Margin:         ${:>14.2} ({:.1}%)", s.total_margin_dollars, s.overall_margin_percent);
    println!(
        "  Pools:          SG&A ${:.2} | Data ${:.2} | Workplace ${:.2}",
        s.sga_pool, s.data_pool, s.workplace_pool
    );
    println!(
        "  Centers:        {} revenue, {} cost, {} non-revenue",
        s.revenue_center_count, s.cost_center_count, s.non_revenue_client_count
    );

    println!("\n🔍 Validation");
    for item in &result.validation {
        println!("  {} {}", marker(item.kind), item.message);
    }

    if result.validation_passed() {
        println!("\n✅ Batch completed, validation passed");
    } else {
        println!("\n⚠️  Batch saved with validation failures");
    }

    Ok(())
}

fn show_batch(conn: &Connection, batch_id: &str) -> Result<()> {
    let stored = get_batch_summary(conn, batch_id)?
        .with_context(|| format!("Batch {} not found", batch_id))?;

    println!("📊 Batch {} - {}", stored.batch.id, stored.batch.period);
    println!("  Status:  {}", stored.batch.status.as_str());
    if let Some(error) = &stored.batch.error_message {
        println!("  Error:   {}", error);
    }

    if let Some(s) = &stored.summary {
        println!(
            "  Revenue ${:.2} | Margin ${:.2} ({:.1}%)",
            s.total_revenue, s.total_margin_dollars, s.overall_margin_percent
        );
    }

    let centers = load_revenue_centers(conn, batch_id)?;
    if !centers.is_empty() {
        println!("\n  {:<18} {:>12} {:>12} {:>8}", "Code", "Revenue", "Margin", "Margin%");
        for rc in &centers {
            println!(
                "  {:<18} {:>12.2} {:>12.2} {:>7.1}%",
                rc.code, rc.revenue, rc.margin_dollars, rc.margin_percent
            );
        }
    }

    if !stored.validation.is_empty() {
        println!("\n🔍 Validation");
        for item in &stored.validation {
            println!("  {} {}", marker(item.kind), item.message);
        }
    }

    Ok(())
}

fn marker(kind: ValidationKind) -> &'static str {
    match kind {
        ValidationKind::Pass => "✓",
        ValidationKind::Warn => "⚠",
        ValidationKind::Fail => "✗",
    }
}
