use sql_gateway::config::GatewayConfig;
use sql_gateway::gateway::SqlGateway;
use sql_gateway::tools::{render_query_result, render_table_schema};

use anyhow::{anyhow, bail, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sql-gateway")]
#[command(about = "Load CSV files into SQLite and run validated read-only queries against them")]
#[command(version)]
struct Args {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a CSV file into a table, replacing any table of the same name
    Load {
        /// CSV file to load
        csv_file: PathBuf,

        /// Table name (default: the file stem)
        #[arg(short, long)]
        table: Option<String>,

        /// Database file (or set SQL_GATEWAY_DB)
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Run a read-only SQL query
    Query {
        /// The SELECT statement
        sql: String,

        /// Database file (or set SQL_GATEWAY_DB)
        #[arg(long)]
        db: Option<PathBuf>,

        /// Row ceiling (or set SQL_GATEWAY_MAX_ROWS)
        #[arg(long)]
        max_rows: Option<u64>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the tables, or one table's schema
    Schema {
        /// Table to describe; lists all tables when omitted
        table: Option<String>,

        /// Database file (or set SQL_GATEWAY_DB)
        #[arg(long)]
        db: Option<PathBuf>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print version information
    Version,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    match args.command {
        Commands::Load { csv_file, table, db } => run_load(csv_file, table, db),
        Commands::Query { sql, db, max_rows, json } => run_query(sql, db, max_rows, json),
        Commands::Schema { table, db, json } => run_schema(table, db, json),
        Commands::Version => {
            println!("sql-gateway {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = if verbose {
        EnvFilter::new(default_level)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Environment config with CLI flags layered on top.
fn load_config(db: Option<PathBuf>, max_rows: Option<u64>) -> Result<GatewayConfig> {
    let mut config = GatewayConfig::from_env()?;
    if let Some(db) = db {
        config.db_path = db;
    }
    if let Some(max_rows) = max_rows {
        config.max_rows = max_rows;
    }
    config.validate()?;
    Ok(config)
}

fn open_existing(config: &GatewayConfig) -> Result<SqlGateway> {
    if !config.db_path.exists() {
        bail!(
            "Database not found: {}. Load a CSV first with `sql-gateway load <file>`.",
            config.db_path.display()
        );
    }
    Ok(SqlGateway::open(config)?)
}

fn run_load(csv_file: PathBuf, table: Option<String>, db: Option<PathBuf>) -> Result<()> {
    let config = load_config(db, None)?;
    let table = match table {
        Some(table) => table,
        None => csv_file
            .file_stem()
            .and_then(|stem| stem.to_str())
            .map(|stem| stem.to_string())
            .ok_or_else(|| anyhow!("Cannot derive a table name from {}", csv_file.display()))?,
    };

    info!("Loading {} into table {}", csv_file.display(), table);
    let gateway = SqlGateway::open(&config)?;
    let result = gateway.load_csv(&csv_file, &table)?;

    println!("Loaded {} rows into table '{}'", result.rows_loaded, result.table_name);
    println!("  Columns:   {}", result.columns.join(", "));
    if !result.indexes_created.is_empty() {
        println!("  Indexes:   {}", result.indexes_created.join(", "));
    }
    for skipped in &result.skipped_indexes {
        println!("  Skipped:   {}", skipped);
    }
    println!("  Load time: {}s", result.load_time_seconds);
    println!("  Database:  {}", result.db_path);
    Ok(())
}

fn run_query(sql: String, db: Option<PathBuf>, max_rows: Option<u64>, json: bool) -> Result<()> {
    let config = load_config(db, max_rows)?;
    let gateway = open_existing(&config)?;
    let execution = gateway.run_query(&sql)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&execution)?);
    } else {
        println!("{}", render_query_result(&execution));
    }
    Ok(())
}

fn run_schema(table: Option<String>, db: Option<PathBuf>, json: bool) -> Result<()> {
    let config = load_config(db, None)?;
    let gateway = open_existing(&config)?;
    let inspector = gateway.schema();

    if let Some(table) = table {
        let schema = inspector.describe_table(&table)?;
        if json {
            println!("{}", serde_json::to_string_pretty(&schema)?);
        } else {
            println!("{}", render_table_schema(&schema));
        }
        return Ok(());
    }

    let tables = inspector.list_tables()?;
    let mut listing = Vec::with_capacity(tables.len());
    for name in tables {
        let row_count = inspector.describe_table(&name)?.row_count;
        listing.push((name, row_count));
    }

    if json {
        let body: Vec<_> = listing
            .iter()
            .map(|(name, rows)| json!({ "table_name": name, "row_count": rows }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else if listing.is_empty() {
        println!("No tables found in {}", config.db_path.display());
    } else {
        println!("Tables in {}:", config.db_path.display());
        for (name, rows) in &listing {
            println!("  {} ({} rows)", name, rows);
        }
    }
    Ok(())
}
