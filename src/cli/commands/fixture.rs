use clap::Subcommand;
use serde_json::json;
use sqlx::PgPool;
use std::path::PathBuf;

use crate::cli::OutputFormat;
use crate::database::{DatabaseManager, QueryCounter};
use crate::fixtures::{self, FixtureSet, TableSpec};

#[derive(Subcommand)]
pub enum FixtureCommands {
    #[command(about = "Dump tables to a JSON fixture file")]
    Dump {
        #[arg(
            long,
            value_delimiter = ',',
            help = "Tables to dump, each 'name' or 'name:pk_column'"
        )]
        tables: Vec<String>,
        #[arg(long, help = "Output fixture file path")]
        output: PathBuf,
        #[arg(long, help = "Database URL override")]
        database_url: Option<String>,
    },

    #[command(about = "Load a JSON fixture file into the database")]
    Load {
        #[arg(long, help = "Input fixture file path")]
        input: PathBuf,
        #[arg(
            long,
            value_delimiter = ',',
            help = "Table load order, parents first (defaults to file order)"
        )]
        order: Vec<String>,
        #[arg(long, help = "Database URL override")]
        database_url: Option<String>,
    },
}

pub async fn handle(cmd: FixtureCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        FixtureCommands::Dump { tables, output, database_url } => {
            handle_dump(tables, output, database_url, output_format).await
        }
        FixtureCommands::Load { input, order, database_url } => {
            handle_load(input, order, database_url, output_format).await
        }
    }
}

async fn connect(database_url: Option<String>) -> anyhow::Result<PgPool> {
    match database_url {
        Some(url) => Ok(DatabaseManager::pool_for_url(&url).await?),
        None => Ok(DatabaseManager::app_pool().await?),
    }
}

async fn handle_dump(
    tables: Vec<String>,
    output: PathBuf,
    database_url: Option<String>,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    if tables.is_empty() {
        return Err(anyhow::anyhow!("No tables given. Use --tables name[:pk_column],..."));
    }

    let specs: Vec<TableSpec> = tables.iter().map(|t| TableSpec::parse(t)).collect();
    let pool = connect(database_url).await?;
    let counter = QueryCounter::new();

    let set = fixtures::dump_tables(&pool, &counter, &specs).await?;
    set.write_file(&output)?;

    let counts = set.counts();

    match output_format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "success": true,
                    "output": output.display().to_string(),
                    "records": set.len(),
                    "tables": counts.iter().map(|(table, n)| json!({
                        "table": table,
                        "records": n
                    })).collect::<Vec<_>>(),
                    "queries": counter.count()
                }))?
            );
        }
        OutputFormat::Text => {
            println!("✓ Dumped {} records to {}", set.len(), output.display());
            for (table, n) in counts {
                println!("  └─ {}: {} records", table, n);
            }
        }
    }

    Ok(())
}

async fn handle_load(
    input: PathBuf,
    order: Vec<String>,
    database_url: Option<String>,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    if !input.exists() {
        return Err(anyhow::anyhow!("Fixture file not found: {}", input.display()));
    }

    let set = FixtureSet::read_file(&input)?;
    let order_refs: Vec<&str> = order.iter().map(|s| s.as_str()).collect();

    let pool = connect(database_url).await?;
    let counter = QueryCounter::new();

    let inserted = fixtures::load_set(&pool, &counter, &set, &order_refs).await?;

    match output_format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "success": true,
                    "input": input.display().to_string(),
                    "inserted": inserted,
                    "queries": counter.count()
                }))?
            );
        }
        OutputFormat::Text => {
            println!("✓ Loaded {} records from {}", inserted, input.display());
        }
    }

    Ok(())
}
