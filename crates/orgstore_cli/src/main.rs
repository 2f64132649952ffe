//! Operator entry point for the organization store.
//!
//! # Responsibility
//! - Load configuration, open the store and apply pending migrations.
//! - Report schema and sequence state; resynchronize sequences on demand.

use anyhow::Context;
use clap::{Parser, Subcommand};
use log::info;
use orgstore_core::db::migrations::{current_user_version, latest_version};
use orgstore_core::repo::sequence;
use orgstore_core::{in_transaction, init_logging_from_config, open_with_config, StoreConfig};
use std::path::PathBuf;

/// orgstore - organization store maintenance
#[derive(Parser)]
#[command(name = "orgstore")]
#[command(version, about, long_about = None)]
struct Cli {
    /// TOML configuration file; `ORGSTORE_*` variables override it.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the schema version and every sequence's next value
    Status,
    /// Recompute sequences from the surviving rows
    Resync {
        /// Table to resynchronize; all tables when omitted
        table: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => StoreConfig::load_from(path),
        None => StoreConfig::load(),
    }
    .context("loading configuration")?;

    init_logging_from_config(&config)
        .map_err(anyhow::Error::msg)
        .context("initializing logging")?;

    let conn = open_with_config(&config)
        .with_context(|| format!("opening store at {}", config.database_path))?;

    match cli.command {
        Commands::Status => {
            println!(
                "schema_version={} latest_supported={}",
                current_user_version(&conn)?,
                latest_version()
            );
            for state in sequence::list(&conn)? {
                println!(
                    "{} table={} next_value={}",
                    state.name, state.table_name, state.next_value
                );
            }
        }
        Commands::Resync { table } => {
            let states = in_transaction(&conn, |tx| match table.as_deref() {
                Some(table) => sequence::resync_table(tx, table).map(|state| vec![state]),
                None => sequence::resync_all(tx),
            })?;
            for state in &states {
                println!("{} next_value={}", state.name, state.next_value);
            }
            info!(
                "event=cli_resync module=cli status=ok sequences={}",
                states.len()
            );
        }
    }
    Ok(())
}
