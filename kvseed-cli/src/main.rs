//! kvseed - seed and inspect the lookup regression fixture.

mod error;
mod telemetry;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use kvseed_core::{SeedConfig, StoreBackend, StoreConfig, CONFIG_ENV};
use kvseed_fixtures::{digest, verify, FixtureSeeder, LookupTable};
use kvseed_storage::{open_store, StoreClient};
use serde::Serialize;
use serde_json::json;

use error::CliError;
use telemetry::{init_tracing, LogFormat};

#[derive(Debug, Parser)]
#[command(name = "kvseed", version, about = "Seed and inspect the lookup regression fixture")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct GlobalArgs {
    /// TOML config file. Falls back to `KVSEED_CONFIG`.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Test name substituted into the table template.
    #[arg(long, global = true, env = "FULL_TESTNAME")]
    test_name: Option<String>,

    /// LMDB directory.
    #[arg(long, global = true, env = "KVSEED_STORE")]
    store_path: Option<PathBuf>,

    /// Use a throwaway in-memory store.
    #[arg(long, global = true, conflicts_with = "store_path")]
    memory: bool,

    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create the data table, write the rows and register the mappings.
    Seed,
    /// Compare the store against the fixture; exits 1 on mismatch.
    Verify,
    /// Print the mappings registered for the data table.
    Lookup,
    /// Print every row of a table.
    Dump {
        /// Defaults to the data table.
        #[arg(long)]
        table: Option<String>,
    },
    /// Print the SHA-256 of a table's contents.
    Digest {
        /// Defaults to the data table.
        #[arg(long)]
        table: Option<String>,
    },
    /// List existing tables.
    Tables,
    /// Drop the data table and remove its mappings.
    Teardown,
}

fn resolve_config(args: &GlobalArgs) -> Result<SeedConfig, CliError> {
    let env_path = std::env::var_os(CONFIG_ENV)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from);
    build_config(args, args.config.as_deref().or(env_path.as_deref()))
}

/// Build the effective config: the file if one is named, otherwise the
/// canonical fixture. Command-line values override the file.
fn build_config(args: &GlobalArgs, config_path: Option<&Path>) -> Result<SeedConfig, CliError> {
    let mut config = match config_path {
        Some(path) => SeedConfig::from_path(path)?,
        None => SeedConfig::canonical(
            args.test_name.clone().unwrap_or_default(),
            StoreConfig::lmdb(args.store_path.clone().unwrap_or_default()),
        ),
    };

    if let Some(name) = &args.test_name {
        config.test_name = name.clone();
    }
    if let Some(path) = &args.store_path {
        config.store.backend = StoreBackend::Lmdb;
        config.store.path = Some(path.clone());
    }
    if args.memory {
        config.store.backend = StoreBackend::Memory;
        config.store.path = None;
    }

    config.validate()?;
    Ok(config)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    let mut out = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;
    Ok(())
}

fn dump(store: &dyn StoreClient, table: &str) -> Result<serde_json::Value, CliError> {
    let rows: Vec<_> = store
        .scan(table)?
        .into_iter()
        .map(|r| {
            let cells: serde_json::Map<_, _> = r
                .cells
                .iter()
                .map(|(column, cell)| {
                    (
                        column.to_string(),
                        json!({
                            "value": cell.value_lossy(),
                            "timestamp": cell.timestamp,
                        }),
                    )
                })
                .collect();
            json!({ "row": r.row, "cells": cells })
        })
        .collect();
    Ok(json!({ "table": table, "rows": rows }))
}

fn run(command: &Command, config: &SeedConfig) -> Result<ExitCode, CliError> {
    let store = open_store(config)?;
    let store = store.as_ref();
    let data_table = config.data_table();

    match command {
        Command::Seed => {
            let report = FixtureSeeder::new(store, config).seed()?;
            print_json(&report)?;
        }
        Command::Verify => {
            let report = verify(store, config)?;
            print_json(&report)?;
            if !report.is_ok() {
                return Ok(ExitCode::from(1));
            }
        }
        Command::Lookup => {
            let lookup = LookupTable::new(store);
            let mappings = lookup.mappings(&data_table)?;
            print_json(&json!({
                "lookup_table": lookup.table(),
                "data_table": data_table,
                "mappings": mappings,
            }))?;
            if mappings.is_none() {
                return Ok(ExitCode::from(1));
            }
        }
        Command::Dump { table } => {
            let table = table.as_deref().unwrap_or(&data_table);
            print_json(&dump(store, table)?)?;
        }
        Command::Digest { table } => {
            let table = table.as_deref().unwrap_or(&data_table);
            print_json(&json!({ "table": table, "sha256": digest(store, table)? }))?;
        }
        Command::Tables => {
            print_json(&store.list_tables()?)?;
        }
        Command::Teardown => {
            let report = FixtureSeeder::new(store, config).teardown()?;
            print_json(&report)?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.global.log_format);

    let result = resolve_config(&cli.global).and_then(|config| {
        tracing::debug!(
            test_name = %config.test_name,
            backend = ?config.store.backend,
            "resolved config"
        );
        run(&cli.command, &config)
    });

    match result {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("error: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}
