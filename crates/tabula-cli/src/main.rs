//! Tabula Command-Line Tool
//!
//! Reconciles a SQLite database with the schema catalog.

mod config;

use clap::Parser;
use config::{Cli, Command, MigrateArgs};
use rusqlite::Connection;
use std::process::ExitCode;
use tabula_core::migration::{
    MigrationConfig, MigrationEngine, ProgressEvent, ProgressSignal, Strategy, VersionTracker,
};
use tabula_core::SchemaCatalog;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Exit code when the run finished but some table failed or was cancelled.
const EXIT_PARTIAL: u8 = 2;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "tabula=debug" } else { "tabula=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let catalog = match &cli.catalog {
        Some(path) => SchemaCatalog::load(path)?,
        None => SchemaCatalog::builtin()?,
    };
    tracing::debug!(tables = catalog.len(), "catalog loaded");

    let mut conn = Connection::open(&cli.database)?;
    tracing::info!(database = %cli.database.display(), "database opened");

    match &cli.command {
        Command::Migrate(args) => migrate(&mut conn, catalog, args, cli.verbose),
        Command::Status => status(&conn, catalog),
    }
}

fn migrate(
    conn: &mut Connection,
    catalog: SchemaCatalog,
    args: &MigrateArgs,
    verbose: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let engine = MigrationEngine::new(catalog, args.config());
    let request = args.request();

    let report = engine.run_with_progress(conn, &request, |event| {
        if let ProgressEvent::TableStarted {
            table,
            position,
            total,
            strategy,
        } = event
        {
            if verbose {
                eprintln!("[{}/{}] {} {}", position, total, table, strategy);
            }
        }
        ProgressSignal::Continue
    })?;

    for outcome in &report.tables {
        println!("{}", outcome);
    }
    println!();
    println!("{}", report.summary());

    if report.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(EXIT_PARTIAL))
    }
}

fn status(conn: &Connection, catalog: SchemaCatalog) -> Result<ExitCode, Box<dyn std::error::Error>> {
    match VersionTracker::new(&catalog).current_version(conn)? {
        Some(applied) => println!("version {} applied {}", applied.version, applied.date),
        None => println!("no version recorded"),
    }

    let engine = MigrationEngine::new(catalog, MigrationConfig::default().with_dry_run(true));
    let mut pending = 0;
    for name in engine.catalog().table_names() {
        let Some(plan) = engine.plan_table(conn, name, false)? else {
            continue;
        };
        if plan.strategy != Strategy::NoChange {
            println!("  {:<10} {:<14} {}", name, plan.strategy.to_string(), plan.reason);
            pending += 1;
        }
    }
    if pending == 0 {
        println!("all tables match the catalog");
    }
    Ok(ExitCode::SUCCESS)
}
