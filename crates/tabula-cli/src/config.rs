//! Command-line arguments.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tabula_core::migration::{Dialect, MigrationConfig, MigrationRequest};

/// Default database file.
pub const DEFAULT_DATABASE: &str = "tabula.db";

/// Tabula schema migration tool
#[derive(Parser, Debug)]
#[command(name = "tabula")]
#[command(version, about = "Reconcile a database with the Tabula schema catalog", long_about = None)]
pub struct Cli {
    /// Path to the SQLite database.
    #[arg(short, long, global = true, default_value = DEFAULT_DATABASE)]
    pub database: PathBuf,

    /// JSON catalog file (defaults to the compiled-in catalog).
    #[arg(short, long, global = true)]
    pub catalog: Option<PathBuf>,

    /// Log at debug level and report progress per table.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Migrate the database to the catalog.
    Migrate(MigrateArgs),
    /// Show the recorded version and any pending work.
    Status,
}

/// Arguments of `tabula migrate`.
#[derive(Args, Debug)]
pub struct MigrateArgs {
    /// Version recorded when every table succeeds.
    #[arg(short = 's', long)]
    pub schema_version: String,

    /// Only these tables (comma separated).
    #[arg(short, long, value_delimiter = ',')]
    pub tables: Vec<String>,

    /// Rebuild every table regardless of its plan.
    #[arg(short, long)]
    pub force: bool,

    /// Drop unknown tables, create missing ones and reseed reference data first.
    #[arg(long)]
    pub clean: bool,

    /// Plan and report without writing.
    #[arg(long)]
    pub dry_run: bool,

    /// Database flavour, which bounds statement parameters.
    #[arg(long, value_enum, default_value_t = DialectArg::Embedded)]
    pub dialect: DialectArg,

    /// Override the parameter ceiling per insert statement.
    #[arg(long)]
    pub max_parameters: Option<usize>,
}

/// `--dialect` values.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DialectArg {
    /// Embedded engine (999 parameters).
    Embedded,
    /// Server engine (32766 parameters).
    Server,
}

impl From<DialectArg> for Dialect {
    fn from(arg: DialectArg) -> Self {
        match arg {
            DialectArg::Embedded => Dialect::Embedded,
            DialectArg::Server => Dialect::Server,
        }
    }
}

impl MigrateArgs {
    /// The run inputs.
    pub fn request(&self) -> MigrationRequest {
        let request = MigrationRequest::new(&self.schema_version)
            .with_force_rebuild(self.force)
            .with_cleanup(self.clean);
        if self.tables.is_empty() {
            request
        } else {
            request.with_tables(self.tables.iter().map(|t| t.trim()).filter(|t| !t.is_empty()))
        }
    }

    /// The engine configuration.
    pub fn config(&self) -> MigrationConfig {
        let config = MigrationConfig::default()
            .with_dialect(self.dialect.into())
            .with_dry_run(self.dry_run);
        match self.max_parameters {
            Some(max) => config.with_max_parameters(max),
            None => config,
        }
    }
}
