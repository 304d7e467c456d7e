//! Tabula Core - schema catalog and live table migration.
//!
//! This crate reconciles a SQLite database with a canonical schema catalog.

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

pub mod catalog;
pub mod error;
pub mod migration;
pub mod sql;

pub use catalog::{
    DefaultPolicy, FieldSize, FieldSpec, IndexSpec, SchemaCatalog, TableSpec, TypeKind, TypeTag,
};
pub use error::Error;
pub use migration::{
    Dialect, MigrationConfig, MigrationEngine, MigrationError, MigrationPlan, MigrationPlanner,
    MigrationRequest, RunReport, Strategy, TableStatus,
};
