//! Migration engine for Tabula.
//!
//! Reconciles a live database with the schema catalog, one table at a time:
//! - Inspection of the live field and index metadata
//! - Per-table strategy selection
//! - Row-preserving table rebuilds with typed coercion and legacy fixups
//! - Index convergence
//! - Optional whole-database cleanup
//! - Version recording once every table has succeeded
//!
//! # Strategies
//!
//! | Strategy | Trigger | Work done |
//! |----------|---------|-----------|
//! | **NO_CHANGE** | Metadata matches the catalog | Nothing |
//! | **METADATA_ONLY** | Only descriptions or headings differ | Metadata rows rewritten in place |
//! | **INDEX_ONLY** | Only the index set differs | Indexes dropped and created |
//! | **REBUILD** | Missing metadata, forced, or any structural change | Table recreated, every row transformed |
//!
//! # Example
//!
//! ```no_run
//! use tabula_core::migration::{MigrationConfig, MigrationEngine, MigrationRequest};
//! use tabula_core::SchemaCatalog;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut conn = rusqlite::Connection::open("tabula.db")?;
//! let engine = MigrationEngine::new(SchemaCatalog::builtin()?, MigrationConfig::default());
//! let report = engine.run(&mut conn, &MigrationRequest::new("6.15"))?;
//! println!("{}", report.summary());
//! # Ok(())
//! # }
//! ```

pub mod cleanup;
pub mod coerce;
pub mod error;
pub mod executor;
pub mod fixup;
pub mod index;
pub mod inspector;
pub mod metadata;
pub mod plan;
pub mod progress;
pub mod rebuild;
pub mod report;
pub mod version;

// Planning
pub use inspector::{Inspection, LiveLayout, SchemaInspector};
pub use plan::{
    MigrationPlan, MigrationPlanner, PlanReason, ShapeShift, Strategy, LEGACY_SHAPE_SHIFTS,
};

// Execution
pub use cleanup::{CleanupReport, CleanupStage};
pub use coerce::{coerce, Coerced};
pub use executor::{Dialect, MigrationConfig, MigrationEngine, MigrationRequest};
pub use fixup::{FixupRegistry, LegacyFixup, OldRow};
pub use index::{IndexManager, IndexReport};
pub use rebuild::{RebuildStats, TableRebuilder, ORDERING_OVERRIDES};
pub use version::{AppliedVersion, VersionTracker};

// Reporting
pub use error::MigrationError;
pub use progress::{ProgressEvent, ProgressSignal};
pub use report::{RunReport, SkipReason, TableOutcome, TableStatus};
