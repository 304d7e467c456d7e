//! Migration engine - drives a run table by table.
//!
//! Order of work: bootstrap the bookkeeping tables, optional cleanup, then
//! for each table in catalog order inspect, plan and apply inside one
//! transaction, and finally record the version if every table succeeded.

use super::cleanup::CleanupStage;
use super::error::MigrationError;
use super::fixup::FixupRegistry;
use super::index::IndexManager;
use super::inspector::{Inspection, SchemaInspector};
use super::metadata;
use super::plan::{MigrationPlan, MigrationPlanner, Strategy};
use super::progress::{ProgressEvent, ProgressSignal};
use super::rebuild::TableRebuilder;
use super::report::{RunReport, SkipReason, TableOutcome, TableStatus};
use super::version::VersionTracker;
use crate::catalog::{system, SchemaCatalog, TableSpec};
use crate::sql;
use rusqlite::Connection;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Database flavour, which bounds bind parameters per statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    /// Embedded engine with the conservative 999 parameter limit.
    #[default]
    Embedded,
    /// Server-style engine with a large parameter limit.
    Server,
}

impl Dialect {
    /// Maximum bind parameters in one statement.
    pub fn max_parameters(&self) -> usize {
        match self {
            Dialect::Embedded => 999,
            Dialect::Server => 32_766,
        }
    }
}

/// Engine configuration.
#[derive(Debug, Clone, Default)]
pub struct MigrationConfig {
    /// Parameter ceiling source.
    pub dialect: Dialect,
    /// Explicit ceiling, overriding the dialect's.
    pub max_parameters: Option<usize>,
    /// Plan only; write nothing.
    pub dry_run: bool,
}

impl MigrationConfig {
    /// Set the dialect.
    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Override the parameter ceiling.
    pub fn with_max_parameters(mut self, max_parameters: usize) -> Self {
        self.max_parameters = Some(max_parameters);
        self
    }

    /// Enable or disable dry-run mode.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// The effective parameter ceiling.
    pub fn parameter_ceiling(&self) -> usize {
        self.max_parameters
            .unwrap_or_else(|| self.dialect.max_parameters())
    }
}

/// Inputs of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationRequest {
    /// Version recorded when the run succeeds.
    pub version: String,
    /// Subset of tables; `None` means every catalog table.
    pub tables: Option<Vec<String>>,
    /// Rebuild every table regardless of its plan.
    pub force_rebuild: bool,
    /// Run the cleanup stage first.
    pub run_cleanup: bool,
}

impl MigrationRequest {
    /// A request for `version` covering every table.
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            tables: None,
            force_rebuild: false,
            run_cleanup: false,
        }
    }

    /// Restrict the run to `tables`.
    pub fn with_tables<I, S>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tables = Some(tables.into_iter().map(Into::into).collect());
        self
    }

    /// Force a rebuild of every table.
    pub fn with_force_rebuild(mut self, force: bool) -> Self {
        self.force_rebuild = force;
        self
    }

    /// Run the cleanup stage first.
    pub fn with_cleanup(mut self, cleanup: bool) -> Self {
        self.run_cleanup = cleanup;
        self
    }
}

/// Reconciles a database with a catalog.
pub struct MigrationEngine {
    catalog: SchemaCatalog,
    config: MigrationConfig,
    fixups: FixupRegistry,
}

impl MigrationEngine {
    /// Create an engine with the standard legacy fixups.
    pub fn new(catalog: SchemaCatalog, config: MigrationConfig) -> Self {
        Self {
            catalog,
            config,
            fixups: FixupRegistry::standard(),
        }
    }

    /// Replace the fixup registry.
    pub fn with_fixups(mut self, fixups: FixupRegistry) -> Self {
        self.fixups = fixups;
        self
    }

    /// The catalog.
    pub fn catalog(&self) -> &SchemaCatalog {
        &self.catalog
    }

    /// The configuration.
    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    /// Run without progress reporting.
    pub fn run(
        &self,
        conn: &mut Connection,
        request: &MigrationRequest,
    ) -> Result<RunReport, MigrationError> {
        self.run_with_progress(conn, request, |_| ProgressSignal::Continue)
    }

    /// Run, reporting progress after each batch and each table.
    ///
    /// Returns an error only when the run cannot start (bootstrap or cleanup
    /// failed); per-table failures are rolled back and recorded in the report.
    pub fn run_with_progress<F>(
        &self,
        conn: &mut Connection,
        request: &MigrationRequest,
        mut progress: F,
    ) -> Result<RunReport, MigrationError>
    where
        F: FnMut(&ProgressEvent<'_>) -> ProgressSignal,
    {
        let dry_run = self.config.dry_run;
        let mut report = RunReport {
            version: request.version.clone(),
            dry_run,
            ..RunReport::default()
        };
        info!(version = %request.version, dry_run, force = request.force_rebuild, "migration started");

        if !dry_run {
            let tx = conn.transaction()?;
            self.bootstrap(&tx)?;
            tx.commit()?;
        }

        if request.run_cleanup {
            if dry_run {
                info!("dry run; cleanup not performed");
            } else {
                let tx = conn.transaction()?;
                let cleanup = CleanupStage::new(&self.catalog).clean(&tx)?;
                tx.commit()?;
                report.cleanup = Some(cleanup);
            }
        }

        let (managed, unmanaged) = self.select_tables(conn, request)?;
        let total = managed.len();
        let mut stop = false;

        for (position, spec) in managed.into_iter().enumerate() {
            if stop {
                report.tables.push(TableOutcome {
                    table: spec.name.clone(),
                    strategy: None,
                    reason: None,
                    status: TableStatus::Skipped(SkipReason::Cancelled),
                });
                continue;
            }

            let plan = match self.plan_table(conn, &spec.name, request.force_rebuild) {
                Ok(Some(plan)) => plan,
                Ok(None) => continue,
                Err(e) => {
                    warn!(table = %spec.name, error = %e, "planning failed");
                    report.tables.push(TableOutcome {
                        table: spec.name.clone(),
                        strategy: None,
                        reason: None,
                        status: TableStatus::Failed {
                            reason: e.to_string(),
                        },
                    });
                    continue;
                }
            };
            info!(table = %spec.name, strategy = %plan.strategy, reason = %plan.reason, "planned");

            let started = ProgressEvent::TableStarted {
                table: &spec.name,
                position: position + 1,
                total,
                strategy: plan.strategy,
            };
            if progress(&started) == ProgressSignal::Stop {
                stop = true;
                info!(table = %spec.name, "stopped before migration");
                report.tables.push(TableOutcome {
                    table: spec.name.clone(),
                    strategy: Some(plan.strategy),
                    reason: Some(plan.reason),
                    status: TableStatus::Skipped(SkipReason::Cancelled),
                });
                continue;
            }

            let status = if dry_run {
                TableStatus::Planned
            } else {
                match self.migrate_table(conn, spec, &plan, &mut progress, &mut stop) {
                    Ok(status) => {
                        info!(table = %spec.name, status = %status, "migrated");
                        status
                    }
                    Err(e) => {
                        warn!(table = %spec.name, error = %e, "migration failed; rolled back");
                        TableStatus::Failed {
                            reason: e.to_string(),
                        }
                    }
                }
            };

            let finished = ProgressEvent::TableFinished {
                table: &spec.name,
                succeeded: !matches!(status, TableStatus::Failed { .. }),
            };
            stop |= progress(&finished) == ProgressSignal::Stop;

            report.tables.push(TableOutcome {
                table: spec.name.clone(),
                strategy: Some(plan.strategy),
                reason: Some(plan.reason),
                status,
            });
        }

        for table in unmanaged {
            warn!(table = %table, "no catalog entry; left alone");
            report.tables.push(TableOutcome {
                table,
                strategy: None,
                reason: None,
                status: TableStatus::Skipped(SkipReason::Unmanaged),
            });
        }

        report.cancelled = stop && !report.rerun_tables().is_empty();
        if !dry_run && report.failed().is_empty() && !report.cancelled {
            let tx = conn.transaction()?;
            VersionTracker::new(&self.catalog).record_version(&tx, &request.version)?;
            tx.commit()?;
            report.version_recorded = true;
        }

        info!(
            tables = report.tables.len(),
            failed = report.failed().len(),
            skipped = report.skipped().len(),
            version_recorded = report.version_recorded,
            "migration finished"
        );
        Ok(report)
    }

    /// Plan one table against the live metadata. `None` for tables the
    /// catalog does not manage.
    pub fn plan_table(
        &self,
        conn: &Connection,
        table: &str,
        force: bool,
    ) -> Result<Option<MigrationPlan>, MigrationError> {
        let layout = match SchemaInspector::new(&self.catalog).inspect(conn, table)? {
            Inspection::Unknown => return Ok(None),
            Inspection::Known(layout) => layout,
        };
        let Some(spec) = self.catalog.get(table) else {
            return Ok(None);
        };
        let plan = MigrationPlanner::plan(
            table,
            layout.fields.as_deref(),
            &spec.fields,
            &layout.indexes,
            &spec.indexes,
            force,
        )
        .require_table(layout.exists)
        .require_description(layout.description.as_deref(), &spec.description);
        Ok(Some(plan))
    }

    /// Bring the bookkeeping tables into their catalog layout so metadata
    /// can be read and written. Missing ones are created; one whose physical
    /// columns differ from the catalog is rebuilt in place, keeping its rows.
    /// The per-table loop then reconciles them like any other table.
    ///
    /// Returns the tables created or rebuilt.
    pub fn bootstrap(&self, conn: &Connection) -> Result<Vec<String>, MigrationError> {
        let mut touched = Vec::new();
        for name in [system::FIELD_TABLE, system::INDEX_TABLE, system::VERSION_TABLE] {
            let Some(spec) = self.catalog.get(name) else {
                continue;
            };
            if !sql::table_exists(conn, name)? {
                sql::create_table(conn, spec).map_err(MigrationError::ddl(name))?;
                debug!(table = name, "bootstrapped bookkeeping table");
                touched.push(name.to_string());
                continue;
            }

            let columns = sql::table_columns(conn, name)?;
            if columns.iter().map(String::as_str).eq(spec.field_names()) {
                continue;
            }
            let rebuilder = TableRebuilder::new(&self.fixups, self.config.parameter_ceiling());
            let stats = rebuilder.rebuild(conn, spec, None, &mut |_, _| {})?;
            IndexManager::reconcile_indexes(conn, spec)?;
            info!(table = name, rows = stats.rows, "rebuilt bookkeeping table from older layout");
            touched.push(name.to_string());
        }
        Ok(touched)
    }

    fn select_tables<'s>(
        &'s self,
        conn: &Connection,
        request: &MigrationRequest,
    ) -> Result<(Vec<&'s TableSpec>, Vec<String>), MigrationError> {
        match &request.tables {
            Some(names) => {
                let wanted: HashSet<&str> = names.iter().map(String::as_str).collect();
                let managed = self
                    .catalog
                    .tables()
                    .iter()
                    .filter(|spec| wanted.contains(spec.name.as_str()))
                    .collect();
                let mut seen = HashSet::new();
                let unmanaged = names
                    .iter()
                    .filter(|name| !self.catalog.contains(name) && seen.insert(name.as_str()))
                    .cloned()
                    .collect();
                Ok((managed, unmanaged))
            }
            None => {
                let unmanaged = sql::live_tables(conn)?
                    .into_iter()
                    .filter(|name| !self.catalog.contains(name))
                    .collect();
                Ok((self.catalog.tables().iter().collect(), unmanaged))
            }
        }
    }

    fn migrate_table<F>(
        &self,
        conn: &mut Connection,
        spec: &TableSpec,
        plan: &MigrationPlan,
        progress: &mut F,
        stop: &mut bool,
    ) -> Result<TableStatus, MigrationError>
    where
        F: FnMut(&ProgressEvent<'_>) -> ProgressSignal,
    {
        let table = spec.name.as_str();
        let tx = conn.transaction()?;
        let status = match plan.strategy {
            Strategy::NoChange => TableStatus::Unchanged,
            Strategy::MetadataOnly => {
                let changed = metadata::update_descriptions(&tx, spec)?;
                debug!(table, changed, "descriptions rewritten");
                if plan.indexes_changed() {
                    IndexManager::reconcile_indexes(&tx, spec)?;
                }
                // Index rows also carry the table description.
                metadata::write_indexes(&tx, spec)?;
                TableStatus::MetadataUpdated
            }
            Strategy::IndexOnly => {
                let indexes = IndexManager::reconcile_indexes(&tx, spec)?;
                debug!(
                    table,
                    created = indexes.created.len(),
                    dropped = indexes.dropped.len(),
                    skipped = indexes.skipped.len(),
                    "indexes reconciled"
                );
                metadata::write_indexes(&tx, spec)?;
                TableStatus::IndexesUpdated
            }
            Strategy::Rebuild => {
                let rebuilder = TableRebuilder::new(&self.fixups, self.config.parameter_ceiling());
                let mut on_batch = |rows: u64, batch: usize| {
                    let event = ProgressEvent::Batch { table, rows, batch };
                    *stop |= progress(&event) == ProgressSignal::Stop;
                };
                let stats = rebuilder.rebuild(&tx, spec, plan.old_fields.as_deref(), &mut on_batch)?;
                if stats.defaults_used > 0 || stats.fixups_applied > 0 {
                    info!(
                        table,
                        defaults = stats.defaults_used,
                        fixups = stats.fixups_applied,
                        "values substituted during rebuild"
                    );
                }
                metadata::write_fields(&tx, spec)?;
                IndexManager::reconcile_indexes(&tx, spec)?;
                metadata::write_indexes(&tx, spec)?;
                TableStatus::Rebuilt { rows: stats.rows }
            }
        };
        tx.commit()?;
        Ok(status)
    }
}
