//! Index reconciliation.

use super::error::MigrationError;
use crate::catalog::{IndexSpec, TableSpec};
use crate::sql::{self, LiveIndex};
use rusqlite::Connection;
use tracing::debug;

/// What a reconciliation changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexReport {
    /// Indexes created.
    pub created: Vec<String>,
    /// Indexes dropped because they were stale or unknown.
    pub dropped: Vec<String>,
    /// Catalog indexes never created because they cover a large column.
    pub skipped: Vec<String>,
    /// Indexes already matching the catalog.
    pub kept: Vec<String>,
}

impl IndexReport {
    /// Whether anything was created or dropped.
    pub fn changed(&self) -> bool {
        !self.created.is_empty() || !self.dropped.is_empty()
    }
}

/// Converges a table's physical indexes on its catalog definition.
pub struct IndexManager;

impl IndexManager {
    /// Drop every explicit index that is not in the catalog or differs from
    /// it, then create the missing ones. Indexes over large text or blob
    /// columns are skipped.
    pub fn reconcile_indexes(
        conn: &Connection,
        spec: &TableSpec,
    ) -> Result<IndexReport, MigrationError> {
        let table = spec.name.as_str();
        let mut report = IndexReport::default();

        let mut desired = Vec::with_capacity(spec.indexes.len());
        for index in &spec.indexes {
            if Self::indexable(spec, index) {
                desired.push(index);
            } else {
                debug!(table, index = %index.name(), "skipping index over large column");
                report.skipped.push(index.name());
            }
        }

        let live = sql::live_indexes(conn, table).map_err(MigrationError::ddl(table))?;
        for existing in &live {
            let wanted = desired.iter().any(|index| Self::matches(index, existing));
            if wanted {
                report.kept.push(existing.name.clone());
            } else {
                conn.execute_batch(&format!("DROP INDEX IF EXISTS {}", sql::quote(&existing.name)))
                    .map_err(MigrationError::ddl(table))?;
                debug!(table, index = %existing.name, "dropped index");
                report.dropped.push(existing.name.clone());
            }
        }

        for index in desired {
            let name = index.name();
            if report.kept.contains(&name) {
                continue;
            }
            conn.execute_batch(&Self::create_sql(index))
                .map_err(MigrationError::ddl(table))?;
            debug!(table, index = %name, unique = index.unique, "created index");
            report.created.push(name);
        }

        Ok(report)
    }

    /// Whether every column of `index` can be indexed.
    pub fn indexable(spec: &TableSpec, index: &IndexSpec) -> bool {
        index
            .columns
            .iter()
            .all(|column| spec.field(column).map_or(true, |f| !f.type_tag.is_large()))
    }

    fn matches(index: &IndexSpec, live: &LiveIndex) -> bool {
        index.name() == live.name && index.unique == live.unique && index.columns == live.columns
    }

    fn create_sql(index: &IndexSpec) -> String {
        format!(
            "CREATE {}INDEX {} ON {} ({})",
            if index.unique { "UNIQUE " } else { "" },
            sql::quote(&index.name()),
            sql::quote(&index.table),
            sql::column_list(&index.columns)
        )
    }
}
