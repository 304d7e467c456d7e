//! Whole-database cleanup.
//!
//! Drops tables the catalog does not know, creates catalog tables that are
//! missing, reseeds the fixed reference rows and removes age allocations
//! whose master account no longer exists.

use super::error::MigrationError;
use super::index::IndexManager;
use super::metadata;
use crate::catalog::SchemaCatalog;
use crate::sql;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use tracing::{debug, info};

/// A fixed set of reference rows, replaced on every cleanup.
pub struct ReferenceData {
    /// Target table.
    pub table: &'static str,
    /// Columns identifying a row; matching rows are deleted before insert.
    pub key: &'static [&'static str],
    /// Columns supplied for each row, key columns first.
    pub columns: &'static [&'static str],
    /// Row values in `columns` order.
    pub rows: fn() -> Vec<Vec<Value>>,
}

/// A child table whose rows require a parent row with the same key.
pub struct OrphanRule {
    /// Dependent table.
    pub child: &'static str,
    /// Key columns in the dependent table.
    pub child_key: &'static [&'static str],
    /// Master table.
    pub parent: &'static str,
    /// Matching key columns in the master table.
    pub parent_key: &'static [&'static str],
}

fn text(s: &str) -> Value {
    Value::Text(s.to_string())
}

fn templates() -> Vec<Vec<Value>> {
    [
        ("statement", "Debtors Statement", "S", "DRS", "header;ageing;lines;totals"),
        ("invoice", "Sales Invoice", "I", "DRS", "header;lines;tax;totals"),
        ("remittance", "Remittance Advice", "R", "CRS", "header;allocations;totals"),
    ]
    .into_iter()
    .map(|(name, title, kind, system, layout)| {
        vec![text(name), text(title), text(kind), text(system), text(layout)]
    })
    .collect()
}

fn rates() -> Vec<Vec<Value>> {
    [
        ("VAT", 19_930_407, "Value Added Tax", 14.0),
        ("VAT", 20_180_401, "Value Added Tax", 15.0),
        ("ZRO", 19_910_930, "Zero Rated", 0.0),
    ]
    .into_iter()
    .map(|(code, date, desc, rate)| {
        vec![text(code), Value::Integer(date), text(desc), Value::Real(rate)]
    })
    .collect()
}

/// Reference rows reseeded by cleanup.
pub static REFERENCE_DATA: &[ReferenceData] = &[
    ReferenceData {
        table: "tplmst",
        key: &["tpm_tname"],
        columns: &["tpm_tname", "tpm_title", "tpm_type", "tpm_system", "tpm_layout"],
        rows: templates,
    },
    ReferenceData {
        table: "ctlrat",
        key: &["ctr_code", "ctr_date"],
        columns: &["ctr_code", "ctr_date", "ctr_desc", "ctr_rate"],
        rows: rates,
    },
];

/// The age ledgers and their masters.
pub static ORPHAN_RULES: &[OrphanRule] = &[
    OrphanRule {
        child: "drsage",
        child_key: &["dra_cono", "dra_chain", "dra_acno"],
        parent: "drsmst",
        parent_key: &["drm_cono", "drm_chain", "drm_acno"],
    },
    OrphanRule {
        child: "crsage",
        child_key: &["cra_cono", "cra_acno"],
        parent: "crsmst",
        parent_key: &["crm_cono", "crm_acno"],
    },
];

/// What cleanup changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Live tables dropped because the catalog does not name them.
    pub dropped_tables: Vec<String>,
    /// Catalog tables created because they were missing.
    pub created_tables: Vec<String>,
    /// Reference rows inserted.
    pub reseeded_rows: usize,
    /// Orphaned age rows deleted.
    pub orphans_removed: usize,
}

/// Optional whole-database pass, run before the per-table migration.
pub struct CleanupStage<'a> {
    catalog: &'a SchemaCatalog,
}

impl<'a> CleanupStage<'a> {
    /// Create a cleanup stage for `catalog`.
    pub fn new(catalog: &'a SchemaCatalog) -> Self {
        Self { catalog }
    }

    /// Run every cleanup step inside the caller's transaction.
    pub fn clean(&self, conn: &Connection) -> Result<CleanupReport, MigrationError> {
        let mut report = CleanupReport {
            dropped_tables: self.drop_unknown(conn)?,
            created_tables: self.create_missing(conn)?,
            ..CleanupReport::default()
        };
        for data in REFERENCE_DATA {
            report.reseeded_rows += self.reseed(conn, data)?;
        }
        for rule in ORPHAN_RULES {
            report.orphans_removed += self.remove_orphans(conn, rule)?;
        }
        info!(
            dropped = report.dropped_tables.len(),
            created = report.created_tables.len(),
            reseeded = report.reseeded_rows,
            orphans = report.orphans_removed,
            "cleanup finished"
        );
        Ok(report)
    }

    fn drop_unknown(&self, conn: &Connection) -> Result<Vec<String>, MigrationError> {
        let mut dropped = Vec::new();
        for table in sql::live_tables(conn)? {
            if self.catalog.contains(&table) {
                continue;
            }
            sql::drop_table(conn, &table).map_err(MigrationError::ddl(&table))?;
            metadata::remove(conn, &table)?;
            info!(table = %table, "dropped table not in catalog");
            dropped.push(table);
        }
        Ok(dropped)
    }

    fn create_missing(&self, conn: &Connection) -> Result<Vec<String>, MigrationError> {
        let mut created = Vec::new();
        // Physical creation first: metadata writes need the bookkeeping tables.
        for spec in self.catalog.tables() {
            if !sql::table_exists(conn, &spec.name)? {
                sql::create_table(conn, spec).map_err(MigrationError::ddl(&spec.name))?;
                created.push(spec.name.clone());
            }
        }
        for name in &created {
            let Some(spec) = self.catalog.get(name) else {
                continue;
            };
            metadata::write_fields(conn, spec).map_err(MigrationError::ddl(name))?;
            metadata::write_indexes(conn, spec).map_err(MigrationError::ddl(name))?;
            IndexManager::reconcile_indexes(conn, spec)?;
            info!(table = %name, "created missing table");
        }
        Ok(created)
    }

    fn reseed(&self, conn: &Connection, data: &ReferenceData) -> Result<usize, MigrationError> {
        let Some(spec) = self.catalog.get(data.table) else {
            return Ok(0);
        };
        if data.columns.iter().any(|c| spec.field(c).is_none())
            || !sql::table_exists(conn, data.table)?
        {
            debug!(table = data.table, "reference table layout differs; not reseeded");
            return Ok(0);
        }

        let table = sql::quote(data.table);
        let predicate = data
            .key
            .iter()
            .enumerate()
            .map(|(i, column)| format!("{} = ?{}", sql::quote(column), i + 1))
            .collect::<Vec<_>>()
            .join(" AND ");
        let mut delete = conn.prepare(&format!("DELETE FROM {} WHERE {}", table, predicate))?;
        let mut insert = conn.prepare(&format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            sql::column_list(data.columns),
            vec!["?"; data.columns.len()].join(", ")
        ))?;

        let rows = (data.rows)();
        for row in &rows {
            delete.execute(params_from_iter(&row[..data.key.len()]))?;
            insert.execute(params_from_iter(row))?;
        }
        debug!(table = data.table, rows = rows.len(), "reseeded reference data");
        Ok(rows.len())
    }

    fn remove_orphans(&self, conn: &Connection, rule: &OrphanRule) -> Result<usize, MigrationError> {
        for (table, key) in [(rule.child, rule.child_key), (rule.parent, rule.parent_key)] {
            if !sql::table_exists(conn, table)? {
                return Ok(0);
            }
            let columns = sql::table_columns(conn, table)?;
            if !key.iter().all(|k| columns.iter().any(|c| c == k)) {
                return Ok(0);
            }
        }

        let join = rule
            .child_key
            .iter()
            .zip(rule.parent_key)
            .map(|(c, p)| {
                format!(
                    "p.{} = {}.{}",
                    sql::quote(p),
                    sql::quote(rule.child),
                    sql::quote(c)
                )
            })
            .collect::<Vec<_>>()
            .join(" AND ");
        let removed = conn.execute(
            &format!(
                "DELETE FROM {} WHERE NOT EXISTS (SELECT 1 FROM {} p WHERE {})",
                sql::quote(rule.child),
                sql::quote(rule.parent),
                join
            ),
            [],
        )?;
        if removed > 0 {
            info!(table = rule.child, removed, "removed orphaned age rows");
        }
        Ok(removed)
    }
}
