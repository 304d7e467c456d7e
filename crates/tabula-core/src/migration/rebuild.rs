//! Table rebuilder.
//!
//! Moves the live table aside, recreates it from the catalog and streams
//! every old row into the new layout in parameter-bounded batches. Each new
//! field is resolved once per rebuild to one of: a verbatim copy, a typed
//! cast, a legacy fixup or the type default.

use super::coerce::{coerce, Coerced};
use super::error::MigrationError;
use super::fixup::{FixupFn, FixupRegistry, OldRow};
use crate::catalog::{FieldSpec, TableSpec};
use crate::sql;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection};
use std::collections::HashMap;
use tracing::debug;

/// Saved report column definitions, cleaned of dropped fields after a rebuild.
pub const REPORT_TABLE: &str = "rptcol";

/// Read order for tables whose history must replay chronologically.
///
/// Tables not listed are read in storage order. Columns missing from the old
/// layout are ignored.
pub const ORDERING_OVERRIDES: &[(&str, &[&str])] = &[
    ("gentrn", &["glt_capdt", "glt_seq"]),
    ("drstrn", &["drt_capdt", "drt_seq"]),
    ("crstrn", &["crt_capdt", "crt_seq"]),
];

/// What a rebuild did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RebuildStats {
    /// Rows read from the old layout and written to the new one.
    pub rows: u64,
    /// Insert batches executed.
    pub batches: usize,
    /// Values that could not be cast and took the type default.
    pub defaults_used: u64,
    /// Values supplied by a legacy fixup.
    pub fixups_applied: u64,
    /// Old columns with no counterpart in the new layout.
    pub dropped_fields: Vec<String>,
    /// Saved report columns removed because they named a dropped field.
    pub report_columns_removed: usize,
}

/// Where one new column's value comes from.
#[derive(Clone, Copy)]
enum Source {
    /// Same name, same storage: copy the old value.
    Copy(usize),
    /// Same name, different or unknown storage: cast the old value.
    Coerce(usize),
    /// New column with a registered fixup.
    Fixup(FixupFn),
    /// New column: type default.
    Default,
}

/// Rebuilds one table into its catalog layout.
pub struct TableRebuilder<'a> {
    fixups: &'a FixupRegistry,
    max_parameters: usize,
}

impl<'a> TableRebuilder<'a> {
    /// Create a rebuilder bounded by `max_parameters` bind parameters per statement.
    pub fn new(fixups: &'a FixupRegistry, max_parameters: usize) -> Self {
        Self {
            fixups,
            max_parameters: max_parameters.max(1),
        }
    }

    /// Rows per insert batch for a table of `field_count` columns.
    pub fn rows_per_batch(&self, field_count: usize) -> usize {
        (self.max_parameters / field_count.max(1)).max(1)
    }

    /// Rebuild `spec.name` from whatever is live.
    ///
    /// `old_fields` is the recorded layout, used to decide whether a column
    /// can be copied verbatim. Old rows are read by physical column name.
    /// `progress` is called after each batch with the rows written so far
    /// and the batch number. Runs inside the caller's transaction.
    pub fn rebuild(
        &self,
        conn: &Connection,
        spec: &TableSpec,
        old_fields: Option<&[FieldSpec]>,
        progress: &mut dyn FnMut(u64, usize),
    ) -> Result<RebuildStats, MigrationError> {
        let table = spec.name.as_str();
        if !sql::table_exists(conn, table)? {
            sql::create_table(conn, spec).map_err(MigrationError::ddl(table))?;
            debug!(table, "created empty table");
            return Ok(RebuildStats::default());
        }

        let old_columns = sql::table_columns(conn, table)?;
        let positions: HashMap<String, usize> = old_columns
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        let sources = self.resolve_sources(spec, old_fields, &positions);
        let dropped_fields: Vec<String> = old_columns
            .iter()
            .filter(|c| spec.field(c).is_none())
            .cloned()
            .collect();

        let staging = format!("{}__rebuild", table);
        sql::drop_table(conn, &staging).map_err(MigrationError::ddl(table))?;
        conn.execute_batch(&format!(
            "ALTER TABLE {} RENAME TO {}",
            sql::quote(table),
            sql::quote(&staging)
        ))
        .map_err(MigrationError::ddl(table))?;
        sql::create_table(conn, spec).map_err(MigrationError::ddl(table))?;

        let mut stats = self.copy_rows(conn, spec, &staging, &old_columns, &positions, &sources, progress)?;

        // Dropping the staging table also drops the old indexes.
        sql::drop_table(conn, &staging).map_err(MigrationError::ddl(table))?;

        let actual = sql::count_rows(conn, table)?;
        if actual != stats.rows {
            return Err(MigrationError::RowCountMismatch {
                table: table.to_string(),
                expected: stats.rows,
                actual,
            });
        }

        stats.report_columns_removed = remove_report_columns(conn, table, &dropped_fields)?;
        stats.dropped_fields = dropped_fields;
        Ok(stats)
    }

    fn resolve_sources(
        &self,
        spec: &TableSpec,
        old_fields: Option<&[FieldSpec]>,
        positions: &HashMap<String, usize>,
    ) -> Vec<Source> {
        spec.fields
            .iter()
            .map(|field| match positions.get(&field.name) {
                Some(&position) => {
                    let recorded = old_fields
                        .and_then(|fields| fields.iter().find(|old| old.name == field.name));
                    match recorded {
                        Some(old) if old.same_storage(field) => Source::Copy(position),
                        _ => Source::Coerce(position),
                    }
                }
                None => match self.fixups.lookup(&spec.name, &field.name) {
                    Some(fixup) => {
                        debug!(table = %spec.name, field = %field.name, fixup = fixup.description, "legacy fixup");
                        Source::Fixup(fixup.apply)
                    }
                    None => Source::Default,
                },
            })
            .collect()
    }

    #[allow(clippy::too_many_arguments)]
    fn copy_rows(
        &self,
        conn: &Connection,
        spec: &TableSpec,
        staging: &str,
        old_columns: &[String],
        positions: &HashMap<String, usize>,
        sources: &[Source],
        progress: &mut dyn FnMut(u64, usize),
    ) -> Result<RebuildStats, MigrationError> {
        let table = spec.name.as_str();
        let mut stats = RebuildStats::default();
        let batch_rows = self.rows_per_batch(spec.fields.len());

        let mut select = format!(
            "SELECT {} FROM {}",
            sql::column_list(old_columns),
            sql::quote(staging)
        );
        let order = ordering_for(table, positions);
        if !order.is_empty() {
            select.push_str(&format!(" ORDER BY {}", sql::column_list(&order)));
        }

        let full_insert = insert_sql(spec, batch_rows);
        let mut full_batch = conn.prepare(&full_insert)?;
        let mut read = conn.prepare(&select)?;
        let mut rows = read.query([])?;

        let mut pending: Vec<Value> = Vec::with_capacity(batch_rows * spec.fields.len());
        let mut pending_rows = 0;
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(old_columns.len());
            for i in 0..old_columns.len() {
                values.push(row.get::<_, Value>(i)?);
            }
            let old = OldRow::new(positions, &values);
            for (field, source) in spec.fields.iter().zip(sources) {
                pending.push(self.resolve(table, field, *source, &old, &mut stats));
            }
            pending_rows += 1;
            stats.rows += 1;

            if pending_rows == batch_rows {
                full_batch.execute(params_from_iter(pending.drain(..)))?;
                pending_rows = 0;
                stats.batches += 1;
                debug!(table, batch = stats.batches, rows = stats.rows, "batch written");
                progress(stats.rows, stats.batches);
            }
        }

        if pending_rows > 0 {
            conn.execute(&insert_sql(spec, pending_rows), params_from_iter(pending.drain(..)))?;
            stats.batches += 1;
            debug!(table, batch = stats.batches, rows = stats.rows, "batch written");
            progress(stats.rows, stats.batches);
        }
        Ok(stats)
    }

    fn resolve(
        &self,
        table: &str,
        field: &FieldSpec,
        source: Source,
        old: &OldRow<'_>,
        stats: &mut RebuildStats,
    ) -> Value {
        let cast = |value: &Value, stats: &mut RebuildStats| {
            let Coerced { value, used_default } = coerce(value, field.type_tag, field.size);
            if used_default {
                stats.defaults_used += 1;
                debug!(table, field = %field.name, "cast failed; default substituted");
            }
            value
        };
        match source {
            Source::Copy(i) => match old.get_at(i) {
                Some(value) if *value != Value::Null => value.clone(),
                other => cast(other.unwrap_or(&Value::Null), stats),
            },
            Source::Coerce(i) => cast(old.get_at(i).unwrap_or(&Value::Null), stats),
            Source::Fixup(apply) => match apply(old) {
                Some(value) => {
                    stats.fixups_applied += 1;
                    cast(&value, stats)
                }
                None => field.type_tag.default_value(),
            },
            Source::Default => field.type_tag.default_value(),
        }
    }
}

fn ordering_for(table: &str, positions: &HashMap<String, usize>) -> Vec<&'static str> {
    ORDERING_OVERRIDES
        .iter()
        .find(|(name, _)| *name == table)
        .map(|(_, columns)| {
            columns
                .iter()
                .copied()
                .filter(|c| positions.contains_key(*c))
                .collect()
        })
        .unwrap_or_default()
}

fn insert_sql(spec: &TableSpec, rows: usize) -> String {
    let row = format!("({})", vec!["?"; spec.fields.len()].join(", "));
    format!(
        "INSERT INTO {} ({}) VALUES {}",
        sql::quote(&spec.name),
        sql::column_list(&spec.field_names()),
        vec![row; rows].join(", ")
    )
}

fn remove_report_columns(
    conn: &Connection,
    table: &str,
    dropped: &[String],
) -> Result<usize, MigrationError> {
    if dropped.is_empty() || !sql::table_exists(conn, REPORT_TABLE)? {
        return Ok(0);
    }
    let columns = sql::table_columns(conn, REPORT_TABLE)?;
    if !["rpc_tabl", "rpc_colm"].iter().all(|c| columns.iter().any(|x| x == c)) {
        return Ok(0);
    }

    let mut delete = conn.prepare(&format!(
        "DELETE FROM {} WHERE rpc_tabl = ?1 AND rpc_colm = ?2",
        sql::quote(REPORT_TABLE)
    ))?;
    let mut removed = 0;
    for column in dropped {
        removed += delete.execute(params![table, column])?;
    }
    if removed > 0 {
        debug!(table, removed, "removed report columns naming dropped fields");
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{FieldSize, TypeTag};

    fn no_progress() -> impl FnMut(u64, usize) {
        |_, _| {}
    }

    fn spec_t(width: u16) -> TableSpec {
        let mut spec = TableSpec::new("t", "Test")
            .with_field("a", TypeTag::SignedInteger, FieldSize::new(7), "", "")
            .with_field("b", TypeTag::Alpha, FieldSize::new(width), "", "");
        spec.normalize();
        spec
    }

    fn values(conn: &Connection, sql: &str) -> Vec<(i64, String)> {
        let mut stmt = conn.prepare(sql).unwrap();
        stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap()
    }

    #[test]
    fn test_rows_per_batch() {
        let fixups = FixupRegistry::empty();
        let rebuilder = TableRebuilder::new(&fixups, 999);
        assert_eq!(rebuilder.rows_per_batch(10), 99);
        assert_eq!(rebuilder.rows_per_batch(2000), 1);
        assert_eq!(TableRebuilder::new(&fixups, 0).rows_per_batch(3), 1);
    }

    #[test]
    fn test_missing_table_is_created_empty() {
        let conn = Connection::open_in_memory().unwrap();
        let fixups = FixupRegistry::empty();
        let stats = TableRebuilder::new(&fixups, 999)
            .rebuild(&conn, &spec_t(20), None, &mut no_progress())
            .unwrap();
        assert_eq!(stats, RebuildStats::default());
        assert!(sql::table_exists(&conn, "t").unwrap());
    }

    #[test]
    fn test_widened_text_is_preserved_across_batches() {
        let conn = Connection::open_in_memory().unwrap();
        let old = spec_t(10);
        sql::create_table(&conn, &old).unwrap();
        let long = "exactly fifteen";
        for i in 0..25 {
            conn.execute("INSERT INTO t (a, b) VALUES (?1, ?2)", params![i, long]).unwrap();
        }

        let fixups = FixupRegistry::empty();
        let mut calls = Vec::new();
        let stats = TableRebuilder::new(&fixups, 20)
            .rebuild(&conn, &spec_t(20), Some(old.fields.as_slice()), &mut |rows, batch| {
                calls.push((rows, batch))
            })
            .unwrap();

        assert_eq!(stats.rows, 25);
        assert_eq!(stats.batches, 3);
        assert_eq!(calls, vec![(10, 1), (20, 2), (25, 3)]);
        assert_eq!(stats.defaults_used, 0);
        let rows = values(&conn, "SELECT a, b FROM t ORDER BY a");
        assert_eq!(rows.len(), 25);
        assert!(rows.iter().all(|(_, b)| b == long));
        assert!(!sql::table_exists(&conn, "t__rebuild").unwrap());
    }

    #[test]
    fn test_type_change_falls_back_to_default() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE t (a INTEGER, b BLOB); \
             INSERT INTO t VALUES (1, X'FFFE'); \
             INSERT INTO t VALUES (2, 'fine');",
        )
        .unwrap();

        let fixups = FixupRegistry::empty();
        let stats = TableRebuilder::new(&fixups, 999)
            .rebuild(&conn, &spec_t(20), None, &mut no_progress())
            .unwrap();
        assert_eq!(stats.rows, 2);
        assert_eq!(stats.defaults_used, 1);
        assert_eq!(
            values(&conn, "SELECT a, b FROM t ORDER BY a"),
            vec![(1, String::new()), (2, "fine".to_string())]
        );
    }

    #[test]
    fn test_fixup_and_dropped_column() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE ctlynd (cye_period INTEGER, cye_old TEXT); \
             INSERT INTO ctlynd VALUES (1, 'x'), (2, 'y'); \
             CREATE TABLE rptcol (rpc_rnam TEXT, rpc_seq INTEGER, rpc_tabl TEXT, rpc_colm TEXT, rpc_head TEXT); \
             INSERT INTO rptcol VALUES ('r', 0, 'ctlynd', 'cye_old', 'Old'); \
             INSERT INTO rptcol VALUES ('r', 1, 'ctlynd', 'cye_period', 'Per');",
        )
        .unwrap();
        let mut spec = TableSpec::new("ctlynd", "Periods")
            .with_field("cye_cono", TypeTag::UnsignedInteger, FieldSize::new(7), "", "")
            .with_field("cye_period", TypeTag::UnsignedInteger, FieldSize::new(3), "", "");
        spec.normalize();

        let fixups = FixupRegistry::standard();
        let stats = TableRebuilder::new(&fixups, 999)
            .rebuild(&conn, &spec, None, &mut no_progress())
            .unwrap();
        assert_eq!(stats.fixups_applied, 2);
        assert_eq!(stats.dropped_fields, vec!["cye_old".to_string()]);
        assert_eq!(stats.report_columns_removed, 1);

        let conos: Vec<i64> = conn
            .prepare("SELECT cye_cono FROM ctlynd")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(conos, vec![1, 1]);
        let left: i64 = conn
            .query_row("SELECT COUNT(*) FROM rptcol", [], |row| row.get(0))
            .unwrap();
        assert_eq!(left, 1);
    }

    #[test]
    fn test_ordering_override_ignores_missing_columns() {
        let positions: HashMap<String, usize> =
            [("glt_seq".to_string(), 0)].into_iter().collect();
        assert_eq!(ordering_for("gentrn", &positions), vec!["glt_seq"]);
        assert!(ordering_for("drsmst", &positions).is_empty());
    }

    #[test]
    fn test_insert_sql() {
        assert_eq!(
            insert_sql(&spec_t(10), 2),
            "INSERT INTO \"t\" (\"a\", \"b\") VALUES (?, ?), (?, ?)"
        );
    }
}
