//! Reads the live metadata tables.

use super::error::MigrationError;
use crate::catalog::system::{FIELD_TABLE, INDEX_KEY_COLUMNS, INDEX_TABLE};
use crate::catalog::{FieldSize, FieldSpec, IndexSpec, SchemaCatalog, TypeTag};
use crate::sql;
use rusqlite::{params, Connection};
use tracing::warn;

/// The live layout of one managed table.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveLayout {
    /// Field metadata; `None` when no rows exist or they cannot be parsed.
    pub fields: Option<Vec<FieldSpec>>,
    /// Index metadata (empty when none is recorded).
    pub indexes: Vec<IndexSpec>,
    /// Table description recorded with the index metadata, if any.
    pub description: Option<String>,
    /// Whether the table physically exists.
    pub exists: bool,
}

/// What the inspector found for a table.
#[derive(Debug, Clone, PartialEq)]
pub enum Inspection {
    /// The catalog does not manage this table; it must be left alone.
    Unknown,
    /// A managed table and its live layout.
    Known(LiveLayout),
}

/// Read-only view of the live metadata.
///
/// The metadata tables may themselves be in an older layout. Missing
/// descriptive columns read as empty; missing key columns make the
/// metadata read as absent.
pub struct SchemaInspector<'a> {
    catalog: &'a SchemaCatalog,
}

impl<'a> SchemaInspector<'a> {
    /// Create an inspector for tables managed by `catalog`.
    pub fn new(catalog: &'a SchemaCatalog) -> Self {
        Self { catalog }
    }

    /// Inspect one table. Never writes.
    pub fn inspect(&self, conn: &Connection, table: &str) -> Result<Inspection, MigrationError> {
        if !self.catalog.contains(table) {
            return Ok(Inspection::Unknown);
        }
        let exists = sql::table_exists(conn, table)?;
        let fields = read_fields(conn, table)?;
        let (indexes, description) = read_indexes(conn, table)?;
        Ok(Inspection::Known(LiveLayout {
            fields,
            indexes,
            description,
            exists,
        }))
    }
}

/// Select expression for `column`: the column itself, or an empty string
/// literal when the live table lacks it.
fn column_or_blank(columns: &[String], column: &str) -> String {
    if columns.iter().any(|c| c == column) {
        sql::quote(column)
    } else {
        "''".to_string()
    }
}

fn missing_column<'c>(columns: &[String], required: &[&'c str]) -> Option<&'c str> {
    required
        .iter()
        .copied()
        .find(|r| !columns.iter().any(|c| c == r))
}

fn metadata_error(table: &str) -> impl FnOnce(rusqlite::Error) -> MigrationError + '_ {
    move |e| MigrationError::Metadata {
        table: table.to_string(),
        reason: e.to_string(),
    }
}

fn read_fields(conn: &Connection, table: &str) -> Result<Option<Vec<FieldSpec>>, MigrationError> {
    if !sql::table_exists(conn, FIELD_TABLE)? {
        return Ok(None);
    }

    let columns = sql::table_columns(conn, FIELD_TABLE)?;
    if let Some(missing) =
        missing_column(&columns, &["ff_tabl", "ff_seq", "ff_name", "ff_type", "ff_size"])
    {
        warn!(table, column = missing, "field metadata table lacks a key column");
        return Ok(None);
    }

    let mut stmt = conn.prepare(&format!(
        "SELECT ff_seq, ff_name, ff_type, ff_size, {}, {} FROM {} \
         WHERE ff_tabl = ?1 ORDER BY ff_seq",
        column_or_blank(&columns, "ff_desc"),
        column_or_blank(&columns, "ff_head"),
        sql::quote(FIELD_TABLE)
    ))?;
    let rows = stmt
        .query_map(params![table], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()
        .map_err(metadata_error(table))?;

    if rows.is_empty() {
        return Ok(None);
    }

    let mut fields = Vec::with_capacity(rows.len());
    for (sequence, name, type_code, size, description, heading) in rows {
        let parsed = (
            u32::try_from(sequence).ok(),
            type_code.parse::<TypeTag>(),
            size.parse::<FieldSize>(),
        );
        match parsed {
            (Some(sequence), Ok(type_tag), Ok(size)) => fields.push(FieldSpec {
                table: table.to_string(),
                sequence,
                name,
                type_tag,
                size,
                description,
                heading,
            }),
            _ => {
                // Unparseable metadata is treated as absent, which forces a rebuild.
                warn!(
                    table,
                    field = %name,
                    sequence,
                    type_code = %type_code,
                    size = %size,
                    "corrupt field metadata"
                );
                return Ok(None);
            }
        }
    }
    Ok(Some(fields))
}

fn read_indexes(
    conn: &Connection,
    table: &str,
) -> Result<(Vec<IndexSpec>, Option<String>), MigrationError> {
    if !sql::table_exists(conn, INDEX_TABLE)? {
        return Ok((Vec::new(), None));
    }

    let columns = sql::table_columns(conn, INDEX_TABLE)?;
    if let Some(missing) = missing_column(&columns, &["ft_tabl", "ft_seq", "ft_type"]) {
        warn!(table, column = missing, "index metadata table lacks a key column");
        return Ok((Vec::new(), None));
    }
    let has_description = columns.iter().any(|c| c == "ft_desc");
    let keys = INDEX_KEY_COLUMNS
        .iter()
        .map(|key| column_or_blank(&columns, key))
        .collect::<Vec<_>>()
        .join(", ");

    let mut stmt = conn.prepare(&format!(
        "SELECT ft_seq, ft_type, {}, {} FROM {} WHERE ft_tabl = ?1 ORDER BY ft_seq",
        column_or_blank(&columns, "ft_desc"),
        keys,
        sql::quote(INDEX_TABLE)
    ))?;
    let rows = stmt
        .query_map(params![table], |row| {
            let sequence: i64 = row.get(0)?;
            let kind: String = row.get(1)?;
            let description: String = row.get(2)?;
            let mut key_columns = Vec::new();
            for slot in 0..INDEX_KEY_COLUMNS.len() {
                let column: String = row.get(slot + 3)?;
                if !column.is_empty() {
                    key_columns.push(column);
                }
            }
            Ok((sequence, kind, description, key_columns))
        })?
        .collect::<Result<Vec<_>, _>>()
        .map_err(metadata_error(table))?;

    let description = if has_description {
        rows.first().map(|(_, _, description, _)| description.clone())
    } else {
        None
    };

    let mut indexes = Vec::with_capacity(rows.len());
    for (sequence, kind, _, key_columns) in rows {
        let Ok(sequence) = u32::try_from(sequence) else {
            // Treated as absent; the plan rewrites the index metadata.
            warn!(table, sequence, "corrupt index metadata");
            return Ok((Vec::new(), description));
        };
        indexes.push(IndexSpec {
            table: table.to_string(),
            sequence,
            unique: kind.eq_ignore_ascii_case("U"),
            columns: key_columns,
        });
    }
    Ok((indexes, description))
}
