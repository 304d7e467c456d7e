//! Physical schema access: the generic DDL creator and live catalog queries.
//!
//! Every function takes the connection explicitly; a `rusqlite::Transaction`
//! derefs to a `Connection`, so these run inside the caller's transaction.

use crate::catalog::{TableSpec, TypeKind, TypeTag};
use rusqlite::{params, Connection};

/// Quote an identifier for interpolation into SQL.
pub fn quote(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Comma-separated quoted column list.
pub fn column_list<S: AsRef<str>>(columns: &[S]) -> String {
    columns
        .iter()
        .map(|c| quote(c.as_ref()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn default_literal(tag: TypeTag) -> &'static str {
    match tag.kind() {
        TypeKind::Integer | TypeKind::Date => "0",
        TypeKind::Decimal => "0.0",
        TypeKind::Text => "''",
        TypeKind::Blob => "X''",
    }
}

/// `CREATE TABLE` statement for a table definition.
pub fn create_table_sql(spec: &TableSpec) -> String {
    let columns = spec
        .fields
        .iter()
        .map(|f| {
            format!(
                "{} {} NOT NULL DEFAULT {}",
                quote(&f.name),
                f.type_tag.sql_type(),
                default_literal(f.type_tag)
            )
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!("CREATE TABLE {} ({})", quote(&spec.name), columns)
}

/// Create a table physically from its definition. Indexes are left to the index manager.
pub fn create_table(conn: &Connection, spec: &TableSpec) -> Result<(), rusqlite::Error> {
    conn.execute_batch(&create_table_sql(spec))
}

/// Drop a table if it exists.
pub fn drop_table(conn: &Connection, name: &str) -> Result<(), rusqlite::Error> {
    conn.execute_batch(&format!("DROP TABLE IF EXISTS {}", quote(name)))
}

/// Whether a table physically exists.
pub fn table_exists(conn: &Connection, name: &str) -> Result<bool, rusqlite::Error> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
        params![name],
        |row| row.get(0),
    )
}

/// All user tables, sorted by name.
pub fn live_tables(conn: &Connection) -> Result<Vec<String>, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master \
         WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )?;
    let names = stmt
        .query_map([], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(names)
}

/// Physical column names of a table in declaration order.
pub fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>, rusqlite::Error> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1) ORDER BY cid")?;
    let columns = stmt
        .query_map(params![table], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(columns)
}

/// Row count of a table.
pub fn count_rows(conn: &Connection, table: &str) -> Result<u64, rusqlite::Error> {
    let count: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM {}", quote(table)),
        [],
        |row| row.get(0),
    )?;
    Ok(count.max(0) as u64)
}

/// An index as it exists in the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveIndex {
    /// Index name.
    pub name: String,
    /// Whether it enforces uniqueness.
    pub unique: bool,
    /// Indexed columns in order.
    pub columns: Vec<String>,
}

/// Explicitly created indexes on a table (constraint autoindexes are excluded).
pub fn live_indexes(conn: &Connection, table: &str) -> Result<Vec<LiveIndex>, rusqlite::Error> {
    let mut list = conn.prepare(
        "SELECT name, \"unique\" FROM pragma_index_list(?1) WHERE origin = 'c' ORDER BY name",
    )?;
    let entries = list
        .query_map(params![table], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, bool>(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut info = conn.prepare("SELECT name FROM pragma_index_info(?1) ORDER BY seqno")?;
    let mut indexes = Vec::with_capacity(entries.len());
    for (name, unique) in entries {
        let columns = info
            .query_map(params![&name], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        indexes.push(LiveIndex {
            name,
            unique,
            columns,
        });
    }
    Ok(indexes)
}
