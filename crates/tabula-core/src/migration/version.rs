//! Applied schema version marker.

use super::coerce::date_number;
use super::error::MigrationError;
use crate::catalog::system::VERSION_TABLE;
use crate::catalog::SchemaCatalog;
use crate::sql;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::info;

/// A recorded version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedVersion {
    /// Version string.
    pub version: String,
    /// Date applied, as CCYYMMDD.
    pub date: i64,
}

/// Reads and writes the single-row version marker.
pub struct VersionTracker<'a> {
    catalog: &'a SchemaCatalog,
}

impl<'a> VersionTracker<'a> {
    /// Create a tracker; the catalog supplies the marker table's layout.
    pub fn new(catalog: &'a SchemaCatalog) -> Self {
        Self { catalog }
    }

    /// Replace the marker with `version`, dated today.
    pub fn record_version(&self, conn: &Connection, version: &str) -> Result<(), MigrationError> {
        self.ensure_table(conn)?;
        let today = date_number(chrono::Local::now().date_naive());
        let table = sql::quote(VERSION_TABLE);
        conn.execute(&format!("DELETE FROM {}", table), [])?;
        conn.execute(
            &format!("INSERT INTO {} (ver_num, ver_date) VALUES (?1, ?2)", table),
            params![version, today],
        )?;
        info!(version, date = today, "recorded schema version");
        Ok(())
    }

    /// The recorded marker, if any.
    pub fn current_version(&self, conn: &Connection) -> Result<Option<AppliedVersion>, MigrationError> {
        if !sql::table_exists(conn, VERSION_TABLE)? {
            return Ok(None);
        }
        let version = conn
            .query_row(
                &format!("SELECT ver_num, ver_date FROM {} LIMIT 1", sql::quote(VERSION_TABLE)),
                [],
                |row| {
                    Ok(AppliedVersion {
                        version: row.get(0)?,
                        date: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(version)
    }

    fn ensure_table(&self, conn: &Connection) -> Result<(), MigrationError> {
        if sql::table_exists(conn, VERSION_TABLE)? {
            return Ok(());
        }
        let spec = self.catalog.get(VERSION_TABLE).ok_or_else(|| MigrationError::Metadata {
            table: VERSION_TABLE.to_string(),
            reason: "catalog has no version table".to_string(),
        })?;
        sql::create_table(conn, spec).map_err(MigrationError::ddl(VERSION_TABLE))
    }
}
