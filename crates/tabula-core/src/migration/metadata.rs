//! Writes the live metadata tables so they mirror the catalog.

use crate::catalog::system::{FIELD_TABLE, INDEX_KEY_COLUMNS, INDEX_TABLE};
use crate::catalog::TableSpec;
use crate::sql;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection};

/// Replace every field metadata row of `spec.name`.
pub fn write_fields(conn: &Connection, spec: &TableSpec) -> Result<(), rusqlite::Error> {
    let table = sql::quote(FIELD_TABLE);
    conn.execute(
        &format!("DELETE FROM {} WHERE ff_tabl = ?1", table),
        params![spec.name],
    )?;

    let mut insert = conn.prepare(&format!(
        "INSERT INTO {} (ff_tabl, ff_seq, ff_name, ff_type, ff_size, ff_desc, ff_head) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        table
    ))?;
    for field in &spec.fields {
        insert.execute(params![
            spec.name,
            field.sequence,
            field.name,
            field.type_tag.code(),
            field.size.to_string(),
            field.description,
            field.heading,
        ])?;
    }
    Ok(())
}

/// Rewrite only the descriptive columns of `spec.name`'s field rows.
pub fn update_descriptions(conn: &Connection, spec: &TableSpec) -> Result<usize, rusqlite::Error> {
    let mut update = conn.prepare(&format!(
        "UPDATE {} SET ff_desc = ?1, ff_head = ?2 WHERE ff_tabl = ?3 AND ff_seq = ?4",
        sql::quote(FIELD_TABLE)
    ))?;
    let mut changed = 0;
    for field in &spec.fields {
        changed += update.execute(params![
            field.description,
            field.heading,
            spec.name,
            field.sequence
        ])?;
    }
    Ok(changed)
}

/// Replace every index metadata row of `spec.name`.
pub fn write_indexes(conn: &Connection, spec: &TableSpec) -> Result<(), rusqlite::Error> {
    let table = sql::quote(INDEX_TABLE);
    conn.execute(
        &format!("DELETE FROM {} WHERE ft_tabl = ?1", table),
        params![spec.name],
    )?;

    let placeholders = (1..=INDEX_KEY_COLUMNS.len() + 4)
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ");
    let mut insert = conn.prepare(&format!(
        "INSERT INTO {} (ft_tabl, ft_desc, ft_seq, ft_type, {}) VALUES ({})",
        table,
        sql::column_list(&INDEX_KEY_COLUMNS),
        placeholders
    ))?;
    for index in &spec.indexes {
        let mut values = vec![
            Value::Text(spec.name.clone()),
            Value::Text(spec.description.clone()),
            Value::Integer(i64::from(index.sequence)),
            Value::Text(if index.unique { "U" } else { "N" }.to_string()),
        ];
        for slot in 0..INDEX_KEY_COLUMNS.len() {
            values.push(Value::Text(index.columns.get(slot).cloned().unwrap_or_default()));
        }
        insert.execute(params_from_iter(values))?;
    }
    Ok(())
}

/// Forget a table entirely.
pub fn remove(conn: &Connection, table: &str) -> Result<(), rusqlite::Error> {
    for (meta, column) in [(FIELD_TABLE, "ff_tabl"), (INDEX_TABLE, "ft_tabl")] {
        if sql::table_exists(conn, meta)? {
            conn.execute(
                &format!("DELETE FROM {} WHERE {} = ?1", sql::quote(meta), column),
                params![table],
            )?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SchemaCatalog;

    fn setup() -> (Connection, SchemaCatalog) {
        let conn = Connection::open_in_memory().unwrap();
        let catalog = SchemaCatalog::builtin().unwrap();
        for name in [FIELD_TABLE, INDEX_TABLE] {
            sql::create_table(&conn, catalog.get(name).unwrap()).unwrap();
        }
        (conn, catalog)
    }

    fn count(conn: &Connection, sql: &str) -> i64 {
        conn.query_row(sql, [], |row| row.get(0)).unwrap()
    }

    #[test]
    fn test_write_fields_replaces_rows() {
        let (conn, catalog) = setup();
        let spec = catalog.get("drsmst").unwrap();
        write_fields(&conn, spec).unwrap();
        write_fields(&conn, spec).unwrap();

        let rows = count(&conn, "SELECT COUNT(*) FROM ffield WHERE ff_tabl = 'drsmst'");
        assert_eq!(rows as usize, spec.fields.len());
    }

    #[test]
    fn test_update_descriptions_only_touches_text() {
        let (conn, catalog) = setup();
        let mut spec = catalog.get("crsmst").unwrap().clone();
        write_fields(&conn, &spec).unwrap();

        spec.fields[2].description = "Supplier Name".to_string();
        let changed = update_descriptions(&conn, &spec).unwrap();
        assert_eq!(changed, spec.fields.len());

        let desc: String = conn
            .query_row(
                "SELECT ff_desc FROM ffield WHERE ff_tabl = 'crsmst' AND ff_seq = 2",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(desc, "Supplier Name");
    }

    #[test]
    fn test_write_indexes_and_remove() {
        let (conn, catalog) = setup();
        let spec = catalog.get("gentrn").unwrap();
        write_fields(&conn, spec).unwrap();
        write_indexes(&conn, spec).unwrap();

        let rows = count(&conn, "SELECT COUNT(*) FROM ftable WHERE ft_tabl = 'gentrn'");
        assert_eq!(rows as usize, spec.indexes.len());
        let unique = count(
            &conn,
            "SELECT COUNT(*) FROM ftable WHERE ft_tabl = 'gentrn' AND ft_type = 'U'",
        );
        assert_eq!(unique, 1);

        remove(&conn, "gentrn").unwrap();
        assert_eq!(count(&conn, "SELECT COUNT(*) FROM ffield WHERE ff_tabl = 'gentrn'"), 0);
        assert_eq!(count(&conn, "SELECT COUNT(*) FROM ftable WHERE ft_tabl = 'gentrn'"), 0);
    }
}
