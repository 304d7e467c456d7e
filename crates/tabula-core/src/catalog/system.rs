//! Bookkeeping tables owned by the engine itself.
//!
//! These mirror every managed table's layout and are reconciled by the same
//! machinery as any other table.

use super::{FieldSize, TableSpec, TypeTag};

/// Field metadata table: one row per column per table.
pub const FIELD_TABLE: &str = "ffield";

/// Index metadata table: one row per index per table.
pub const INDEX_TABLE: &str = "ftable";

/// Applied schema version marker.
pub const VERSION_TABLE: &str = "verupd";

/// Key column slots in the index metadata table.
pub const INDEX_KEY_COLUMNS: [&str; 7] = [
    "ft_key0", "ft_key1", "ft_key2", "ft_key3", "ft_key4", "ft_key5", "ft_key6",
];

/// Definitions of the bookkeeping tables, in migration order.
pub fn tables() -> Vec<TableSpec> {
    use TypeTag::*;

    let mut index_table = TableSpec::new(INDEX_TABLE, "Table Index Definitions")
        .with_field("ft_tabl", Alpha, FieldSize::new(20), "Table Name", "Table")
        .with_field("ft_desc", Alpha, FieldSize::new(30), "Table Description", "Description")
        .with_field("ft_seq", UnsignedInteger, FieldSize::new(2), "Index Sequence", "Seq")
        .with_field("ft_type", UpperAlpha, FieldSize::new(1), "Index Type (U/N)", "T");
    for (position, key) in INDEX_KEY_COLUMNS.iter().enumerate() {
        index_table = index_table.with_field(
            key,
            Alpha,
            FieldSize::new(20),
            &format!("Key Column {}", position),
            &format!("Key{}", position),
        );
    }
    let index_table = index_table.with_index(true, &["ft_tabl", "ft_seq"]);

    vec![
        TableSpec::new(FIELD_TABLE, "Table Field Definitions")
            .with_field("ff_tabl", Alpha, FieldSize::new(20), "Table Name", "Table")
            .with_field("ff_seq", UnsignedInteger, FieldSize::new(3), "Field Sequence", "Seq")
            .with_field("ff_name", Alpha, FieldSize::new(20), "Field Name", "Name")
            .with_field("ff_type", UpperAlpha, FieldSize::new(2), "Field Type", "TP")
            .with_field("ff_size", Alpha, FieldSize::new(6), "Field Size", "Size")
            .with_field("ff_desc", Alpha, FieldSize::new(30), "Description", "Description")
            .with_field("ff_head", Alpha, FieldSize::new(20), "Heading", "Heading")
            .with_index(true, &["ff_tabl", "ff_seq"])
            .with_index(false, &["ff_tabl", "ff_name"]),
        index_table,
        TableSpec::new(VERSION_TABLE, "Schema Version Marker")
            .with_field("ver_num", Alpha, FieldSize::new(20), "Version Number", "Version")
            .with_field("ver_date", Date, FieldSize::new(10), "Date Applied", "Date"),
    ]
}
