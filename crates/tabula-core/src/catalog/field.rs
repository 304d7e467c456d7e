//! Field and index specifications.

use super::types::{FieldSize, TypeTag};
use serde::{Deserialize, Serialize};

/// Maximum number of columns in one index.
pub const MAX_INDEX_COLUMNS: usize = 7;

/// One column of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Owning table. Filled in from the enclosing table when loaded from a file.
    #[serde(default)]
    pub table: String,
    /// Position in the table, dense from zero.
    #[serde(rename = "seq")]
    pub sequence: u32,
    /// Column name.
    pub name: String,
    /// Logical type.
    #[serde(rename = "type")]
    pub type_tag: TypeTag,
    /// Declared width.
    pub size: FieldSize,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Short column heading.
    #[serde(default)]
    pub heading: String,
}

impl FieldSpec {
    /// Create a field with empty description and heading.
    pub fn new(
        table: impl Into<String>,
        sequence: u32,
        name: impl Into<String>,
        type_tag: TypeTag,
        size: FieldSize,
    ) -> Self {
        Self {
            table: table.into(),
            sequence,
            name: name.into(),
            type_tag,
            size,
            description: String::new(),
            heading: String::new(),
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the heading.
    pub fn with_heading(mut self, heading: impl Into<String>) -> Self {
        self.heading = heading.into();
        self
    }

    /// Whether `other` stores values the same way (type and size).
    pub fn same_storage(&self, other: &FieldSpec) -> bool {
        self.type_tag == other.type_tag && self.size == other.size
    }

    /// Whether only the descriptive text (description, heading) differs.
    pub fn same_descriptions(&self, other: &FieldSpec) -> bool {
        self.description == other.description && self.heading == other.heading
    }
}

/// One index of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpec {
    /// Owning table.
    #[serde(default)]
    pub table: String,
    /// Index number; the physical name is `<table>_key<sequence>`.
    #[serde(rename = "seq")]
    pub sequence: u32,
    /// Whether the indexed columns must be unique.
    #[serde(default)]
    pub unique: bool,
    /// Indexed columns in order, at most [`MAX_INDEX_COLUMNS`].
    pub columns: Vec<String>,
}

impl IndexSpec {
    /// Create an index over the given columns.
    pub fn new<I, S>(table: impl Into<String>, sequence: u32, unique: bool, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            table: table.into(),
            sequence,
            unique,
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    /// Physical index name.
    pub fn name(&self) -> String {
        index_name(&self.table, self.sequence)
    }
}

/// Physical name of index `sequence` on `table`.
pub fn index_name(table: &str, sequence: u32) -> String {
    format!("{}_key{}", table, sequence)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_name() {
        let index = IndexSpec::new("drsmst", 2, false, ["drm_cono", "drm_name"]);
        assert_eq!(index.name(), "drsmst_key2");
        assert_eq!(index.columns, vec!["drm_cono", "drm_name"]);
    }

    #[test]
    fn test_field_comparisons() {
        let a = FieldSpec::new("t", 0, "a", TypeTag::Alpha, FieldSize::new(10))
            .with_description("Name");
        let b = a.clone().with_description("Full Name");
        let c = FieldSpec::new("t", 0, "a", TypeTag::Alpha, FieldSize::new(20));

        assert!(a.same_storage(&b));
        assert!(!a.same_descriptions(&b));
        assert!(!a.same_storage(&c));
    }

    #[test]
    fn test_field_from_json() {
        let field: FieldSpec = serde_json::from_str(
            r#"{"seq": 3, "name": "glt_tramt", "type": "SD", "size": 13.2, "description": "Amount"}"#,
        )
        .unwrap();
        assert_eq!(field.sequence, 3);
        assert_eq!(field.type_tag, TypeTag::SignedDecimal);
        assert_eq!(field.size, FieldSize::decimal(13, 2));
        assert_eq!(field.heading, "");
    }
}
